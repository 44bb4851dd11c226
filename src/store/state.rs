//! # Estado Persistido
//!
//! União das três coleções acumuladas mais o timestamp do último save.
//! É exatamente o que vai para o armazenamento local e para o backup remoto.
//!
//! ```json
//! {
//!   "evolutions": [ ... ],
//!   "financial_records": [ ... ],
//!   "schedules": { "missed": [ ... ], "attended": [ ... ], "reference_date": "15/10/2025" },
//!   "timestamp": "2025-10-15T13:00:00Z"
//! }
//! ```
//!
//! Documentos antigos (`evolucoes`, `financeiro_records`, `agendamentos`) são
//! aceitos. Qualquer coleção ausente ou `null` vira coleção vazia.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::core::records::{null_as_default, sanitize_fee};
use crate::core::{EvolutionRecord, FinancialRecord, ScheduleData};

/// Estado completo do store.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PersistedState {
    #[serde(default, alias = "evolucoes", deserialize_with = "null_as_default")]
    pub evolutions: Vec<EvolutionRecord>,
    #[serde(default, alias = "financeiro_records", deserialize_with = "null_as_default")]
    pub financial_records: Vec<FinancialRecord>,
    #[serde(default, alias = "agendamentos", deserialize_with = "null_as_default")]
    pub schedules: ScheduleData,
    /// Último save. `None` até o primeiro save.
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub timestamp: Option<DateTime<Utc>>,
}

impl PersistedState {
    /// Corrige campos derivados após carregar um documento externo.
    ///
    /// Valores negativos ou não-finitos viram zero.
    pub fn normalize(mut self) -> Self {
        self.schedules.normalize();
        for record in &mut self.financial_records {
            record.fee = sanitize_fee(record.fee);
        }
        self
    }

    /// `true` se as três coleções estão vazias.
    pub fn is_empty(&self) -> bool {
        self.evolutions.is_empty() && self.financial_records.is_empty() && self.schedules.is_empty()
    }

    /// `true` se `self` é estritamente mais novo que `other`.
    ///
    /// Estado sem timestamp nunca é mais novo; qualquer timestamp é mais novo
    /// que nenhum.
    pub fn is_newer_than(&self, other: &PersistedState) -> bool {
        match (self.timestamp, other.timestamp) {
            (Some(mine), Some(theirs)) => mine > theirs,
            (Some(_), None) => true,
            (None, _) => false,
        }
    }
}

/// Aceita RFC 3339 ou ISO sem fuso (assumido UTC). Qualquer outra coisa vira `None`.
fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
    let Some(serde_json::Value::String(s)) = raw else {
        return Ok(None);
    };
    if let Ok(ts) = DateTime::parse_from_rfc3339(&s) {
        return Ok(Some(ts.with_timezone(&Utc)));
    }
    Ok(NaiveDateTime::parse_from_str(&s, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn missing_and_null_collections_default_to_empty() {
        let state: PersistedState =
            serde_json::from_str(r#"{ "evolucoes": null, "timestamp": null }"#).unwrap();
        assert!(state.is_empty());
        assert!(state.timestamp.is_none());
    }

    #[test]
    fn legacy_document_is_accepted() {
        let json = r#"{
            "evolucoes": [{ "id": 1, "paciente": "Maria", "horario": "08:00", "fisioterapeuta": "Ana", "dataProcessamento": "15/10/2025" }],
            "financeiro": {},
            "financeiro_records": [],
            "agendamentos": { "faltaram": [{ "paciente": "João" }], "compareceram": [] },
            "timestamp": "2025-11-12T00:00:00"
        }"#;
        let state: PersistedState = serde_json::from_str::<PersistedState>(json).unwrap().normalize();
        assert_eq!(state.evolutions.len(), 1);
        assert_eq!(state.evolutions[0].patient, "Maria");
        assert_eq!(state.schedules.missed.len(), 1);
        assert_eq!(state.timestamp, Some(Utc.with_ymd_and_hms(2025, 11, 12, 0, 0, 0).unwrap()));
    }

    #[test]
    fn negative_fees_are_zeroed_on_load() {
        let json = r#"{ "financial_records": [
            { "patient": "Maria", "fee": -50.0 },
            { "paciente": "João", "valor": -0.01 },
            { "patient": "Ana", "fee": 80.5 }
        ] }"#;
        let state = serde_json::from_str::<PersistedState>(json).unwrap().normalize();
        let fees: Vec<f64> = state.financial_records.iter().map(|r| r.fee).collect();
        assert_eq!(fees, vec![0.0, 0.0, 80.5]);
    }

    #[test]
    fn garbage_timestamp_is_ignored() {
        let state: PersistedState = serde_json::from_str(r#"{ "timestamp": 1731369600000 }"#).unwrap();
        assert!(state.timestamp.is_none());
    }

    #[test]
    fn newer_comparison_is_strict() {
        let t = Utc.with_ymd_and_hms(2025, 10, 15, 12, 0, 0).unwrap();
        let a = PersistedState { timestamp: Some(t), ..Default::default() };
        let b = a.clone();
        assert!(!a.is_newer_than(&b));

        let newer = PersistedState {
            timestamp: Some(t + chrono::Duration::seconds(1)),
            ..Default::default()
        };
        assert!(newer.is_newer_than(&a));
        assert!(a.is_newer_than(&PersistedState::default()));
        assert!(!PersistedState::default().is_newer_than(&a));
    }
}
