//! # Exportação e Importação de Backup
//!
//! Documento de backup do estado completo:
//!
//! ```json
//! {
//!   "version": "2.0.0",
//!   "export_date": "2025-10-15T13:00:00Z",
//!   "data": { "evolutions": [], "financial_records": [], "schedules": {}, "timestamp": null },
//!   "metadata": { "evolution_count": 0, "financial_count": 0, ... }
//! }
//! ```
//!
//! A importação é tudo-ou-nada: `version` e `data` são obrigatórios, coleções
//! ausentes viram vazias e uma coleção presente com formato errado rejeita o
//! documento inteiro.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ImportError;
use crate::store::state::PersistedState;

/// Versão do formato de backup gerado.
pub const BACKUP_VERSION: &str = "2.0.0";

/// Contagens e totais para conferência humana do arquivo.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BackupMetadata {
    pub evolution_count: usize,
    pub financial_count: usize,
    pub missed_count: usize,
    pub attended_count: usize,
    pub total_revenue: f64,
    pub last_modified: Option<DateTime<Utc>>,
}

impl BackupMetadata {
    pub fn from_state(state: &PersistedState) -> Self {
        let revenue: f64 = state.financial_records.iter().map(|r| r.fee).sum();
        Self {
            evolution_count: state.evolutions.len(),
            financial_count: state.financial_records.len(),
            missed_count: state.schedules.missed.len(),
            attended_count: state.schedules.attended.len(),
            total_revenue: (revenue * 100.0).round() / 100.0,
            last_modified: state.timestamp,
        }
    }
}

/// Documento de backup.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BackupDocument {
    pub version: String,
    pub export_date: DateTime<Utc>,
    pub data: PersistedState,
    pub metadata: BackupMetadata,
}

/// Gera o documento de backup do estado.
pub fn export(state: &PersistedState) -> BackupDocument {
    BackupDocument {
        version: BACKUP_VERSION.to_string(),
        export_date: Utc::now(),
        data: state.clone(),
        metadata: BackupMetadata::from_state(state),
    }
}

/// Coleções do `data`, com os nomes antigos, e o tipo JSON esperado.
const COLLECTIONS: [(&str, &str, &str, bool); 3] = [
    ("evolutions", "evolucoes", "evoluções", true),
    ("financial_records", "financeiro_records", "financeiro", true),
    ("schedules", "agendamentos", "agendamentos", false),
];

/// Valida e converte um documento de backup em estado.
pub fn import(raw: &str) -> Result<PersistedState, ImportError> {
    let doc: Value = serde_json::from_str(raw)?;

    if doc.get("version").map_or(true, Value::is_null) {
        return Err(ImportError::MissingField("version"));
    }
    let data = match doc.get("data") {
        Some(Value::Object(map)) => map,
        Some(Value::Null) | None => return Err(ImportError::MissingField("data")),
        Some(_) => return Err(ImportError::InvalidCollection("data")),
    };

    for (key, legacy, label, is_list) in COLLECTIONS {
        for value in [data.get(key), data.get(legacy)].into_iter().flatten() {
            let ok = match value {
                Value::Null => true,
                Value::Array(_) => is_list,
                Value::Object(_) => !is_list,
                _ => false,
            };
            if !ok {
                return Err(ImportError::InvalidCollection(label));
            }
        }
    }

    let state: PersistedState = serde_json::from_value(Value::Object(data.clone()))?;
    Ok(state.normalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::appointment::sample;
    use crate::core::{EvolutionRecord, FinancialRecord, ScheduleOutcome, ScheduleRecord};

    fn populated() -> PersistedState {
        let a = sample("Maria", "Presença confirmada");
        let mut state = PersistedState {
            evolutions: vec![EvolutionRecord::from_appointment(&a, 1)],
            financial_records: vec![FinancialRecord::from(&a), FinancialRecord::from(&a)],
            timestamp: Some(Utc::now()),
            ..Default::default()
        };
        state
            .schedules
            .missed
            .push(ScheduleRecord::from_appointment(&sample("João", "Faltou"), ScheduleOutcome::Missed));
        state
            .schedules
            .attended
            .push(ScheduleRecord::from_appointment(&a, ScheduleOutcome::Attended));
        state
    }

    #[test]
    fn export_carries_metadata() {
        let doc = export(&populated());
        assert_eq!(doc.version, BACKUP_VERSION);
        assert_eq!(doc.metadata.evolution_count, 1);
        assert_eq!(doc.metadata.financial_count, 2);
        assert_eq!(doc.metadata.missed_count, 1);
        assert_eq!(doc.metadata.attended_count, 1);
        assert_eq!(doc.metadata.total_revenue, 160.0);
    }

    #[test]
    fn collections_survive_export_and_import() {
        let state = populated();
        let json = serde_json::to_string(&export(&state)).unwrap();
        assert_eq!(import(&json).unwrap(), state);
    }

    #[test]
    fn missing_top_level_fields_are_rejected() {
        assert!(matches!(import(r#"{ "data": {} }"#), Err(ImportError::MissingField("version"))));
        assert!(matches!(import(r#"{ "version": "1.0" }"#), Err(ImportError::MissingField("data"))));
        assert!(matches!(import("not json"), Err(ImportError::InvalidJson(_))));
    }

    #[test]
    fn missing_collections_default_to_empty() {
        let state = import(r#"{ "version": "1.0", "data": { "evolucoes": [] } }"#).unwrap();
        assert!(state.is_empty());
    }

    #[test]
    fn imported_negative_fee_becomes_zero() {
        let state = import(r#"{ "version": "2.0.0", "data": { "financial_records": [{ "patient": "Maria", "fee": -50.0 }] } }"#)
            .unwrap();
        assert_eq!(state.financial_records[0].fee, 0.0);
        assert_eq!(BackupMetadata::from_state(&state).total_revenue, 0.0);
    }

    #[test]
    fn wrongly_shaped_collection_rejects_everything() {
        let err = import(r#"{ "version": "1.0", "data": { "evolucoes": {"x": 1}, "financeiro_records": [] } }"#);
        assert!(matches!(err, Err(ImportError::InvalidCollection("evoluções"))));
        let err = import(r#"{ "version": "1.0", "data": { "agendamentos": [] } }"#);
        assert!(matches!(err, Err(ImportError::InvalidCollection("agendamentos"))));
    }
}
