//! # Registros de Destino — Evolução, Financeiro e Agendamentos
//!
//! Cada [`Appointment`] roteada vira um ou mais registros de destino.
//! O roteamento é um *fan-out*, não uma partição: o mesmo agendamento pode
//! gerar uma [`EvolutionRecord`], uma [`FinancialRecord`] e uma
//! [`ScheduleRecord`] ao mesmo tempo.
//!
//! | Registro | Criado quando | Coleção |
//! |----------|---------------|---------|
//! | [`EvolutionRecord`] | presença confirmada | evoluções pendentes |
//! | [`FinancialRecord`] | presença confirmada ou atendido | financeiro |
//! | [`ScheduleRecord`] | sempre (falta ou compareceu) | agendamentos |
//!
//! ## Compatibilidade com Documentos Antigos
//!
//! Os campos aceitam os nomes em português usados pelas versões anteriores
//! (`paciente`, `fisioterapeuta`, `valor`...) via `#[serde(alias)]`, e
//! valores `null` viram o default do tipo.

use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use super::appointment::Appointment;

/// Rótulo usado quando o bloco não trouxe o fisioterapeuta.
pub const UNSPECIFIED: &str = "Não especificado";

/// Desserializa `null` como `T::default()`.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Evolução clínica pendente: um atendimento com presença confirmada que
/// ainda precisa de nota de evolução.
///
/// Nunca é alterada depois de criada; só sai da coleção via limpeza explícita.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EvolutionRecord {
    /// Identificador sequencial, atribuído pelo store no momento do append.
    #[serde(default)]
    pub id: u64,
    #[serde(default, alias = "horario", deserialize_with = "null_as_default")]
    pub time_slot: String,
    #[serde(default, alias = "fisioterapeuta", deserialize_with = "null_as_default")]
    pub professional: String,
    #[serde(default, alias = "paciente", deserialize_with = "null_as_default")]
    pub patient: String,
    #[serde(default, alias = "celular")]
    pub phone: Option<String>,
    #[serde(default, alias = "convenio")]
    pub payer: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default, alias = "procedimentos")]
    pub procedure: Option<String>,
    #[serde(default, alias = "periodo")]
    pub period: Option<String>,
    /// Rótulo `DD/MM/YYYY` da data de processamento.
    #[serde(default, alias = "dataProcessamento", deserialize_with = "null_as_default")]
    pub processing_date: String,
    #[serde(default, alias = "dia")]
    pub day: Option<u32>,
    #[serde(default, alias = "mes")]
    pub month: Option<u32>,
    #[serde(default, alias = "ano")]
    pub year: Option<i32>,
}

impl EvolutionRecord {
    /// Projeta uma `Appointment` com o id informado.
    pub fn from_appointment(appointment: &Appointment, id: u64) -> Self {
        Self {
            id,
            time_slot: appointment.time_slot.clone(),
            professional: appointment
                .professional
                .clone()
                .filter(|p| !p.trim().is_empty())
                .unwrap_or_else(|| UNSPECIFIED.to_string()),
            patient: appointment.patient.clone(),
            phone: appointment.phone.clone(),
            payer: appointment.payer.clone(),
            status: appointment.status.clone(),
            procedure: appointment.procedure.clone(),
            period: appointment.period.clone(),
            processing_date: appointment.date_label(),
            day: Some(appointment.date.day),
            month: Some(appointment.date.month),
            year: Some(appointment.date.year),
        }
    }
}

/// Registro de faturamento.
///
/// `fee` é sempre um número não-negativo (0 quando o bloco não tinha linha `R$`).
/// A classificação isento/pagante é derivada do `payer`, não armazenada.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FinancialRecord {
    #[serde(default, alias = "horario", deserialize_with = "null_as_default")]
    pub time_slot: String,
    #[serde(default, alias = "fisioterapeuta", deserialize_with = "null_as_default")]
    pub professional: String,
    #[serde(default, alias = "paciente", deserialize_with = "null_as_default")]
    pub patient: String,
    #[serde(default, alias = "celular")]
    pub phone: Option<String>,
    #[serde(default, alias = "convenio")]
    pub payer: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default, alias = "procedimentos")]
    pub procedure: Option<String>,
    #[serde(default, alias = "repetido")]
    pub repeated: Option<String>,
    #[serde(default, alias = "dataAtendimento")]
    pub service_date: Option<String>,
    #[serde(default, alias = "valor", deserialize_with = "null_as_default")]
    pub fee: f64,
    #[serde(default, alias = "dataProcessamento", deserialize_with = "null_as_default")]
    pub processing_date: String,
    #[serde(default, alias = "dia")]
    pub day: Option<u32>,
    #[serde(default, alias = "mes")]
    pub month: Option<u32>,
    #[serde(default, alias = "ano")]
    pub year: Option<i32>,
}

impl From<&Appointment> for FinancialRecord {
    fn from(appointment: &Appointment) -> Self {
        Self {
            time_slot: appointment.time_slot.clone(),
            professional: appointment.professional.clone().unwrap_or_default(),
            patient: appointment.patient.clone(),
            phone: appointment.phone.clone(),
            payer: appointment.payer.clone(),
            status: appointment.status.clone(),
            procedure: appointment.procedure.clone(),
            repeated: appointment.repeated.clone(),
            service_date: appointment
                .period
                .clone()
                .or_else(|| appointment.service_date.clone()),
            fee: sanitize_fee(appointment.fee),
            processing_date: appointment.date_label(),
            day: Some(appointment.date.day),
            month: Some(appointment.date.month),
            year: Some(appointment.date.year),
        }
    }
}

/// Garante valor finito e não-negativo.
pub fn sanitize_fee(fee: f64) -> f64 {
    if fee.is_finite() && fee > 0.0 {
        fee
    } else {
        0.0
    }
}

/// Resultado de comparecimento de um agendamento.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScheduleOutcome {
    /// "Não atendido" ou "faltou".
    Missed,
    /// Qualquer outro status.
    Attended,
}

/// Agendamento marcado com o resultado de comparecimento.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScheduleRecord {
    #[serde(default = "new_schedule_id")]
    pub id: String,
    #[serde(default = "default_outcome")]
    pub outcome: ScheduleOutcome,
    #[serde(default, alias = "horario", deserialize_with = "null_as_default")]
    pub time_slot: String,
    #[serde(default, alias = "fisioterapeuta")]
    pub professional: Option<String>,
    #[serde(default, alias = "paciente", deserialize_with = "null_as_default")]
    pub patient: String,
    #[serde(default, alias = "celular")]
    pub phone: Option<String>,
    #[serde(default, alias = "convenio")]
    pub payer: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default, alias = "procedimentos")]
    pub procedure: Option<String>,
    #[serde(default, alias = "periodo")]
    pub period: Option<String>,
    #[serde(default, alias = "repetido")]
    pub repeated: Option<String>,
    #[serde(default, alias = "dataProcessamento", deserialize_with = "null_as_default")]
    pub processing_date: String,
}

fn new_schedule_id() -> String {
    Uuid::new_v4().to_string()
}

fn default_outcome() -> ScheduleOutcome {
    ScheduleOutcome::Attended
}

impl ScheduleRecord {
    /// Cria o registro de agendamento com id novo.
    pub fn from_appointment(appointment: &Appointment, outcome: ScheduleOutcome) -> Self {
        Self {
            id: new_schedule_id(),
            outcome,
            time_slot: appointment.time_slot.clone(),
            professional: appointment.professional.clone(),
            patient: appointment.patient.clone(),
            phone: appointment.phone.clone(),
            payer: appointment.payer.clone(),
            status: appointment.status.clone(),
            procedure: appointment.procedure.clone(),
            period: appointment.period.clone(),
            repeated: appointment.repeated.clone(),
            processing_date: appointment.date_label(),
        }
    }
}

/// Coleção de agendamentos: faltas e comparecimentos convivem no mesmo store.
///
/// Cada agendamento está em exatamente um dos dois grupos.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ScheduleData {
    #[serde(default, alias = "faltaram", deserialize_with = "null_as_default")]
    pub missed: Vec<ScheduleRecord>,
    #[serde(default, alias = "compareceram", deserialize_with = "null_as_default")]
    pub attended: Vec<ScheduleRecord>,
    /// Data de referência (primeira data processada desde a última limpeza).
    #[serde(default, alias = "data")]
    pub reference_date: Option<String>,
}

impl ScheduleData {
    /// Total de agendamentos nos dois grupos.
    pub fn total(&self) -> usize {
        self.missed.len() + self.attended.len()
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }

    /// Reescreve o `outcome` de cada registro conforme o grupo em que está.
    ///
    /// Documentos antigos não tinham o campo, então o grupo é a fonte de verdade.
    pub fn normalize(&mut self) {
        for r in &mut self.missed {
            r.outcome = ScheduleOutcome::Missed;
        }
        for r in &mut self.attended {
            r.outcome = ScheduleOutcome::Attended;
        }
    }
}
