//! # Appointment — Um Agendamento Extraído do Texto Colado
//!
//! Saída do [`AppointmentParser`](crate::parser::AppointmentParser): um
//! registro plano, já normalizado, com a data de processamento resolvida.
//!
//! ## Invariante
//!
//! Uma `Appointment` só existe se o bloco de origem tinha **horário** e
//! **paciente**. Por isso esses dois campos são `String` e os demais são
//! `Option<String>`.

use serde::{Deserialize, Serialize};

use super::date::ProcessingDate;
use super::names::is_exempt;
use super::status::AttendanceStatus;

/// Agendamento normalizado.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Appointment {
    /// Horário, já reduzido a `HH:MM` ou `HH:MM - HH:MM`.
    pub time_slot: String,
    /// Fisioterapeuta responsável.
    pub professional: Option<String>,
    /// Nome do paciente.
    pub patient: String,
    /// Celular do paciente.
    pub phone: Option<String>,
    /// Convênio / pagador.
    pub payer: Option<String>,
    /// Status em texto livre, como veio no bloco.
    pub status: Option<String>,
    /// Descrição do procedimento (texto completo).
    pub procedure: Option<String>,
    /// Campo `Repetido:`.
    pub repeated: Option<String>,
    /// Texto da linha `Período:`.
    pub period: Option<String>,
    /// Data solta no bloco (linha iniciando com `DD/MM/YYYY`).
    pub service_date: Option<String>,
    /// Valor do atendimento extraído da linha `R$`. Zero quando ausente.
    pub fee: f64,
    /// "Particular" ou "Outros", derivado da linha `R$`.
    pub billing_label: Option<String>,
    /// Data de processamento resolvida.
    pub date: ProcessingDate,
}

impl Appointment {
    /// Status normalizado.
    pub fn attendance_status(&self) -> AttendanceStatus {
        AttendanceStatus::classify(self.status.as_deref())
    }

    /// Rótulo `DD/MM/YYYY` da data de processamento.
    pub fn date_label(&self) -> String {
        self.date.label()
    }

    /// `true` se o convênio indica isenção.
    pub fn is_exempt(&self) -> bool {
        is_exempt(self.payer.as_deref())
    }
}

#[cfg(test)]
pub(crate) fn sample(patient: &str, status: &str) -> Appointment {
    Appointment {
        time_slot: "08:00 - 09:00".to_string(),
        professional: Some("Dra. Ana Souza".to_string()),
        patient: patient.to_string(),
        phone: Some("(11) 99999-0000".to_string()),
        payer: Some("Particular".to_string()),
        status: Some(status.to_string()),
        procedure: Some("Fisioterapia Ortopedia".to_string()),
        repeated: None,
        period: None,
        service_date: None,
        fee: 80.0,
        billing_label: Some("Particular".to_string()),
        date: ProcessingDate::new(15, 10, 2025).unwrap(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derived_fields() {
        let mut a = sample("Maria", "Presença confirmada");
        assert_eq!(a.attendance_status(), AttendanceStatus::ConfirmedPresence);
        assert_eq!(a.date_label(), "15/10/2025");
        assert!(!a.is_exempt());
        a.payer = Some("Isento SUS".to_string());
        assert!(a.is_exempt());
    }
}
