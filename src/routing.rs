//! # Classificador de Status e Roteador de Destinos
//!
//! Cada [`Appointment`] é classificada em um [`AttendanceStatus`] e então
//! enviada para zero, um, dois ou três destinos ao mesmo tempo (*fan-out*):
//!
//! | Status | Evolução | Financeiro | Agendamentos |
//! |--------|----------|------------|--------------|
//! | `ConfirmedPresence` | sim | sim | attended |
//! | `Attended` | não | sim | attended |
//! | `NotAttended` / `Absent` | não | não | missed |
//! | `Other` | não | não | attended |
//!
//! Uma `Appointment` gera no máximo um registro financeiro, mesmo que o texto
//! do status case com mais de uma regra.

use serde::Serialize;
use tracing::{debug, info};

use crate::core::{Appointment, AttendanceStatus, FinancialRecord, ScheduleOutcome, ScheduleRecord};

/// Destinos de um status.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Route {
    pub evolution: bool,
    pub financial: bool,
    pub schedule: ScheduleOutcome,
}

/// Tabela de roteamento.
pub fn route(status: AttendanceStatus) -> Route {
    match status {
        AttendanceStatus::ConfirmedPresence => Route {
            evolution: true,
            financial: true,
            schedule: ScheduleOutcome::Attended,
        },
        AttendanceStatus::Attended => Route {
            evolution: false,
            financial: true,
            schedule: ScheduleOutcome::Attended,
        },
        AttendanceStatus::NotAttended | AttendanceStatus::Absent => Route {
            evolution: false,
            financial: false,
            schedule: ScheduleOutcome::Missed,
        },
        AttendanceStatus::Other => Route {
            evolution: false,
            financial: false,
            schedule: ScheduleOutcome::Attended,
        },
    }
}

/// As quatro visões do classificador (partição por status).
#[derive(Clone, Debug, Default, Serialize)]
pub struct Classified {
    pub confirmed: Vec<Appointment>,
    pub attended: Vec<Appointment>,
    pub missed: Vec<Appointment>,
    pub other: Vec<Appointment>,
}

/// Particiona as agendas pelo status normalizado.
pub fn classify(appointments: &[Appointment]) -> Classified {
    let mut out = Classified::default();
    for a in appointments {
        let bucket = match a.attendance_status() {
            AttendanceStatus::ConfirmedPresence => &mut out.confirmed,
            AttendanceStatus::Attended => &mut out.attended,
            AttendanceStatus::NotAttended | AttendanceStatus::Absent => &mut out.missed,
            AttendanceStatus::Other => &mut out.other,
        };
        bucket.push(a.clone());
    }
    out
}

/// Lote roteado: as agendas de cada destino, na ordem da colagem.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct RoutedBatch {
    pub evolution: Vec<Appointment>,
    pub financial: Vec<Appointment>,
    pub missed: Vec<Appointment>,
    pub attended: Vec<Appointment>,
}

impl RoutedBatch {
    /// Registros financeiros prontos para o store.
    pub fn financial_records(&self) -> Vec<FinancialRecord> {
        self.financial.iter().map(FinancialRecord::from).collect()
    }

    /// Registros de agendamento (faltas, comparecimentos).
    pub fn schedule_records(&self) -> (Vec<ScheduleRecord>, Vec<ScheduleRecord>) {
        let missed = self
            .missed
            .iter()
            .map(|a| ScheduleRecord::from_appointment(a, ScheduleOutcome::Missed))
            .collect();
        let attended = self
            .attended
            .iter()
            .map(|a| ScheduleRecord::from_appointment(a, ScheduleOutcome::Attended))
            .collect();
        (missed, attended)
    }

    /// `true` se nenhum destino recebeu nada.
    pub fn is_empty(&self) -> bool {
        self.evolution.is_empty()
            && self.financial.is_empty()
            && self.missed.is_empty()
            && self.attended.is_empty()
    }
}

/// Classifica e roteia. Cada agenda cai em exatamente um grupo de
/// agendamentos e, opcionalmente, em evolução e financeiro.
pub fn classify_and_route(appointments: &[Appointment]) -> RoutedBatch {
    let mut batch = RoutedBatch::default();

    for a in appointments {
        let status = a.attendance_status();
        let r = route(status);
        debug!(patient = %a.patient, status = status.label(), ?r, "Roteando agenda");

        if r.evolution {
            batch.evolution.push(a.clone());
        }
        if r.financial {
            batch.financial.push(a.clone());
        }
        match r.schedule {
            ScheduleOutcome::Missed => batch.missed.push(a.clone()),
            ScheduleOutcome::Attended => batch.attended.push(a.clone()),
        }
    }

    info!(
        evolution = batch.evolution.len(),
        financial = batch.financial.len(),
        missed = batch.missed.len(),
        attended = batch.attended.len(),
        "Lote roteado"
    );
    batch
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::appointment::sample;

    #[test]
    fn confirmed_presence_goes_to_evolution_and_financial() {
        let batch = classify_and_route(&[sample("Maria", "PRESENÇA CONFIRMADA")]);
        assert_eq!(batch.evolution.len(), 1);
        assert_eq!(batch.financial.len(), 1);
        assert!(batch.missed.is_empty());
        assert_eq!(batch.attended.len(), 1);
    }

    #[test]
    fn missed_statuses_only_reach_schedule() {
        for status in ["Não atendido", "não atendio", "Faltou", "FALTOU"] {
            let batch = classify_and_route(&[sample("João", status)]);
            assert!(batch.evolution.is_empty(), "{status}");
            assert!(batch.financial.is_empty(), "{status}");
            assert_eq!(batch.missed.len(), 1, "{status}");
            assert!(batch.attended.is_empty(), "{status}");
        }
    }

    #[test]
    fn attended_is_billed_without_evolution() {
        let batch = classify_and_route(&[sample("Ana", "Atendido")]);
        assert!(batch.evolution.is_empty());
        assert_eq!(batch.financial.len(), 1);
        assert_eq!(batch.attended.len(), 1);
    }

    #[test]
    fn unknown_status_counts_as_attended_only() {
        let batch = classify_and_route(&[sample("Ana", "Cancelado"), sample("Bia", "")]);
        assert!(batch.evolution.is_empty());
        assert!(batch.financial.is_empty());
        assert_eq!(batch.attended.len(), 2);
    }

    #[test]
    fn every_appointment_lands_in_exactly_one_schedule_group() {
        let input: Vec<_> = ["Presença confirmada", "Atendido", "Faltou", "Não atendida", "Remarcado"]
            .iter()
            .map(|s| sample("P", s))
            .collect();
        let batch = classify_and_route(&input);
        assert_eq!(batch.missed.len() + batch.attended.len(), input.len());

        let (missed, attended) = batch.schedule_records();
        assert!(missed.iter().all(|r| r.outcome == ScheduleOutcome::Missed));
        assert!(attended.iter().all(|r| r.outcome == ScheduleOutcome::Attended));
    }

    #[test]
    fn classify_partitions_by_status() {
        let input = [
            sample("A", "Presença confirmada"),
            sample("B", "Atendido"),
            sample("C", "Faltou"),
            sample("D", "Cancelado"),
        ];
        let c = classify(&input);
        assert_eq!(
            (c.confirmed.len(), c.attended.len(), c.missed.len(), c.other.len()),
            (1, 1, 1, 1)
        );
    }
}
