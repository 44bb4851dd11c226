//! # Relatório de Comparecimento
//!
//! Faltas × comparecimentos, com a taxa de falta em percentual (uma casa
//! decimal) no geral, por profissional e por convênio.

use std::collections::HashMap;

use serde::Serialize;

use super::percent1;
use crate::core::{ScheduleData, ScheduleRecord, normalize_name};

const NOT_INFORMED: &str = "Não informado";

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct AttendanceSummary {
    pub attended: usize,
    pub missed: usize,
    pub total: usize,
    pub reference_date: Option<String>,
    /// Percentual de faltas, uma casa decimal.
    pub no_show_rate: f64,
}

/// Comparecimento de um profissional ou convênio.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AttendanceGroup {
    pub name: String,
    pub attended: usize,
    pub missed: usize,
    pub total: usize,
    pub no_show_rate: f64,
}

/// Paciente que faltou ao menos uma vez. `dates` sem repetição.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MissedPatient {
    pub name: String,
    pub phone: Option<String>,
    pub missed_count: usize,
    pub dates: Vec<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct AttendanceReport {
    pub summary: AttendanceSummary,
    pub by_professional: Vec<AttendanceGroup>,
    pub by_payer: Vec<AttendanceGroup>,
    pub missed_patients: Vec<MissedPatient>,
}

pub fn attendance_report(data: &ScheduleData) -> AttendanceReport {
    let attended = data.attended.len();
    let missed = data.missed.len();

    AttendanceReport {
        summary: AttendanceSummary {
            attended,
            missed,
            total: attended + missed,
            reference_date: data.reference_date.clone(),
            no_show_rate: percent1(missed, attended + missed),
        },
        by_professional: group_by(data, |r| r.professional.as_deref()),
        by_payer: group_by(data, |r| r.payer.as_deref()),
        missed_patients: missed_patients(&data.missed),
    }
}

fn group_by<F>(data: &ScheduleData, key: F) -> Vec<AttendanceGroup>
where
    F: Fn(&ScheduleRecord) -> Option<&str>,
{
    let mut groups: Vec<AttendanceGroup> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    let tagged = data
        .attended
        .iter()
        .map(|r| (r, false))
        .chain(data.missed.iter().map(|r| (r, true)));

    for (record, was_missed) in tagged {
        let name = key(record)
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .unwrap_or(NOT_INFORMED)
            .to_string();
        let i = *index.entry(normalize_name(&name)).or_insert_with(|| {
            groups.push(AttendanceGroup {
                name,
                attended: 0,
                missed: 0,
                total: 0,
                no_show_rate: 0.0,
            });
            groups.len() - 1
        });
        let g = &mut groups[i];
        if was_missed {
            g.missed += 1;
        } else {
            g.attended += 1;
        }
        g.total += 1;
    }

    for g in &mut groups {
        g.no_show_rate = percent1(g.missed, g.total);
    }
    groups.sort_by(|a, b| b.total.cmp(&a.total));
    groups
}

fn missed_patients(missed: &[ScheduleRecord]) -> Vec<MissedPatient> {
    let mut patients: Vec<MissedPatient> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for r in missed {
        let i = *index.entry(normalize_name(&r.patient)).or_insert_with(|| {
            patients.push(MissedPatient {
                name: r.patient.trim().to_string(),
                phone: r.phone.clone(),
                missed_count: 0,
                dates: Vec::new(),
            });
            patients.len() - 1
        });
        let p = &mut patients[i];
        p.missed_count += 1;
        if !r.processing_date.is_empty() && !p.dates.contains(&r.processing_date) {
            p.dates.push(r.processing_date.clone());
        }
    }

    patients.sort_by(|a, b| b.missed_count.cmp(&a.missed_count));
    patients
}
