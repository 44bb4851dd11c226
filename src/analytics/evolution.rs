//! Visão geral das evoluções pendentes: quem precisa de nota, de qual
//! profissional, e em que dia.

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;

use super::date_parts;
use crate::core::{EvolutionRecord, normalize_name};
use crate::core::records::UNSPECIFIED;

/// Pendências de um paciente.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PatientPending {
    pub name: String,
    pub count: usize,
    pub professionals: Vec<String>,
    pub dates: Vec<String>,
}

/// Pendências de um profissional.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ProfessionalPending {
    pub name: String,
    pub count: usize,
    pub patients: Vec<String>,
    pub dates: Vec<String>,
}

/// Evoluções de um dia, ordenadas por horário.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ChronologyDay {
    pub date: String,
    pub entries: Vec<EvolutionRecord>,
}

/// Totais e contagens.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct EvolutionStats {
    pub total: usize,
    pub distinct_patients: usize,
    pub distinct_professionals: usize,
    /// Chave `MM/YYYY`.
    pub per_month: BTreeMap<String, usize>,
    pub per_professional: BTreeMap<String, usize>,
    pub per_payer: BTreeMap<String, usize>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct EvolutionOverview {
    /// Ordem alfabética.
    pub patients: Vec<PatientPending>,
    /// Ordem alfabética.
    pub professionals: Vec<ProfessionalPending>,
    /// Mais recente primeiro.
    pub chronology: Vec<ChronologyDay>,
    pub stats: EvolutionStats,
}

/// Acrescenta se ainda não houver entrada com o mesmo nome normalizado.
fn push_unique(list: &mut Vec<String>, value: &str) {
    let key = normalize_name(value);
    if !list.iter().any(|v| normalize_name(v) == key) {
        list.push(value.trim().to_string());
    }
}

/// Data exibida de uma evolução: data de processamento, período ou `MM/YYYY`.
fn display_date(ev: &EvolutionRecord) -> String {
    if !ev.processing_date.trim().is_empty() {
        return ev.processing_date.clone();
    }
    if let Some(period) = ev.period.as_deref().filter(|p| !p.trim().is_empty()) {
        return period.to_string();
    }
    match (ev.month, ev.year) {
        (Some(m), Some(y)) => format!("{m:02}/{y}"),
        _ => UNSPECIFIED.to_string(),
    }
}

pub fn overview(evolutions: &[EvolutionRecord]) -> EvolutionOverview {
    let mut patients: Vec<PatientPending> = Vec::new();
    let mut patient_idx: HashMap<String, usize> = HashMap::new();
    let mut professionals: Vec<ProfessionalPending> = Vec::new();
    let mut professional_idx: HashMap<String, usize> = HashMap::new();
    let mut days: Vec<ChronologyDay> = Vec::new();
    let mut day_idx: HashMap<String, usize> = HashMap::new();
    let mut stats = EvolutionStats {
        total: evolutions.len(),
        ..Default::default()
    };

    for ev in evolutions {
        let date = display_date(ev);

        let i = *patient_idx.entry(normalize_name(&ev.patient)).or_insert_with(|| {
            patients.push(PatientPending {
                name: ev.patient.trim().to_string(),
                count: 0,
                professionals: Vec::new(),
                dates: Vec::new(),
            });
            patients.len() - 1
        });
        patients[i].count += 1;
        push_unique(&mut patients[i].professionals, &ev.professional);
        push_unique(&mut patients[i].dates, &date);

        let i = *professional_idx.entry(normalize_name(&ev.professional)).or_insert_with(|| {
            professionals.push(ProfessionalPending {
                name: ev.professional.trim().to_string(),
                count: 0,
                patients: Vec::new(),
                dates: Vec::new(),
            });
            professionals.len() - 1
        });
        professionals[i].count += 1;
        push_unique(&mut professionals[i].patients, &ev.patient);
        push_unique(&mut professionals[i].dates, &date);

        let i = *day_idx.entry(date.clone()).or_insert_with(|| {
            days.push(ChronologyDay {
                date: date.clone(),
                entries: Vec::new(),
            });
            days.len() - 1
        });
        days[i].entries.push(ev.clone());

        let month_key = match (ev.month, ev.year) {
            (Some(m), Some(y)) => format!("{m:02}/{y}"),
            _ => UNSPECIFIED.to_string(),
        };
        *stats.per_month.entry(month_key).or_default() += 1;
        let payer = ev
            .payer
            .clone()
            .filter(|p| !p.trim().is_empty())
            .unwrap_or_else(|| "Não informado".to_string());
        *stats.per_payer.entry(payer).or_default() += 1;
    }

    stats.distinct_patients = patients.len();
    stats.distinct_professionals = professionals.len();
    stats.per_professional = professionals.iter().map(|p| (p.name.clone(), p.count)).collect();

    patients.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
    professionals.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
    for p in &mut professionals {
        p.patients.sort();
    }

    for day in &mut days {
        day.entries.sort_by(|a, b| a.time_slot.cmp(&b.time_slot));
    }
    days.sort_by(|a, b| {
        let (da, ma, ya) = date_parts(&a.date);
        let (db, mb, yb) = date_parts(&b.date);
        (yb, mb, db).cmp(&(ya, ma, da))
    });

    EvolutionOverview {
        patients,
        professionals,
        chronology: days,
        stats,
    }
}
