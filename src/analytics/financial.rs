//! # Relatório de Agregação
//!
//! ```text
//! registros ──┬── summary ........ total, pagantes, isentos, receita, ticket médio
//!             ├── by_date ........ data de processamento (mais recente primeiro)
//!             ├── by_specialty ... texto completo do procedimento
//!             ├── by_professional  nome normalizado, nome exibido do 1º registro
//!             └── by_patient ..... isentos (por contagem) | pagantes (por receita)
//! ```
//!
//! Todos os agrupamentos preservam a ordem de primeira aparição antes de
//! ordenar, e as ordenações são estáveis: empates mantêm a ordem da entrada.

use std::collections::{BTreeSet, HashMap};

use serde::Serialize;

use super::{Analyzable, date_parts, round2};
use crate::core::records::UNSPECIFIED;
use crate::core::{ProcessingDate, is_exempt, normalize_name};

/// Resumo geral.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Summary {
    pub total: usize,
    pub paying: usize,
    pub exempt: usize,
    pub revenue: f64,
    /// `revenue / total`, zero quando não há registros.
    pub average_ticket: f64,
}

/// Um dia de processamento.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DateGroup {
    pub date: String,
    pub day: u32,
    pub month: u32,
    pub year: i32,
    pub appointments: usize,
    pub paying: usize,
    pub exempt: usize,
    pub revenue: f64,
}

/// Uma especialidade (texto do procedimento).
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SpecialtyGroup {
    pub name: String,
    pub appointments: usize,
    pub paying: usize,
    pub exempt: usize,
    pub revenue: f64,
}

/// Um profissional.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ProfessionalGroup {
    /// Nome como apareceu no primeiro registro.
    pub name: String,
    pub appointments: usize,
    pub paying: usize,
    pub exempt: usize,
    pub revenue: f64,
    pub unique_patients: usize,
    /// Especialidades distintas, em ordem alfabética.
    pub specialties: Vec<String>,
}

/// Um paciente dentro do grupo isento ou pagante.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PatientGroup {
    pub name: String,
    pub phone: Option<String>,
    pub professional: String,
    pub specialty: String,
    pub appointments: usize,
    pub revenue: f64,
}

/// Pacientes isentos e pagantes.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct PatientGroups {
    pub exempt: Vec<PatientGroup>,
    pub paying: Vec<PatientGroup>,
}

/// Relatório completo. Derivado, nunca persistido.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct AggregationReport {
    pub summary: Summary,
    pub by_date: Vec<DateGroup>,
    pub by_specialty: Vec<SpecialtyGroup>,
    pub by_professional: Vec<ProfessionalGroup>,
    pub by_patient: PatientGroups,
}

/// Agrega usando a data de hoje para registros sem data.
pub fn analyze<R: Analyzable>(records: &[R]) -> AggregationReport {
    analyze_at(records, ProcessingDate::today())
}

/// Agrega com uma data de referência explícita para registros sem data.
pub fn analyze_at<R: Analyzable>(records: &[R], today: ProcessingDate) -> AggregationReport {
    let report = AggregationReport {
        summary: summary(records),
        by_date: by_date(records, today),
        by_specialty: by_specialty(records),
        by_professional: by_professional(records),
        by_patient: by_patient(records),
    };
    tracing::debug!(
        records = records.len(),
        dates = report.by_date.len(),
        professionals = report.by_professional.len(),
        "Relatório de agregação gerado"
    );
    report
}

fn summary<R: Analyzable>(records: &[R]) -> Summary {
    let total = records.len();
    let exempt = records.iter().filter(|r| is_exempt(r.payer())).count();
    let revenue: f64 = records.iter().map(|r| r.fee()).sum();
    Summary {
        total,
        paying: total - exempt,
        exempt,
        revenue: round2(revenue),
        average_ticket: if total == 0 { 0.0 } else { round2(revenue / total as f64) },
    }
}

/// Especialidade = texto completo do procedimento.
fn specialty_of<R: Analyzable>(r: &R) -> String {
    r.procedure()
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .unwrap_or(UNSPECIFIED)
        .to_string()
}

/// Rótulo de data do registro, com preenchimento para documentos antigos.
fn date_label_of<R: Analyzable>(r: &R, today: ProcessingDate) -> String {
    let label = r.processing_date().trim();
    if !label.is_empty() {
        return label.to_string();
    }
    match (r.month(), r.year()) {
        (Some(m), Some(y)) => format!("{m:02}/{y}"),
        _ => today.label(),
    }
}

/// Agrupa preservando a ordem de primeira aparição.
struct Grouper<T> {
    index: HashMap<String, usize>,
    groups: Vec<T>,
}

impl<T> Grouper<T> {
    fn new() -> Self {
        Self {
            index: HashMap::new(),
            groups: Vec::new(),
        }
    }

    fn entry(&mut self, key: String, init: impl FnOnce() -> T) -> &mut T {
        let idx = match self.index.get(&key) {
            Some(&idx) => idx,
            None => {
                self.groups.push(init());
                let idx = self.groups.len() - 1;
                self.index.insert(key, idx);
                idx
            }
        };
        &mut self.groups[idx]
    }

    fn into_vec(self) -> Vec<T> {
        self.groups
    }
}

fn by_date<R: Analyzable>(records: &[R], today: ProcessingDate) -> Vec<DateGroup> {
    let mut grouper = Grouper::new();
    for r in records {
        let label = date_label_of(r, today);
        let g = grouper.entry(label.clone(), || {
            let (day, month, year) = date_parts(&label);
            DateGroup {
                date: label.clone(),
                day,
                month: r.month().unwrap_or(month),
                year: r.year().unwrap_or(year),
                appointments: 0,
                paying: 0,
                exempt: 0,
                revenue: 0.0,
            }
        });
        g.appointments += 1;
        g.revenue += r.fee();
        if is_exempt(r.payer()) {
            g.exempt += 1;
        } else {
            g.paying += 1;
        }
    }

    let mut groups = grouper.into_vec();
    for g in &mut groups {
        g.revenue = round2(g.revenue);
    }
    groups.sort_by(|a, b| {
        b.year
            .cmp(&a.year)
            .then(b.month.cmp(&a.month))
            .then(b.day.cmp(&a.day))
    });
    groups
}

fn by_specialty<R: Analyzable>(records: &[R]) -> Vec<SpecialtyGroup> {
    let mut grouper = Grouper::new();
    for r in records {
        let name = specialty_of(r);
        let g = grouper.entry(name.clone(), || SpecialtyGroup {
            name,
            appointments: 0,
            paying: 0,
            exempt: 0,
            revenue: 0.0,
        });
        g.appointments += 1;
        g.revenue += r.fee();
        if is_exempt(r.payer()) {
            g.exempt += 1;
        } else {
            g.paying += 1;
        }
    }

    let mut groups = grouper.into_vec();
    for g in &mut groups {
        g.revenue = round2(g.revenue);
    }
    groups.sort_by(|a, b| b.appointments.cmp(&a.appointments));
    groups
}

fn by_professional<R: Analyzable>(records: &[R]) -> Vec<ProfessionalGroup> {
    struct Acc {
        group: ProfessionalGroup,
        patients: BTreeSet<String>,
        specialties: BTreeSet<String>,
    }

    let mut grouper = Grouper::new();
    for r in records {
        let display = r.professional().trim();
        let display = if display.is_empty() { UNSPECIFIED } else { display };
        let acc = grouper.entry(normalize_name(display), || Acc {
            group: ProfessionalGroup {
                name: display.to_string(),
                appointments: 0,
                paying: 0,
                exempt: 0,
                revenue: 0.0,
                unique_patients: 0,
                specialties: Vec::new(),
            },
            patients: BTreeSet::new(),
            specialties: BTreeSet::new(),
        });
        acc.group.appointments += 1;
        acc.group.revenue += r.fee();
        if is_exempt(r.payer()) {
            acc.group.exempt += 1;
        } else {
            acc.group.paying += 1;
        }
        acc.patients.insert(normalize_name(r.patient()));
        acc.specialties.insert(specialty_of(r));
    }

    let mut groups: Vec<ProfessionalGroup> = grouper
        .into_vec()
        .into_iter()
        .map(|acc| ProfessionalGroup {
            revenue: round2(acc.group.revenue),
            unique_patients: acc.patients.len(),
            specialties: acc.specialties.into_iter().collect(),
            ..acc.group
        })
        .collect();
    groups.sort_by(|a, b| b.appointments.cmp(&a.appointments));
    groups
}

fn by_patient<R: Analyzable>(records: &[R]) -> PatientGroups {
    let mut exempt = Grouper::new();
    let mut paying = Grouper::new();

    for r in records {
        let grouper = if is_exempt(r.payer()) { &mut exempt } else { &mut paying };
        let g = grouper.entry(normalize_name(r.patient()), || PatientGroup {
            name: r.patient().trim().to_string(),
            phone: r.phone().map(str::to_string),
            professional: r.professional().to_string(),
            specialty: specialty_of(r),
            appointments: 0,
            revenue: 0.0,
        });
        g.appointments += 1;
        g.revenue += r.fee();
    }

    let finish = |g: Grouper<PatientGroup>| -> Vec<PatientGroup> {
        g.into_vec()
            .into_iter()
            .map(|p| PatientGroup {
                revenue: round2(p.revenue),
                ..p
            })
            .collect()
    };

    let mut exempt = finish(exempt);
    let mut paying = finish(paying);
    exempt.sort_by(|a, b| b.appointments.cmp(&a.appointments));
    paying.sort_by(|a, b| b.revenue.total_cmp(&a.revenue));
    PatientGroups { exempt, paying }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::FinancialRecord;
    use crate::core::appointment::sample;

    fn record(patient: &str, professional: &str, payer: &str, fee: f64, date: &str) -> FinancialRecord {
        let mut a = sample(patient, "Presença confirmada");
        a.professional = Some(professional.to_string());
        a.payer = Some(payer.to_string());
        a.fee = fee;
        let mut r = FinancialRecord::from(&a);
        let (d, m, y) = date_parts(date);
        r.processing_date = date.to_string();
        r.day = Some(d);
        r.month = Some(m);
        r.year = Some(y);
        r
    }

    fn today() -> ProcessingDate {
        ProcessingDate::new(20, 10, 2025).unwrap()
    }

    #[test]
    fn empty_input_has_zero_average() {
        let report = analyze_at::<FinancialRecord>(&[], today());
        assert_eq!(report.summary, Summary::default());
        assert!(report.by_date.is_empty());
    }

    #[test]
    fn summary_splits_exempt_and_paying() {
        let records = vec![
            record("Maria", "Ana", "Particular", 80.0, "15/10/2025"),
            record("João", "Ana", "Isento", 0.0, "15/10/2025"),
            record("Pedro", "Ana", "Unimed", 50.0, "15/10/2025"),
        ];
        let s = analyze_at(&records, today()).summary;
        assert_eq!((s.total, s.paying, s.exempt), (3, 2, 1));
        assert_eq!(s.revenue, 130.0);
        assert_eq!(s.average_ticket, 43.33);
    }

    #[test]
    fn dates_sorted_most_recent_first() {
        let records = vec![
            record("A", "Ana", "Particular", 10.0, "02/09/2025"),
            record("B", "Ana", "Particular", 10.0, "15/10/2025"),
            record("C", "Ana", "Particular", 10.0, "03/10/2025"),
            record("D", "Ana", "Particular", 10.0, "15/10/2025"),
            record("E", "Ana", "Particular", 10.0, "31/12/2024"),
        ];
        let dates: Vec<_> = analyze_at(&records, today())
            .by_date
            .into_iter()
            .map(|g| (g.date, g.appointments))
            .collect();
        assert_eq!(
            dates,
            vec![
                ("15/10/2025".to_string(), 2),
                ("03/10/2025".to_string(), 1),
                ("02/09/2025".to_string(), 1),
                ("31/12/2024".to_string(), 1),
            ]
        );
    }

    #[test]
    fn missing_date_is_backfilled() {
        let mut with_month = record("A", "Ana", "Particular", 10.0, "01/08/2025");
        with_month.processing_date.clear();
        with_month.day = None;
        let mut nothing = with_month.clone();
        nothing.month = None;
        nothing.year = None;

        let labels: Vec<_> = analyze_at(&[with_month, nothing], today())
            .by_date
            .into_iter()
            .map(|g| g.date)
            .collect();
        assert_eq!(labels, vec!["20/10/2025", "08/2025"]);
    }

    #[test]
    fn professionals_merge_by_normalized_name() {
        let records = vec![
            record("Maria", "joão silva", "Particular", 80.0, "15/10/2025"),
            record("Pedro", " João  Silva ", "Isento", 0.0, "15/10/2025"),
            record("maria", "JOÃO SILVA", "Particular", 80.0, "15/10/2025"),
            record("Lia", "Ana", "Particular", 60.0, "15/10/2025"),
        ];
        let pros = analyze_at(&records, today()).by_professional;
        assert_eq!(pros.len(), 2);
        assert_eq!(pros[0].name, "joão silva");
        assert_eq!(pros[0].appointments, 3);
        assert_eq!(pros[0].unique_patients, 2);
        assert_eq!(pros[0].revenue, 160.0);
        assert_eq!((pros[0].paying, pros[0].exempt), (2, 1));
        assert_eq!(pros[0].specialties, vec!["Fisioterapia Ortopedia"]);
    }

    #[test]
    fn specialty_is_full_procedure_text() {
        let mut a = record("A", "Ana", "Particular", 10.0, "15/10/2025");
        a.procedure = Some("Pilates Clínico - Coluna".into());
        let b = record("B", "Ana", "Particular", 10.0, "15/10/2025");
        let c = record("C", "Ana", "Particular", 10.0, "15/10/2025");
        let specs = analyze_at(&[a, b, c], today()).by_specialty;
        assert_eq!(specs[0].name, "Fisioterapia Ortopedia");
        assert_eq!(specs[0].appointments, 2);
        assert_eq!(specs[1].name, "Pilates Clínico - Coluna");
    }

    #[test]
    fn patients_split_and_sorted() {
        let records = vec![
            record("Maria", "Ana", "Particular", 80.0, "15/10/2025"),
            record("João", "Ana", "Isento", 0.0, "15/10/2025"),
            record("Pedro", "Ana", "Particular", 200.0, "15/10/2025"),
            record("MARIA ", "Ana", "Particular", 80.0, "16/10/2025"),
            record("Lia", "Ana", "ISENTO Prefeitura", 0.0, "15/10/2025"),
            record("Lia", "Ana", "Isento", 0.0, "16/10/2025"),
        ];
        let p = analyze_at(&records, today()).by_patient;
        assert_eq!(p.exempt.len(), 2);
        assert_eq!(p.exempt[0].name, "Lia");
        assert_eq!(p.exempt[0].appointments, 2);
        assert_eq!(p.paying.len(), 2);
        assert_eq!(p.paying[0].name, "Pedro");
        assert_eq!(p.paying[1].name, "Maria");
        assert_eq!(p.paying[1].revenue, 160.0);
    }

    #[test]
    fn analyze_is_idempotent() {
        let records = vec![
            record("Maria", "Ana", "Particular", 80.0, "15/10/2025"),
            record("João", "Paulo", "Isento", 0.0, "14/10/2025"),
        ];
        assert_eq!(analyze_at(&records, today()), analyze_at(&records, today()));
    }
}
