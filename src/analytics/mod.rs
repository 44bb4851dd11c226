//! # Motor de Agregação
//!
//! Estatísticas derivadas das coleções acumuladas. Tudo aqui é função pura da
//! entrada: nada é guardado, e chamar duas vezes com a mesma entrada produz
//! relatórios iguais.
//!
//! | Módulo | Entrada | Saída |
//! |--------|---------|-------|
//! | [`financial`] | `&[R: Analyzable]` | [`AggregationReport`] (resumo, por data, especialidade, profissional, paciente) |
//! | [`evolution`] | `&[EvolutionRecord]` | [`EvolutionOverview`] (pacientes, profissionais, cronologia, estatísticas) |
//! | [`schedules`] | `&ScheduleData` | [`AttendanceReport`] (taxa de falta, por profissional, por convênio) |
//!
//! ## Trait [`Analyzable`]
//!
//! O relatório de agregação funciona tanto para registros financeiros quanto
//! para evoluções. O trait expõe só o que o agrupamento precisa; evoluções não
//! têm valor, então contribuem com receita zero.

/// Agregação financeira (resumo, data, especialidade, profissional, paciente).
pub mod financial;

/// Visão geral das evoluções pendentes.
pub mod evolution;

/// Relatório de comparecimento/faltas.
pub mod schedules;

use crate::core::{EvolutionRecord, FinancialRecord};

pub use evolution::{EvolutionOverview, overview};
pub use financial::{AggregationReport, analyze, analyze_at};
pub use schedules::{AttendanceReport, attendance_report};

/// Registro que pode ser agregado pelo [`analyze()`].
pub trait Analyzable {
    fn professional(&self) -> &str;
    fn patient(&self) -> &str;
    fn phone(&self) -> Option<&str>;
    fn payer(&self) -> Option<&str>;
    fn procedure(&self) -> Option<&str>;
    /// Valor cobrado. Zero para registros sem cobrança.
    fn fee(&self) -> f64;
    /// Rótulo `DD/MM/YYYY`, possivelmente vazio em documentos antigos.
    fn processing_date(&self) -> &str;
    fn month(&self) -> Option<u32>;
    fn year(&self) -> Option<i32>;
}

impl Analyzable for FinancialRecord {
    fn professional(&self) -> &str {
        &self.professional
    }
    fn patient(&self) -> &str {
        &self.patient
    }
    fn phone(&self) -> Option<&str> {
        self.phone.as_deref()
    }
    fn payer(&self) -> Option<&str> {
        self.payer.as_deref()
    }
    fn procedure(&self) -> Option<&str> {
        self.procedure.as_deref()
    }
    fn fee(&self) -> f64 {
        self.fee
    }
    fn processing_date(&self) -> &str {
        &self.processing_date
    }
    fn month(&self) -> Option<u32> {
        self.month
    }
    fn year(&self) -> Option<i32> {
        self.year
    }
}

impl Analyzable for EvolutionRecord {
    fn professional(&self) -> &str {
        &self.professional
    }
    fn patient(&self) -> &str {
        &self.patient
    }
    fn phone(&self) -> Option<&str> {
        self.phone.as_deref()
    }
    fn payer(&self) -> Option<&str> {
        self.payer.as_deref()
    }
    fn procedure(&self) -> Option<&str> {
        self.procedure.as_deref()
    }
    fn fee(&self) -> f64 {
        0.0
    }
    fn processing_date(&self) -> &str {
        &self.processing_date
    }
    fn month(&self) -> Option<u32> {
        self.month
    }
    fn year(&self) -> Option<i32> {
        self.year
    }
}

/// Arredonda para centavos.
pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Percentual com uma casa decimal. Zero quando `total` é zero.
pub(crate) fn percent1(part: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (part as f64 / total as f64 * 1000.0).round() / 10.0
}

/// Componentes `(dia, mês, ano)` de um rótulo `DD/MM/YYYY` ou `MM/YYYY`.
///
/// Componentes ausentes ou ilegíveis viram zero.
pub(crate) fn date_parts(label: &str) -> (u32, u32, i32) {
    let parts: Vec<&str> = label.trim().split('/').collect();
    match parts.as_slice() {
        [d, m, y] => (
            d.trim().parse().unwrap_or(0),
            m.trim().parse().unwrap_or(0),
            y.trim().parse().unwrap_or(0),
        ),
        [m, y] => (0, m.trim().parse().unwrap_or(0), y.trim().parse().unwrap_or(0)),
        _ => (0, 0, 0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rounding_helpers() {
        assert_eq!(round2(10.005_1), 10.01);
        assert_eq!(percent1(1, 3), 33.3);
        assert_eq!(percent1(2, 3), 66.7);
        assert_eq!(percent1(0, 0), 0.0);
    }

    #[test]
    fn date_parts_accepts_partial_labels() {
        assert_eq!(date_parts("15/10/2025"), (15, 10, 2025));
        assert_eq!(date_parts("10/2025"), (0, 10, 2025));
        assert_eq!(date_parts("Data não informada"), (0, 0, 0));
    }
}
