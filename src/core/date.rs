//! # ProcessingDate — Data de Processamento dos Atendimentos
//!
//! Toda [`Appointment`](super::Appointment) carrega a data em que foi
//! processada. Essa data não vem necessariamente do texto colado: o operador
//! escolhe uma data no calendário e ela tem prioridade sobre qualquer data
//! encontrada nos blocos.
//!
//! ## Formatos Aceitos
//!
//! | Formato | Exemplo | Origem |
//! |---------|---------|--------|
//! | `DD/MM/YYYY` | `15/10/2025` | Linhas `Período:` e datas soltas no texto |
//! | `YYYY-MM-DD` | `2025-10-15` | Seletor de data (input HTML / API) |
//!
//! O rótulo canônico (usado como chave de agrupamento por data) é sempre
//! `DD/MM/YYYY`.

use std::fmt;
use std::sync::LazyLock;

use chrono::{Datelike, Local, NaiveDate};
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Captura a primeira data `DD/MM/YYYY` de um trecho de texto.
static DATE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d{2})/(\d{2})/(\d{4})").unwrap());

/// Data de calendário (dia/mês/ano) já validada.
///
/// Serializada como struct `{ "day", "month", "year" }`; o rótulo
/// `DD/MM/YYYY` é derivado via [`label()`](ProcessingDate::label).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProcessingDate {
    /// Dia do mês (1-31).
    pub day: u32,
    /// Mês (1-12).
    pub month: u32,
    /// Ano com quatro dígitos.
    pub year: i32,
}

impl ProcessingDate {
    /// Cria uma data validando o calendário (rejeita 31/02, mês 13, etc.).
    pub fn new(day: u32, month: u32, year: i32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, day).map(Self::from_naive)
    }

    /// Converte uma `NaiveDate` do chrono.
    pub fn from_naive(date: NaiveDate) -> Self {
        Self {
            day: date.day(),
            month: date.month(),
            year: date.year(),
        }
    }

    /// Data atual no fuso local da máquina.
    pub fn today() -> Self {
        Self::from_naive(Local::now().date_naive())
    }

    /// Rótulo canônico `DD/MM/YYYY`.
    pub fn label(&self) -> String {
        format!("{:02}/{:02}/{}", self.day, self.month, self.year)
    }

    /// Interpreta um rótulo vindo do operador: `DD/MM/YYYY` ou `YYYY-MM-DD`.
    pub fn parse_label(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
            return Some(Self::from_naive(date));
        }
        NaiveDate::parse_from_str(raw, "%d/%m/%Y")
            .ok()
            .map(Self::from_naive)
    }

    /// Procura a primeira data `DD/MM/YYYY` válida dentro de um texto livre.
    ///
    /// Usado para linhas como `Período: 01/10/2025 até 31/12/2025`, onde
    /// apenas a data inicial interessa.
    pub fn find_in(text: &str) -> Option<Self> {
        DATE_RE.captures_iter(text).find_map(|cap| {
            let day = cap[1].parse().ok()?;
            let month = cap[2].parse().ok()?;
            let year = cap[3].parse().ok()?;
            Self::new(day, month, year)
        })
    }
}

impl fmt::Display for ProcessingDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn label_is_zero_padded() {
        let d = ProcessingDate::new(5, 3, 2025).unwrap();
        assert_eq!(d.label(), "05/03/2025");
    }

    #[test]
    fn rejects_impossible_dates() {
        assert!(ProcessingDate::new(31, 2, 2025).is_none());
        assert!(ProcessingDate::new(1, 13, 2025).is_none());
    }

    #[test]
    fn parse_label_accepts_both_formats() {
        let expected = ProcessingDate::new(15, 10, 2025).unwrap();
        assert_eq!(ProcessingDate::parse_label("15/10/2025"), Some(expected));
        assert_eq!(ProcessingDate::parse_label(" 2025-10-15 "), Some(expected));
        assert_eq!(ProcessingDate::parse_label("ontem"), None);
    }

    #[test]
    fn find_in_takes_first_valid_date() {
        let d = ProcessingDate::find_in("01/10/2025 até 31/12/2025").unwrap();
        assert_eq!((d.day, d.month, d.year), (1, 10, 2025));
    }

    #[test]
    fn find_in_skips_invalid_candidates() {
        let d = ProcessingDate::find_in("99/99/2025 ou 02/01/2026").unwrap();
        assert_eq!(d.label(), "02/01/2026");
    }
}
