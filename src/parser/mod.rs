//! # Parser de Agendamentos — Texto Colado → `Vec<Appointment>`
//!
//! Compõe o [`BlockSplitter`] e o [`FieldExtractor`]:
//!
//! ```text
//! texto colado
//!     │
//!     ├── 1. NFC + remove marcadores (× • ·)
//!     ├── 2. BlockSplitter: divide em blocos pela âncora "Horário:"
//!     ├── 3. FieldExtractor: campos por prefixo de linha
//!     ├── 4. valida (horário + paciente), descarta o resto
//!     └── 5. resolve a data de processamento
//!             ▼
//!       ParseOutcome { appointments, accepted, rejected }
//! ```
//!
//! ## Prioridade da Data
//!
//! | # | Fonte |
//! |---|-------|
//! | 1 | data selecionada pelo operador ([`ParseContext::selected_date`]) |
//! | 2 | primeira data da linha `Período:` |
//! | 3 | linha iniciando com `DD/MM/YYYY` |
//! | 4 | data atual ([`ParseContext::today`]) |
//!
//! Blocos sem horário ou sem paciente nunca viram erro: são descartados e
//! contados em `rejected`.

/// Divisão da colagem em blocos.
pub mod blocks;

/// Extração de campos por prefixo.
pub mod fields;

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use tracing::{debug, info, warn};
use unicode_normalization::UnicodeNormalization;

use crate::core::{Appointment, ProcessingDate};
use crate::error::ParseError;

pub use blocks::{Block, BlockSplitter};
pub use fields::{FieldExtractor, RawFields};

static TIME_LINE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?im)^\s*hor[áa]rio\s*:").unwrap());
static PATIENT_LINE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?im)^\s*paciente\s*:").unwrap());

/// Contexto de datas de uma rodada de parse.
#[derive(Clone, Copy, Debug)]
pub struct ParseContext {
    /// Data escolhida pelo operador. Tem prioridade sobre o texto.
    pub selected_date: Option<ProcessingDate>,
    /// Último recurso quando nenhuma data foi encontrada.
    pub today: ProcessingDate,
}

impl ParseContext {
    pub fn new(selected_date: Option<ProcessingDate>) -> Self {
        Self {
            selected_date,
            today: ProcessingDate::today(),
        }
    }
}

/// Resultado do parse de uma colagem.
#[derive(Clone, Debug, Default, Serialize)]
pub struct ParseOutcome {
    pub appointments: Vec<Appointment>,
    /// Blocos encontrados (aceitos + rejeitados).
    pub blocks: usize,
    pub accepted: usize,
    pub rejected: usize,
}

/// Parser de agendamentos.
pub struct AppointmentParser {
    splitter: BlockSplitter,
    extractor: FieldExtractor,
}

impl AppointmentParser {
    pub fn new() -> Self {
        Self {
            splitter: BlockSplitter::new(),
            extractor: FieldExtractor::new(),
        }
    }

    /// Divide, extrai e valida todos os blocos da colagem.
    pub fn parse_multiple(&self, text: &str, ctx: &ParseContext) -> ParseOutcome {
        let cleaned = clean_text(text);
        let blocks = self.splitter.split(&cleaned);

        let mut outcome = ParseOutcome {
            blocks: blocks.len(),
            ..Default::default()
        };

        for block in &blocks {
            match self.parse_block(block, ctx) {
                Some(appointment) => {
                    debug!(
                        block = block.index,
                        patient = %appointment.patient,
                        time = %appointment.time_slot,
                        "Bloco aceito"
                    );
                    outcome.appointments.push(appointment);
                }
                None => {
                    warn!(block = block.index, "Bloco descartado: sem horário ou paciente");
                    outcome.rejected += 1;
                }
            }
        }

        outcome.accepted = outcome.appointments.len();
        info!(
            blocks = outcome.blocks,
            accepted = outcome.accepted,
            rejected = outcome.rejected,
            "Parse concluído"
        );
        outcome
    }

    /// Converte um bloco em `Appointment`, ou `None` se faltar horário ou paciente.
    pub fn parse_block(&self, block: &Block, ctx: &ParseContext) -> Option<Appointment> {
        let fields = self.extractor.extract(&block.text());
        build_appointment(fields, ctx)
    }
}

impl Default for AppointmentParser {
    fn default() -> Self {
        Self::new()
    }
}

fn build_appointment(fields: RawFields, ctx: &ParseContext) -> Option<Appointment> {
    let time_slot = fields.time_slot?;
    let patient = fields.patient?;

    let date = ctx
        .selected_date
        .or(fields.period_date)
        .or_else(|| fields.service_date.as_deref().and_then(ProcessingDate::find_in))
        .unwrap_or(ctx.today);

    Some(Appointment {
        time_slot,
        professional: fields.professional,
        patient,
        phone: fields.phone,
        payer: fields.payer,
        status: fields.status,
        procedure: fields.procedure,
        repeated: fields.repeated,
        period: fields.period,
        service_date: fields.service_date,
        fee: fields.fee.unwrap_or(0.0),
        billing_label: fields.billing_label,
        date,
    })
}

/// Validação da colagem inteira, antes do parse.
pub fn validate_paste(text: &str) -> Result<(), ParseError> {
    if text.trim().is_empty() {
        return Err(ParseError::EmptyInput);
    }
    let cleaned = clean_text(text);
    if !TIME_LINE_RE.is_match(&cleaned) {
        return Err(ParseError::MissingTimeSlot);
    }
    if !PATIENT_LINE_RE.is_match(&cleaned) {
        return Err(ParseError::MissingPatient);
    }
    Ok(())
}

/// NFC, quebras de linha `\n` e marcadores decorativos trocados por espaço.
pub fn clean_text(text: &str) -> String {
    text.nfc()
        .filter(|c| *c != '\r')
        .map(|c| match c {
            '×' | '•' | '·' => ' ',
            other => other,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(selected: Option<ProcessingDate>) -> ParseContext {
        ParseContext {
            selected_date: selected,
            today: ProcessingDate::new(20, 10, 2025).unwrap(),
        }
    }

    const PASTE: &str = "Agendamentos de 15/10/2025
• Horário: × 08:00 - 09:00
Fisioterapeuta: Dra. Ana Souza
Paciente: Maria da Silva
Convênio: Particular
Status: Presença confirmada
Procedimentos: Fisioterapia Ortopedia
Atendimento Particular R$ 80,00

• Horário: 09:00 - 10:00
Fisioterapeuta: Dr. Paulo
Status: Faltou

• Horário: 10:00 - 11:00
Fisioterapeuta: Dr. Paulo
Paciente: João Pereira
Convênio: Isento
Status: Faltou
Período: 01/09/2025 até 30/09/2025
";

    #[test]
    fn counts_accepted_and_rejected_blocks() {
        let out = AppointmentParser::new().parse_multiple(PASTE, &ctx(None));
        assert_eq!(out.blocks, 3);
        assert_eq!(out.accepted, 2);
        assert_eq!(out.rejected, 1);
        assert_eq!(out.appointments[0].patient, "Maria da Silva");
        assert_eq!(out.appointments[0].time_slot, "08:00 - 09:00");
        assert_eq!(out.appointments[0].fee, 80.0);
        assert_eq!(out.appointments[1].patient, "João Pereira");
        assert_eq!(out.appointments[1].fee, 0.0);
    }

    #[test]
    fn date_priority() {
        let parser = AppointmentParser::new();

        let out = parser.parse_multiple(PASTE, &ctx(None));
        assert_eq!(out.appointments[0].date, ProcessingDate::new(20, 10, 2025).unwrap());
        assert_eq!(out.appointments[1].date, ProcessingDate::new(1, 9, 2025).unwrap());

        let selected = ProcessingDate::new(3, 11, 2025);
        let out = parser.parse_multiple(PASTE, &ctx(selected));
        assert!(out.appointments.iter().all(|a| Some(a.date) == selected));
    }

    #[test]
    fn service_date_line_is_used_before_today() {
        let text = "Horário: 08:00\n14/10/2025\nPaciente: Ana";
        let out = AppointmentParser::new().parse_multiple(text, &ctx(None));
        assert_eq!(out.appointments[0].date, ProcessingDate::new(14, 10, 2025).unwrap());
        assert_eq!(out.appointments[0].service_date.as_deref(), Some("14/10/2025"));
    }

    #[test]
    fn block_with_empty_patient_is_rejected() {
        let out = AppointmentParser::new().parse_multiple("Horário: 08:00\nPaciente:\n", &ctx(None));
        assert_eq!(out.accepted, 0);
        assert_eq!(out.rejected, 1);
    }

    #[test]
    fn decomposed_accents_are_normalized() {
        // "Horário" com acento combinante (U+0301)
        let text = "Hora\u{301}rio: 08:00\nPaciente: Jose\u{301}";
        let out = AppointmentParser::new().parse_multiple(text, &ctx(None));
        assert_eq!(out.accepted, 1);
        assert_eq!(out.appointments[0].patient, "José");
    }

    #[test]
    fn paste_validation() {
        assert_eq!(validate_paste("   \n"), Err(ParseError::EmptyInput));
        assert_eq!(validate_paste("Paciente: Maria"), Err(ParseError::MissingTimeSlot));
        assert_eq!(validate_paste("Horário: 08:00"), Err(ParseError::MissingPatient));
        assert_eq!(validate_paste(PASTE), Ok(()));
    }
}
