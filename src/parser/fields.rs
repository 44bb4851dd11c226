//! # Extrator de Campos — Um Bloco de Texto → Registro Chave/Valor
//!
//! O [`FieldExtractor`] reconhece linhas pelo **prefixo** e extrai o valor
//! após os primeiros dois-pontos. Não sabe nada sobre múltiplos blocos:
//! recebe um bloco e devolve [`RawFields`].
//!
//! ## Prefixos Reconhecidos
//!
//! | Prefixo | Campo | Observação |
//! |---------|-------|------------|
//! | `Horário:` | `time_slot` | reduzido a `HH:MM` ou `HH:MM - HH:MM` |
//! | `Fisioterapeuta:` | `professional` | |
//! | `Paciente:` | `patient` | |
//! | `Celular:` | `phone` | |
//! | `Convênio:` / `Convenio:` | `payer` | |
//! | `Status:` | `status` | texto livre |
//! | `Procedimentos:` | `procedure` | texto completo preservado |
//! | `Repetido:` | `repeated` | |
//! | `Período:` / `Periodo:` | `period` | primeira data vira `period_date` |
//!
//! Além dos prefixos:
//!
//! - uma linha iniciando com `DD/MM/YYYY` vira `service_date`
//! - qualquer outra linha com `R$ <número>` vira `fee` + `billing_label`
//!
//! Todos os prefixos são case-insensitive e toleram espaço antes dos
//! dois-pontos (`Status :`). Valores vazios são tratados como ausentes.
//! Se um prefixo aparece duas vezes no mesmo bloco, a última linha vence.

use regex::Regex;

use crate::core::ProcessingDate;

/// Campo reconhecido por prefixo de linha.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FieldKind {
    TimeSlot,
    Professional,
    Patient,
    Phone,
    Payer,
    Status,
    Procedure,
    Repeated,
    Period,
}

/// Campos crus extraídos de um bloco, antes da validação.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RawFields {
    pub time_slot: Option<String>,
    pub professional: Option<String>,
    pub patient: Option<String>,
    pub phone: Option<String>,
    pub payer: Option<String>,
    pub status: Option<String>,
    pub procedure: Option<String>,
    pub repeated: Option<String>,
    pub period: Option<String>,
    /// Primeira data válida da linha `Período:`.
    pub period_date: Option<ProcessingDate>,
    /// Data da linha iniciando com `DD/MM/YYYY`.
    pub service_date: Option<String>,
    /// Valor da linha `R$`.
    pub fee: Option<f64>,
    /// "Particular" ou "Outros", derivado da linha `R$`.
    pub billing_label: Option<String>,
}

/// Extrator de campos por prefixo de linha.
///
/// As regexes são compiladas uma vez em [`new()`](FieldExtractor::new) e
/// reutilizadas em todos os blocos.
pub struct FieldExtractor {
    /// Tabela prefixo → campo, testada em ordem.
    prefixes: Vec<(FieldKind, Regex)>,
    /// Estreita o horário para `HH:MM` ou `HH:MM - HH:MM`.
    time_re: Regex,
    /// Captura o número após `R$`.
    currency_re: Regex,
    /// Linha iniciando com data.
    service_date_re: Regex,
    /// `Pa..` truncado pela exportação (vira "Particular").
    truncated_particular_re: Regex,
}

impl FieldExtractor {
    pub fn new() -> Self {
        let prefix = |pattern: &str| Regex::new(&format!(r"(?i)^{pattern}\s*:")).unwrap();
        Self {
            prefixes: vec![
                (FieldKind::TimeSlot, prefix("hor[áa]rio")),
                (FieldKind::Professional, prefix("fisioterapeuta")),
                (FieldKind::Patient, prefix("paciente")),
                (FieldKind::Phone, prefix("celular")),
                (FieldKind::Payer, prefix("conv[êe]nio")),
                (FieldKind::Status, prefix("status")),
                (FieldKind::Procedure, prefix("procedimentos?")),
                (FieldKind::Repeated, prefix("repetido")),
                (FieldKind::Period, prefix("per[íi]odo")),
            ],
            time_re: Regex::new(r"\d{1,2}:\d{2}\s*-\s*\d{1,2}:\d{2}|\d{1,2}:\d{2}").unwrap(),
            currency_re: Regex::new(r"(?i)R\$\s*([\d.,]+)").unwrap(),
            service_date_re: Regex::new(r"^(\d{2}/\d{2}/\d{4})").unwrap(),
            truncated_particular_re: Regex::new(r"\bPa\.{2,}").unwrap(),
        }
    }

    /// Extrai todos os campos reconhecidos de um bloco.
    pub fn extract(&self, block: &str) -> RawFields {
        let mut fields = RawFields::default();

        for line in block.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            if let Some((kind, value)) = self.extract_line(line) {
                self.assign(&mut fields, kind, value);
                continue;
            }

            if let Some(cap) = self.service_date_re.captures(line) {
                fields.service_date = Some(cap[1].to_string());
                continue;
            }

            if let Some(fee) = self.extract_fee(line) {
                fields.fee = Some(fee);
                fields.billing_label = Some(self.billing_label(line));
            }
        }

        fields
    }

    /// Reconhece uma linha com prefixo. Retorna `None` para linhas sem
    /// prefixo conhecido ou com valor vazio.
    pub fn extract_line(&self, line: &str) -> Option<(FieldKind, String)> {
        let line = line.trim();
        let (kind, _) = self.prefixes.iter().find(|(_, re)| re.is_match(line))?;
        let value = value_after_colon(line);
        let value = match kind {
            FieldKind::TimeSlot => self.narrow_time(&value),
            _ => value,
        };
        if value.is_empty() {
            None
        } else {
            Some((*kind, value))
        }
    }

    /// Reduz o valor do horário ao trecho `HH:MM` ou `HH:MM - HH:MM`.
    ///
    /// Sem match, devolve o valor limpo (sem marcadores iniciais).
    pub fn narrow_time(&self, value: &str) -> String {
        let value = value.trim_start_matches(|c: char| c == '×' || c == '-' || c.is_whitespace());
        match self.time_re.find(value) {
            Some(m) => m.as_str().trim().to_string(),
            None => value.trim().to_string(),
        }
    }

    fn extract_fee(&self, line: &str) -> Option<f64> {
        let cap = self.currency_re.captures(line)?;
        parse_currency(&cap[1])
    }

    fn billing_label(&self, line: &str) -> String {
        let fixed = self.truncated_particular_re.replace_all(line, "Particular");
        if fixed.to_lowercase().contains("particular") {
            "Particular".to_string()
        } else {
            "Outros".to_string()
        }
    }

    fn assign(&self, fields: &mut RawFields, kind: FieldKind, value: String) {
        match kind {
            FieldKind::TimeSlot => fields.time_slot = Some(value),
            FieldKind::Professional => fields.professional = Some(value),
            FieldKind::Patient => fields.patient = Some(value),
            FieldKind::Phone => fields.phone = Some(value),
            FieldKind::Payer => fields.payer = Some(value),
            FieldKind::Status => fields.status = Some(value),
            FieldKind::Procedure => fields.procedure = Some(value),
            FieldKind::Repeated => fields.repeated = Some(value),
            FieldKind::Period => {
                fields.period_date = ProcessingDate::find_in(&value);
                fields.period = Some(value);
            }
        }
    }
}

impl Default for FieldExtractor {
    fn default() -> Self {
        Self::new()
    }
}

/// Conteúdo após os primeiros dois-pontos, sem espaços nas bordas.
pub fn value_after_colon(line: &str) -> String {
    line.split_once(':')
        .map(|(_, rest)| rest.trim().to_string())
        .unwrap_or_default()
}

/// Converte um valor em reais para `f64`.
///
/// - `1.234,56` → `1234.56` (ponto de milhar removido, vírgula vira ponto)
/// - `80,00` → `80.0`
/// - `80.50` → `80.5` (sem vírgula e com 1-2 casas após o ponto: ponto decimal)
/// - `1.500` → `1500.0` (sem vírgula: ponto de milhar)
///
/// Retorna `None` se não sobrar número.
pub fn parse_currency(raw: &str) -> Option<f64> {
    let raw = raw.trim().trim_end_matches(['.', ',']);
    if raw.is_empty() {
        return None;
    }

    let normalized = if let Some(pos) = raw.rfind(',') {
        let (int_part, dec_part) = raw.split_at(pos);
        let int_part: String = int_part.chars().filter(|c| c.is_ascii_digit()).collect();
        format!("{}.{}", int_part, &dec_part[1..])
    } else {
        match raw.rsplit_once('.') {
            Some((int_part, dec)) if !dec.is_empty() && dec.len() <= 2 && !int_part.contains('.') => {
                raw.to_string()
            }
            _ => raw.replace('.', ""),
        }
    };

    normalized
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite() && *v >= 0.0)
}
