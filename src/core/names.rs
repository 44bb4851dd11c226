//! Normalização de nomes e classificação isento/pagante.
//!
//! Os agrupamentos por profissional e por paciente usam uma chave
//! normalizada (trim + lowercase + espaços colapsados), de modo que
//! `" João  Silva "` e `"joão silva"` caiam no mesmo grupo.

/// Chave de agrupamento para nomes de pessoas.
pub fn normalize_name(name: &str) -> String {
    name.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// `true` se o convênio indica atendimento isento (substring `isento`).
///
/// Convênio ausente ou vazio nunca é isento.
pub fn is_exempt(payer: Option<&str>) -> bool {
    payer
        .map(|p| p.to_lowercase().contains("isento"))
        .unwrap_or(false)
}
