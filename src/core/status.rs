//! # AttendanceStatus — Status do Agendamento como Tipo Fechado
//!
//! O campo `Status:` dos blocos é texto livre ("Presença confirmada",
//! "Atendido", "Não atendido", "Faltou", "Cancelado"...). Toda a decisão de
//! roteamento depende dele, então o texto é normalizado **uma única vez** em
//! [`AttendanceStatus::classify()`] e o resto do sistema só faz `match`
//! exaustivo sobre o enum.
//!
//! ## Tabela de Classificação
//!
//! Comparação case-insensitive por substring, na ordem abaixo:
//!
//! | Ordem | Contém | Variante |
//! |-------|--------|----------|
//! | 1 | `presença confirmada` | [`ConfirmedPresence`](AttendanceStatus::ConfirmedPresence) |
//! | 2 | `não atendi` (atendido, atendida, atendio) | [`NotAttended`](AttendanceStatus::NotAttended) |
//! | 3 | `faltou` | [`Absent`](AttendanceStatus::Absent) |
//! | 4 | `atendido` sem `não` | [`Attended`](AttendanceStatus::Attended) |
//! | 5 | qualquer outra coisa, inclusive vazio | [`Other`](AttendanceStatus::Other) |
//!
//! A forma sem acento (`nao`, `presenca`) também é reconhecida, porque
//! exportações copiadas de celular perdem acentuação com frequência.

use serde::{Deserialize, Serialize};

/// Status de comparecimento normalizado.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AttendanceStatus {
    /// Presença confirmada: gera evolução pendente e cobrança.
    ConfirmedPresence,
    /// Atendido (sem "não"): gera cobrança.
    Attended,
    /// Não atendido: conta como falta.
    NotAttended,
    /// Faltou: conta como falta.
    Absent,
    /// Qualquer outro status (cancelado, remarcado, vazio...).
    Other,
}

impl AttendanceStatus {
    /// Classifica o texto livre do campo `Status:`.
    pub fn classify(raw: Option<&str>) -> Self {
        let Some(raw) = raw else {
            return Self::Other;
        };
        let status = raw.trim().to_lowercase();
        if status.is_empty() {
            return Self::Other;
        }

        if status.contains("presença confirmada") || status.contains("presenca confirmada") {
            Self::ConfirmedPresence
        } else if status.contains("não atendi") || status.contains("nao atendi") {
            Self::NotAttended
        } else if status.contains("faltou") {
            Self::Absent
        } else if status.contains("atendido") && !status.contains("não") && !status.contains("nao")
        {
            Self::Attended
        } else {
            Self::Other
        }
    }

    /// `true` para os status que contam como falta na aba de agendamentos.
    pub fn is_missed(self) -> bool {
        matches!(self, Self::NotAttended | Self::Absent)
    }

    /// Rótulo curto em PT-BR para logs e relatórios.
    pub fn label(self) -> &'static str {
        match self {
            Self::ConfirmedPresence => "presença confirmada",
            Self::Attended => "atendido",
            Self::NotAttended => "não atendido",
            Self::Absent => "faltou",
            Self::Other => "outro",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn confirmed_presence_any_casing() {
        for s in ["Presença confirmada", "PRESENÇA CONFIRMADA", "  presença confirmada  "] {
            assert_eq!(AttendanceStatus::classify(Some(s)), AttendanceStatus::ConfirmedPresence);
        }
    }

    #[test]
    fn not_attended_variants() {
        for s in ["Não atendido", "NÃO ATENDIDA", "não atendio", "nao atendido"] {
            assert_eq!(AttendanceStatus::classify(Some(s)), AttendanceStatus::NotAttended, "{s}");
        }
    }

    #[test]
    fn absent_and_attended() {
        assert_eq!(AttendanceStatus::classify(Some("Faltou")), AttendanceStatus::Absent);
        assert_eq!(AttendanceStatus::classify(Some("Atendido")), AttendanceStatus::Attended);
    }

    #[test]
    fn unknown_and_empty_are_other() {
        assert_eq!(AttendanceStatus::classify(Some("Cancelado")), AttendanceStatus::Other);
        assert_eq!(AttendanceStatus::classify(Some("   ")), AttendanceStatus::Other);
        assert_eq!(AttendanceStatus::classify(None), AttendanceStatus::Other);
    }

    #[test]
    fn missed_covers_only_explicit_absence() {
        assert!(AttendanceStatus::NotAttended.is_missed());
        assert!(AttendanceStatus::Absent.is_missed());
        assert!(!AttendanceStatus::Other.is_missed());
        assert!(!AttendanceStatus::Attended.is_missed());
    }
}
