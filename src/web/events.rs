//! # Eventos SSE do Pipeline
//!
//! Tudo que o orquestrador faz vira um [`PipelineEvent`], enviado em tempo
//! real para quem estiver ouvindo `GET /events`.
//!
//! ## Ciclo de um Processamento
//!
//! ```text
//! Parsed → Routed → Accumulated
//!    ou → Error
//! ```
//!
//! ## Serialização
//!
//! `#[serde(tag = "type")]` produz JSON com discriminador:
//!
//! ```json
//! { "type": "Parsed", "blocks": 3, "accepted": 2, "rejected": 1 }
//! ```

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Evento do pipeline.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum PipelineEvent {
    /// Colagem dividida e validada bloco a bloco.
    Parsed {
        blocks: usize,
        accepted: usize,
        rejected: usize,
    },

    /// Agendas distribuídas entre os destinos.
    Routed {
        evolution: usize,
        financial: usize,
        missed: usize,
        attended: usize,
    },

    /// Coleções após o append.
    Accumulated {
        evolution_total: usize,
        financial_total: usize,
        schedule_total: usize,
    },

    /// Estado gravado no armazenamento local.
    Saved { timestamp: DateTime<Utc> },

    /// Backup importado (estado substituído).
    Imported {
        evolution_count: usize,
        financial_count: usize,
        schedule_count: usize,
    },

    /// Coleção limpa. `None` = todas.
    Cleared { collection: Option<String> },

    /// Data selecionada alterada. `None` = volta para "hoje".
    DateChanged { date: Option<String> },

    /// Falha que interrompeu uma operação.
    Error { message: String },
}
