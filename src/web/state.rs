//! # Estado da Aplicação Web
//!
//! Tudo que os handlers compartilham, montado uma vez em `main`:
//!
//! ```text
//! AppState (Clone, barato)
//!  ├── orchestrator: Arc<Orchestrator> ──► Arc<AccumulationStore>
//!  ├── store: Arc<AccumulationStore>       (o mesmo Arc)
//!  └── events_tx: Arc<broadcast::Sender<PipelineEvent>>
//! ```

use std::sync::Arc;

use tokio::sync::broadcast;

use crate::orchestrator::Orchestrator;
use crate::store::AccumulationStore;
use crate::web::events::PipelineEvent;

/// Capacidade do canal de eventos SSE.
pub const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Estado compartilhado da aplicação Axum.
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<Orchestrator>,
    pub store: Arc<AccumulationStore>,
    /// Canal broadcast para o stream SSE.
    pub events_tx: Arc<broadcast::Sender<PipelineEvent>>,
}

impl AppState {
    /// Monta o orquestrador em volta do store e cria o canal de eventos.
    pub fn new(store: Arc<AccumulationStore>) -> Self {
        let (tx, _rx) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let events_tx = Arc::new(tx);
        let orchestrator = Arc::new(Orchestrator::new(store.clone(), events_tx.clone()));
        Self {
            orchestrator,
            store,
            events_tx,
        }
    }
}
