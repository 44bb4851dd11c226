//! # Módulo Web — API JSON do Pipeline
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │ Axum Router (este módulo)                                     │
//! │  ├── GET  /status                → contagens + último save    │
//! │  ├── GET  /date · PUT /date      → data selecionada           │
//! │  ├── POST /process               → parse + rota + acumula     │
//! │  ├── POST /parse                 → só parse                   │
//! │  ├── GET  /evolucoes[/report|/analysis]                       │
//! │  ├── GET  /financeiro[/report]                                │
//! │  ├── GET  /agendamentos[/report]                              │
//! │  ├── GET  /backup/export · POST /backup/import                │
//! │  ├── POST /save                                               │
//! │  ├── POST /clear · POST /clear/{collection}                   │
//! │  └── GET  /events                → SSE stream                 │
//! ├───────────────────────────────────────────────────────────────┤
//! │ tower-http: CorsLayer (permissivo) + TraceLayer               │
//! └───────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Submódulos
//!
//! | Módulo | Responsabilidade |
//! |--------|------------------|
//! | [`state`] | Estado compartilhado (`AppState`) |
//! | [`events`] | Enum de eventos SSE do pipeline |
//! | [`handlers`] | Handlers Axum para cada rota |

pub mod events;
pub mod handlers;
pub mod state;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use state::AppState;

/// Limite do corpo das requisições (colagens e backups grandes).
const BODY_LIMIT: usize = 20 * 1024 * 1024;

/// Cria o router Axum com todas as rotas da aplicação.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // ── Estado ────────────────────────────────────────────
        .route("/status", get(handlers::status))
        .route("/date", get(handlers::get_date).put(handlers::put_date))
        // ── Pipeline ──────────────────────────────────────────
        .route("/process", post(handlers::process))
        .route("/parse", post(handlers::parse))
        // ── Coleções e relatórios ─────────────────────────────
        .route("/evolucoes", get(handlers::evolutions))
        .route("/evolucoes/report", get(handlers::evolution_overview))
        .route("/evolucoes/analysis", get(handlers::evolution_analysis))
        .route("/financeiro", get(handlers::financial))
        .route("/financeiro/report", get(handlers::financial_report))
        .route("/agendamentos", get(handlers::schedules))
        .route("/agendamentos/report", get(handlers::attendance_report))
        // ── Backup e persistência ─────────────────────────────
        .route("/backup/export", get(handlers::export_backup))
        .route("/backup/import", post(handlers::import_backup))
        .route("/save", post(handlers::save))
        .route("/clear", post(handlers::clear_all))
        .route("/clear/{collection}", post(handlers::clear_collection))
        // ── SSE ───────────────────────────────────────────────
        .route("/events", get(handlers::sse_events))
        .layer(DefaultBodyLimit::max(BODY_LIMIT))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
