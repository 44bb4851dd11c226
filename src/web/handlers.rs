//! # Handlers HTTP
//!
//! Cada função pública é um handler Axum mapeado em
//! [`super::create_router()`]. Todas as respostas são JSON, exceto o stream
//! SSE.
//!
//! ## Erros
//!
//! [`PipelineError`] vira resposta HTTP com corpo `{ "error": "..." }`:
//!
//! | Variante | Status |
//! |----------|--------|
//! | `Validation`, `Import`, `InvalidDate` | 400 |
//! | `UnknownCollection` | 404 |
//! | `Storage` | 500 |

use std::convert::Infallible;
use std::time::Duration;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::sse::{Event as SseEvent, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{DateTime, Utc};
use futures_util::stream::StreamExt;
use serde::{Deserialize, Serialize};
use tokio_stream::wrappers::BroadcastStream;

use super::state::AppState;
use crate::analytics::{AggregationReport, AttendanceReport, EvolutionOverview};
use crate::core::{EvolutionRecord, FinancialRecord, ScheduleData};
use crate::error::PipelineError;
use crate::orchestrator::ProcessingReport;
use crate::parser::ParseOutcome;
use crate::store::StoreStatus;
use crate::store::backup::{BackupDocument, BackupMetadata};

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for PipelineError {
    fn into_response(self) -> Response {
        let status = match &self {
            PipelineError::Validation(_) | PipelineError::Import(_) | PipelineError::InvalidDate(_) => {
                StatusCode::BAD_REQUEST
            }
            PipelineError::UnknownCollection(_) => StatusCode::NOT_FOUND,
            PipelineError::Storage(_) => {
                tracing::error!(error = %self, "Falha de armazenamento na requisição");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        (status, Json(ErrorBody { error: self.to_string() })).into_response()
    }
}

/// Corpo de `/process` e `/parse`.
#[derive(Deserialize)]
pub struct PasteRequest {
    pub text: String,
}

/// Corpo de `PUT /date`. `null` ou vazio limpa a seleção.
#[derive(Deserialize, Serialize)]
pub struct DateBody {
    pub date: Option<String>,
}

#[derive(Serialize)]
pub struct StatusResponse {
    #[serde(flatten)]
    pub store: StoreStatus,
    pub selected_date: Option<String>,
}

#[derive(Serialize)]
pub struct SavedResponse {
    pub timestamp: DateTime<Utc>,
}

#[derive(Serialize)]
pub struct ClearedResponse {
    pub cleared: String,
}

/// GET `/status` — contagens por coleção, último save e data selecionada.
pub async fn status(State(state): State<AppState>) -> Json<StatusResponse> {
    Json(StatusResponse {
        store: state.store.status(),
        selected_date: state.orchestrator.selected_date().map(|d| d.label()),
    })
}

/// GET `/date`
pub async fn get_date(State(state): State<AppState>) -> Json<DateBody> {
    Json(DateBody {
        date: state.orchestrator.selected_date().map(|d| d.label()),
    })
}

/// PUT `/date` — aceita `DD/MM/YYYY` ou `YYYY-MM-DD`.
pub async fn put_date(
    State(state): State<AppState>,
    Json(body): Json<DateBody>,
) -> Result<Json<DateBody>, PipelineError> {
    let date = state
        .orchestrator
        .set_selected_date_label(body.date.as_deref().unwrap_or(""))?;
    Ok(Json(DateBody {
        date: date.map(|d| d.label()),
    }))
}

/// POST `/process` — valida, faz o parse, roteia e acumula.
pub async fn process(
    State(state): State<AppState>,
    Json(req): Json<PasteRequest>,
) -> Result<Json<ProcessingReport>, PipelineError> {
    state.orchestrator.process(&req.text).map(Json)
}

/// POST `/parse` — só o parse, nada é gravado.
pub async fn parse(
    State(state): State<AppState>,
    Json(req): Json<PasteRequest>,
) -> Result<Json<ParseOutcome>, PipelineError> {
    state.orchestrator.parse(&req.text).map(Json)
}

/// GET `/evolucoes`
pub async fn evolutions(State(state): State<AppState>) -> Json<Vec<EvolutionRecord>> {
    Json(state.store.evolutions())
}

/// GET `/evolucoes/report`
pub async fn evolution_overview(State(state): State<AppState>) -> Json<EvolutionOverview> {
    Json(state.orchestrator.evolution_overview())
}

/// GET `/evolucoes/analysis`
pub async fn evolution_analysis(State(state): State<AppState>) -> Json<AggregationReport> {
    Json(state.orchestrator.evolution_analysis())
}

/// GET `/financeiro`
pub async fn financial(State(state): State<AppState>) -> Json<Vec<FinancialRecord>> {
    Json(state.store.financial_records())
}

/// GET `/financeiro/report`
pub async fn financial_report(State(state): State<AppState>) -> Json<AggregationReport> {
    Json(state.orchestrator.financial_report())
}

/// GET `/agendamentos`
pub async fn schedules(State(state): State<AppState>) -> Json<ScheduleData> {
    Json(state.store.schedules())
}

/// GET `/agendamentos/report`
pub async fn attendance_report(State(state): State<AppState>) -> Json<AttendanceReport> {
    Json(state.orchestrator.attendance_report())
}

/// GET `/backup/export`
pub async fn export_backup(State(state): State<AppState>) -> Json<BackupDocument> {
    Json(state.orchestrator.export_backup())
}

/// POST `/backup/import` — corpo é o documento de backup cru.
///
/// O corpo é lido como texto para que erros de formato virem
/// [`ImportError`](crate::error::ImportError) com mensagem descritiva.
pub async fn import_backup(
    State(state): State<AppState>,
    body: String,
) -> Result<Json<BackupMetadata>, PipelineError> {
    state.orchestrator.import_backup(&body).map(Json)
}

/// POST `/save`
pub async fn save(State(state): State<AppState>) -> Result<Json<SavedResponse>, PipelineError> {
    let timestamp = state.orchestrator.save()?;
    Ok(Json(SavedResponse { timestamp }))
}

/// POST `/clear`
pub async fn clear_all(State(state): State<AppState>) -> Result<Json<ClearedResponse>, PipelineError> {
    state.orchestrator.clear(None)?;
    Ok(Json(ClearedResponse {
        cleared: "all".to_string(),
    }))
}

/// POST `/clear/{collection}`
pub async fn clear_collection(
    State(state): State<AppState>,
    Path(collection): Path<String>,
) -> Result<Json<ClearedResponse>, PipelineError> {
    state.orchestrator.clear(Some(&collection))?;
    Ok(Json(ClearedResponse { cleared: collection }))
}

/// GET `/events` — stream SSE de [`PipelineEvent`](super::events::PipelineEvent).
///
/// Keep-alive a cada 15s. Subscribers atrasados perdem as mensagens que
/// ficaram para trás.
pub async fn sse_events(
    State(state): State<AppState>,
) -> Sse<impl futures_util::Stream<Item = Result<SseEvent, Infallible>>> {
    let rx = state.events_tx.subscribe();
    let stream = BroadcastStream::new(rx).filter_map(|result| async move {
        match result {
            Ok(event) => {
                let data = serde_json::to_string(&event).ok()?;
                Some(Ok(SseEvent::default().data(data)))
            }
            Err(_) => None,
        }
    });
    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}
