//! # Orquestrador — Texto Colado → Coleções Acumuladas
//!
//! O [`Orchestrator`] conecta os subsistemas em resposta às operações do
//! operador. Não guarda dados próprios além da data selecionada: o estado
//! vive no [`AccumulationStore`], recebido por injeção.
//!
//! ## Ciclo de Processamento
//!
//! ```text
//! texto colado
//!   │
//!   ├── 1. validate_paste ........ vazio / sem Horário / sem Paciente → erro
//!   │
//!   ├── 2. AppointmentParser ..... blocos → Appointments (rejeitados contados)
//!   │       └── evento Parsed
//!   │
//!   ├── 3. classify .............. contagens por status (confirmado/atendido/falta/outro)
//!   │   classify_and_route .... fan-out para evolução / financeiro / agendamentos
//!   │       └── evento Routed
//!   │
//!   └── 4. store.apply ........... append atômico + save local + push remoto
//!           └── evento Accumulated
//! ```
//!
//! ## Data Selecionada
//!
//! O operador pode fixar uma data de processamento (`PUT /date`). Enquanto
//! fixada, ela carimba todas as agendas, independente do texto.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::{info, warn};

use crate::analytics::{self, AggregationReport, AttendanceReport, EvolutionOverview};
use crate::core::ProcessingDate;
use crate::error::PipelineError;
use crate::parser::{AppointmentParser, ParseContext, ParseOutcome, validate_paste};
use crate::routing::{classify, classify_and_route};
use crate::store::backup::{self, BackupDocument, BackupMetadata};
use crate::store::{AccumulationStore, AppendSummary, Collection};
use crate::web::events::PipelineEvent;

/// Contagens por status normalizado (partição, soma = aceitos).
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct StatusCounts {
    pub confirmed: usize,
    pub attended: usize,
    pub missed: usize,
    pub other: usize,
}

/// Contagens do roteamento.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct RoutedCounts {
    pub evolution: usize,
    pub financial: usize,
    pub missed: usize,
    pub attended: usize,
}

/// Resultado de um `process()`.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ProcessingReport {
    /// Data usada como referência do lote (`DD/MM/YYYY`).
    pub date: String,
    pub blocks: usize,
    pub accepted: usize,
    pub rejected: usize,
    pub statuses: StatusCounts,
    pub routed: RoutedCounts,
    pub accumulated: AppendSummary,
}

/// Serviço do pipeline.
pub struct Orchestrator {
    parser: AppointmentParser,
    store: Arc<AccumulationStore>,
    /// Data fixada pelo operador (`None` = hoje / data do texto).
    selected_date: RwLock<Option<ProcessingDate>>,
    events_tx: Arc<broadcast::Sender<PipelineEvent>>,
}

impl Orchestrator {
    pub fn new(store: Arc<AccumulationStore>, events_tx: Arc<broadcast::Sender<PipelineEvent>>) -> Self {
        Self {
            parser: AppointmentParser::new(),
            store,
            selected_date: RwLock::new(None),
            events_tx,
        }
    }

    pub fn store(&self) -> &Arc<AccumulationStore> {
        &self.store
    }

    fn emit(&self, event: PipelineEvent) {
        // Sem ouvintes o send falha; é esperado.
        let _ = self.events_tx.send(event);
    }

    // ─── Data selecionada ───────────────────────────────────────

    pub fn selected_date(&self) -> Option<ProcessingDate> {
        *self.selected_date.read()
    }

    pub fn set_selected_date(&self, date: Option<ProcessingDate>) {
        *self.selected_date.write() = date;
        info!(date = ?date.map(|d| d.label()), "Data selecionada alterada");
        self.emit(PipelineEvent::DateChanged {
            date: date.map(|d| d.label()),
        });
    }

    /// Aceita `DD/MM/YYYY`, `YYYY-MM-DD` ou vazio (limpa a seleção).
    pub fn set_selected_date_label(&self, raw: &str) -> Result<Option<ProcessingDate>, PipelineError> {
        let date = if raw.trim().is_empty() {
            None
        } else {
            Some(ProcessingDate::parse_label(raw).ok_or_else(|| PipelineError::InvalidDate(raw.to_string()))?)
        };
        self.set_selected_date(date);
        Ok(date)
    }

    // ─── Pipeline ───────────────────────────────────────────────

    /// Só o parse, sem tocar no store.
    pub fn parse(&self, text: &str) -> Result<ParseOutcome, PipelineError> {
        validate_paste(text)?;
        let ctx = ParseContext::new(self.selected_date());
        Ok(self.parser.parse_multiple(text, &ctx))
    }

    /// Valida, faz o parse, roteia e acumula.
    pub fn process(&self, text: &str) -> Result<ProcessingReport, PipelineError> {
        if let Err(e) = validate_paste(text) {
            warn!(error = %e, "Colagem rejeitada");
            self.emit(PipelineEvent::Error { message: e.to_string() });
            return Err(e.into());
        }

        let ctx = ParseContext::new(self.selected_date());
        let outcome = self.parser.parse_multiple(text, &ctx);
        self.emit(PipelineEvent::Parsed {
            blocks: outcome.blocks,
            accepted: outcome.accepted,
            rejected: outcome.rejected,
        });

        let classified = classify(&outcome.appointments);
        let statuses = StatusCounts {
            confirmed: classified.confirmed.len(),
            attended: classified.attended.len(),
            missed: classified.missed.len(),
            other: classified.other.len(),
        };

        let batch = classify_and_route(&outcome.appointments);
        let routed = RoutedCounts {
            evolution: batch.evolution.len(),
            financial: batch.financial.len(),
            missed: batch.missed.len(),
            attended: batch.attended.len(),
        };
        self.emit(PipelineEvent::Routed {
            evolution: routed.evolution,
            financial: routed.financial,
            missed: routed.missed,
            attended: routed.attended,
        });

        let date = ctx
            .selected_date
            .or_else(|| outcome.appointments.first().map(|a| a.date))
            .unwrap_or(ctx.today)
            .label();

        let accumulated = self.store.apply(&batch, Some(date.clone()));
        self.emit(PipelineEvent::Accumulated {
            evolution_total: accumulated.evolution_total,
            financial_total: accumulated.financial_total,
            schedule_total: accumulated.schedule_total,
        });

        info!(
            %date,
            accepted = outcome.accepted,
            rejected = outcome.rejected,
            evolutions = accumulated.evolutions_added,
            financial = accumulated.financial_added,
            "Processamento concluído"
        );

        Ok(ProcessingReport {
            date,
            blocks: outcome.blocks,
            accepted: outcome.accepted,
            rejected: outcome.rejected,
            statuses,
            routed,
            accumulated,
        })
    }

    // ─── Relatórios ─────────────────────────────────────────────

    pub fn financial_report(&self) -> AggregationReport {
        analytics::analyze(&self.store.financial_records())
    }

    pub fn evolution_analysis(&self) -> AggregationReport {
        analytics::analyze(&self.store.evolutions())
    }

    pub fn evolution_overview(&self) -> EvolutionOverview {
        analytics::overview(&self.store.evolutions())
    }

    pub fn attendance_report(&self) -> AttendanceReport {
        analytics::attendance_report(&self.store.schedules())
    }

    // ─── Persistência ───────────────────────────────────────────

    pub fn save(&self) -> Result<DateTime<Utc>, PipelineError> {
        let timestamp = self.store.save()?;
        info!(%timestamp, "Estado salvo");
        self.emit(PipelineEvent::Saved { timestamp });
        Ok(timestamp)
    }

    /// Limpa uma coleção pelo nome, ou tudo com `None`.
    pub fn clear(&self, collection: Option<&str>) -> Result<(), PipelineError> {
        match collection {
            None => self.store.clear()?,
            Some(name) => {
                let c = Collection::parse(name)
                    .ok_or_else(|| PipelineError::UnknownCollection(name.to_string()))?;
                self.store.clear_collection(c);
            }
        }
        self.emit(PipelineEvent::Cleared {
            collection: collection.map(str::to_string),
        });
        Ok(())
    }

    pub fn export_backup(&self) -> BackupDocument {
        backup::export(&self.store.snapshot())
    }

    /// Importa um backup. Em caso de erro o estado atual fica intacto.
    pub fn import_backup(&self, raw: &str) -> Result<BackupMetadata, PipelineError> {
        let state = match backup::import(raw) {
            Ok(state) => state,
            Err(e) => {
                warn!(error = %e, "Importação rejeitada");
                self.emit(PipelineEvent::Error { message: e.to_string() });
                return Err(e.into());
            }
        };
        self.store.replace_all(state);

        let metadata = BackupMetadata::from_state(&self.store.snapshot());
        info!(
            evolutions = metadata.evolution_count,
            financial = metadata.financial_count,
            "Backup importado"
        );
        self.emit(PipelineEvent::Imported {
            evolution_count: metadata.evolution_count,
            financial_count: metadata.financial_count,
            schedule_count: metadata.missed_count + metadata.attended_count,
        });
        Ok(metadata)
    }
}
