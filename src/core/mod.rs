//! # Módulo Core — Tipos Fundamentais do Domínio
//!
//! Os tipos que atravessam todo o pipeline de agendamentos:
//!
//! - [`ProcessingDate`] — data de processamento (dia/mês/ano)
//! - [`Appointment`] — agendamento extraído do texto colado
//! - [`AttendanceStatus`] — status normalizado em um enum fechado
//! - [`EvolutionRecord`], [`FinancialRecord`], [`ScheduleRecord`] — registros de destino
//! - [`ScheduleData`] — faltas + comparecimentos
//!
//! ## Fluxo de Dados
//!
//! ```text
//! texto colado ──► Appointment ──► AttendanceStatus ──┬──► EvolutionRecord
//!                                                     ├──► FinancialRecord
//!                                                     └──► ScheduleRecord (missed | attended)
//! ```

/// Data de processamento e formatos de data aceitos.
pub mod date;

/// Agendamento normalizado (saída do parser).
pub mod appointment;

/// Classificação do status em enum fechado.
pub mod status;

/// Registros das três coleções de destino.
pub mod records;

/// Normalização de nomes e regra de isenção.
pub mod names;

pub use appointment::Appointment;
pub use date::ProcessingDate;
pub use names::{is_exempt, normalize_name};
pub use records::{EvolutionRecord, FinancialRecord, ScheduleData, ScheduleOutcome, ScheduleRecord};
pub use status::AttendanceStatus;
