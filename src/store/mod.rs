//! # Store de Acumulação
//!
//! Dono exclusivo do [`PersistedState`]. Junta cada lote roteado ao histórico
//! já acumulado e espelha o resultado no armazenamento local (síncrono) e no
//! backup remoto (assíncrono, best-effort).
//!
//! ## Operações
//!
//! | Operação | Semântica |
//! |----------|-----------|
//! | `append_*` / [`apply()`](AccumulationStore::apply) | ler-juntar-gravar sob **um** write lock |
//! | `replace_*` | substitui a coleção pela lista já combinada pelo chamador |
//! | [`save()`](AccumulationStore::save) | timestamp novo → local → push remoto em background |
//! | [`clear()`](AccumulationStore::clear) | zera tudo (local e remoto) |
//! | [`sync_from_remote()`](AccumulationStore::sync_from_remote) | adota o remoto só se estritamente mais novo |
//!
//! ## Fluxo de um Save
//!
//! ```text
//! mutação ──► state.write() ──► timestamp = agora ──► snapshot
//!                                                        │
//!                       ┌────────────────────────────────┤
//!                       ▼                                ▼
//!              write_state(local)              tokio::spawn(remote.push)
//!              falha → warn                    falha → warn
//! ```
//!
//! O estado em memória é sempre a referência da sessão: uma falha de escrita
//! local ou remota nunca desfaz a mutação.

/// Estado persistido (três coleções + timestamp).
pub mod state;

/// Armazenamento chave/valor local.
pub mod local;

/// Cliente do backup remoto.
pub mod remote;

/// Documento de backup (exportar/importar).
pub mod backup;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::core::{Appointment, EvolutionRecord, FinancialRecord, ScheduleData, ScheduleRecord};
use crate::error::{RemoteError, StorageError};
use crate::routing::RoutedBatch;

pub use local::{FileStorage, KeyValueStorage, MemoryStorage, STATE_KEY};
pub use remote::{HttpRemoteBackup, RemoteBackup};
pub use state::PersistedState;

/// Coleção individual, para limpezas parciais.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Collection {
    Evolutions,
    Financial,
    Schedules,
}

impl Collection {
    /// Aceita os nomes da API e os nomes antigos em português.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "evolutions" | "evolucoes" | "evoluções" => Some(Self::Evolutions),
            "financial" | "financeiro" | "financial_records" => Some(Self::Financial),
            "schedules" | "agendamentos" => Some(Self::Schedules),
            _ => None,
        }
    }
}

/// Contagens por coleção e último save.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct StoreStatus {
    pub evolution_count: usize,
    pub financial_count: usize,
    pub missed_count: usize,
    pub attended_count: usize,
    pub last_save: Option<DateTime<Utc>>,
    pub remote_enabled: bool,
}

/// Quanto cada coleção cresceu em um [`apply()`](AccumulationStore::apply).
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct AppendSummary {
    pub evolutions_added: usize,
    pub financial_added: usize,
    pub missed_added: usize,
    pub attended_added: usize,
    pub evolution_total: usize,
    pub financial_total: usize,
    pub schedule_total: usize,
}

/// Store de acumulação das três coleções.
pub struct AccumulationStore {
    state: RwLock<PersistedState>,
    /// Serializa as escritas: snapshot, arquivo local e push remoto saem na
    /// mesma ordem.
    save_guard: Mutex<()>,
    storage: Arc<dyn KeyValueStorage>,
    remote: Option<Arc<dyn RemoteBackup>>,
}

impl AccumulationStore {
    /// Store vazio.
    pub fn new(storage: Arc<dyn KeyValueStorage>, remote: Option<Arc<dyn RemoteBackup>>) -> Self {
        Self::with_state(PersistedState::default(), storage, remote)
    }

    pub fn with_state(
        state: PersistedState,
        storage: Arc<dyn KeyValueStorage>,
        remote: Option<Arc<dyn RemoteBackup>>,
    ) -> Self {
        Self {
            state: RwLock::new(state),
            save_guard: Mutex::new(()),
            storage,
            remote,
        }
    }

    /// Carrega o estado salvo localmente (vazio se nunca houve save).
    pub fn load(
        storage: Arc<dyn KeyValueStorage>,
        remote: Option<Arc<dyn RemoteBackup>>,
    ) -> anyhow::Result<Self> {
        let state = local::read_state(storage.as_ref())?.unwrap_or_default();
        info!(
            evolutions = state.evolutions.len(),
            financial = state.financial_records.len(),
            schedules = state.schedules.total(),
            "Estado local carregado"
        );
        Ok(Self::with_state(state, storage, remote))
    }

    // ─── Leitura ────────────────────────────────────────────────

    pub fn snapshot(&self) -> PersistedState {
        self.state.read().clone()
    }

    pub fn evolutions(&self) -> Vec<EvolutionRecord> {
        self.state.read().evolutions.clone()
    }

    pub fn financial_records(&self) -> Vec<FinancialRecord> {
        self.state.read().financial_records.clone()
    }

    pub fn schedules(&self) -> ScheduleData {
        self.state.read().schedules.clone()
    }

    pub fn last_save(&self) -> Option<DateTime<Utc>> {
        self.state.read().timestamp
    }

    pub fn status(&self) -> StoreStatus {
        let s = self.state.read();
        StoreStatus {
            evolution_count: s.evolutions.len(),
            financial_count: s.financial_records.len(),
            missed_count: s.schedules.missed.len(),
            attended_count: s.schedules.attended.len(),
            last_save: s.timestamp,
            remote_enabled: self.remote.is_some(),
        }
    }

    // ─── Append atômico ─────────────────────────────────────────

    /// Acrescenta evoluções com ids sequenciais a partir do maior id existente.
    pub fn append_evolutions(&self, appointments: &[Appointment]) -> Vec<EvolutionRecord> {
        let added = {
            let mut s = self.state.write();
            push_evolutions(&mut s.evolutions, appointments)
        };
        self.persist_if(!added.is_empty());
        added
    }

    pub fn append_financial(&self, records: Vec<FinancialRecord>) -> usize {
        let n = records.len();
        self.state.write().financial_records.extend(records);
        self.persist_if(n > 0);
        n
    }

    /// Acrescenta agendamentos. A data de referência só é definida se ainda
    /// não existir.
    pub fn append_schedules(
        &self,
        missed: Vec<ScheduleRecord>,
        attended: Vec<ScheduleRecord>,
        reference_date: Option<String>,
    ) -> usize {
        let n = missed.len() + attended.len();
        {
            let mut s = self.state.write();
            push_schedules(&mut s.schedules, missed, attended, reference_date);
        }
        self.persist_if(n > 0);
        n
    }

    /// Junta um lote roteado inteiro sob um único write lock e salva uma vez.
    pub fn apply(&self, batch: &RoutedBatch, reference_date: Option<String>) -> AppendSummary {
        let (missed, attended) = batch.schedule_records();
        let financial = batch.financial_records();

        let summary = {
            let mut s = self.state.write();
            let evolutions = push_evolutions(&mut s.evolutions, &batch.evolution);
            let financial_added = financial.len();
            s.financial_records.extend(financial);
            let missed_added = missed.len();
            let attended_added = attended.len();
            push_schedules(&mut s.schedules, missed, attended, reference_date);

            AppendSummary {
                evolutions_added: evolutions.len(),
                financial_added,
                missed_added,
                attended_added,
                evolution_total: s.evolutions.len(),
                financial_total: s.financial_records.len(),
                schedule_total: s.schedules.total(),
            }
        };

        debug!(?summary, "Lote acumulado");
        self.persist_if(!batch.is_empty());
        summary
    }

    // ─── Substituição (lista já combinada pelo chamador) ────────

    pub fn replace_evolutions(&self, records: Vec<EvolutionRecord>) {
        self.state.write().evolutions = records;
        self.persist();
    }

    pub fn replace_financial(&self, records: Vec<FinancialRecord>) {
        self.state.write().financial_records = records;
        self.persist();
    }

    pub fn replace_schedules(&self, mut data: ScheduleData) {
        data.normalize();
        self.state.write().schedules = data;
        self.persist();
    }

    /// Substitui o estado inteiro (restauração de backup).
    pub fn replace_all(&self, state: PersistedState) {
        *self.state.write() = state.normalize();
        self.persist();
    }

    // ─── Limpeza ────────────────────────────────────────────────

    /// Zera as três coleções, remove o estado local e pede limpeza ao remoto.
    pub fn clear(&self) -> Result<(), StorageError> {
        let _guard = self.save_guard.lock();
        *self.state.write() = PersistedState::default();
        self.storage.remove(STATE_KEY)?;
        info!("Todos os dados foram limpos");

        if let Some(remote) = self.remote.clone() {
            spawn_remote("clear", async move { remote.clear().await });
        }
        Ok(())
    }

    pub fn clear_collection(&self, collection: Collection) {
        {
            let mut s = self.state.write();
            match collection {
                Collection::Evolutions => s.evolutions.clear(),
                Collection::Financial => s.financial_records.clear(),
                Collection::Schedules => s.schedules = ScheduleData::default(),
            }
        }
        info!(?collection, "Coleção limpa");
        self.persist();
    }

    // ─── Persistência ───────────────────────────────────────────

    /// Grava o estado atual com timestamp novo e dispara o push remoto.
    pub fn save(&self) -> Result<DateTime<Utc>, StorageError> {
        let _guard = self.save_guard.lock();
        let snapshot = {
            let mut s = self.state.write();
            s.timestamp = Some(Utc::now());
            s.clone()
        };
        let ts = snapshot.timestamp.unwrap_or_else(Utc::now);

        local::write_state(self.storage.as_ref(), &snapshot)?;
        debug!(%ts, "Estado salvo localmente");

        if let Some(remote) = self.remote.clone() {
            spawn_remote("push", async move { remote.push(snapshot).await });
        }
        Ok(ts)
    }

    /// Consulta o remoto e adota o estado dele se for estritamente mais novo.
    ///
    /// Retorna `true` se o estado local foi substituído.
    pub async fn sync_from_remote(&self) -> Result<bool, RemoteError> {
        let Some(remote) = self.remote.clone() else {
            return Ok(false);
        };
        let Some(remote_state) = remote.fetch().await? else {
            debug!("Backup remoto vazio");
            return Ok(false);
        };

        let _guard = self.save_guard.lock();
        let adopted = {
            let mut s = self.state.write();
            if remote_state.is_newer_than(&s) {
                *s = remote_state;
                Some(s.clone())
            } else {
                None
            }
        };

        let Some(state) = adopted else {
            debug!("Estado local é o mais recente");
            return Ok(false);
        };
        info!(timestamp = ?state.timestamp, "Estado remoto mais novo adotado");
        if let Err(e) = local::write_state(self.storage.as_ref(), &state) {
            warn!(error = %e, "Falha ao gravar localmente o estado remoto");
        }
        Ok(true)
    }

    fn persist(&self) {
        if let Err(e) = self.save() {
            warn!(error = %e, "Falha ao salvar estado local; mantendo em memória");
        }
    }

    fn persist_if(&self, changed: bool) {
        if changed {
            self.persist();
        }
    }
}

fn push_evolutions(target: &mut Vec<EvolutionRecord>, appointments: &[Appointment]) -> Vec<EvolutionRecord> {
    let mut next_id = target.iter().map(|e| e.id).max().unwrap_or(0) + 1;
    let added: Vec<EvolutionRecord> = appointments
        .iter()
        .map(|a| {
            let rec = EvolutionRecord::from_appointment(a, next_id);
            next_id += 1;
            rec
        })
        .collect();
    target.extend(added.iter().cloned());
    added
}

fn push_schedules(
    target: &mut ScheduleData,
    missed: Vec<ScheduleRecord>,
    attended: Vec<ScheduleRecord>,
    reference_date: Option<String>,
) {
    if missed.is_empty() && attended.is_empty() {
        return;
    }
    target.missed.extend(missed);
    target.attended.extend(attended);
    if target.reference_date.is_none() {
        target.reference_date = reference_date;
    }
}

/// Roda uma operação remota em background. Sem runtime tokio, não faz nada.
fn spawn_remote<F>(op: &'static str, fut: F)
where
    F: std::future::Future<Output = Result<(), RemoteError>> + Send + 'static,
{
    match tokio::runtime::Handle::try_current() {
        Ok(handle) => {
            handle.spawn(async move {
                match fut.await {
                    Ok(()) => debug!(op, "Backup remoto atualizado"),
                    Err(e) => warn!(op, error = %e, "Falha no backup remoto (ignorada)"),
                }
            });
        }
        Err(_) => debug!(op, "Sem runtime tokio, backup remoto ignorado"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::appointment::sample;
    use crate::routing::classify_and_route;
    use futures_util::future::BoxFuture;
    use tokio::sync::mpsc;

    fn memory_store() -> (Arc<MemoryStorage>, AccumulationStore) {
        let storage = Arc::new(MemoryStorage::new());
        let store = AccumulationStore::new(storage.clone(), None);
        (storage, store)
    }

    fn confirmed(n: usize) -> Vec<Appointment> {
        (0..n).map(|i| sample(&format!("Paciente {i}"), "Presença confirmada")).collect()
    }

    #[test]
    fn append_is_monotonic_across_cycles() {
        let (_, store) = memory_store();
        store.apply(&classify_and_route(&confirmed(3)), None);
        let summary = store.apply(&classify_and_route(&confirmed(2)), None);

        assert_eq!(summary.evolutions_added, 2);
        assert_eq!(summary.evolution_total, 5);
        assert_eq!(store.financial_records().len(), 5);
        let ids: Vec<u64> = store.evolutions().iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn replace_uses_caller_combined_list() {
        let (_, store) = memory_store();
        store.append_evolutions(&confirmed(2));

        let mut combined = store.evolutions();
        combined.push(EvolutionRecord::from_appointment(&sample("Nova", "Presença confirmada"), 3));
        store.replace_evolutions(combined);
        assert_eq!(store.evolutions().len(), 3);
    }

    #[test]
    fn every_mutation_is_written_locally() {
        let (storage, store) = memory_store();
        store.append_financial(vec![FinancialRecord::from(&sample("Maria", "Atendido"))]);

        let saved = local::read_state(storage.as_ref()).unwrap().unwrap();
        assert_eq!(saved.financial_records.len(), 1);
        assert!(saved.timestamp.is_some());
        assert_eq!(store.last_save(), saved.timestamp);
    }

    #[test]
    fn reference_date_is_kept_from_first_batch() {
        let (_, store) = memory_store();
        let batch = classify_and_route(&[sample("João", "Faltou")]);
        store.apply(&batch, Some("15/10/2025".into()));
        store.apply(&batch, Some("16/10/2025".into()));
        let schedules = store.schedules();
        assert_eq!(schedules.missed.len(), 2);
        assert_eq!(schedules.reference_date.as_deref(), Some("15/10/2025"));
    }

    #[test]
    fn clear_collection_and_clear_all() {
        let (storage, store) = memory_store();
        store.apply(&classify_and_route(&confirmed(2)), None);

        store.clear_collection(Collection::Financial);
        let status = store.status();
        assert_eq!(status.financial_count, 0);
        assert_eq!(status.evolution_count, 2);

        store.clear().unwrap();
        assert_eq!(store.snapshot(), PersistedState::default());
        assert_eq!(storage.get(STATE_KEY).unwrap(), None);
    }

    #[test]
    fn empty_batch_does_not_claim_reference_date() {
        let (_, store) = memory_store();
        store.apply(&classify_and_route(&[]), Some("14/10/2025".into()));
        assert_eq!(store.schedules().reference_date, None);

        store.apply(&classify_and_route(&[sample("João", "Faltou")]), Some("15/10/2025".into()));
        assert_eq!(store.schedules().reference_date.as_deref(), Some("15/10/2025"));
    }

    #[test]
    fn concurrent_saves_to_file_storage() {
        let dir = tempfile::tempdir().unwrap();
        let storage: Arc<dyn KeyValueStorage> = Arc::new(FileStorage::new(dir.path()));
        let store = Arc::new(AccumulationStore::new(storage.clone(), None));
        store.apply(&classify_and_route(&confirmed(500)), None);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = store.clone();
                std::thread::spawn(move || (0..20).filter(|_| store.save().is_err()).count())
            })
            .collect();
        let failures: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
        assert_eq!(failures, 0);

        let saved = local::read_state(storage.as_ref()).unwrap().unwrap();
        assert_eq!(saved.evolutions.len(), 500);
        assert_eq!(saved.timestamp, store.last_save());
    }

    /// Armazenamento que recusa toda escrita.
    struct ReadOnlyStorage;

    impl KeyValueStorage for ReadOnlyStorage {
        fn get(&self, _key: &str) -> Result<Option<String>, StorageError> {
            Ok(None)
        }

        fn set(&self, _key: &str, _value: &str) -> Result<(), StorageError> {
            Err(std::io::Error::new(std::io::ErrorKind::PermissionDenied, "somente leitura").into())
        }

        fn remove(&self, _key: &str) -> Result<(), StorageError> {
            Ok(())
        }
    }

    #[test]
    fn local_write_failure_keeps_memory_state() {
        let store = AccumulationStore::new(Arc::new(ReadOnlyStorage), None);

        let summary = store.apply(&classify_and_route(&confirmed(2)), None);
        assert_eq!(summary.evolution_total, 2);
        store.append_evolutions(&confirmed(1));
        store.append_financial(vec![FinancialRecord::from(&sample("Ana", "Atendido"))]);
        assert_eq!(store.evolutions().len(), 3);
        assert_eq!(store.financial_records().len(), 3);

        assert!(matches!(store.save(), Err(StorageError::Io(_))));
        assert_eq!(store.evolutions().len(), 3);
        assert_eq!(store.status().financial_count, 3);
    }

    #[test]
    fn collection_names() {
        assert_eq!(Collection::parse("evolucoes"), Some(Collection::Evolutions));
        assert_eq!(Collection::parse("Financeiro"), Some(Collection::Financial));
        assert_eq!(Collection::parse("agendamentos"), Some(Collection::Schedules));
        assert_eq!(Collection::parse("tudo"), None);
    }

    #[test]
    fn load_restores_saved_state() {
        let (storage, store) = memory_store();
        store.append_evolutions(&confirmed(1));
        let reloaded = AccumulationStore::load(storage, None).unwrap();
        assert_eq!(reloaded.evolutions().len(), 1);
    }

    /// Remoto em memória que avisa cada push por canal.
    struct FakeRemote {
        state: parking_lot::Mutex<Option<PersistedState>>,
        pushes: mpsc::UnboundedSender<PersistedState>,
        fail: bool,
    }

    impl RemoteBackup for FakeRemote {
        fn fetch(&self) -> BoxFuture<'_, Result<Option<PersistedState>, RemoteError>> {
            Box::pin(async move { Ok(self.state.lock().clone()) })
        }

        fn push(&self, state: PersistedState) -> BoxFuture<'_, Result<(), RemoteError>> {
            Box::pin(async move {
                let _ = self.pushes.send(state.clone());
                if self.fail {
                    return Err(RemoteError::Rejected);
                }
                *self.state.lock() = Some(state);
                Ok(())
            })
        }

        fn clear(&self) -> BoxFuture<'_, Result<(), RemoteError>> {
            Box::pin(async move {
                *self.state.lock() = None;
                Ok(())
            })
        }
    }

    fn fake_remote(fail: bool) -> (Arc<FakeRemote>, mpsc::UnboundedReceiver<PersistedState>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let remote = Arc::new(FakeRemote {
            state: parking_lot::Mutex::new(None),
            pushes: tx,
            fail,
        });
        (remote, rx)
    }

    #[tokio::test]
    async fn save_pushes_to_remote_in_background() {
        let (remote, mut pushes) = fake_remote(false);
        let store = AccumulationStore::new(Arc::new(MemoryStorage::new()), Some(remote.clone()));

        store.append_evolutions(&confirmed(1));
        let pushed = pushes.recv().await.unwrap();
        assert_eq!(pushed.evolutions.len(), 1);
    }

    #[tokio::test]
    async fn remote_failure_does_not_affect_local_state() {
        let (remote, mut pushes) = fake_remote(true);
        let storage = Arc::new(MemoryStorage::new());
        let store = AccumulationStore::new(storage.clone(), Some(remote));

        store.append_evolutions(&confirmed(2));
        pushes.recv().await.unwrap();
        assert_eq!(store.evolutions().len(), 2);
        assert!(storage.get(STATE_KEY).unwrap().is_some());
    }

    #[tokio::test]
    async fn sync_adopts_only_strictly_newer_remote() {
        let (remote, _pushes) = fake_remote(false);
        let storage = Arc::new(MemoryStorage::new());
        let local_ts = Utc::now();
        let store = AccumulationStore::with_state(
            PersistedState {
                timestamp: Some(local_ts),
                ..Default::default()
            },
            storage.clone(),
            Some(remote.clone()),
        );

        let same_age = PersistedState {
            evolutions: vec![EvolutionRecord::from_appointment(&sample("Empate", "Presença confirmada"), 1)],
            timestamp: Some(local_ts),
            ..Default::default()
        };
        *remote.state.lock() = Some(same_age);
        assert!(!store.sync_from_remote().await.unwrap());
        assert!(store.evolutions().is_empty());

        let newer = PersistedState {
            evolutions: vec![EvolutionRecord::from_appointment(&sample("Remota", "Presença confirmada"), 1)],
            timestamp: Some(local_ts + chrono::Duration::seconds(5)),
            ..Default::default()
        };
        *remote.state.lock() = Some(newer);
        assert!(store.sync_from_remote().await.unwrap());
        assert_eq!(store.evolutions()[0].patient, "Remota");

        let saved = local::read_state(storage.as_ref()).unwrap().unwrap();
        assert_eq!(saved.evolutions.len(), 1);
    }
}
