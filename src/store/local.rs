//! # Armazenamento Local — Chave/Valor Durável
//!
//! O store enxerga o armazenamento local como um mapa `chave → string`
//! síncrono ([`KeyValueStorage`]). Duas implementações:
//!
//! | Implementação | Uso | Onde fica |
//! |---------------|-----|-----------|
//! | [`FileStorage`] | produção | um arquivo `<chave>.json` por chave em `data/` |
//! | [`MemoryStorage`] | testes | `HashMap` em memória |
//!
//! O estado completo fica sob a chave [`STATE_KEY`].
//!
//! ## ⚠️ Atomicidade
//!
//! [`FileStorage::set()`] escreve num arquivo temporário de nome único e
//! renomeia, então um crash no meio da escrita deixa o arquivo anterior
//! intacto e escritas simultâneas nunca renomeiam o temporário uma da outra.

use std::collections::HashMap;
use std::path::PathBuf;

use anyhow::Context;
use parking_lot::RwLock;
use uuid::Uuid;

use crate::error::StorageError;
use crate::store::state::PersistedState;

/// Chave do estado completo no armazenamento local.
pub const STATE_KEY: &str = "zenfisio_data";

/// Armazenamento chave/valor síncrono.
pub trait KeyValueStorage: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// Um arquivo JSON por chave dentro de um diretório.
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl KeyValueStorage for FileStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let path = self.path_for(key);
        match std::fs::read_to_string(&path) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.path_for(key);
        // Nome único por escrita: dois saves nunca dividem o mesmo temporário.
        let tmp = self.dir.join(format!("{key}.{}.tmp", Uuid::new_v4().simple()));
        std::fs::write(&tmp, value)?;
        if let Err(e) = std::fs::rename(&tmp, &path) {
            let _ = std::fs::remove_file(&tmp);
            return Err(e.into());
        }
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        match std::fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Armazenamento em memória.
#[derive(Default)]
pub struct MemoryStorage {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStorage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries.read().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.entries.write().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.entries.write().remove(key);
        Ok(())
    }
}

/// Salva o estado como JSON pretty-printed sob [`STATE_KEY`].
pub fn write_state(storage: &dyn KeyValueStorage, state: &PersistedState) -> Result<(), StorageError> {
    let json = serde_json::to_string_pretty(state)?;
    storage.set(STATE_KEY, &json)
}

/// Carrega o estado, ou `None` se nunca foi salvo.
///
/// Coleções ausentes viram vazias; grupos de agendamento são normalizados.
pub fn read_state(storage: &dyn KeyValueStorage) -> anyhow::Result<Option<PersistedState>> {
    let Some(json) = storage
        .get(STATE_KEY)
        .context("Falha ao ler o estado do armazenamento local")?
    else {
        tracing::info!("Nenhum estado salvo em {}, iniciando vazio", STATE_KEY);
        return Ok(None);
    };
    let state: PersistedState =
        serde_json::from_str(&json).context("Falha ao desserializar o estado salvo")?;
    Ok(Some(state.normalize()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{EvolutionRecord, appointment::sample};

    #[test]
    fn file_storage_roundtrip_and_remove() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path().join("data"));

        assert_eq!(storage.get("k").unwrap(), None);
        storage.set("k", "{\"a\":1}").unwrap();
        assert_eq!(storage.get("k").unwrap().as_deref(), Some("{\"a\":1}"));
        assert!(dir.path().join("data/k.json").exists());

        storage.remove("k").unwrap();
        storage.remove("k").unwrap();
        assert_eq!(storage.get("k").unwrap(), None);
    }

    #[test]
    fn concurrent_writes_leave_one_complete_file() {
        let dir = tempfile::tempdir().unwrap();
        let storage = std::sync::Arc::new(FileStorage::new(dir.path()));

        let handles: Vec<_> = (0..8)
            .map(|t| {
                let storage = storage.clone();
                std::thread::spawn(move || {
                    for i in 0..20 {
                        let value = format!("{{\"writer\":{t},\"seq\":{i},\"pad\":\"{}\"}}", "x".repeat(4096));
                        storage.set("k", &value).unwrap();
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        let content = storage.get("k").unwrap().unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&content).unwrap();
        assert_eq!(parsed["seq"], 19);
        let leftovers = std::fs::read_dir(dir.path())
            .unwrap()
            .filter(|e| e.as_ref().unwrap().path().extension().is_some_and(|x| x == "tmp"))
            .count();
        assert_eq!(leftovers, 0);
    }

    #[test]
    fn state_survives_write_and_read() {
        let storage = MemoryStorage::new();
        assert!(read_state(&storage).unwrap().is_none());

        let state = PersistedState {
            evolutions: vec![EvolutionRecord::from_appointment(&sample("Maria", "Presença confirmada"), 1)],
            ..Default::default()
        };
        write_state(&storage, &state).unwrap();
        assert_eq!(read_state(&storage).unwrap(), Some(state));
    }

    #[test]
    fn corrupted_state_is_an_error() {
        let storage = MemoryStorage::new();
        storage.set(STATE_KEY, "{ nope").unwrap();
        assert!(read_state(&storage).is_err());
    }
}
