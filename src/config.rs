//! # Configuração
//!
//! Lida das variáveis de ambiente, com defaults:
//!
//! | Variável | Default | Significado |
//! |----------|---------|-------------|
//! | `ZENFISIO_ADDR` | `0.0.0.0:3000` | endereço HTTP |
//! | `ZENFISIO_DATA_DIR` | `data` | diretório do armazenamento local |
//! | `ZENFISIO_REMOTE_URL` | — | backup remoto (ausente = desligado) |
//! | `ZENFISIO_AUTOSAVE_SECS` | `10` | período do autosave |
//!
//! Valores inválidos caem no default com um `warn`.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use tracing::warn;

pub const DEFAULT_ADDR: &str = "0.0.0.0:3000";
pub const DEFAULT_DATA_DIR: &str = "data";
pub const DEFAULT_AUTOSAVE_SECS: u64 = 10;

#[derive(Clone, Debug, PartialEq)]
pub struct AppConfig {
    pub addr: SocketAddr,
    pub data_dir: PathBuf,
    pub remote_url: Option<String>,
    pub autosave: Duration,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            addr: default_addr(),
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            remote_url: None,
            autosave: Duration::from_secs(DEFAULT_AUTOSAVE_SECS),
        }
    }
}

fn default_addr() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 3000))
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Monta a configuração a partir de uma função de consulta (testável).
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let addr = match get("ZENFISIO_ADDR") {
            Some(raw) => raw.parse().unwrap_or_else(|_| {
                warn!(value = %raw, default = DEFAULT_ADDR, "ZENFISIO_ADDR inválido, usando default");
                default_addr()
            }),
            None => default_addr(),
        };

        let autosave_secs = match get("ZENFISIO_AUTOSAVE_SECS") {
            Some(raw) => match raw.parse::<u64>() {
                Ok(secs) if secs > 0 => secs,
                _ => {
                    warn!(
                        value = %raw,
                        default = DEFAULT_AUTOSAVE_SECS,
                        "ZENFISIO_AUTOSAVE_SECS inválido, usando default"
                    );
                    DEFAULT_AUTOSAVE_SECS
                }
            },
            None => DEFAULT_AUTOSAVE_SECS,
        };

        Self {
            addr,
            data_dir: get("ZENFISIO_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR)),
            remote_url: get("ZENFISIO_REMOTE_URL"),
            autosave: Duration::from_secs(autosave_secs),
        }
    }
}
