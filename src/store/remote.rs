//! # Backup Remoto
//!
//! Serviço chave/valor HTTP que guarda uma cópia do estado:
//!
//! | Método | Caminho | Corpo | Resposta |
//! |--------|---------|-------|----------|
//! | GET | `/state` | | `{ success, state, timestamp }` |
//! | POST | `/state` | `{ state }` | `{ success }` |
//! | POST | `/state/clear` | | `{ success }` |
//!
//! Toda falha aqui é não-fatal: o store registra um `warn` e segue com o
//! estado local, que é a fonte de verdade.

use std::time::Duration;

use futures_util::future::BoxFuture;
use serde::{Deserialize, Serialize};

use crate::error::RemoteError;
use crate::store::state::PersistedState;

/// Backup remoto do estado.
pub trait RemoteBackup: Send + Sync {
    /// Estado remoto atual, `None` se o remoto está vazio.
    fn fetch(&self) -> BoxFuture<'_, Result<Option<PersistedState>, RemoteError>>;
    /// Substitui o estado remoto.
    fn push(&self, state: PersistedState) -> BoxFuture<'_, Result<(), RemoteError>>;
    /// Apaga o estado remoto.
    fn clear(&self) -> BoxFuture<'_, Result<(), RemoteError>>;
}

#[derive(Deserialize)]
struct StateReply {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    state: Option<PersistedState>,
}

#[derive(Deserialize)]
struct AckReply {
    #[serde(default)]
    success: bool,
}

#[derive(Serialize)]
struct PushBody<'a> {
    state: &'a PersistedState,
}

/// Cliente HTTP do backup remoto.
pub struct HttpRemoteBackup {
    client: reqwest::Client,
    base_url: String,
}

impl HttpRemoteBackup {
    pub fn new(base_url: impl Into<String>) -> Result<Self, RemoteError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn fetch_state(&self) -> Result<Option<PersistedState>, RemoteError> {
        let resp = self.client.get(self.url("/state")).send().await?;
        if !resp.status().is_success() {
            return Err(RemoteError::Status(resp.status().as_u16()));
        }
        let reply: StateReply = resp.json().await?;
        if !reply.success {
            return Err(RemoteError::Rejected);
        }
        Ok(reply.state.map(PersistedState::normalize))
    }

    async fn post(&self, path: &str, body: Option<PushBody<'_>>) -> Result<(), RemoteError> {
        let mut req = self.client.post(self.url(path));
        if let Some(body) = body {
            req = req.json(&body);
        }
        let resp = req.send().await?;
        if !resp.status().is_success() {
            return Err(RemoteError::Status(resp.status().as_u16()));
        }
        let reply: AckReply = resp.json().await?;
        if reply.success {
            Ok(())
        } else {
            Err(RemoteError::Rejected)
        }
    }
}

impl RemoteBackup for HttpRemoteBackup {
    fn fetch(&self) -> BoxFuture<'_, Result<Option<PersistedState>, RemoteError>> {
        Box::pin(self.fetch_state())
    }

    fn push(&self, state: PersistedState) -> BoxFuture<'_, Result<(), RemoteError>> {
        Box::pin(async move { self.post("/state", Some(PushBody { state: &state })).await })
    }

    fn clear(&self) -> BoxFuture<'_, Result<(), RemoteError>> {
        Box::pin(self.post("/state/clear", None))
    }
}
