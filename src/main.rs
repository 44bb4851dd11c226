#![allow(dead_code)]
#![allow(rustdoc::broken_intra_doc_links)]
//! # ZenFisio — Pipeline de Agendamentos
//!
//! **Ponto de entrada principal** do serviço.
//!
//! O operador cola a exportação de agendamentos da clínica; o pipeline
//! extrai cada agendamento, decide para onde ele vai (evoluções pendentes,
//! financeiro, faltas/comparecimentos), acumula com o histórico e calcula as
//! estatísticas consumidas pela interface.
//!
//! ## Fluxo de Inicialização
//!
//! ```text
//! main()
//!   ├── Configura tracing/logging
//!   ├── Lê AppConfig do ambiente
//!   ├── Carrega o estado local (ou inicia vazio)
//!   ├── Sync-down do backup remoto (só adota se estritamente mais novo)
//!   ├── Monta AppState e Router
//!   ├── Spawn: autosave a cada N segundos
//!   ├── Inicia servidor TCP
//!   └── Ctrl-C → para o servidor → save final
//! ```
//!
//! ## Exemplo de Uso
//!
//! ```bash
//! # Executar com logs padrão (info)
//! cargo run
//!
//! # Logs detalhados e backup remoto
//! RUST_LOG=debug ZENFISIO_REMOTE_URL=http://localhost:5000/api cargo run
//! ```

/// Módulo `core` — tipos do domínio: Appointment, registros, status, datas.
mod core;

/// Módulo `error` — taxonomia de erros tipados.
mod error;

/// Módulo `parser` — texto colado → agendamentos.
mod parser;

/// Módulo `routing` — classificação de status e fan-out para os destinos.
mod routing;

/// Módulo `store` — acumulação, persistência local/remota e backup.
mod store;

/// Módulo `analytics` — relatórios derivados das coleções.
mod analytics;

/// Módulo `orchestrator` — serviço que conecta parser, roteador e store.
mod orchestrator;

/// Módulo `config` — configuração via variáveis de ambiente.
mod config;

/// Módulo `web` — servidor axum, handlers JSON e SSE.
mod web;

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;

use crate::config::AppConfig;
use crate::store::{AccumulationStore, FileStorage, HttpRemoteBackup, KeyValueStorage, RemoteBackup};
use crate::web::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // RUST_LOG controla o nível (default: info).
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    tracing::info!("ZenFisio — Starting...");

    let config = AppConfig::from_env();
    tracing::info!(
        addr = %config.addr,
        data_dir = %config.data_dir.display(),
        remote = config.remote_url.as_deref().unwrap_or("-"),
        autosave_secs = config.autosave.as_secs(),
        "Configuração carregada"
    );

    let storage: Arc<dyn KeyValueStorage> = Arc::new(FileStorage::new(&config.data_dir));

    let remote: Option<Arc<dyn RemoteBackup>> = match config.remote_url.as_deref() {
        Some(url) => match HttpRemoteBackup::new(url) {
            Ok(client) => Some(Arc::new(client)),
            Err(e) => {
                tracing::warn!(error = %e, "Backup remoto desativado");
                None
            }
        },
        None => None,
    };

    // Estado local corrompido não impede o serviço de subir.
    let store = match AccumulationStore::load(storage.clone(), remote.clone()) {
        Ok(store) => store,
        Err(e) => {
            tracing::warn!(error = %e, "Falha ao carregar estado local, iniciando vazio");
            AccumulationStore::new(storage, remote)
        }
    };
    let store = Arc::new(store);

    match store.sync_from_remote().await {
        Ok(true) => tracing::info!("Estado remoto adotado na inicialização"),
        Ok(false) => {}
        Err(e) => tracing::warn!(error = %e, "Sync-down do backup remoto falhou"),
    }

    let state = AppState::new(store.clone());
    let app = web::create_router(state);

    // Autosave periódico. O primeiro tick do interval é imediato, então é pulado.
    let autosave_store = store.clone();
    let period = config.autosave;
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            if let Err(e) = autosave_store.save() {
                tracing::warn!(error = %e, "Autosave falhou");
            }
        }
    });

    let listener = tokio::net::TcpListener::bind(config.addr)
        .await
        .with_context(|| format!("Falha ao fazer bind em {}", config.addr))?;
    tracing::info!("Server running at http://{}", config.addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Servidor axum falhou")?;

    // Save final ao encerrar.
    match store.save() {
        Ok(ts) => tracing::info!(timestamp = %ts, "Estado salvo no encerramento"),
        Err(e) => tracing::error!(error = %e, "Falha no save final"),
    }

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Falha ao instalar handler de Ctrl-C");
        std::future::pending::<()>().await;
    }
    tracing::info!("Ctrl-C recebido, encerrando...");
}
