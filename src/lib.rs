//! r10k webhook - 接收 Git 托管平台的 webhook，触发 r10k 部署 Puppet 环境或模块
//!
//! 库入口：`run` 负责加载配置、初始化日志、启动 HTTP 服务

pub mod api;
pub mod config;
pub mod domain;
pub mod error;
pub mod infra;
pub mod middleware;
pub mod services;
pub mod state;

pub use config::RuntimeConfig;

use anyhow::Context;
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::signal;

use crate::config::env::constants::VERSION;
use crate::config::Config;
use crate::state::AppState;

/// 启动服务，直到收到 SIGINT/SIGTERM
pub async fn run(runtime: RuntimeConfig) -> anyhow::Result<()> {
    let config_path = runtime.config_path();
    let config = Config::load(&config_path)
        .with_context(|| format!("Failed to load configuration from {}", config_path.display()))?
        .with_port(runtime.port());

    let _log_guard = infra::logging::init(config.access_logfile.as_deref())
        .context("Failed to open access log file")?;

    tracing::info!(
        version = VERSION,
        config = %config_path.display(),
        bind = %config.bind_address,
        port = config.port,
        protected = config.credentials.is_some(),
        signed = config.github_secret.is_some(),
        strategy = ?config.command.strategy,
        prefix = ?config.prefix,
        lock_file = %config.lock_file.display(),
        slack = config.slack.is_some(),
        "Starting r10k webhook"
    );

    let addr = format!("{}:{}", config.bind_address, config.port);
    let pid_file = config.pid_file.clone();
    let state = Arc::new(AppState::new(config)?);
    let app = api::router(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;
    tracing::info!(addr = %listener.local_addr()?, "Listening");

    let _pid = PidFile::create(pid_file)?;

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("Server error")?;

    tracing::info!("r10k webhook stopped");
    Ok(())
}

/// PID 文件，drop 时删除
struct PidFile {
    path: PathBuf,
}

impl PidFile {
    fn create(path: PathBuf) -> anyhow::Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        fs::write(&path, format!("{}\n", std::process::id()))
            .with_context(|| format!("Failed to write PID file {}", path.display()))?;
        Ok(Self { path })
    }

    fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for PidFile {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(self.path()) {
            tracing::warn!(path = %self.path.display(), error = %e, "Failed to remove PID file");
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
