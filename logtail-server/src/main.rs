//! Deployment log server - start synthetic deployments and tail their logs.

mod error;
mod routes;
mod state;
mod stream;

use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, bail};
use clap::Parser;
use logtail::deploy::Deployer;
use logtail::io::config::{LogtailConfig, ServerConfig, load_config, write_config};
use logtail::io::storage::LogStore;
use tokio::sync::oneshot;
use tracing::{info, warn};

use crate::state::AppState;

#[derive(Parser)]
#[command(name = "logtail-server")]
#[command(about = "Start synthetic deployments and stream their logs")]
struct Args {
    /// Path to the TOML config file (defaults apply if it does not exist)
    #[arg(long, default_value = "logtail.toml")]
    config: PathBuf,

    /// Address to bind the server to
    #[arg(long)]
    bind: Option<String>,

    /// Port to listen on
    #[arg(long)]
    port: Option<u16>,

    /// Directory holding deployment logs
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Records written per deployment
    #[arg(long)]
    records: Option<u32>,

    /// Write the effective configuration to the config path and exit
    #[arg(long)]
    write_default_config: bool,
}

/// Apply command-line overrides on top of the file configuration.
fn apply_overrides(mut cfg: LogtailConfig, args: &Args) -> anyhow::Result<LogtailConfig> {
    if let Some(bind) = &args.bind {
        cfg.server.bind = bind.clone();
    }
    if let Some(port) = args.port {
        cfg.server.port = port;
    }
    if let Some(data_dir) = &args.data_dir {
        cfg.data_dir = data_dir.clone();
    }
    if let Some(records) = args.records {
        cfg.record_count = records;
    }
    cfg.validate()?;
    Ok(cfg)
}

/// Write `cfg` as a starter config file. Never replaces an existing file.
fn write_starter_config(path: &Path, cfg: &LogtailConfig) -> anyhow::Result<()> {
    if path.exists() {
        bail!("config file {} already exists", path.display());
    }
    write_config(path, cfg).with_context(|| format!("write starter config {}", path.display()))?;
    info!(path = %path.display(), "wrote starter config");
    Ok(())
}

/// Socket address for the listener; accepts IPv4 and IPv6 bind addresses.
fn bind_addr(server: &ServerConfig) -> anyhow::Result<SocketAddr> {
    let ip: IpAddr = server
        .bind
        .parse()
        .with_context(|| format!("invalid bind address {}", server.bind))?;
    Ok(SocketAddr::from((ip, server.port)))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logtail::logging::init();

    let args = Args::parse();
    let cfg = load_config(&args.config)?;
    let cfg = apply_overrides(cfg, &args)?;
    if args.write_default_config {
        return write_starter_config(&args.config, &cfg);
    }

    let store = LogStore::new(&cfg.data_dir);
    store.ensure_dir().context("prepare data directory")?;
    info!(
        data_dir = %cfg.data_dir.display(),
        records = cfg.record_count,
        "starting logtail-server"
    );

    let deployer = Deployer::new(store, cfg.producer_settings(), cfg.tail_settings());
    let app = routes::router(AppState::new(deployer)?);

    let addr = bind_addr(&cfg.server)?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("bind {addr}"))?;
    info!(addr = %addr, "listening");

    let (signalled_tx, signalled_rx) = oneshot::channel();
    let mut server = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                shutdown_signal().await;
                let _ = signalled_tx.send(());
            })
            .await
    });

    tokio::select! {
        result = &mut server => {
            result??;
            return Ok(());
        }
        Ok(()) = signalled_rx => {}
    }

    // Open log streams keep connections alive, so bound the wait.
    let grace = Duration::from_secs(cfg.server.shutdown_grace_secs);
    info!(grace_secs = grace.as_secs(), "shutting down server");
    match tokio::time::timeout(grace, &mut server).await {
        Ok(result) => result??,
        Err(_) => {
            warn!("in-flight requests still open after grace period, forcing shutdown");
            server.abort();
        }
    }

    info!("server exiting");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
    info!("shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(extra: &[&str]) -> Args {
        let mut argv = vec!["logtail-server"];
        argv.extend_from_slice(extra);
        Args::parse_from(argv)
    }

    #[test]
    fn no_flags_keep_file_config() {
        let cfg = apply_overrides(LogtailConfig::default(), &args(&[])).expect("apply");
        assert_eq!(cfg, LogtailConfig::default());
    }

    #[test]
    fn flags_override_file_config() {
        let cfg = apply_overrides(
            LogtailConfig::default(),
            &args(&["--port", "9090", "--data-dir", "/tmp/logs", "--records", "3"]),
        )
        .expect("apply");
        assert_eq!(cfg.server.port, 9090);
        assert_eq!(cfg.data_dir, PathBuf::from("/tmp/logs"));
        assert_eq!(cfg.record_count, 3);
        assert_eq!(cfg.server.bind, "127.0.0.1");
    }

    #[test]
    fn starter_config_is_written_with_overrides_and_loads_back() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("logtail.toml");
        let args = args(&["--write-default-config", "--records", "7"]);
        assert!(args.write_default_config);

        let cfg = apply_overrides(load_config(&path).expect("defaults"), &args).expect("apply");
        write_starter_config(&path, &cfg).expect("write");

        let loaded = load_config(&path).expect("load");
        assert_eq!(loaded.record_count, 7);
        assert_eq!(loaded, cfg);
    }

    #[test]
    fn starter_config_never_overwrites() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("logtail.toml");
        std::fs::write(&path, "record_count = 2\n").expect("write existing");

        let err = write_starter_config(&path, &LogtailConfig::default()).expect_err("exists");
        assert!(err.to_string().contains("already exists"));
        assert_eq!(
            std::fs::read_to_string(&path).expect("read"),
            "record_count = 2\n"
        );
    }

    #[test]
    fn bind_addr_accepts_ipv4_and_ipv6() {
        let mut server = ServerConfig::default();
        assert_eq!(
            bind_addr(&server).expect("ipv4"),
            "127.0.0.1:8080".parse::<SocketAddr>().expect("addr")
        );

        server.bind = "::1".to_string();
        server.port = 9000;
        assert_eq!(
            bind_addr(&server).expect("ipv6"),
            "[::1]:9000".parse::<SocketAddr>().expect("addr")
        );

        server.bind = "localhost".to_string();
        assert!(bind_addr(&server).is_err());
    }

    #[test]
    fn invalid_override_is_rejected() {
        let err = apply_overrides(LogtailConfig::default(), &args(&["--records", "0"]))
            .expect_err("zero records");
        assert!(err.to_string().contains("record_count"));
    }
}
