mod config;
mod handlers;
mod state;

use std::net::SocketAddr;
use std::process;
use std::sync::Arc;

use clap::Parser;
use tracing::{Level, error, info, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::Directive;

use sabnzbd_exporter_core::client::SabnzbdClient;
use sabnzbd_exporter_core::exporter::{ExporterOptions, SabnzbdExporter};

use config::{Args, Config};
use state::{APP_NAME, AppState};

const LOG_TARGETS: [&str; 2] = ["sabnzbd_exporter", "sabnzbd_exporter_core"];

// ============================================================
// Main
// ============================================================

fn main() {
    let dotenv = dotenvy::dotenv();
    let args = Args::parse();

    let config = match Config::load(&args) {
        Ok(config) => config,
        Err(e) => {
            init_logging(Level::INFO);
            error!(error = %e, "failed to load configuration");
            process::exit(1);
        }
    };

    init_logging(config.log_level);
    match dotenv {
        Ok(path) => info!(path = %path.display(), "loaded .env file"),
        Err(e) if e.not_found() => {}
        Err(e) => warn!(error = %e, "failed to load .env file"),
    }

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!(error = %e, "failed to build tokio runtime");
            process::exit(1);
        }
    };

    if let Err(e) = runtime.block_on(async_main(config)) {
        error!(error = %e, "exporter stopped");
        process::exit(1);
    }
}

async fn async_main(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    let client = SabnzbdClient::new(&config.base_url, &config.api_key, config.timeout)?;
    let api_url = client.api_url().clone();
    let options = ExporterOptions {
        app_name: APP_NAME.to_string(),
        version: sabnzbd_exporter_core::VERSION.to_string(),
        base_url: config.base_url.clone(),
        process_collector: config.process_collector,
    };
    let exporter = SabnzbdExporter::new(client, &options)?;
    let app = handlers::router(Arc::new(AppState { exporter }));

    let addr = SocketAddr::from(([0, 0, 0, 0], config.listen_port));
    let listener = tokio::net::TcpListener::bind(addr).await?;

    info!(
        version = sabnzbd_exporter_core::VERSION,
        %addr,
        api_url = %api_url,
        process_collector = config.process_collector,
        timeout_secs = config.timeout.as_secs(),
        "starting sabnzbd-exporter"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("server stopped");
    Ok(())
}

/// Initializes the tracing subscriber at `level`. `RUST_LOG` directives are
/// applied on top.
fn init_logging(level: Level) {
    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    tracing_subscriber::fmt()
        .with_env_filter(log_filter(level, rust_log.as_deref()))
        .with_target(false)
        .init();
}

/// Builds the filter: the exporter's own targets at `level`, then every
/// directive from `rust_log`. A directive for the same target replaces the
/// earlier one.
fn log_filter(level: Level, rust_log: Option<&str>) -> EnvFilter {
    let mut filter = EnvFilter::default();
    for target in LOG_TARGETS {
        if let Ok(directive) = format!("{}={}", target, level).parse() {
            filter = filter.add_directive(directive);
        }
    }
    for raw in rust_log.unwrap_or_default().split(',') {
        let raw = raw.trim();
        if raw.is_empty() {
            continue;
        }
        if let Ok(directive) = raw.parse::<Directive>() {
            filter = filter.add_directive(directive);
        }
    }
    filter
}

/// Resolves on SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "failed to listen for ctrl-c");
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
                error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("received shutdown signal");
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_subscriber::filter::LevelFilter;

    #[test]
    fn filter_uses_configured_level() {
        let filter = log_filter(Level::INFO, None);
        assert_eq!(filter.max_level_hint(), Some(LevelFilter::INFO));
    }

    #[test]
    fn rust_log_raises_exporter_target() {
        let filter = log_filter(Level::INFO, Some("sabnzbd_exporter_core=trace"));
        assert_eq!(filter.max_level_hint(), Some(LevelFilter::TRACE));
    }

    #[test]
    fn rust_log_replaces_exporter_targets() {
        let filter = log_filter(
            Level::DEBUG,
            Some("sabnzbd_exporter=warn, sabnzbd_exporter_core=warn"),
        );
        let directives = filter.to_string().to_lowercase();
        assert!(directives.contains("sabnzbd_exporter=warn"), "{}", directives);
        assert!(!directives.contains("sabnzbd_exporter=debug"), "{}", directives);
        assert!(!directives.contains("sabnzbd_exporter_core=debug"), "{}", directives);
    }

    #[test]
    fn invalid_rust_log_directive_is_skipped() {
        let filter = log_filter(Level::ERROR, Some("sabnzbd_exporter=notalevel"));
        assert_eq!(filter.max_level_hint(), Some(LevelFilter::ERROR));
    }
}
