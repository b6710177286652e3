//! Hermes G2P service - main entry point
//!
//! Wires configuration, the pronunciation dictionary, the G2P engine
//! adapter, and the MQTT transport into a running service, then waits for
//! a shutdown signal.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use g2p_common::config::Config;
use g2p_hermes::backend::{G2pBackend, PhonetisaurusBackend, UnconfiguredBackend};
use g2p_hermes::dictionary::PronunciationDictionary;
use g2p_hermes::handler::RequestHandler;
use g2p_hermes::service::G2pService;
use g2p_hermes::transport;

/// Command-line arguments for g2p-hermes
#[derive(Parser, Debug)]
#[command(name = "g2p-hermes")]
#[command(about = "Hermes MQTT grapheme-to-phoneme service")]
#[command(version)]
struct Args {
    /// Path to the TOML configuration file
    #[arg(short, long, env = "G2P_CONFIG")]
    config: Option<PathBuf>,

    /// MQTT broker host
    #[arg(long, env = "G2P_MQTT_HOST")]
    mqtt_host: Option<String>,

    /// MQTT broker port
    #[arg(long, env = "G2P_MQTT_PORT")]
    mqtt_port: Option<u16>,

    /// Trained G2P model file
    #[arg(long, env = "G2P_MODEL")]
    model: Option<PathBuf>,

    /// Pronunciation dictionary file (repeatable)
    #[arg(long = "dictionary")]
    dictionaries: Vec<PathBuf>,

    /// Restrict the service to these site ids (repeatable; default all)
    #[arg(long = "site-id")]
    site_ids: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "g2p_hermes=debug,g2p_common=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    let mut config =
        Config::load(args.config.as_deref()).context("Failed to load configuration")?;

    // Command-line/environment overrides take priority over the file.
    if let Some(host) = args.mqtt_host {
        config.mqtt.host = host;
    }
    if let Some(port) = args.mqtt_port {
        config.mqtt.port = port;
    }
    if let Some(model) = args.model {
        config.backend.model = Some(model);
    }
    if !args.dictionaries.is_empty() {
        config.service.dictionaries = args.dictionaries;
    }
    if !args.site_ids.is_empty() {
        config.service.site_ids = args.site_ids;
    }

    config.validate().context("Invalid configuration")?;

    info!(
        mqtt_host = %config.mqtt.host,
        mqtt_port = config.mqtt.port,
        "Starting Hermes G2P service"
    );

    let mut dictionary = PronunciationDictionary::new();
    for path in &config.service.dictionaries {
        match dictionary.load_file(path) {
            Ok(added) => {
                info!(path = %path.display(), pronunciations = added, "Loaded dictionary");
            }
            Err(error) => {
                warn!(path = %path.display(), %error, "Failed to load dictionary, skipping");
            }
        }
    }

    let backend: Arc<dyn G2pBackend> = match &config.backend.model {
        Some(model) => {
            let backend = PhonetisaurusBackend::new(
                config.backend.binary.clone(),
                model.clone(),
                config.backend.max_concurrent_calls,
            );
            if let Err(error) = backend.check_available().await {
                warn!(%error, "G2P engine probe failed, requests will error until repaired");
            } else {
                info!(model = %model.display(), "G2P engine ready");
            }
            Arc::new(backend)
        }
        None => {
            warn!("No G2P model configured, guessing disabled");
            Arc::new(UnconfiguredBackend)
        }
    };

    let handler = Arc::new(RequestHandler::new(
        backend,
        Arc::new(dictionary),
        config.per_word_timeout(),
        config.request_timeout(),
    ));

    let (publisher, events) = transport::connect(&config.mqtt);
    let service = G2pService::new(
        handler,
        Arc::new(publisher),
        config.service.site_ids.clone(),
    );

    tokio::select! {
        _ = service.run(events) => {}
        _ = shutdown_signal() => {
            info!("Shutting down");
        }
    }

    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
