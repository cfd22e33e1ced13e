use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing_subscriber::EnvFilter;

mod config;
mod dbus_interface;
mod engine;
mod extractor;

use config::Config;
use dbus_interface::ReceptionService;

const BUS_NAME: &str = "org.autoclient.Reception1";
const OBJECT_PATH: &str = "/org/autoclient/Reception1";

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    tracing::info!("receptiond starting");
    let config = Config::from_env();

    if let Some(parent) = config.db_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating data directory {}", parent.display()))?;
    }

    let store = reception_store::Store::open(&config.db_path)
        .with_context(|| format!("opening database {}", config.db_path.display()))?;
    tracing::info!(path = %config.db_path.display(), "database opened");

    if config.seed_catalog {
        let inserted = reception_store::seed_catalog(&store)?;
        if inserted > 0 {
            tracing::info!(inserted, "seeded sample catalog");
        }
    }

    // Fail fast: the daemon is useless without the embedding model.
    let onnx = extractor::OnnxExtractor::load(&config.model_path)
        .with_context(|| format!("loading model {}", config.model_path.display()))?;
    let engine = engine::spawn_engine(Box::new(onnx));

    let service = ReceptionService::new(
        engine,
        Arc::new(Mutex::new(store)),
        config.tolerance,
        config.top_k,
    );

    let builder = if config.system_bus {
        zbus::connection::Builder::system()?
    } else {
        zbus::connection::Builder::session()?
    };
    let _conn = builder
        .name(BUS_NAME)?
        .serve_at(OBJECT_PATH, service)?
        .build()
        .await
        .context("registering on the bus")?;

    tracing::info!(
        bus = BUS_NAME,
        tolerance = config.tolerance,
        top_k = config.top_k,
        "receptiond ready"
    );

    tokio::signal::ctrl_c().await?;
    tracing::info!("receptiond shutting down");

    Ok(())
}
