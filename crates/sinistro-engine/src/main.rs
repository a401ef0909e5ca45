//! Sync runner for the Sinistro monthly ledgers.
//!
//! Runs one reconciliation pass between the local month files and the
//! shared Dragonfly store, then reports open incidents that have been at
//! the workshop too long.
//!
//! # Startup Sequence
//!
//! 1. Load configuration (first argument, else `sinistro-config.yaml`)
//! 2. Initialize structured logging (tracing)
//! 3. Open the local store and connect to Dragonfly
//! 4. Reconcile
//! 5. Scan every month for overdue incidents
//!
//! Usage: `sinistro-engine [config-path]`

mod error;

use std::path::{Path, PathBuf};

use chrono::Utc;
use sinistro_ledger::overdue;
use sinistro_store::{DragonflyRemote, FileKv, LocalMonthStore, RemoteMonthStore};
use sinistro_sync::{SyncConfig, reconcile};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::error::EngineError;

const DEFAULT_CONFIG_PATH: &str = "sinistro-config.yaml";

/// Application entry point for the sync runner.
///
/// # Errors
///
/// Returns an error if configuration, either store, or the
/// reconciliation pass fails.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Load configuration.
    let config_path = std::env::args_os()
        .nth(1)
        .map_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH), PathBuf::from);
    let (config, found) = load_config(&config_path)?;

    // 2. Initialize structured logging. RUST_LOG wins over the config.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.logging.level)),
        )
        .with_target(true)
        .init();

    info!("sinistro-engine starting");
    if !found {
        info!(path = %config_path.display(), "Config file not found, using defaults");
    }
    info!(
        data_dir = %config.local.data_dir.display(),
        dragonfly_url = config.remote.dragonfly_url,
        namespace = config.remote.namespace,
        timeout_ms = config.remote.timeout_ms,
        "Configuration loaded"
    );

    run(&config).await?;
    info!("sinistro-engine finished");
    Ok(())
}

async fn run(config: &SyncConfig) -> Result<(), EngineError> {
    // 3. Open both stores.
    let mut local = LocalMonthStore::new(FileKv::open(&config.local.data_dir)?);
    let remote = RemoteMonthStore::new(DragonflyRemote::connect(&config.remote.dragonfly_url).await?)
        .with_namespace(config.remote.namespace.clone())
        .with_timeout(config.remote.timeout());

    // 4. Reconcile.
    let report = reconcile(&mut local, &remote, Utc::now()).await?;
    info!(
        run_id = %report.run_id,
        pushed = report.pushed.len(),
        pulled = report.pulled.len(),
        updated = report.updated.len(),
        malformed = report.malformed.len(),
        "Sync pass complete"
    );
    for conflict in &report.conflicts {
        info!(
            month = %conflict.key,
            winner = ?conflict.winner,
            local_saved_at = %conflict.local_saved_at,
            remote_saved_at = %conflict.remote_saved_at,
            "Conflict resolved"
        );
    }

    // 5. Overdue incidents across every month.
    let thresholds = config.ledger.thresholds()?;
    let today = Utc::now().date_naive();
    for record in local.list_all()? {
        for event in overdue::scan(&record.rows, today, &thresholds) {
            warn!(
                month = record.display_label(),
                row = event.row_index,
                plate = event.plate,
                days = event.days,
                urgency = ?event.urgency,
                "Incident overdue at workshop"
            );
        }
    }
    Ok(())
}

/// Load configuration from `path`, falling back to defaults when the
/// file does not exist.
///
/// Returns the configuration and whether the file was found.
fn load_config(path: &Path) -> Result<(SyncConfig, bool), EngineError> {
    if path.exists() {
        Ok((SyncConfig::from_file(path)?, true))
    } else {
        let mut config = SyncConfig::default();
        config.apply_env_overrides();
        Ok((config, false))
    }
}
