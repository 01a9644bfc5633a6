// src/background/mod.rs
// Background workers. Currently a single loop: the SLA monitor.

pub mod sla;

use std::sync::Arc;
use tokio::sync::watch;

use crate::config::Config;
use crate::db::Database;
use crate::notify::Notifier;

pub use sla::SlaMonitor;

/// Spawn the SLA monitor.
///
/// Returns the shutdown sender; send true to stop the worker. The signal
/// is polled between scan intervals, so shutdown is cooperative rather
/// than instantaneous.
pub fn spawn(
    db: Arc<Database>,
    config: Arc<Config>,
    notifier: Arc<dyn Notifier>,
) -> watch::Sender<bool> {
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let monitor = SlaMonitor::new(db, config, notifier, shutdown_rx);
    tokio::spawn(async move {
        monitor.run().await;
    });

    shutdown_tx
}
