//! Position-feed worker (§5.1): repeatedly polls the external position
//! provider, validates every state via C3, and publishes an atomic
//! snapshot.

use crate::observation::{PositionSnapshot, RawAircraftState, RegistrationTable, ValidationPolicy};
use async_trait::async_trait;
use chrono::Utc;
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tokio::sync::watch;
use tracing::{info, warn};

/// The external position provider this worker polls. A real client would
/// read from a cross-process key/value transport; that client is out of
/// scope here.
#[async_trait]
pub trait PositionProvider: Send + Sync {
    async fn poll(&self) -> anyhow::Result<Vec<RawAircraftState>>;
}

/// Shared handle to the latest published snapshot, read-mostly with rare
/// full-value replacement.
pub type SharedSnapshot = Arc<RwLock<Arc<PositionSnapshot>>>;

pub fn empty_snapshot() -> SharedSnapshot {
    Arc::new(RwLock::new(Arc::new(PositionSnapshot::default())))
}

/// Runs the position-feed worker loop until `shutdown` fires.
pub async fn run(
    provider: Arc<dyn PositionProvider>,
    registrations: Arc<RegistrationTable>,
    policy: ValidationPolicy,
    snapshot: SharedSnapshot,
    poll_period: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    info!("position-feed worker started");
    loop {
        if *shutdown.borrow() {
            break;
        }
        let cycle_start = std::time::Instant::now();
        match provider.poll().await {
            Ok(raw_states) => {
                let mut positions = std::collections::HashMap::new();
                for raw in &raw_states {
                    if let Some(observation) =
                        crate::observation::validate(raw, &policy, &registrations)
                    {
                        positions.insert(observation.callsign.clone(), observation);
                    }
                }
                let published = PositionSnapshot::new(positions, Utc::now());
                metrics::gauge!("position_feed.snapshot_size").set(published.positions.len() as f64);
                *snapshot.write().unwrap() = Arc::new(published);
            }
            Err(err) => {
                warn!("position feed poll failed: {err:#}; backing off");
                metrics::counter!("position_feed.poll_errors_total").increment(1);
            }
        }
        metrics::histogram!("position_feed.cycle_duration_ms")
            .record(cycle_start.elapsed().as_millis() as f64);

        if !super::sleep_or_shutdown(poll_period, &mut shutdown).await {
            break;
        }
    }
    info!("position-feed worker stopped");
}
