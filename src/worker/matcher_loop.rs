//! Matcher worker (§5.3): on each cycle, reads the latest snapshot and the
//! active subset from each source adapter, runs C7, writes to C8, and
//! sleeps so the cycle lasts `max(0, period - work)`. A snapshot older
//! than `max_position_age` is treated as missing: the cycle is skipped
//! rather than matched against stale positions.

use crate::adapters::{RouteOracle, SourceAdapter, TranslationTable};
use crate::candidate::CandidateStore;
use crate::matcher::{self, MatcherConfig};
use crate::reference::ReferenceDirectory;
use crate::route::RouteCheckConfig;
use crate::store::VerifiedRouteStore;
use crate::worker::position_feed::SharedSnapshot;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Runs the matcher worker loop until `shutdown` fires.
#[allow(clippy::too_many_arguments)]
pub async fn run(
    reference: Arc<ReferenceDirectory>,
    sources: Vec<Arc<dyn SourceAdapter>>,
    translation: Arc<dyn TranslationTable>,
    oracle: Arc<dyn RouteOracle>,
    snapshot: SharedSnapshot,
    candidates: Arc<CandidateStore>,
    store: Arc<VerifiedRouteStore>,
    route_config: RouteCheckConfig,
    matcher_config: MatcherConfig,
    period: Duration,
    max_position_age: chrono::Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    info!("matcher worker started");
    loop {
        if *shutdown.borrow() {
            break;
        }
        let cycle_start = std::time::Instant::now();
        let t = Utc::now();
        let current_snapshot = snapshot.read().unwrap().clone();

        let snapshot_age = t.signed_duration_since(current_snapshot.states_time);
        if snapshot_age > max_position_age {
            warn!(age_seconds = snapshot_age.num_seconds(), "position snapshot is stale, skipping matcher cycle");
            metrics::counter!("matcher.stale_snapshot_total").increment(1);
            if !super::sleep_or_shutdown(period, &mut shutdown).await {
                break;
            }
            continue;
        }

        for source in &sources {
            match source.get_active_flights(t).await {
                Ok(flights) => {
                    let ambiguous = matcher::run_cycle(
                        &reference,
                        &route_config,
                        &matcher_config,
                        &current_snapshot,
                        &candidates,
                        &store,
                        translation.as_ref(),
                        oracle.as_ref(),
                        source.source_label(),
                        &flights,
                        t,
                    )
                    .await;
                    for diagnostic in &ambiguous {
                        debug!(
                            operator = %diagnostic.operator_iata,
                            flight_number = diagnostic.flight_number,
                            route = %diagnostic.route,
                            "ambiguous match, leaving unbound"
                        );
                    }
                }
                Err(err) => {
                    warn!(
                        source = source.source_label(),
                        "failed to fetch active flights: {err:#}"
                    );
                    metrics::counter!("matcher.source_errors_total").increment(1);
                }
            }
        }

        candidates.sweep();
        metrics::histogram!("matcher.cycle_duration_ms")
            .record(cycle_start.elapsed().as_millis() as f64);

        let elapsed = cycle_start.elapsed();
        let remaining = period.saturating_sub(elapsed);
        if !super::sleep_or_shutdown(remaining, &mut shutdown).await {
            break;
        }
    }
    info!("matcher worker stopped");
}
