use anyhow::{Context, Result};
use async_trait::async_trait;
use routebind::adapters::{SourceAdapter, StaticRouteOracle, StaticSourceAdapter, StaticTranslationTable};
use routebind::candidate::CandidateStore;
use routebind::config::Cli;
use routebind::log_format::TargetFirstFormat;
use routebind::matcher::MatcherConfig;
use routebind::observation::{RawAircraftState, RegistrationTable, ValidationPolicy};
use routebind::reference::{AirlineRef, AirportRef, ReferenceDirectory};
use routebind::route::RouteCheckConfig;
use routebind::schedule::ScheduledFlight;
use routebind::store::VerifiedRouteStore;
use routebind::worker::position_feed::PositionProvider;
use routebind::worker::{self, matcher_loop, position_feed};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, Instrument};
use tracing_subscriber::EnvFilter;

/// A position provider with no upstream configured, used when the binary
/// is run without a real position-feed client wired in. Production
/// deployments implement `PositionProvider` against the cross-process
/// key/value transport described in §6, which is out of scope here.
struct NoopPositionProvider;

#[async_trait]
impl PositionProvider for NoopPositionProvider {
    async fn poll(&self) -> Result<Vec<RawAircraftState>> {
        Ok(Vec::new())
    }
}

fn install_tracing() {
    let filter = EnvFilter::try_from_env("ROUTEBIND_LOG").unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .event_format(TargetFirstFormat)
        .init();
}

fn install_metrics(addr: Option<&str>) -> Result<()> {
    let Some(addr) = addr else {
        return Ok(());
    };
    let socket_addr: std::net::SocketAddr = addr
        .parse()
        .with_context(|| format!("parsing metrics address {addr:?}"))?;
    metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(socket_addr)
        .install()
        .context("installing Prometheus metrics exporter")?;
    info!("metrics exporter listening on {addr}");
    Ok(())
}

fn demo_reference_directory() -> ReferenceDirectory {
    let airports = vec![
        AirportRef {
            icao: "EDDF".into(),
            iata: Some("FRA".into()),
            name: "Frankfurt am Main".into(),
            latitude: 50.0333,
            longitude: 8.5706,
            country: "DE".into(),
            timezone: "Europe/Berlin".into(),
        },
        AirportRef {
            icao: "EGLL".into(),
            iata: Some("LHR".into()),
            name: "London Heathrow".into(),
            latitude: 51.4706,
            longitude: -0.4619,
            country: "GB".into(),
            timezone: "Europe/London".into(),
        },
    ];
    let airlines = vec![AirlineRef {
        icao: "DLH".into(),
        iata: "LH".into(),
        name: "Lufthansa".into(),
    }];
    ReferenceDirectory::new(airports, airlines)
}

fn demo_flight() -> ScheduledFlight {
    ScheduledFlight {
        id: "demo-1".into(),
        operator_iata: "LH".into(),
        operator_icao: "DLH".into(),
        flight_number: 400,
        route: routebind::route::Route::parse("EDDF-EGLL").unwrap(),
        departure: Some(chrono::Utc::now() - chrono::Duration::minutes(5)),
        arrival: Some(chrono::Utc::now() + chrono::Duration::hours(1)),
        status: None,
        cancelled: false,
        diverted: false,
        redundant: false,
        overlap: false,
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    install_tracing();

    let cli = Cli::load()?;
    install_metrics(cli.metrics_addr.as_deref())?;

    let reference = Arc::new(match (&cli.airports_csv, &cli.airlines_csv) {
        (Some(airports), Some(airlines)) => ReferenceDirectory::load_from_csv(airports, airlines)
            .context("loading reference directory from CSV")?,
        _ => {
            info!("no reference CSVs configured, using the built-in demo directory");
            demo_reference_directory()
        }
    });

    let demo_source: Arc<dyn SourceAdapter> =
        Arc::new(StaticSourceAdapter::new("demo", vec![demo_flight()]));
    let sources = vec![demo_source];
    let translation = Arc::new(StaticTranslationTable::default());
    let oracle = Arc::new(StaticRouteOracle::default());

    let snapshot = position_feed::empty_snapshot();
    let candidates = Arc::new(CandidateStore::with_ttl(chrono::Duration::hours(
        cli.candidate_ttl_hours,
    )));
    let store = Arc::new(VerifiedRouteStore::new(chrono::Duration::seconds(
        cli.outdated_seconds,
    )));

    let matcher_config = MatcherConfig {
        min_recent_tier: cli.min_recent_tier,
        recent_callsigns_window_hours: cli.recent_callsigns_window_hours,
        ..MatcherConfig::default()
    };

    let (shutdown_tx, shutdown_rx) = worker::shutdown_channel();

    let position_handle = tokio::spawn(
        position_feed::run(
            Arc::new(NoopPositionProvider),
            Arc::new(RegistrationTable::default()),
            ValidationPolicy {
                max_flight_level: cli.flight_level_cap,
                ..ValidationPolicy::default()
            },
            snapshot.clone(),
            Duration::from_secs(cli.poll_period_seconds),
            shutdown_rx.clone(),
        )
        .instrument(tracing::info_span!("position_feed")),
    );

    let matcher_handle = tokio::spawn(
        matcher_loop::run(
            reference,
            sources,
            translation,
            oracle,
            snapshot,
            candidates,
            store,
            RouteCheckConfig::default(),
            matcher_config,
            Duration::from_secs(cli.match_period_seconds),
            chrono::Duration::seconds(cli.max_position_age_seconds as i64),
            shutdown_rx,
        )
        .instrument(tracing::info_span!("matcher")),
    );

    info!("routebind running, press Ctrl+C to stop");
    tokio::signal::ctrl_c().await.context("listening for ctrl_c")?;
    info!("shutdown signal received, stopping workers");
    shutdown_tx.send(true).ok();

    let _ = tokio::join!(position_handle, matcher_handle);
    info!("shutdown complete");
    Ok(())
}
