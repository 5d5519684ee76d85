//! Typed configuration (§2.1, §6): every tunable parameter as a field of a
//! single `Config` struct, built from `clap` defaults and overridable by
//! flag, environment variable (`ROUTEBIND_` prefix), or an optional TOML
//! file — mirroring the reference codebase's layered `dotenvy` + `clap`
//! composition.

use clap::Parser;
use serde::Deserialize;
use std::path::PathBuf;

/// Command-line / environment configuration for the `routebind` binary.
#[derive(Debug, Clone, Parser)]
#[command(name = "routebind", about = "Binds verified callsigns to scheduled flights.")]
pub struct Cli {
    /// Optional TOML config file overlaying these defaults.
    #[arg(long, env = "ROUTEBIND_CONFIG_FILE")]
    pub config_file: Option<PathBuf>,

    /// Path to the airports reference CSV.
    #[arg(long, env = "ROUTEBIND_AIRPORTS_CSV")]
    pub airports_csv: Option<PathBuf>,

    /// Path to the airlines reference CSV.
    #[arg(long, env = "ROUTEBIND_AIRLINES_CSV")]
    pub airlines_csv: Option<PathBuf>,

    /// Position-feed poll period, in seconds.
    #[arg(long, env = "ROUTEBIND_POLL_PERIOD_SECONDS", default_value_t = 45)]
    pub poll_period_seconds: u64,

    /// Matcher cycle period, in seconds.
    #[arg(long, env = "ROUTEBIND_MATCH_PERIOD_SECONDS", default_value_t = 45)]
    pub match_period_seconds: u64,

    /// Maximum age of position data before it is considered stale, seconds.
    #[arg(long, env = "ROUTEBIND_MAX_POSITION_AGE_SECONDS", default_value_t = 60)]
    pub max_position_age_seconds: u64,

    /// Flight-level cap above which an observation is rejected.
    #[arg(long, env = "ROUTEBIND_FLIGHT_LEVEL_CAP", default_value_t = 600)]
    pub flight_level_cap: i32,

    /// Seconds after which a verified binding is considered outdated and
    /// eligible for replacement by a lower-tier candidate.
    #[arg(long, env = "ROUTEBIND_OUTDATED_SECONDS", default_value_t = 3 * 3600)]
    pub outdated_seconds: i64,

    /// Minimum tier considered "recently bound" and excluded from search.
    #[arg(long, env = "ROUTEBIND_MIN_RECENT_TIER", default_value_t = 1)]
    pub min_recent_tier: u8,

    /// Window, in hours, for the recent-callsigns exclusion set.
    #[arg(long, env = "ROUTEBIND_RECENT_CALLSIGNS_WINDOW_HOURS", default_value_t = 48)]
    pub recent_callsigns_window_hours: i64,

    /// Candidate-set time-to-live, in hours.
    #[arg(long, env = "ROUTEBIND_CANDIDATE_TTL_HOURS", default_value_t = 24)]
    pub candidate_ttl_hours: i64,

    /// Install the Prometheus metrics exporter on this address (host:port).
    /// When absent, metrics calls are no-ops.
    #[arg(long, env = "ROUTEBIND_METRICS_ADDR")]
    pub metrics_addr: Option<String>,
}

/// The subset of `Cli` fields an optional TOML file may override. Only
/// fields present in the file take effect; `clap`-supplied values and
/// defaults remain otherwise.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct FileOverlay {
    pub airports_csv: Option<PathBuf>,
    pub airlines_csv: Option<PathBuf>,
    pub poll_period_seconds: Option<u64>,
    pub match_period_seconds: Option<u64>,
    pub max_position_age_seconds: Option<u64>,
    pub flight_level_cap: Option<i32>,
    pub outdated_seconds: Option<i64>,
    pub min_recent_tier: Option<u8>,
    pub recent_callsigns_window_hours: Option<i64>,
    pub candidate_ttl_hours: Option<i64>,
    pub metrics_addr: Option<String>,
}

impl Cli {
    /// Parses CLI args/env, then overlays an optional TOML file (flags and
    /// env still win over file values already present, since clap already
    /// resolved them — the file only fills in fields clap left at their
    /// built-in default and the user didn't otherwise set).
    pub fn load() -> anyhow::Result<Self> {
        use anyhow::Context;

        let mut cli = Self::parse();
        if let Some(path) = cli.config_file.clone() {
            let contents = std::fs::read_to_string(&path)
                .with_context(|| format!("reading config file {path:?}"))?;
            let overlay: FileOverlay =
                toml::from_str(&contents).with_context(|| format!("parsing config file {path:?}"))?;
            cli.apply_overlay(overlay);
        }
        Ok(cli)
    }

    fn apply_overlay(&mut self, overlay: FileOverlay) {
        if self.airports_csv.is_none() {
            self.airports_csv = overlay.airports_csv;
        }
        if self.airlines_csv.is_none() {
            self.airlines_csv = overlay.airlines_csv;
        }
        if let Some(v) = overlay.poll_period_seconds {
            self.poll_period_seconds = v;
        }
        if let Some(v) = overlay.match_period_seconds {
            self.match_period_seconds = v;
        }
        if let Some(v) = overlay.max_position_age_seconds {
            self.max_position_age_seconds = v;
        }
        if let Some(v) = overlay.flight_level_cap {
            self.flight_level_cap = v;
        }
        if let Some(v) = overlay.outdated_seconds {
            self.outdated_seconds = v;
        }
        if let Some(v) = overlay.min_recent_tier {
            self.min_recent_tier = v;
        }
        if let Some(v) = overlay.recent_callsigns_window_hours {
            self.recent_callsigns_window_hours = v;
        }
        if let Some(v) = overlay.candidate_ttl_hours {
            self.candidate_ttl_hours = v;
        }
        if self.metrics_addr.is_none() {
            self.metrics_addr = overlay.metrics_addr;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_constants() {
        let cli = Cli::parse_from(["routebind"]);
        assert_eq!(cli.poll_period_seconds, 45);
        assert_eq!(cli.flight_level_cap, 600);
        assert_eq!(cli.min_recent_tier, 1);
        assert_eq!(cli.recent_callsigns_window_hours, 48);
        assert_eq!(cli.candidate_ttl_hours, 24);
    }

    #[test]
    fn overlay_fills_in_unset_scalar_fields() {
        let mut cli = Cli::parse_from(["routebind"]);
        cli.apply_overlay(FileOverlay {
            poll_period_seconds: Some(30),
            ..Default::default()
        });
        assert_eq!(cli.poll_period_seconds, 30);
        assert_eq!(cli.flight_level_cap, 600);
    }
}
