//! Callsign normalisation (C2): validates an arbitrary string against the
//! Eurocontrol CSS ZG00 callsign shape and produces a canonical form.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;

/// Eurocontrol CSS ZG00 shape: three letters, a digit, then either up to
/// three more digits, up to two digits + one letter, or zero/one digit + two
/// letters.
static CALLSIGN_SHAPE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([A-Z]{3})([0-9](?:[0-9]{0,3}|[0-9]{0,2}[A-Z]|[0-9]?[A-Z]{2}))$").unwrap()
});

static LEADING_ZERO: Lazy<Regex> = Lazy::new(|| Regex::new(r"^0").unwrap());

/// Policy flags controlling which suffix shapes and operators are accepted.
#[derive(Debug, Clone, Default)]
pub struct CallsignPolicy {
    /// If present, only these three-letter operator ICAOs are accepted.
    pub accepted_operators: Option<HashSet<String>>,
    pub allow_numeric_suffix: bool,
    pub allow_alphanumeric_suffix: bool,
}

impl CallsignPolicy {
    /// Default policy: no operator restriction, both suffix shapes allowed.
    pub fn permissive() -> Self {
        Self {
            accepted_operators: None,
            allow_numeric_suffix: true,
            allow_alphanumeric_suffix: true,
        }
    }
}

/// A validated, canonicalised callsign.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalCallsign {
    pub callsign: String,
    pub operator_icao: String,
    pub numeric_suffix: Option<i64>,
}

/// Validate and canonicalise a raw callsign string.
///
/// Returns `None` for anything that doesn't fit the CSS ZG00 shape, whose
/// suffix is all zeros, whose operator isn't in the accepted set, or whose
/// suffix shape is disallowed by policy.
pub fn normalize(raw: &str, policy: &CallsignPolicy) -> Option<CanonicalCallsign> {
    let trimmed = raw.trim().to_uppercase();
    let captures = CALLSIGN_SHAPE.captures(&trimmed)?;
    let operator = captures.get(1)?.as_str().to_string();
    let raw_suffix = captures.get(2)?.as_str();

    let stripped_suffix = LEADING_ZERO.replace_all(raw_suffix, "");
    let stripped_suffix = strip_all_leading_zeros(&stripped_suffix);
    if stripped_suffix.is_empty() {
        return None;
    }

    if let Some(accepted) = &policy.accepted_operators {
        if !accepted.contains(&operator) {
            return None;
        }
    }

    let is_numeric = stripped_suffix.chars().all(|c| c.is_ascii_digit());
    let numeric_suffix = if is_numeric {
        if !policy.allow_numeric_suffix {
            return None;
        }
        stripped_suffix.parse::<i64>().ok()
    } else {
        if !policy.allow_alphanumeric_suffix {
            return None;
        }
        None
    };

    let callsign = format!("{operator}{stripped_suffix}");
    Some(CanonicalCallsign {
        callsign,
        operator_icao: operator,
        numeric_suffix,
    })
}

fn strip_all_leading_zeros(s: &str) -> String {
    s.trim_start_matches('0').to_string()
}
