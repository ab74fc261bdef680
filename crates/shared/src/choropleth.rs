//! Severity bucketing for the borough map.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Green,
    Yellow,
    Orange,
    Red,
    DarkRed,
}

const BANDS: [(f64, Severity); 4] = [
    (0.04, Severity::DarkRed),
    (0.03, Severity::Red),
    (0.02, Severity::Orange),
    (0.01, Severity::Yellow),
];

impl Severity {
    pub fn hex(self) -> &'static str {
        match self {
            Severity::Green => "#2e8b57",
            Severity::Yellow => "#f2d024",
            Severity::Orange => "#f28c28",
            Severity::Red => "#d7301f",
            Severity::DarkRed => "#7f0000",
        }
    }
}

/// Bands are half-open: `[0.01, 0.02)` is yellow, so a share of exactly
/// `0.02` is orange.
pub fn severity_for_share(share: f64) -> Severity {
    if !share.is_finite() {
        return if share == f64::INFINITY {
            Severity::DarkRed
        } else {
            Severity::Green
        };
    }

    BANDS
        .iter()
        .find(|(lower, _)| share >= *lower)
        .map(|(_, severity)| *severity)
        .unwrap_or(Severity::Green)
}

/// Zero when the period total is zero or negative.
pub fn death_share(deaths: i64, period_total: i64) -> f64 {
    if period_total <= 0 {
        return 0.0;
    }
    deaths.max(0) as f64 / period_total as f64
}

pub fn colour_for(deaths: i64, period_total: i64) -> Severity {
    severity_for_share(death_share(deaths, period_total))
}

#[cfg(test)]
#[path = "tests/choropleth_tests.rs"]
mod tests;
