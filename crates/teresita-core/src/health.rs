//! Health report types for operator diagnostics.
//!
//! The probing itself lives in [`ContentLoader::health_check`](crate::ContentLoader::health_check);
//! this module holds the report and the aggregation rule.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::cache::ErrorRecord;

/// Result of probing one (content type, language) manifest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckStatus {
    /// Manifest fetched or served from a fresh cache entry
    Ok,
    /// Refresh failed; a stale manifest was served instead
    Stale,
    /// No manifest available at all
    Missing,
}

/// Aggregate status of all probes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
    /// The probe set itself did not complete
    Error,
}

impl HealthStatus {
    /// Folds per-check results: everything ok is healthy, anything usable is
    /// degraded, nothing usable is unhealthy.
    ///
    /// # Examples
    ///
    /// ```
    /// use teresita_core::health::{CheckStatus, HealthStatus};
    ///
    /// assert_eq!(HealthStatus::aggregate([CheckStatus::Ok, CheckStatus::Ok]), HealthStatus::Healthy);
    /// assert_eq!(HealthStatus::aggregate([CheckStatus::Ok, CheckStatus::Missing]), HealthStatus::Degraded);
    /// assert_eq!(HealthStatus::aggregate([CheckStatus::Missing]), HealthStatus::Unhealthy);
    /// ```
    pub fn aggregate(checks: impl IntoIterator<Item = CheckStatus>) -> Self {
        let mut any = false;
        let mut all_ok = true;
        let mut some_usable = false;

        for check in checks {
            any = true;
            match check {
                CheckStatus::Ok => some_usable = true,
                CheckStatus::Stale => {
                    all_ok = false;
                    some_usable = true;
                }
                CheckStatus::Missing => all_ok = false,
            }
        }

        if !any || !some_usable {
            HealthStatus::Unhealthy
        } else if all_ok {
            HealthStatus::Healthy
        } else {
            HealthStatus::Degraded
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            HealthStatus::Healthy => "healthy",
            HealthStatus::Degraded => "degraded",
            HealthStatus::Unhealthy => "unhealthy",
            HealthStatus::Error => "error",
        }
    }
}

/// Snapshot returned by a health check.
#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub timestamp: DateTime<Utc>,
    pub status: HealthStatus,
    /// Keyed `<type>_<lang>`, e.g. `museum_es`.
    pub checks: BTreeMap<String, CheckStatus>,
    pub errors: Vec<ErrorRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl HealthReport {
    pub fn new(checks: BTreeMap<String, CheckStatus>, errors: Vec<ErrorRecord>) -> Self {
        let status = HealthStatus::aggregate(checks.values().copied());
        Self {
            timestamp: Utc::now(),
            status,
            checks,
            errors,
            error: None,
        }
    }

    /// Report for a probe set that failed to complete.
    pub fn failed(message: impl Into<String>, errors: Vec<ErrorRecord>) -> Self {
        Self {
            timestamp: Utc::now(),
            status: HealthStatus::Error,
            checks: BTreeMap::new(),
            errors,
            error: Some(message.into()),
        }
    }

    pub fn is_healthy(&self) -> bool {
        self.status == HealthStatus::Healthy
    }
}
