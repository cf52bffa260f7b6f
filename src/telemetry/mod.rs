//! Logging and decision counters.
//!
//! [`init_tracing`] installs the global `tracing` subscriber. [`Telemetry`]
//! keeps per-decision counters of an engine.

use crate::config::TelemetryConfig;
use crate::policy::DecisionType;
use crate::{Error, Result};

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing_subscriber::{fmt, EnvFilter};

/// Install a global fmt subscriber.
///
/// `RUST_LOG` takes precedence over the configured level. Fails if a global
/// subscriber is already installed.
pub fn init_tracing(config: &TelemetryConfig) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .map_err(|e| Error::config_key(e.to_string(), "telemetry.log_level"))?;

    let builder = fmt().with_env_filter(env_filter).with_target(true);
    let result = if config.json_logs {
        builder.json().try_init()
    } else {
        builder.try_init()
    };

    result.map_err(|e| Error::internal(format!("Failed to set tracing subscriber: {}", e)))
}

/// Decision counters of an engine.
#[derive(Debug)]
pub struct Telemetry {
    config: TelemetryConfig,
    permit: AtomicU64,
    deny: AtomicU64,
    not_applicable: AtomicU64,
    indeterminate: AtomicU64,
    cache_hits: AtomicU64,
    errors: AtomicU64,
    /// Total evaluation time in microseconds
    total_evaluation_time_us: AtomicU64,
}

impl Telemetry {
    /// Create counters for the given configuration.
    pub fn new(config: &TelemetryConfig) -> Self {
        Self {
            config: config.clone(),
            permit: AtomicU64::new(0),
            deny: AtomicU64::new(0),
            not_applicable: AtomicU64::new(0),
            indeterminate: AtomicU64::new(0),
            cache_hits: AtomicU64::new(0),
            errors: AtomicU64::new(0),
            total_evaluation_time_us: AtomicU64::new(0),
        }
    }

    /// Record a decision.
    pub fn record_evaluation(&self, decision: DecisionType, duration_ms: f64, cached: bool) {
        let counter = match decision {
            DecisionType::Permit => &self.permit,
            DecisionType::Deny => &self.deny,
            DecisionType::NotApplicable => &self.not_applicable,
            DecisionType::Indeterminate => &self.indeterminate,
        };
        counter.fetch_add(1, Ordering::Relaxed);

        if cached {
            self.cache_hits.fetch_add(1, Ordering::Relaxed);
        }

        let duration_us = (duration_ms * 1000.0) as u64;
        self.total_evaluation_time_us
            .fetch_add(duration_us, Ordering::Relaxed);
    }

    /// Record an error status of a decision.
    pub fn record_error(&self, error: &Error) {
        tracing::debug!(category = error.category(), "Decision carries error status");
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Snapshot of the counters.
    pub fn metrics(&self) -> TelemetryMetrics {
        let permit = self.permit.load(Ordering::Relaxed);
        let deny = self.deny.load(Ordering::Relaxed);
        let not_applicable = self.not_applicable.load(Ordering::Relaxed);
        let indeterminate = self.indeterminate.load(Ordering::Relaxed);
        let total_evaluations = permit + deny + not_applicable + indeterminate;

        let total_time_us = self.total_evaluation_time_us.load(Ordering::Relaxed);
        let avg_evaluation_time_ms = if total_evaluations > 0 {
            (total_time_us as f64 / total_evaluations as f64) / 1000.0
        } else {
            0.0
        };

        TelemetryMetrics {
            total_evaluations,
            permit,
            deny,
            not_applicable,
            indeterminate,
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            avg_evaluation_time_ms,
            errors: self.errors.load(Ordering::Relaxed),
        }
    }

    /// Check if counters are enabled.
    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    /// Get the service name.
    pub fn service_name(&self) -> &str {
        &self.config.service_name
    }
}

/// Snapshot of decision counters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryMetrics {
    /// Total number of decisions
    pub total_evaluations: u64,
    /// Permit decisions
    pub permit: u64,
    /// Deny decisions
    pub deny: u64,
    /// NotApplicable decisions
    pub not_applicable: u64,
    /// Indeterminate decisions
    pub indeterminate: u64,
    /// Decisions served from the cache
    pub cache_hits: u64,
    /// Average evaluation time in milliseconds
    pub avg_evaluation_time_ms: f64,
    /// Decisions with an error status
    pub errors: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_telemetry_creation() {
        let telemetry = Telemetry::new(&TelemetryConfig::default());
        assert!(telemetry.is_enabled());
        assert_eq!(telemetry.service_name(), "pdp-engine");
    }

    #[test]
    fn test_record_evaluation() {
        let telemetry = Telemetry::new(&TelemetryConfig::default());

        telemetry.record_evaluation(DecisionType::Permit, 5.0, false);
        telemetry.record_evaluation(DecisionType::Deny, 3.0, true);
        telemetry.record_evaluation(DecisionType::Permit, 1.0, false);
        telemetry.record_evaluation(DecisionType::Indeterminate, 3.0, false);
        telemetry.record_error(&Error::missing_value("x"));

        let metrics = telemetry.metrics();
        assert_eq!(metrics.total_evaluations, 4);
        assert_eq!(metrics.permit, 2);
        assert_eq!(metrics.deny, 1);
        assert_eq!(metrics.not_applicable, 0);
        assert_eq!(metrics.indeterminate, 1);
        assert_eq!(metrics.cache_hits, 1);
        assert_eq!(metrics.errors, 1);
        assert!((metrics.avg_evaluation_time_ms - 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_init_tracing_rejects_bad_level() {
        if std::env::var("RUST_LOG").is_ok() {
            return;
        }
        let config = TelemetryConfig {
            log_level: "pdp_engine=verbose".to_string(),
            ..Default::default()
        };
        assert!(init_tracing(&config).is_err());
    }
}
