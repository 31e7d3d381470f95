use std::time::Duration;

use crate::identity::FlagId;

/// A log sink a host application can install in place of the default
/// `tracing`-backed implementation.
pub trait Logger: Send + Sync {
    fn warn(&self, message: &str);
    fn info(&self, message: &str);
    fn debug(&self, message: &str);
}

/// The default `Logger`, forwarding to `tracing`'s global subscriber. This
/// is what a container uses unless a host overrides it via
/// `Registry::set_hooks`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingLogger;

impl Logger for TracingLogger {
    fn warn(&self, message: &str) {
        tracing::warn!("{message}");
    }

    fn info(&self, message: &str) {
        tracing::info!("{message}");
    }

    fn debug(&self, message: &str) {
        tracing::debug!("{message}");
    }
}

/// One evaluation outcome, reported after the decision is made. `duration`
/// covers the full evaluate call, including bucketing.
#[derive(Debug, Clone)]
pub struct EvaluationMetric {
    pub flag_id: FlagId,
    pub container_id: String,
    pub decision_kind: &'static str,
    pub platform: Option<String>,
    pub duration: Duration,
}

/// Reported once per successful `Registry::load`.
#[derive(Debug, Clone)]
pub struct ConfigLoadEvent {
    pub container_id: String,
    pub flag_count: usize,
    pub generation: u64,
    pub duration: Duration,
}

/// Reported once per `Registry::rollback` attempt, successful or not.
#[derive(Debug, Clone)]
pub struct ConfigRollbackEvent {
    pub container_id: String,
    pub steps: usize,
    pub succeeded: bool,
}

/// A metrics sink a host application can install in place of the default
/// `metrics`-facade implementation. All three events carry no borrowed
/// data, so an implementation may queue them for off-thread emission.
pub trait MetricsCollector: Send + Sync {
    fn record_evaluation(&self, event: EvaluationMetric);
    fn record_config_load(&self, event: ConfigLoadEvent);
    fn record_config_rollback(&self, event: ConfigRollbackEvent);
}

/// The default `MetricsCollector`, emitting through the `metrics` facade.
/// Installing an actual recorder (Prometheus, statsd, ...) is the host's
/// responsibility; this crate only ever calls the facade macros.
#[derive(Debug, Default, Clone, Copy)]
pub struct FacadeMetricsCollector;

impl MetricsCollector for FacadeMetricsCollector {
    fn record_evaluation(&self, event: EvaluationMetric) {
        metrics::counter!(
            "konditional_evaluations_total",
            "container" => event.container_id,
            "decision" => event.decision_kind,
        )
        .increment(1);
        metrics::histogram!(
            "konditional_evaluation_duration_seconds",
            "decision" => event.decision_kind,
        )
        .record(event.duration.as_secs_f64());
    }

    fn record_config_load(&self, event: ConfigLoadEvent) {
        metrics::counter!("konditional_config_loads_total", "container" => event.container_id.clone()).increment(1);
        metrics::gauge!("konditional_config_flag_count", "container" => event.container_id).set(event.flag_count as f64);
        metrics::histogram!("konditional_config_load_duration_seconds").record(event.duration.as_secs_f64());
    }

    fn record_config_rollback(&self, event: ConfigRollbackEvent) {
        metrics::counter!(
            "konditional_config_rollbacks_total",
            "container" => event.container_id,
            "succeeded" => event.succeeded.to_string(),
        )
        .increment(1);
    }
}

/// Bundles the two hook surfaces a container dispatches through. Both
/// default to the crate's own `tracing`/`metrics` implementations; a host
/// overrides either independently via `Registry::set_hooks`.
#[derive(Clone)]
pub struct Hooks {
    pub logger: std::sync::Arc<dyn Logger>,
    pub metrics: std::sync::Arc<dyn MetricsCollector>,
}

impl Default for Hooks {
    fn default() -> Self {
        Hooks {
            logger: std::sync::Arc::new(TracingLogger),
            metrics: std::sync::Arc::new(FacadeMetricsCollector),
        }
    }
}

impl std::fmt::Debug for Hooks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Hooks").finish_non_exhaustive()
    }
}
