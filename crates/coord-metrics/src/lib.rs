//! Prometheus metrics backing the `MetricsSink` port: the three named
//! instruments the admission pipeline emits into (spec §4.5).

use std::sync::OnceLock;
use std::time::Duration;

use coordinator_core::MetricsSink;
use prometheus::{CounterVec, HistogramOpts, HistogramVec, Opts, Registry};

static REGISTRY: OnceLock<Registry> = OnceLock::new();

/// `coordination.timer`: wall-clock duration of each `submit` call, tagged
/// by outcome and (on failure) failure class.
static COORDINATION_TIMER: OnceLock<HistogramVec> = OnceLock::new();

/// `submit.setJobEnvironment.timer`: duration of stage 7, tagged likewise.
static SET_JOB_ENVIRONMENT_TIMER: OnceLock<HistogramVec> = OnceLock::new();

/// `submit.rejected.jobs-limit.counter`: incremented once per
/// `UserLimitExceeded` outcome, tagged by user and limit.
static REJECTED_JOBS_LIMIT_COUNTER: OnceLock<CounterVec> = OnceLock::new();

fn registry() -> &'static Registry {
    REGISTRY.get_or_init(|| {
        let r = Registry::new();
        register_metrics(&r);
        r
    })
}

fn register_metrics(registry: &Registry) {
    let coordination = HistogramVec::new(
        HistogramOpts::new("coordination_timer_seconds", "Duration of each submit call")
            .buckets(vec![0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0]),
        &["outcome", "failure_class"],
    )
    .expect("failed to create coordination_timer metric");
    registry
        .register(Box::new(coordination.clone()))
        .expect("failed to register coordination_timer");
    COORDINATION_TIMER.set(coordination).ok();

    let set_job_environment = HistogramVec::new(
        HistogramOpts::new(
            "submit_set_job_environment_timer_seconds",
            "Duration of the runtime-binding stage of submit",
        )
        .buckets(vec![0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0]),
        &["outcome", "failure_class"],
    )
    .expect("failed to create submit_set_job_environment_timer metric");
    registry
        .register(Box::new(set_job_environment.clone()))
        .expect("failed to register submit_set_job_environment_timer");
    SET_JOB_ENVIRONMENT_TIMER.set(set_job_environment).ok();

    let rejected = CounterVec::new(
        Opts::new(
            "submit_rejected_jobs_limit_total",
            "Number of submissions rejected for exceeding the per-user active-jobs limit",
        ),
        &["user", "limit"],
    )
    .expect("failed to create submit_rejected_jobs_limit_counter metric");
    registry
        .register(Box::new(rejected.clone()))
        .expect("failed to register submit_rejected_jobs_limit_counter");
    REJECTED_JOBS_LIMIT_COUNTER.set(rejected).ok();
}

/// `MetricsSink` implementation backed by the process-global Prometheus
/// registry. Stateless: every instance shares the same static registry, so
/// constructing more than one is harmless but pointless.
#[derive(Default)]
pub struct PrometheusMetricsSink;

impl PrometheusMetricsSink {
    pub fn new() -> Self {
        registry();
        Self
    }
}

impl MetricsSink for PrometheusMetricsSink {
    fn record_submit(&self, duration: Duration, outcome: &str, failure_class: Option<&str>) {
        if let Some(histogram) = COORDINATION_TIMER.get() {
            histogram
                .with_label_values(&[outcome, failure_class.unwrap_or("")])
                .observe(duration.as_secs_f64());
        }
    }

    fn record_set_job_environment(
        &self,
        duration: Duration,
        outcome: &str,
        failure_class: Option<&str>,
    ) {
        if let Some(histogram) = SET_JOB_ENVIRONMENT_TIMER.get() {
            histogram
                .with_label_values(&[outcome, failure_class.unwrap_or("")])
                .observe(duration.as_secs_f64());
        }
    }

    fn record_user_limit_rejected(&self, user: &str, limit: u64) {
        if let Some(counter) = REJECTED_JOBS_LIMIT_COUNTER.get() {
            counter.with_label_values(&[user, &limit.to_string()]).inc();
        }
    }
}

/// Metrics in Prometheus text exposition format, for an embedding HTTP
/// server to scrape without the core needing to know about HTTP.
pub fn metrics_text() -> String {
    use prometheus::{Encoder, TextEncoder};

    let encoder = TextEncoder::new();
    let metric_families = registry().gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer).unwrap();
    String::from_utf8(buffer).unwrap()
}
