use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use once_cell::sync::OnceCell;
use serde::Serialize;
use tracing_subscriber::EnvFilter;

static TRACING_INIT: OnceCell<()> = OnceCell::new();

#[derive(Debug, Default)]
pub struct AppMetrics {
    runs_total: AtomicU64,
    blocked_total: AtomicU64,
    degraded_total: AtomicU64,
    fatal_total: AtomicU64,
    unknown_intent_total: AtomicU64,
    emergency_total: AtomicU64,
    advisory_calls_total: AtomicU64,
    search_fallback_total: AtomicU64,
    total_latency_millis: AtomicU64,
}

#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub runs_total: u64,
    pub blocked_total: u64,
    pub degraded_total: u64,
    pub fatal_total: u64,
    pub unknown_intent_total: u64,
    pub emergency_total: u64,
    pub advisory_calls_total: u64,
    pub search_fallback_total: u64,
    pub avg_latency_millis: f64,
}

impl AppMetrics {
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn inc_run(&self) {
        self.runs_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_blocked(&self) {
        self.blocked_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_degraded(&self) {
        self.degraded_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_fatal(&self) {
        self.fatal_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_unknown_intent(&self) {
        self.unknown_intent_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_emergency(&self) {
        self.emergency_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_advisory_call(&self) {
        self.advisory_calls_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_search_fallback(&self) {
        self.search_fallback_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn observe_latency(&self, duration: Duration) {
        self.total_latency_millis
            .fetch_add(duration.as_millis() as u64, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let runs = self.runs_total.load(Ordering::Relaxed);
        let latency = self.total_latency_millis.load(Ordering::Relaxed);

        MetricsSnapshot {
            runs_total: runs,
            blocked_total: self.blocked_total.load(Ordering::Relaxed),
            degraded_total: self.degraded_total.load(Ordering::Relaxed),
            fatal_total: self.fatal_total.load(Ordering::Relaxed),
            unknown_intent_total: self.unknown_intent_total.load(Ordering::Relaxed),
            emergency_total: self.emergency_total.load(Ordering::Relaxed),
            advisory_calls_total: self.advisory_calls_total.load(Ordering::Relaxed),
            search_fallback_total: self.search_fallback_total.load(Ordering::Relaxed),
            avg_latency_millis: if runs == 0 {
                0.0
            } else {
                latency as f64 / runs as f64
            },
        }
    }
}

/// JSON logs on stderr so stdout stays free for command output.
pub fn init_tracing(service_name: &str) {
    TRACING_INIT.get_or_init(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "{}=info,arogya_agents=info,arogya_providers=info,arogya_retrieval=warn",
                service_name
            ))
        });

        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_current_span(true)
            .with_span_list(true)
            .with_writer(std::io::stderr)
            .init();
    });
}
