use actix_web::HttpResponse;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

static REQUEST_COUNT: AtomicU64 = AtomicU64::new(0);
static ERROR_COUNT: AtomicU64 = AtomicU64::new(0);
static WEBHOOK_CALLS: AtomicU64 = AtomicU64::new(0);
static WEBHOOK_FAILURES: AtomicU64 = AtomicU64::new(0);
static MIGRATIONS_WRITTEN: AtomicU64 = AtomicU64::new(0);

pub fn increment_request_count() {
    REQUEST_COUNT.fetch_add(1, Ordering::Relaxed);
}

pub fn increment_error_count() {
    ERROR_COUNT.fetch_add(1, Ordering::Relaxed);
}

pub fn record_webhook_call(success: bool) {
    WEBHOOK_CALLS.fetch_add(1, Ordering::Relaxed);
    if !success {
        WEBHOOK_FAILURES.fetch_add(1, Ordering::Relaxed);
    }
}

pub fn increment_migrations() {
    MIGRATIONS_WRITTEN.fetch_add(1, Ordering::Relaxed);
}

#[derive(Serialize, Deserialize, utoipa::ToSchema)]
pub struct MetricsResponse {
    pub http_requests_total: u64,
    pub http_errors_total: u64,
    pub webhook_calls_total: u64,
    pub webhook_failures_total: u64,
    pub settings_migrations_total: u64,
}

impl MetricsResponse {
    pub fn snapshot() -> Self {
        Self {
            http_requests_total: REQUEST_COUNT.load(Ordering::Relaxed),
            http_errors_total: ERROR_COUNT.load(Ordering::Relaxed),
            webhook_calls_total: WEBHOOK_CALLS.load(Ordering::Relaxed),
            webhook_failures_total: WEBHOOK_FAILURES.load(Ordering::Relaxed),
            settings_migrations_total: MIGRATIONS_WRITTEN.load(Ordering::Relaxed),
        }
    }

    pub fn to_prometheus(&self) -> String {
        let counters = [
            ("http_requests_total", "Total number of HTTP requests", self.http_requests_total),
            ("http_errors_total", "Total number of HTTP errors", self.http_errors_total),
            ("webhook_calls_total", "Chat messages sent to n8n webhooks", self.webhook_calls_total),
            ("webhook_failures_total", "Chat webhook calls that failed", self.webhook_failures_total),
            ("settings_migrations_total", "Settings records written by migration", self.settings_migrations_total),
        ];

        counters
            .iter()
            .map(|(name, help, value)| {
                format!("# HELP {name} {help}\n# TYPE {name} counter\n{name} {value}\n")
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[utoipa::path(
    get,
    path = "/metrics",
    tag = "Health",
    responses(
        (status = 200, description = "System metrics (Prometheus text format)", body = String)
    )
)]
pub async fn get_metrics() -> HttpResponse {
    HttpResponse::Ok()
        .content_type("text/plain; version=0.0.4")
        .body(MetricsResponse::snapshot().to_prometheus())
}
