use once_cell::sync::Lazy;
use prometheus::{register_int_counter, register_int_counter_vec, Encoder, IntCounter, IntCounterVec, TextEncoder};

// Prometheus metrics (default registry)
pub static LOGIN_ATTEMPTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "mock_auth_login_attempts_total",
        "Login attempts handled by the mock auth API, by outcome",
        &["outcome"]
    )
    .expect("register login_attempts_total")
});

pub static LOGOUTS_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "mock_auth_logouts_total",
        "Logout notifications received"
    )
    .expect("register logouts_total")
});

pub static SIGNUPS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "mock_auth_signups_total",
        "Signup requests handled by the mock auth API, by outcome",
        &["outcome"]
    )
    .expect("register signups_total")
});

pub fn encode_metrics() -> (axum::http::StatusCode, String) {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        return (
            axum::http::StatusCode::INTERNAL_SERVER_ERROR,
            format!("metrics encode error: {e}"),
        );
    }
    (
        axum::http::StatusCode::OK,
        String::from_utf8(buffer).unwrap_or_default(),
    )
}
