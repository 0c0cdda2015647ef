use once_cell::sync::Lazy;
use prometheus::{register_int_counter_vec, register_int_gauge, IntCounterVec, IntGauge};

// Poll outcomes
static POLLS: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "traefik_dashboard_polls_total",
        "Number of Traefik API polls by result",
        &["result"]
    )
    .unwrap()
});

// Size of the published snapshot
static ROUTERS: Lazy<IntGauge> = Lazy::new(|| {
    register_int_gauge!(
        "traefik_dashboard_routers",
        "Number of routers in the current snapshot"
    )
    .unwrap()
});

static HEALTH_CHECKS: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "traefik_dashboard_health_checks_total",
        "Number of health checks by result",
        &["result"]
    )
    .unwrap()
});

pub fn record_poll_success(routers: usize) {
    POLLS.with_label_values(&["success"]).inc();
    ROUTERS.set(routers as i64);
}

pub fn record_poll_failure() {
    POLLS.with_label_values(&["failure"]).inc();
}

pub fn record_health_check(healthy: bool) {
    let result = if healthy { "healthy" } else { "unhealthy" };
    HEALTH_CHECKS.with_label_values(&[result]).inc();
}
