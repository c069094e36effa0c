use autometrics::prometheus_exporter::{self, PrometheusResponse};
use lazy_static::lazy_static;
use prometheus::exponential_buckets;
use prometheus::HistogramVec;
use prometheus::IntCounterVec;
use prometheus::IntGauge;
use prometheus::Opts;
use prometheus::Registry;

lazy_static! {
    /// Events currently retained in the durable queue
    pub static ref QUEUE_DEPTH_METRIC: IntGauge =
        IntGauge::new("queue_depth", "Change events retained in the propagation queue")
            .expect("metric can not be created");

    /// Capture cycles by outcome (ok / backpressure / error)
    pub static ref CAPTURE_POLLS_METRIC: IntCounterVec = IntCounterVec::new(
        Opts::new("capture_polls", "Capture poll cycles against the primary, by outcome"),
        &["outcome"]
    )
    .expect("metric can not be created");

    /// Events appended to the queue, by operation
    pub static ref CAPTURED_EVENTS_METRIC: IntCounterVec = IntCounterVec::new(
        Opts::new("captured_events", "Change events captured from the primary, by operation"),
        &["op"]
    )
    .expect("metric can not be created");

    /// Events acknowledged per target, by operation
    pub static ref DELIVERED_EVENTS_METRIC: IntCounterVec = IntCounterVec::new(
        Opts::new("delivered_events", "Change events applied to a replica target, by operation"),
        &["target", "op"]
    )
    .expect("metric can not be created");

    /// Events acknowledged without a network call (allowed_ops filter)
    pub static ref FILTERED_EVENTS_METRIC: IntCounterVec = IntCounterVec::new(
        Opts::new("filtered_events", "Change events skipped by a target's allowed_ops filter"),
        &["target", "op"]
    )
    .expect("metric can not be created");

    /// Events set aside after exhausting delivery retries
    pub static ref DEAD_LETTERED_EVENTS_METRIC: IntCounterVec = IntCounterVec::new(
        Opts::new("dead_lettered_events", "Change events moved to the dead-letter tree"),
        &["target"]
    )
    .expect("metric can not be created");

    /// Wall time from capture to acknowledged delivery, per target
    pub static ref DELIVERY_LATENCY_METRIC: HistogramVec = HistogramVec::new(
        prometheus::HistogramOpts::new(
            "delivery_latency_ms",
            "Capture-to-acknowledgement latency per target in ms",
        )
        .buckets(exponential_buckets(1.0, 4.0, 10).unwrap()),
        &["target"]
    )
    .expect("metric can not be created");

    /// Failed delivery attempts and health probes, per target
    pub static ref TARGET_FAILURES_METRIC: IntCounterVec = IntCounterVec::new(
        Opts::new("target_failures", "Failed requests against a replica target, by kind"),
        &["target", "kind"]
    )
    .expect("metric can not be created");

    pub static ref REGISTRY: Registry = {
        let registry = Registry::new_custom(Some("metasync".to_string()), None)
            .expect("registry can be created");
        register_custom_metrics(&registry);
        registry
    };
}

fn register_custom_metrics(registry: &Registry) {
    registry
        .register(Box::new(QUEUE_DEPTH_METRIC.clone()))
        .expect("collector can be registered");
    registry
        .register(Box::new(CAPTURE_POLLS_METRIC.clone()))
        .expect("collector can be registered");
    registry
        .register(Box::new(CAPTURED_EVENTS_METRIC.clone()))
        .expect("collector can be registered");
    registry
        .register(Box::new(DELIVERED_EVENTS_METRIC.clone()))
        .expect("collector can be registered");
    registry
        .register(Box::new(FILTERED_EVENTS_METRIC.clone()))
        .expect("collector can be registered");
    registry
        .register(Box::new(DEAD_LETTERED_EVENTS_METRIC.clone()))
        .expect("collector can be registered");
    registry
        .register(Box::new(DELIVERY_LATENCY_METRIC.clone()))
        .expect("collector can be registered");
    registry
        .register(Box::new(TARGET_FAILURES_METRIC.clone()))
        .expect("collector can be registered");
}

/// Text exposition of the custom registry plus the autometrics collectors.
pub fn render_metrics() -> String {
    use prometheus::Encoder;
    let encoder = prometheus::TextEncoder::new();

    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&REGISTRY.gather(), &mut buffer) {
        eprintln!("could not encode custom metrics: {}", e);
    };
    let mut res = match String::from_utf8(buffer) {
        Ok(v) => v,
        Err(e) => {
            eprintln!("custom metrics could not be from_utf8'd: {}", e);
            String::default()
        }
    };

    res.push_str(&get_metrics_body());
    res
}

/// Export metrics for Prometheus to scrape
pub fn get_metrics_body() -> String {
    let autometrics_response = prometheus_exporter::encode_http_response();
    autometrics_response.into_body()
}
/// Export metrics for Prometheus to scrape
pub fn get_metrics() -> PrometheusResponse {
    prometheus_exporter::encode_http_response()
}
