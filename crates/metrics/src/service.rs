use ocr_models::OcrError;
use prometheus::{
    Counter, CounterVec, Encoder, Gauge, Histogram, HistogramOpts, Opts, Registry, TextEncoder,
};

const DURATION_BUCKETS_MS: [f64; 12] = [
    10.0, 25.0, 50.0, 100.0, 250.0, 500.0, 1000.0, 2500.0, 5000.0, 10000.0, 20000.0, 30000.0,
];

fn internal(e: impl std::fmt::Display) -> OcrError {
    OcrError::InternalError {
        reason: e.to_string(),
    }
}

pub struct MetricsService {
    registry: Registry,
    requests_total: Counter,
    errors_total: CounterVec,
    throttles_total: Counter,
    in_flight: Gauge,
    duration_ms: Histogram,
    engine_duration_ms: Histogram,
}

/// Decrements `ocr_in_flight` when dropped.
pub struct InFlightGuard {
    gauge: Gauge,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.gauge.dec();
    }
}

impl MetricsService {
    pub fn new() -> Result<Self, OcrError> {
        let registry = Registry::new();

        let requests_total = Counter::new("ocr_requests_total", "Total number of OCR requests")
            .map_err(internal)?;

        let errors_total = CounterVec::new(
            Opts::new("ocr_errors_total", "Total number of failed OCR requests"),
            &["error_type"],
        )
        .map_err(internal)?;

        let throttles_total = Counter::new(
            "ocr_throttles_total",
            "Total number of requests rejected by the client cooldown",
        )
        .map_err(internal)?;

        let in_flight = Gauge::new("ocr_in_flight", "OCR requests currently being processed")
            .map_err(internal)?;

        let duration_ms = Histogram::with_opts(
            HistogramOpts::new(
                "ocr_duration_ms",
                "End-to-end OCR request duration in milliseconds",
            )
            .buckets(DURATION_BUCKETS_MS.to_vec()),
        )
        .map_err(internal)?;

        let engine_duration_ms = Histogram::with_opts(
            HistogramOpts::new(
                "ocr_engine_duration_ms",
                "Time spent inside the OCR engine in milliseconds",
            )
            .buckets(DURATION_BUCKETS_MS.to_vec()),
        )
        .map_err(internal)?;

        registry
            .register(Box::new(requests_total.clone()))
            .map_err(internal)?;
        registry
            .register(Box::new(errors_total.clone()))
            .map_err(internal)?;
        registry
            .register(Box::new(throttles_total.clone()))
            .map_err(internal)?;
        registry
            .register(Box::new(in_flight.clone()))
            .map_err(internal)?;
        registry
            .register(Box::new(duration_ms.clone()))
            .map_err(internal)?;
        registry
            .register(Box::new(engine_duration_ms.clone()))
            .map_err(internal)?;

        Ok(Self {
            registry,
            requests_total,
            errors_total,
            throttles_total,
            in_flight,
            duration_ms,
            engine_duration_ms,
        })
    }

    pub fn record_request(&self) {
        self.requests_total.inc();
    }

    pub fn record_error(&self, error_type: &str) {
        self.errors_total.with_label_values(&[error_type]).inc();
    }

    pub fn record_throttle(&self) {
        self.throttles_total.inc();
    }

    pub fn record_duration(&self, duration_ms: f64) {
        self.duration_ms.observe(duration_ms);
    }

    pub fn record_engine_duration(&self, duration_ms: f64) {
        self.engine_duration_ms.observe(duration_ms);
    }

    pub fn track_in_flight(&self) -> InFlightGuard {
        self.in_flight.inc();
        InFlightGuard {
            gauge: self.in_flight.clone(),
        }
    }

    pub fn in_flight(&self) -> f64 {
        self.in_flight.get()
    }

    pub fn get_prometheus_metrics(&self) -> Result<String, OcrError> {
        let metric_families = self.registry.gather();
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();

        encoder
            .encode(&metric_families, &mut buffer)
            .map_err(internal)?;

        String::from_utf8(buffer).map_err(internal)
    }
}
