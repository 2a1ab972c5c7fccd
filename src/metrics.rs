//! Process metrics, exposed at `/metrics` in Prometheus text format.
//!
//! This mirrors the shape of the original service's OpenTelemetry-backed
//! `Metrics`/`OperationTimer` pair, but talks directly to `prometheus`
//! instead: this proxy runs as a single small service with no OTLP
//! collector assumed to exist downstream, so the simpler direct-scrape
//! model is the right fit.

use std::sync::OnceLock;
use std::time::Instant;

use prometheus::{Encoder, HistogramVec, IntCounterVec, Registry, TextEncoder};

pub struct Metrics {
	pub registry: Registry,
	pub requests_total: IntCounterVec,
	pub pipeline_errors_total: IntCounterVec,
	pub phase_duration_seconds: HistogramVec,
	pub output_bytes: HistogramVec,
}

impl Metrics {
	fn new() -> Self {
		let registry = Registry::new();

		let requests_total = IntCounterVec::new(
			prometheus::Opts::new("pipeline_requests_total", "Total transform requests by origin and status"),
			&["origin", "status"],
		)
		.expect("metric registration");

		let pipeline_errors_total =
			IntCounterVec::new(prometheus::Opts::new("pipeline_errors_total", "Total pipeline errors by kind"), &["kind"]).expect("metric registration");

		let phase_duration_seconds = HistogramVec::new(
			prometheus::HistogramOpts::new("pipeline_duration_seconds", "Pipeline phase duration in seconds"),
			&["phase"],
		)
		.expect("metric registration");

		let output_bytes =
			HistogramVec::new(prometheus::HistogramOpts::new("transform_output_bytes", "Transformed output size in bytes"), &["mime"])
				.expect("metric registration");

		registry.register(Box::new(requests_total.clone())).expect("metric registration");
		registry.register(Box::new(pipeline_errors_total.clone())).expect("metric registration");
		registry.register(Box::new(phase_duration_seconds.clone())).expect("metric registration");
		registry.register(Box::new(output_bytes.clone())).expect("metric registration");

		Self { registry, requests_total, pipeline_errors_total, phase_duration_seconds, output_bytes }
	}

	pub fn get() -> &'static Self {
		static INSTANCE: OnceLock<Metrics> = OnceLock::new();
		INSTANCE.get_or_init(Self::new)
	}

	pub fn record_request(&self, origin: &str, status: u16) {
		self.requests_total.with_label_values(&[origin, &status.to_string()]).inc();
	}

	pub fn record_error(&self, kind: &str) {
		self.pipeline_errors_total.with_label_values(&[kind]).inc();
	}

	pub fn record_output_bytes(&self, mime: &str, bytes: usize) {
		self.output_bytes.with_label_values(&[mime]).observe(bytes as f64);
	}

	pub fn encode(&self) -> Vec<u8> {
		let metric_families = self.registry.gather();
		let mut buffer = Vec::new();
		TextEncoder::new().encode(&metric_families, &mut buffer).expect("prometheus encoding");
		buffer
	}
}

/// Records a phase's wall-clock duration when dropped — the same
/// RAII-timer shape the original metrics stack used for its
/// `OperationTimer`, adapted to a plain `Instant` instead of a tracing
/// span guard.
pub struct PhaseTimer {
	start: Instant,
	phase: &'static str,
}

impl PhaseTimer {
	pub fn start(phase: &'static str) -> Self {
		Self { start: Instant::now(), phase }
	}
}

impl Drop for PhaseTimer {
	fn drop(&mut self) {
		let elapsed = self.start.elapsed().as_secs_f64();
		Metrics::get().phase_duration_seconds.with_label_values(&[self.phase]).observe(elapsed);
	}
}
