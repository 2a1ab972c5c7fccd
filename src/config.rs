//! Process configuration: CLI flags backed by environment variables (via
//! `clap`'s `env` feature), with a `.env` file loaded first by `dotenv`.
//! Grounded on the original service's flag set (`port`, `surrogate-control`,
//! `cache-control`, `default-quality`, `bicubic-threshold`, throttle knobs).

use std::collections::HashMap;

use clap::Parser;

#[derive(Debug, Clone, Parser)]
#[command(name = "lensproxy", about = "HTTP image-transformation proxy")]
pub struct Config {
	/// Port to listen on.
	#[arg(long, env = "PORT", default_value_t = 6116)]
	pub port: u16,

	/// Surrogate-Control header value sent with every transformed image.
	#[arg(long, env = "SURROGATE_CONTROL", default_value = "max-age=31536000")]
	pub surrogate_control: String,

	/// Cache-Control header value sent with every transformed image.
	#[arg(long, env = "CACHE_CONTROL", default_value = "max-age=31536000")]
	pub cache_control: String,

	/// Default output-quality (1-100) applied when a request doesn't set one.
	#[arg(long, env = "DEFAULT_QUALITY", default_value_t = 95)]
	pub default_quality: i64,

	/// Default pixel density (1 or 2) applied when a request doesn't set one.
	#[arg(long, env = "DEFAULT_DENSITY", default_value_t = 1)]
	pub default_density: i64,

	/// Resize target widths at or below this threshold use a bicubic-style
	/// filter (CatmullRom); above it, bilinear.
	#[arg(long, env = "BICUBIC_THRESHOLD", default_value_t = 300)]
	pub bicubic_threshold: i64,

	/// Maximum concurrent in-flight pipelines before the load-shed layer
	/// starts rejecting requests with 503.
	#[arg(long, env = "CONCURRENCY_LIMIT", default_value_t = 64)]
	pub concurrency_limit: usize,

	/// Per-request timeout, in seconds.
	#[arg(long, env = "REQUEST_TIMEOUT_SECS", default_value_t = 30)]
	pub request_timeout_secs: u64,

	/// Maximum accepted request body size, in bytes (relevant to any
	/// future ingestion surface; transform requests carry no body).
	#[arg(long, env = "MAX_BODY_BYTES", default_value_t = 1_048_576)]
	pub max_body_bytes: usize,

	/// If set, `/health` requires this token as a `?token=` query parameter.
	#[arg(long, env = "HEALTHCHECK_TOKEN")]
	pub healthcheck_token: Option<String>,

	/// When true, the origin resolver rejects any site key it doesn't
	/// recognise with `UnsupportedOrigin` instead of treating it as a
	/// literal hostname.
	#[arg(long, env = "RESTRICT_ORIGINS", default_value_t = false)]
	pub restrict_origins: bool,

	/// Use HTTPS when contacting resolved origins.
	#[arg(long, env = "USE_SSL", default_value_t = false)]
	pub use_ssl: bool,

	/// `site=host` pairs, comma separated, seeding the origin map (e.g.
	/// `cosmopolitan=amv-prod-cos.s3.amazonaws.com,delish=amv-prod-del.s3.amazonaws.com`).
	/// A production deployment's full CDN/S3 mapping is operational data,
	/// not something this proxy hardcodes.
	#[arg(long, env = "ORIGIN_MAP", value_delimiter = ',', default_value = "")]
	pub origin_map: Vec<String>,

	/// Path to a `rustface`-compatible face-detection model, used to
	/// augment smart-crop auto-positioning. Auto-positioning still works
	/// without one — it just skips the face-detection boost.
	#[arg(long, env = "FACE_MODEL_PATH")]
	pub face_model_path: Option<String>,

	/// Log as JSON instead of human-readable text.
	#[arg(long, env = "LOG_JSON", default_value_t = false)]
	pub log_json: bool,
}

impl Config {
	pub fn origin_map(&self) -> HashMap<String, String> {
		self.origin_map
			.iter()
			.filter_map(|entry| entry.split_once('='))
			.map(|(site, host)| (site.to_string(), host.to_string()))
			.collect()
	}
}
