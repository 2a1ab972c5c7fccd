//! `/health` support: process liveness plus a best-effort check that the
//! `gifsicle` binary this proxy shells out to for GIF transforms is
//! actually on `PATH`.

use std::process::Command;
use std::time::Instant;

use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct GifsicleStatus {
	pub available: bool,
	pub version: Option<String>,
}

pub fn probe_gifsicle() -> GifsicleStatus {
	match Command::new("gifsicle").arg("--version").output() {
		Ok(output) if output.status.success() => {
			let first_line = String::from_utf8_lossy(&output.stdout).lines().next().map(str::to_string);
			GifsicleStatus { available: true, version: first_line }
		}
		_ => GifsicleStatus { available: false, version: None },
	}
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
	pub status: &'static str,
	pub version: &'static str,
	pub uptime_secs: u64,
	pub cpus: usize,
	pub gifsicle: GifsicleStatus,
}

/// Process-wide start time, used to compute `uptime_secs`.
pub fn process_start() -> Instant {
	use std::sync::OnceLock;
	static START: OnceLock<Instant> = OnceLock::new();
	*START.get_or_init(Instant::now)
}

pub fn report() -> HealthReport {
	HealthReport {
		status: "healthy",
		version: env!("CARGO_PKG_VERSION"),
		uptime_secs: process_start().elapsed().as_secs(),
		cpus: std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1),
		gifsicle: probe_gifsicle(),
	}
}
