use std::collections::HashMap;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

pub mod config;
pub mod core;
pub mod error;
pub mod fetch;
pub mod handlers;
pub mod health;
pub mod metrics;
pub mod origin;
pub mod routes;

pub use config::Config;
pub use fetch::{Fetcher, ReqwestFetcher};
pub use origin::OriginResolver;

/// Everything a request handler needs: static configuration, the origin
/// table, the upstream fetcher, and the cancellation token graceful
/// shutdown watches. One explicit struct, built once at startup.
#[derive(Clone)]
pub struct AppState {
	pub config: Arc<Config>,
	pub origin_resolver: Arc<OriginResolver>,
	pub fetcher: Arc<dyn Fetcher>,
	pub cancel_token: CancellationToken,
}

impl AppState {
	pub fn build(config: Arc<Config>, cancel_token: CancellationToken) -> Self {
		let known: HashMap<String, String> = config.origin_map();
		let origin_resolver = Arc::new(OriginResolver::new(known, config.use_ssl));
		let fetcher: Arc<dyn Fetcher> = Arc::new(ReqwestFetcher::new());

		Self { config, origin_resolver, fetcher, cancel_token }
	}
}
