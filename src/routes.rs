use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;

use crate::error::PipelineError;
use crate::handlers::{health, transform};
use crate::AppState;

async fn robots_txt() -> &'static str {
	"User-agent: *\nDisallow: /\n"
}

async fn favicon() -> axum::http::StatusCode {
	axum::http::StatusCode::NO_CONTENT
}

/// Runs for any method other than GET/HEAD on a transform route — the only
/// two methods this proxy accepts. Goes through `PipelineError` so the 405
/// body matches the same JSON error-array shape as every other rejection.
async fn method_not_allowed() -> impl IntoResponse {
	PipelineError::MethodNotAllowed
}

/// `/hips/:site/*path` is a legacy alias kept for callers that never moved
/// off the original mount point; it's wired to the exact same handler.
pub fn router(state: AppState) -> Router {
	Router::new()
		.route("/:site/*path", get(transform::transform).fallback(method_not_allowed))
		.route("/hips/:site/*path", get(transform::transform).fallback(method_not_allowed))
		.route("/health", get(health::health))
		.route("/metrics", get(health::metrics))
		.route("/robots.txt", get(robots_txt))
		.route("/favicon.ico", get(favicon))
		.with_state(state)
}
