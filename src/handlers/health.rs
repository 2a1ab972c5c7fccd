use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json};
use serde::Deserialize;
use tracing::instrument;

use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct HealthQuery {
	token: Option<String>,
}

#[axum::debug_handler]
#[instrument(name = "health", skip(state))]
pub async fn health(State(state): State<AppState>, Query(query): Query<HealthQuery>) -> impl IntoResponse {
	if let Some(expected) = &state.config.healthcheck_token {
		if query.token.as_deref() != Some(expected.as_str()) {
			return (StatusCode::UNAUTHORIZED, "unauthorized").into_response();
		}
	}

	(StatusCode::OK, Json(crate::health::report())).into_response()
}

#[axum::debug_handler]
pub async fn metrics() -> impl IntoResponse {
	let body = crate::metrics::Metrics::get().encode();
	([("content-type", "text/plain; version=0.0.4")], body)
}
