use axum::extract::{Path, RawQuery, State};
use axum::http::{HeaderMap, HeaderValue};
use axum::response::IntoResponse;
use tracing::instrument;

use crate::core::handle::Options;
use crate::core::pipeline;
use crate::error::PipelineError;
use crate::metrics::{Metrics, PhaseTimer};
use crate::origin::OriginResolver;
use crate::AppState;

/// Handles `GET/HEAD /:site/*path` and its `/hips/:site/*path` legacy alias.
/// Fetches the source image from the resolved origin, runs it through the
/// transform pipeline, and returns the result with the headers callers have
/// always relied on for caching and client-side layout.
#[axum::debug_handler]
#[instrument(name = "transform", skip(state), fields(site = %site))]
pub async fn transform(State(state): State<AppState>, Path((site, path)): Path<(String, String)>, RawQuery(raw_query): RawQuery) -> impl IntoResponse {
	let result = run(&state, &site, &path, raw_query.as_deref().unwrap_or("")).await;

	match &result {
		Ok(_) => Metrics::get().record_request(&site, 200),
		Err(err) => {
			Metrics::get().record_request(&site, err_status(err));
			Metrics::get().record_error(err_kind(err));
		}
	}

	result
}

fn err_kind(err: &PipelineError) -> &'static str {
	match err {
		PipelineError::BadPath(_) => "bad_path",
		PipelineError::UnsupportedOrigin(_) => "unsupported_origin",
		PipelineError::FetchFailed(_) => "fetch_failed",
		PipelineError::DecodeFailed(_) => "decode_failed",
		PipelineError::ParseFailed(_) => "parse_failed",
		PipelineError::TransformFailed(_) => "transform_failed",
		PipelineError::MethodNotAllowed => "method_not_allowed",
		PipelineError::Internal(_) => "internal",
	}
}

fn err_status(err: &PipelineError) -> u16 {
	match err {
		PipelineError::BadPath(_) | PipelineError::UnsupportedOrigin(_) | PipelineError::DecodeFailed(_) | PipelineError::ParseFailed(_) | PipelineError::TransformFailed(_) => 400,
		PipelineError::FetchFailed(_) => 403,
		PipelineError::MethodNotAllowed => 405,
		PipelineError::Internal(_) => 500,
	}
}

async fn run(state: &AppState, site: &str, path: &str, raw_query: &str) -> Result<axum::response::Response, PipelineError> {
	if path.is_empty() || path.contains("..") {
		return Err(PipelineError::BadPath(path.to_string()));
	}

	// Browsers and upstream caches alike sometimes entity-encode `&` inside
	// an already-encoded URL; normalize both percent-encoding and that
	// substitution before handing the query to the operation parser.
	let decoded_query = urlencoding::decode(raw_query).map(|s| s.into_owned()).unwrap_or_else(|_| raw_query.to_string());
	let normalized_query = decoded_query.replace("&amp;", "&");

	let site = OriginResolver::normalize(site);
	if state.config.restrict_origins && !state.origin_resolver.is_known(site) {
		return Err(PipelineError::UnsupportedOrigin(site.to_string()));
	}
	let origin = state.origin_resolver.resolve(site);

	let data = {
		let _timer = PhaseTimer::start("fetch");
		state.fetcher.fetch(&origin, path).await.map_err(|e| PipelineError::FetchFailed(e.to_string()))?
	};

	let options = Options {
		default_quality: state.config.default_quality,
		default_density: state.config.default_density,
		bicubic_threshold: state.config.bicubic_threshold,
	};
	let face_model_path = state.config.face_model_path.clone();

	let transformed = {
		let _timer = PhaseTimer::start("transform");
		let site_owned = site.to_string();
		let path_owned = path.to_string();
		let query_owned = normalized_query.clone();
		tokio::task::spawn_blocking(move || pipeline::run(data, &site_owned, &path_owned, &query_owned, options, face_model_path.as_deref()))
			.await
			.map_err(|e| PipelineError::Internal(anyhow::anyhow!(e)))?
			.map_err(PipelineError::from)?
	};

	Metrics::get().record_output_bytes(transformed.mime.mime(), transformed.bytes.len());

	let mut headers = HeaderMap::new();
	headers.insert(axum::http::header::CONTENT_TYPE, HeaderValue::from_str(transformed.mime.mime()).unwrap());
	headers.insert(axum::http::header::CONTENT_LENGTH, HeaderValue::from(transformed.bytes.len()));
	if let Ok(v) = HeaderValue::from_str(&state.config.surrogate_control) {
		headers.insert("Surrogate-Control", v);
	}
	if let Ok(v) = HeaderValue::from_str(&state.config.cache_control) {
		headers.insert(axum::http::header::CACHE_CONTROL, v);
	}
	headers.insert("X-Image-Dimensions", HeaderValue::from_str(&format!("{}:{}", transformed.width, transformed.height)).unwrap());
	headers.insert(
		"X-Source-Image-Dimensions",
		HeaderValue::from_str(&format!("{}:{}", transformed.source_width, transformed.source_height)).unwrap(),
	);
	headers.insert("X-Animated", HeaderValue::from_static(if transformed.animated { "1" } else { "0" }));

	Ok((headers, transformed.bytes).into_response())
}
