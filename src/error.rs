use axum::body::Body;
use axum::http::{Response, StatusCode};
use axum::response::IntoResponse;
use axum::Json;

/// One variant per error kind the pipeline can surface to a caller. Every
/// variant carries enough of the original message to reproduce it verbatim
/// in the response body.
#[derive(thiserror::Error, Debug)]
pub enum PipelineError {
	#[error("Invalid path [{0}]")]
	BadPath(String),

	#[error("Invalid site [{0}].")]
	UnsupportedOrigin(String),

	#[error("{0}")]
	FetchFailed(String),

	#[error("{0}")]
	DecodeFailed(String),

	#[error("{0}")]
	ParseFailed(String),

	#[error("{0}")]
	TransformFailed(String),

	#[error("method not allowed")]
	MethodNotAllowed,

	#[error("internal error: {0}")]
	Internal(#[from] anyhow::Error),
}

impl PipelineError {
	const fn status_code(&self) -> StatusCode {
		match self {
			Self::BadPath(_) => StatusCode::BAD_REQUEST,
			Self::UnsupportedOrigin(_) => StatusCode::BAD_REQUEST,
			Self::FetchFailed(_) => StatusCode::FORBIDDEN,
			Self::DecodeFailed(_) => StatusCode::BAD_REQUEST,
			Self::ParseFailed(_) => StatusCode::BAD_REQUEST,
			Self::TransformFailed(_) => StatusCode::BAD_REQUEST,
			Self::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
			Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
		}
	}
}

impl IntoResponse for PipelineError {
	fn into_response(self) -> Response<Body> {
		if matches!(self, Self::Internal(_)) {
			tracing::error!(error = %self, "unhandled pipeline error");
			return (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response();
		}

		// Matches the shape the proxy's callers have always gotten: a JSON
		// body whose `data` field is a one-element array holding the
		// message, code mirrored at top level.
		#[derive(serde::Serialize)]
		struct ErrorBody {
			code: u16,
			data: [String; 1],
		}

		let status = self.status_code();
		let body = ErrorBody { code: status.as_u16(), data: [self.to_string()] };
		(status, Json(body)).into_response()
	}
}
