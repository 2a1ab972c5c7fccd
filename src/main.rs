use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use axum::error_handling::HandleErrorLayer;
use axum::http::StatusCode;
use clap::Parser;
use lensproxy::{routes, AppState, Config};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower::limit::ConcurrencyLimitLayer;
use tower::load_shed::LoadShedLayer;
use tower::timeout::TimeoutLayer;
use tower::{BoxError, ServiceBuilder};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::fmt::format::JsonFields;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::Layer;

#[tokio::main]
async fn main() -> Result<()> {
	dotenv::dotenv().ok();
	let config = Config::parse();

	init_tracing(&config);

	let config = Arc::new(config);
	let shutdown_token = CancellationToken::new();
	let app_state = AppState::build(config.clone(), shutdown_token.clone());

	let app = routes::router(app_state).layer(
		ServiceBuilder::new()
			.layer(TraceLayer::new_for_http())
			.layer(HandleErrorLayer::new(handle_tower_error))
			.layer(RequestBodyLimitLayer::new(config.max_body_bytes))
			.layer(ConcurrencyLimitLayer::new(config.concurrency_limit))
			.layer(TimeoutLayer::new(Duration::from_secs(config.request_timeout_secs)))
			.layer(LoadShedLayer::new()),
	);

	let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
	let listener = TcpListener::bind(addr).await?;
	tracing::info!(%addr, "listening");

	let signal_token = shutdown_token.clone();
	tokio::spawn(async move {
		tokio::signal::ctrl_c().await.ok();
		tracing::info!("received ctrl-c, shutting down");
		signal_token.cancel();
	});

	let server_token = shutdown_token.clone();
	axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
		.with_graceful_shutdown(async move {
			server_token.cancelled().await;
		})
		.await?;

	tracing::info!("server stopped");
	Ok(())
}

async fn handle_tower_error(error: BoxError) -> (StatusCode, &'static str) {
	if error.is::<tower::timeout::error::Elapsed>() {
		tracing::warn!("request timed out");
		(StatusCode::REQUEST_TIMEOUT, "request timed out")
	} else if error.is::<tower::load_shed::error::Overloaded>() {
		tracing::warn!("service overloaded, shedding load");
		(StatusCode::SERVICE_UNAVAILABLE, "service overloaded")
	} else {
		tracing::error!(%error, "unhandled middleware error");
		(StatusCode::INTERNAL_SERVER_ERROR, "internal error")
	}
}

fn init_tracing(config: &Config) {
	let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

	tracing_subscriber::registry()
		.with(if config.log_json {
			Box::new(
				tracing_subscriber::fmt::layer()
					.fmt_fields(JsonFields::default())
					.event_format(tracing_subscriber::fmt::format().json().flatten_event(true).with_span_list(false))
					.with_filter(filter),
			) as Box<dyn Layer<_> + Send + Sync>
		} else {
			Box::new(tracing_subscriber::fmt::layer().event_format(tracing_subscriber::fmt::format().pretty()).with_filter(filter))
		})
		.init();
}
