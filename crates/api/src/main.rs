use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::Instrument;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use farecast_core::domain::price::PriceResponse;
use farecast_core::domain::trip::TripQueryPayload;
use farecast_core::quote::{QuoteError, QuoteService};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = farecast_core::config::Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer())
        .init();

    let quotes = match QuoteService::from_settings(&settings) {
        Ok(quotes) => quotes,
        Err(e) => {
            sentry_anyhow::capture_anyhow(&e);
            tracing::error!(error = %e, "failed to configure quote service");
            return Err(e);
        }
    };

    tracing::info!(
        provider = %settings.llm.provider,
        model = %settings.llm.generation.model,
        max_attempts = settings.retry.max_attempts,
        "quote service configured"
    );

    let state = AppState {
        quotes: Arc::new(quotes),
    };

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], settings.port));

    tracing::info!(%addr, "api listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

fn app(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/flights/price", post(quote_flight_price))
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

async fn healthz() -> &'static str {
    "ok"
}

#[derive(Clone)]
struct AppState {
    quotes: Arc<QuoteService>,
}

async fn quote_flight_price(
    State(state): State<AppState>,
    Json(payload): Json<TripQueryPayload>,
) -> Result<Json<PriceResponse>, ApiError> {
    let request_id = Uuid::new_v4();
    let span = tracing::info_span!("quote", %request_id);

    // Each quote runs on its own task; a panic there becomes a 500 instead of
    // tearing down the connection.
    let quotes = state.quotes.clone();
    let task = tokio::spawn(async move { quotes.quote_payload(payload).await }.instrument(span));

    let res = match task.await {
        Ok(res) => res,
        Err(e) => Err(QuoteError::Internal(anyhow::anyhow!(
            "quote task failed (request_id={request_id}): {e}"
        ))),
    };

    res.map(Json).map_err(ApiError)
}

#[derive(Debug)]
struct ApiError(QuoteError);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self.0 {
            QuoteError::Validation(e) => (StatusCode::BAD_REQUEST, e.to_string()),
            QuoteError::Upstream(e) => (
                StatusCode::SERVICE_UNAVAILABLE,
                format!("flight price estimation is temporarily unavailable: {e}"),
            ),
            QuoteError::DeadlineExceeded(_) => (
                StatusCode::SERVICE_UNAVAILABLE,
                format!("flight price estimation is temporarily unavailable: {}", self.0),
            ),
            QuoteError::Internal(e) => {
                sentry_anyhow::capture_anyhow(e);
                tracing::error!(error = %e, "unexpected failure while quoting");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal server error".to_string(),
                )
            }
        };

        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}

fn init_sentry(settings: &farecast_core::config::Settings) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}
