//! Axum HTTP server for the planner.
//!
//! Routes: `/health`, and `GET`/`POST` on the plan endpoint. Everything under
//! `/api` passes through the per-client throttle when it is enabled.

use std::future::Future;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{ConnectInfo, DefaultBodyLimit, Request, State, rejection::JsonRejection},
    http::{HeaderMap, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::get,
};
use serde_json::Value;
use tower_http::trace::TraceLayer;

use crate::error::{ErrorCode, GatewayError, InputError, PlanError};
use crate::gateway::rate_limit::RateLimiter;
use crate::gateway::types::*;
use crate::planner::{PlanOptions, PlanRequest, Planner};

pub const NO_CACHE_HEADER: &str = "x-no-cache";

/// Shared state for all gateway handlers.
pub struct GatewayState {
    pub planner: Arc<Planner>,
    /// `None` when throttling is disabled.
    pub rate_limiter: Option<RateLimiter>,
}

impl GatewayState {
    pub fn new(planner: Arc<Planner>, rate_limit_rpm: u32) -> Self {
        Self {
            planner,
            rate_limiter: (rate_limit_rpm > 0).then(|| RateLimiter::new(rate_limit_rpm)),
        }
    }
}

/// Build the application router.
pub fn build_router(state: Arc<GatewayState>, body_limit_bytes: usize) -> Router {
    let public = Router::new().route("/health", get(health_handler));

    let mut api = Router::new().route(
        NL_PLAN_PATH,
        get(metadata_handler).post(nl_plan_handler),
    );
    if state.rate_limiter.is_some() {
        api = api.layer(middleware::from_fn_with_state(
            state.clone(),
            rate_limit_middleware,
        ));
    }

    Router::new()
        .merge(public)
        .merge(api)
        .layer(DefaultBodyLimit::max(body_limit_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind, serve until `shutdown` resolves, then drain in-flight requests.
pub async fn start_server(
    addr: SocketAddr,
    state: Arc<GatewayState>,
    body_limit_bytes: usize,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<(), GatewayError> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| GatewayError::StartupFailed {
            reason: format!("Failed to bind to {}: {}", addr, e),
        })?;
    let bound_addr = listener
        .local_addr()
        .map_err(|e| GatewayError::StartupFailed {
            reason: format!("Failed to get local addr: {}", e),
        })?;

    let registry = Arc::clone(state.planner.registry());
    tokio::spawn(async move {
        registry.refresh().await;
    });

    let pruner = state.rate_limiter.as_ref().map(|limiter| {
        let state = Arc::clone(&state);
        let period = limiter.window();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                if let Some(limiter) = &state.rate_limiter {
                    limiter.prune();
                }
            }
        })
    });

    let app = build_router(state, body_limit_bytes);
    tracing::info!(addr = %bound_addr, "server_started");

    let served = axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown)
    .await;

    if let Some(pruner) = pruner {
        pruner.abort();
    }
    served.map_err(|e| GatewayError::Serve(e.to_string()))?;
    tracing::info!("server_closed");
    Ok(())
}

// --- Middleware ---

async fn rate_limit_middleware(
    State(state): State<Arc<GatewayState>>,
    request: Request,
    next: Next,
) -> Response {
    let Some(limiter) = &state.rate_limiter else {
        return next.run(request).await;
    };

    let client = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip())
        .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED));

    match limiter.check(client) {
        Ok(()) => next.run(request).await,
        Err(retry_after_seconds) => {
            tracing::warn!(client = %client, retry_after_seconds, "rate_limited");
            (
                StatusCode::TOO_MANY_REQUESTS,
                Json(RateLimitedResponse {
                    error: "Rate limit exceeded",
                    error_code: ErrorCode::RateLimited,
                    retry_after_seconds,
                }),
            )
                .into_response()
        }
    }
}

// --- Handlers ---

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

async fn metadata_handler() -> Json<EndpointMetadata> {
    Json(EndpointMetadata::current())
}

async fn nl_plan_handler(
    State(state): State<Arc<GatewayState>>,
    headers: HeaderMap,
    body: Result<Json<Value>, JsonRejection>,
) -> Response {
    let body = match body {
        Ok(Json(body)) => body,
        Err(rejection) => return error_response(&rejection_to_error(&rejection)),
    };

    let request = match PlanRequest::from_json(&unwrap_body(body)) {
        Ok(request) => request,
        Err(error) => return error_response(&PlanError::Input(error)),
    };

    let options = PlanOptions {
        no_cache: headers
            .get(NO_CACHE_HEADER)
            .and_then(|value| value.to_str().ok())
            .is_some_and(|value| value == "true"),
    };

    match state.planner.process_plan(&request, options).await {
        Ok(response) => Json(response).into_response(),
        Err(error) => error_response(&error),
    }
}

/// Unwrap the `{ "body": ... }` envelope some payment proxies add.
///
/// A nested object replaces the outer body; a string is parsed as JSON and
/// left as-is when it does not parse.
pub fn unwrap_body(body: Value) -> Value {
    match body {
        Value::Object(mut outer) => match outer.remove("body") {
            Some(inner @ Value::Object(_)) => inner,
            Some(Value::String(raw)) if !raw.is_empty() => {
                match serde_json::from_str::<Value>(&raw) {
                    Ok(parsed) => parsed,
                    Err(_) => {
                        outer.insert("body".to_string(), Value::String(raw));
                        Value::Object(outer)
                    }
                }
            }
            Some(other) => {
                outer.insert("body".to_string(), other);
                Value::Object(outer)
            }
            None => Value::Object(outer),
        },
        other => other,
    }
}

fn rejection_to_error(rejection: &JsonRejection) -> PlanError {
    if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
        PlanError::Input(InputError::BodyTooLarge)
    } else {
        PlanError::Input(InputError::InvalidBody(rejection.body_text()))
    }
}

fn status_for(error: &PlanError) -> StatusCode {
    match error.code() {
        ErrorCode::InvalidInput => StatusCode::BAD_REQUEST,
        ErrorCode::BodyTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
        ErrorCode::RateLimited => StatusCode::TOO_MANY_REQUESTS,
        ErrorCode::ServiceUnavailable | ErrorCode::ExtractionFailed => {
            StatusCode::SERVICE_UNAVAILABLE
        }
        ErrorCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn error_response(error: &PlanError) -> Response {
    let body = ErrorResponse {
        error: error.public_message(),
        error_code: error.code(),
        detail: error.public_detail(),
    };
    (status_for(error), Json(body)).into_response()
}
