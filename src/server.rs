//! HTTP authentication backend
//!
//! Exposes the decision engine over the broker's HTTP auth backend protocol:
//! one endpoint per decision point, each answering with a bare verdict token.
//! Requests arrive as form data (query string for GET) or JSON.

use crate::acl::{
    DecisionEngine, ResourceRequest, TopicRequest, UserRequest, Verdict, VhostRequest,
};

use anyhow::{Context, Result};
use axum::{
    extract::{FromRequest, Request, State},
    http::{header::CONTENT_TYPE, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Form, Json, Router,
};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::{DefaultOnResponse, TraceLayer};
use tracing::{info, Level};

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    engine: Arc<DecisionEngine>,
}

impl AppState {
    pub fn new(engine: DecisionEngine) -> Self {
        Self {
            engine: Arc::new(engine),
        }
    }
}

/// Request body decoded from JSON or form encoding, by content type
pub struct AuthForm<T>(pub T);

#[async_trait::async_trait]
impl<S, T> FromRequest<S> for AuthForm<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = Response;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_json = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(|value| value.starts_with("application/json"))
            .unwrap_or(false);

        if is_json {
            let Json(value) = Json::<T>::from_request(req, state)
                .await
                .map_err(IntoResponse::into_response)?;
            Ok(Self(value))
        } else {
            let Form(value) = Form::<T>::from_request(req, state)
                .await
                .map_err(IntoResponse::into_response)?;
            Ok(Self(value))
        }
    }
}

impl IntoResponse for Verdict {
    fn into_response(self) -> Response {
        (StatusCode::OK, self.as_str()).into_response()
    }
}

async fn user(State(state): State<AppState>, AuthForm(req): AuthForm<UserRequest>) -> Verdict {
    state.engine.user(&req).verdict
}

async fn vhost(State(state): State<AppState>, AuthForm(req): AuthForm<VhostRequest>) -> Verdict {
    state.engine.vhost(&req).verdict
}

async fn resource(
    State(state): State<AppState>,
    AuthForm(req): AuthForm<ResourceRequest>,
) -> Verdict {
    state.engine.resource(&req).verdict
}

async fn topic(State(state): State<AppState>, AuthForm(req): AuthForm<TopicRequest>) -> Verdict {
    state.engine.topic(&req).verdict
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    timestamp: String,
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}

/// Build the backend router
pub fn router(state: AppState) -> Router {
    let trace = TraceLayer::new_for_http().on_response(DefaultOnResponse::new().level(Level::DEBUG));

    Router::new()
        .route("/user", get(user).post(user))
        .route("/vhost", get(vhost).post(vhost))
        .route("/resource", get(resource).post(resource))
        .route("/topic", get(topic).post(topic))
        .route("/health", get(health))
        .layer(trace)
        .with_state(state)
}

/// Serve the backend until Ctrl+C or SIGTERM
pub async fn serve(addr: SocketAddr, state: AppState) -> Result<()> {
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    info!(address = %addr, "Broker auth backend listening");

    axum::serve(listener, router(state).into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;

    info!("Server shut down gracefully");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C"),
        _ = terminate => info!("Received SIGTERM"),
    }
}
