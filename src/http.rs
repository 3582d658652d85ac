//! HTTP surface: the single webhook route.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use serde::Serialize;
use tracing::info;

use crate::webhook::{WebhookError, WebhookHandler};

pub const WEBHOOK_PATH: &str = "/payment/webhook";
pub const SIGNATURE_HEADER: &str = "stripe-signature";

/// Error response
#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
    retryable: bool,
}

impl IntoResponse for WebhookError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let body = ErrorResponse { error: self.to_string(), retryable: self.is_retryable() };
        (status, Json(body)).into_response()
    }
}

pub fn router(handler: Arc<WebhookHandler>) -> Router {
    Router::new().route(WEBHOOK_PATH, post(webhook)).with_state(handler)
}

#[tracing::instrument(skip_all)]
async fn webhook(State(handler): State<Arc<WebhookHandler>>, headers: HeaderMap, body: Bytes) -> Response {
    let signature = headers.get(SIGNATURE_HEADER).and_then(|value| value.to_str().ok());
    match handler.handle(&body, signature).await {
        Ok(ack) => (StatusCode::OK, Json(ack)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Serves the webhook route until `shutdown` resolves.
pub async fn serve(
    addr: SocketAddr,
    handler: Arc<WebhookHandler>,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(addr = %listener.local_addr()?, path = WEBHOOK_PATH, "Listening for webhooks");
    axum::serve(listener, router(handler)).with_graceful_shutdown(shutdown).await
}
