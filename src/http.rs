//! HTTP transport: message webhook, interaction endpoint and stats query.

use crate::event;
use crate::interaction::{Interaction, InteractionResponder, InteractionResponse};
use crate::pipeline::Relay;
use crate::stats::{self, CorrectionStats, StatsBounds};
use crate::store::CorrectionStore;
use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{debug, error, info};

#[derive(Clone)]
pub struct AppState {
    pub relay: Arc<Relay>,
    pub responder: Arc<InteractionResponder>,
    pub corrections: Arc<dyn CorrectionStore>,
    pub bounds: StatsBounds,
}

pub fn build_app(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/discord/webhook", post(webhook))
        .route("/discord/interactions", post(interactions))
        .route("/discord/stats/{guild_id}", get(guild_stats))
        .with_state(state)
}

pub async fn serve(addr: &str, state: AppState) -> anyhow::Result<()> {
    let addr: SocketAddr = addr
        .parse()
        .map_err(|e| anyhow::anyhow!("invalid HTTP_LISTEN_ADDR '{}': {}", addr, e))?;

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("HTTP listener bound on {}", addr);
    axum::serve(listener, build_app(state)).await?;
    Ok(())
}

async fn healthz() -> (StatusCode, &'static str) {
    (StatusCode::OK, "ok")
}

/// Malformed or irrelevant payloads are acknowledged without side effects.
async fn webhook(State(state): State<AppState>, body: Bytes) -> (StatusCode, &'static str) {
    let Some(message) = event::parse_webhook_body(&body) else {
        debug!("Webhook: ignoring payload that is not a message event");
        return (StatusCode::OK, "OK");
    };

    match state.relay.handle(&message).await {
        Ok(outcome) => {
            debug!("Webhook: message {} -> {:?}", message.id, outcome);
            (StatusCode::OK, "OK")
        }
        Err(e) => {
            error!("Webhook: failed to process message {}: {}", message.id, e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error")
        }
    }
}

async fn interactions(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<InteractionResponse>, (StatusCode, &'static str)> {
    let interaction: Interaction = serde_json::from_slice(&body).map_err(|e| {
        debug!("Interactions: malformed payload: {}", e);
        (StatusCode::BAD_REQUEST, "Bad Request")
    })?;

    state.responder.respond(&interaction).await.map(Json).map_err(|e| {
        error!("Interactions: failed to build response: {}", e);
        (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error")
    })
}

async fn guild_stats(
    State(state): State<AppState>,
    Path(guild_id): Path<String>,
) -> Result<Json<CorrectionStats>, (StatusCode, &'static str)> {
    stats::guild_stats(state.corrections.as_ref(), &guild_id, state.bounds)
        .await
        .map(Json)
        .map_err(|e| {
            error!("Stats: failed to aggregate guild {}: {}", guild_id, e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error")
        })
}
