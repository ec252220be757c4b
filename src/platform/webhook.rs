//! LINE webhook endpoint.
//!
//! `POST /callback` verifies the `X-Line-Signature` header against the raw
//! body, then hands every text message event to the [`Responder`] and sends
//! whatever it decides back through a [`ReplySender`].

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::post,
    Router,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use futures::future::join_all;
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use sha2::Sha256;
use tracing::{debug, error, info, info_span, warn, Instrument};

use crate::classifier::IncomingMessage;
use crate::platform::ReplySender;
use crate::responder::{ReplyOutcome, Responder};

type HmacSha256 = Hmac<Sha256>;

pub const SIGNATURE_HEADER: &str = "x-line-signature";

// ── Payload types ──────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct WebhookPayload {
    #[serde(default)]
    pub destination: Option<String>,
    #[serde(default)]
    pub events: Vec<WebhookEvent>,
}

/// One webhook event. Only the fields needed to answer text messages are
/// modelled; everything else is ignored.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookEvent {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub reply_token: Option<String>,
    #[serde(default)]
    pub message: Option<EventMessage>,
}

#[derive(Debug, Deserialize)]
pub struct EventMessage {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub text: Option<String>,
}

impl WebhookEvent {
    /// The event as an [`IncomingMessage`] if it is a text message with a
    /// reply token.
    pub fn text_message(&self) -> Option<IncomingMessage> {
        if self.kind != "message" {
            return None;
        }
        let message = self.message.as_ref()?;
        if message.kind != "text" {
            return None;
        }
        let text = message.text.as_deref()?;
        let reply_token = self.reply_token.as_deref()?;
        Some(IncomingMessage::new(text, reply_token))
    }
}

// ── Signature ──────────────────────────────────────────────────────────────────

/// Check `signature` (base64 HMAC-SHA256 of `body` keyed by the channel
/// secret). Comparison is constant-time.
pub fn verify_signature(body: &[u8], signature: &str, channel_secret: &[u8]) -> bool {
    let Ok(expected) = STANDARD.decode(signature.trim()) else {
        warn!("Signature header is not valid base64");
        return false;
    };

    let Ok(mut mac) = HmacSha256::new_from_slice(channel_secret) else {
        warn!("Failed to create HMAC");
        return false;
    };

    mac.update(body);
    mac.verify_slice(&expected).is_ok()
}

// ── Server ─────────────────────────────────────────────────────────────────────

/// Shared state for the webhook handler
#[derive(Clone)]
pub struct WebhookState {
    pub responder: Arc<Responder>,
    pub replier: Arc<dyn ReplySender>,
    pub channel_secret: SecretString,
}

pub fn router(state: WebhookState) -> Router {
    Router::new()
        .route("/callback", post(callback))
        .with_state(state)
}

/// Serve the webhook on `addr` until Ctrl-C.
pub async fn run(state: WebhookState, addr: &str) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {addr}"))?;

    info!("Listening for LINE webhooks on http://{addr}/callback");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutting down");
        })
        .await
        .context("Server error")?;

    Ok(())
}

async fn callback(
    State(state): State<WebhookState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<&'static str, StatusCode> {
    let Some(signature) = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
    else {
        warn!("Rejected webhook: missing signature header");
        return Err(StatusCode::BAD_REQUEST);
    };

    if !verify_signature(
        &body,
        signature,
        state.channel_secret.expose_secret().as_bytes(),
    ) {
        warn!("Rejected webhook: invalid signature");
        return Err(StatusCode::BAD_REQUEST);
    }

    let payload: WebhookPayload = serde_json::from_slice(&body).map_err(|e| {
        warn!("Rejected webhook: invalid payload: {e}");
        StatusCode::BAD_REQUEST
    })?;

    let delivery_id = uuid::Uuid::new_v4();
    let span = info_span!("delivery", %delivery_id);

    async {
        debug!(
            destination = payload.destination.as_deref().unwrap_or(""),
            events = payload.events.len(),
            "Webhook received"
        );

        let messages: Vec<IncomingMessage> = payload
            .events
            .iter()
            .filter_map(|event| {
                let message = event.text_message();
                if message.is_none() {
                    debug!(kind = %event.kind, "Skipping non-text event");
                }
                message
            })
            .collect();

        join_all(messages.iter().map(|m| handle_message(&state, m))).await;
    }
    .instrument(span)
    .await;

    Ok("OK")
}

async fn handle_message(state: &WebhookState, message: &IncomingMessage) {
    debug!(command = message.has_command_prefix(), "Handling text message");
    match state.responder.respond(&message.text).await {
        ReplyOutcome::Reply(text) => {
            if let Err(e) = state.replier.reply(&message.reply_token, &text).await {
                error!("Failed to send reply: {e}");
            }
        }
        ReplyOutcome::NoReply => {
            debug!("No reply for message");
        }
    }
}
