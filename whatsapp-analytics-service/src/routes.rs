//! Axum route handlers for the webhook and inspection endpoints.

use crate::db::Db;
use crate::interpreter;
use crate::whatsapp_api::{self, WhatsAppCredentials};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use std::sync::Arc;
use std::time::Instant;
use whatsapp_analytics_types::*;

pub struct AppState {
    pub db: Arc<Db>,
    pub http: reqwest::Client,
    pub credentials: Option<WhatsAppCredentials>,
    pub verify_token: String,
    pub company_scope_id: i64,
    pub start_time: Instant,
    pub started_at: String,
}

// GET /webhook — Meta subscription handshake
pub async fn verify_webhook(
    State(state): State<Arc<AppState>>,
    Query(params): Query<WebhookVerifyParams>,
) -> Response {
    if params.mode.as_deref() == Some("subscribe")
        && params.verify_token.as_deref() == Some(state.verify_token.as_str())
    {
        log::info!("Webhook verified");
        return (StatusCode::OK, params.challenge.unwrap_or_default()).into_response();
    }
    StatusCode::FORBIDDEN.into_response()
}

// POST /webhook — inbound message events
pub async fn receive_webhook(
    State(state): State<Arc<AppState>>,
    Json(event): Json<WebhookEvent>,
) -> StatusCode {
    // The platform also delivers status updates and empty notifications;
    // anything without a conversational message is acknowledged and dropped.
    if event.object.is_none() {
        return StatusCode::OK;
    }
    let Some(msg) = event.first_message() else {
        return StatusCode::OK;
    };

    let from = msg.from.clone();
    let text = msg
        .text
        .as_ref()
        .map(|t| t.body.trim())
        .unwrap_or("")
        .to_string();

    log::info!("Incoming from {}: {}", from, text);

    if let Err(e) = state.db.log_message(&from, &text, "in") {
        log::error!("Failed to log inbound message: {}", e);
    }

    let reply = interpreter::handle_message(&state.db, state.company_scope_id, &from, &text);

    match &state.credentials {
        Some(credentials) => {
            if let Err(e) = whatsapp_api::send_text(&state.http, credentials, &from, &reply).await {
                log::error!("Failed to send reply to {}: {}", from, e);
            }
        }
        None => {
            log::warn!("META_TOKEN/PHONE_NUMBER_ID not set — dropping reply to {}", from);
        }
    }

    if let Err(e) = state.db.log_message(&from, &reply, "out") {
        log::error!("Failed to log outbound message: {}", e);
    }

    StatusCode::OK
}

// GET /logs — 20 most recent log entries, newest first
pub async fn logs(
    State(state): State<Arc<AppState>>,
) -> (StatusCode, Json<RpcResponse<Vec<MessageLogEntry>>>) {
    match state.db.recent_messages(20) {
        Ok(entries) => (StatusCode::OK, Json(RpcResponse::ok(entries))),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, Json(RpcResponse::err(e))),
    }
}

// GET /rpc/financials — the seeded reference records
pub async fn financials(
    State(state): State<Arc<AppState>>,
) -> (StatusCode, Json<RpcResponse<Vec<FinancialRecord>>>) {
    match state.db.list_financials() {
        Ok(records) => (StatusCode::OK, Json(RpcResponse::ok(records))),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, Json(RpcResponse::err(e))),
    }
}

// GET /rpc/status
pub async fn status(
    State(state): State<Arc<AppState>>,
) -> (StatusCode, Json<RpcResponse<ServiceStatus>>) {
    (
        StatusCode::OK,
        Json(RpcResponse::ok(ServiceStatus {
            running: true,
            uptime_secs: state.start_time.elapsed().as_secs(),
            started_at: state.started_at.clone(),
            total_messages: state.db.message_count(),
            financial_records: state.db.financial_record_count(),
            outbound_configured: state.credentials.is_some(),
            company_scope_id: state.company_scope_id,
        })),
    )
}
