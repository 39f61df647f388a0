//! WhatsApp Analytics Bot — webhook-driven financial reporting over chat.
//!
//! Receives inbound WhatsApp messages via a Meta Graph webhook, answers
//! metric/date-range queries from the seeded financials store, and replies
//! through the Graph outbound message API.
//! Default: http://127.0.0.1:3021/

mod db;
mod interpreter;
mod routes;
mod whatsapp_api;

use routes::AppState;
use std::sync::Arc;
use std::time::Instant;

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();
    env_logger::init();

    let port: u16 = std::env::var("WHATSAPP_ANALYTICS_PORT")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(3021);

    let db_path = std::env::var("WHATSAPP_ANALYTICS_DB_PATH")
        .unwrap_or_else(|_| "./whatsapp_analytics.db".to_string());

    let company_scope_id: i64 = std::env::var("COMPANY_SCOPE_ID")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(100);

    let verify_token =
        std::env::var("VERIFY_TOKEN").unwrap_or_else(|_| "HiitsVerify".to_string());

    let credentials = whatsapp_api::WhatsAppCredentials::from_env();
    if credentials.is_none() {
        log::warn!("META_TOKEN/PHONE_NUMBER_ID not set — outbound replies disabled");
    }

    log::info!("Opening database at: {}", db_path);
    let database = Arc::new(db::Db::open(&db_path).expect("Failed to open database"));

    let state = Arc::new(AppState {
        db: database,
        http: reqwest::Client::new(),
        credentials,
        verify_token,
        company_scope_id,
        start_time: Instant::now(),
        started_at: chrono::Utc::now().to_rfc3339(),
    });

    let cors = tower_http::cors::CorsLayer::permissive();

    let app = axum::Router::new()
        .route(
            "/webhook",
            axum::routing::get(routes::verify_webhook).post(routes::receive_webhook),
        )
        .route("/logs", axum::routing::get(routes::logs))
        .route("/rpc/financials", axum::routing::get(routes::financials))
        .route("/rpc/status", axum::routing::get(routes::status))
        .with_state(state)
        .layer(cors);

    let addr = format!("0.0.0.0:{}", port);
    log::info!("WhatsApp Analytics Bot listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("Failed to bind");

    axum::serve(listener, app).await.expect("Server error");
}
