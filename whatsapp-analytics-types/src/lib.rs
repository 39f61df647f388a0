//! Shared types for the WhatsApp analytics service and its API clients.

use serde::{Deserialize, Serialize};

// =====================================================
// Domain Types
// =====================================================

/// A summable financial metric. Closed set — the SQL column a report reads
/// is derived from these variants and nothing else.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    Ebitda,
    Revenue,
    Sales,
    Cogs,
    Inventory,
}

impl Metric {
    /// Column name in the `financials` table.
    pub fn column(&self) -> &'static str {
        match self {
            Metric::Ebitda => "ebitda",
            Metric::Revenue => "revenue",
            Metric::Sales => "sales",
            Metric::Cogs => "cogs",
            Metric::Inventory => "inventory",
        }
    }

    /// Uppercase label used in report lines.
    pub fn label(&self) -> &'static str {
        match self {
            Metric::Ebitda => "EBITDA",
            Metric::Revenue => "REVENUE",
            Metric::Sales => "SALES",
            Metric::Cogs => "COGS",
            Metric::Inventory => "INVENTORY",
        }
    }

    /// Parse a metric name, case-insensitively.
    pub fn parse_name(name: &str) -> Option<Metric> {
        match name.to_lowercase().as_str() {
            "ebitda" => Some(Metric::Ebitda),
            "revenue" => Some(Metric::Revenue),
            "sales" => Some(Metric::Sales),
            "cogs" => Some(Metric::Cogs),
            "inventory" => Some(Metric::Inventory),
            _ => None,
        }
    }

    /// Map a menu keyword ("1".."4") to its metric. The numbering is a
    /// user-facing contract and must not change.
    pub fn from_menu_key(key: &str) -> Option<Metric> {
        match key {
            "1" => Some(Metric::Ebitda),
            "2" => Some(Metric::Revenue),
            "3" => Some(Metric::Sales),
            "4" => Some(Metric::Inventory),
            _ => None,
        }
    }
}

/// A seeded financial record. Reference data, never mutated after seeding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinancialRecord {
    pub id: i64,
    pub date: String,
    pub company_id: i64,
    pub name: String,
    pub revenue: f64,
    pub cogs: f64,
    pub ebitda: f64,
    pub sales: f64,
    pub inventory: f64,
}

/// One entry in the conversation log (both directions).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageLogEntry {
    pub id: i64,
    pub from_number: String,
    pub message_text: String,
    pub direction: String,
    pub created_at: String,
}

// =====================================================
// Webhook Payload Types (Meta Graph envelope)
// =====================================================

/// Query parameters of the webhook verification handshake.
#[derive(Debug, Default, Deserialize)]
pub struct WebhookVerifyParams {
    #[serde(rename = "hub.mode")]
    pub mode: Option<String>,
    #[serde(rename = "hub.verify_token")]
    pub verify_token: Option<String>,
    #[serde(rename = "hub.challenge")]
    pub challenge: Option<String>,
}

/// Top-level inbound webhook event.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct WebhookEvent {
    #[serde(default)]
    pub object: Option<String>,
    #[serde(default)]
    pub entry: Vec<WebhookEntry>,
}

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct WebhookEntry {
    #[serde(default)]
    pub changes: Vec<WebhookChange>,
}

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct WebhookChange {
    #[serde(default)]
    pub value: WebhookChangeValue,
}

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct WebhookChangeValue {
    #[serde(default)]
    pub messages: Option<Vec<InboundMessage>>,
}

/// A single inbound message inside the envelope.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct InboundMessage {
    pub from: String,
    #[serde(default)]
    pub text: Option<MessageText>,
}

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct MessageText {
    pub body: String,
}

impl WebhookEvent {
    /// First message of the first change, the slot the platform delivers
    /// conversational messages in.
    pub fn first_message(&self) -> Option<&InboundMessage> {
        self.entry
            .first()?
            .changes
            .first()?
            .value
            .messages
            .as_ref()?
            .first()
    }
}

// =====================================================
// RPC Response Types
// =====================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct RpcResponse<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T: Serialize> RpcResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn err(msg: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(msg.into()),
        }
    }
}

// =====================================================
// Service Status
// =====================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct ServiceStatus {
    pub running: bool,
    pub uptime_secs: u64,
    pub started_at: String,
    pub total_messages: i64,
    pub financial_records: i64,
    pub outbound_configured: bool,
    pub company_scope_id: i64,
}
