//! Outbound message delivery via the Meta Graph API.
//!
//! Sends plain-text WhatsApp messages on behalf of the configured business
//! phone number.

/// Meta Graph API credentials
#[derive(Debug, Clone)]
pub struct WhatsAppCredentials {
    pub token: String,
    pub phone_number_id: String,
}

impl WhatsAppCredentials {
    pub fn from_env() -> Option<Self> {
        Some(Self {
            token: std::env::var("META_TOKEN").ok()?,
            phone_number_id: std::env::var("PHONE_NUMBER_ID").ok()?,
        })
    }
}

/// Send a text message to a recipient phone number.
pub async fn send_text(
    client: &reqwest::Client,
    credentials: &WhatsAppCredentials,
    to: &str,
    body: &str,
) -> Result<(), String> {
    let url = format!(
        "https://graph.facebook.com/v17.0/{}/messages",
        credentials.phone_number_id
    );

    let payload = serde_json::json!({
        "messaging_product": "whatsapp",
        "to": to,
        "type": "text",
        "text": { "body": body },
    });

    let response = client
        .post(&url)
        .bearer_auth(&credentials.token)
        .json(&payload)
        .send()
        .await
        .map_err(|e| format!("WhatsApp API request failed: {}", e))?;

    let status = response.status();
    let resp_body = response
        .text()
        .await
        .map_err(|e| format!("Failed to read response: {}", e))?;

    if !status.is_success() {
        return Err(format!(
            "WhatsApp API error ({}): {}",
            status,
            truncate_error(&resp_body)
        ));
    }

    log::info!("Message sent to {}", to);
    Ok(())
}

fn truncate_error(s: &str) -> &str {
    if s.len() > 200 {
        &s[..200]
    } else {
        s
    }
}
