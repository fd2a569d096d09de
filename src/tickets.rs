use reqwest::Client;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::{debug, info};

use crate::config::Config;
use crate::error::RequestError;

#[derive(Serialize)]
struct TicketRequest<'a> {
    grievance_text: &'a str,
}

/// Fields of a freshly created ticket that the chat reply shows.
///
/// Nothing is validated: each field keeps whatever JSON the service sent
/// (including `null`), or `None` when it was left out.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct TicketReceipt {
    #[serde(default, deserialize_with = "present")]
    pub id: Option<Value>,
    #[serde(default, deserialize_with = "present")]
    pub assigned_team: Option<Value>,
    #[serde(default, deserialize_with = "present")]
    pub status: Option<Value>,
}

impl TicketReceipt {
    pub fn reply_text(&self) -> String {
        format!(
            "Your grievance has been recorded.\nTicket ID: #{},\nAssigned Team: {},\nStatus: {}",
            display_field(self.id.as_ref()),
            display_field(self.assigned_team.as_ref()),
            display_field(self.status.as_ref()),
        )
    }
}

/// A recorded ticket as returned by the listing endpoint.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Ticket {
    #[serde(default, deserialize_with = "present")]
    pub id: Option<Value>,
    #[serde(default, deserialize_with = "present")]
    pub grievance_text: Option<Value>,
    #[serde(default, deserialize_with = "present")]
    pub category: Option<Value>,
    #[serde(default, deserialize_with = "present")]
    pub assigned_team: Option<Value>,
    #[serde(default, deserialize_with = "present")]
    pub status: Option<Value>,
    #[serde(default, deserialize_with = "present")]
    pub created_at: Option<Value>,
}

/// A field that appears in the body is `Some`, even when its value is `null`.
fn present<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

/// Render a loosely typed field the way string interpolation would:
/// strings verbatim, other JSON (`null` included) as its text, absent as
/// `undefined`.
pub fn display_field(value: Option<&Value>) -> String {
    match value {
        None => "undefined".to_string(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

#[derive(Clone)]
pub struct TicketClient {
    client: Client,
    url: String,
}

impl TicketClient {
    pub fn new(config: &Config) -> Self {
        Self {
            client: Client::new(),
            url: config.tickets_url(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub async fn create_ticket(&self, grievance_text: &str) -> Result<TicketReceipt, RequestError> {
        debug!(url = %self.url, "posting grievance");

        let response = self
            .client
            .post(&self.url)
            .json(&TicketRequest { grievance_text })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(RequestError::Status(response.status()));
        }

        let body = response.text().await?;
        let value: Value = serde_json::from_str(&body)
            .map_err(|e| RequestError::Decode(e.to_string()))?;
        if !value.is_object() {
            return Err(RequestError::Decode(format!("expected a JSON object, got {}", value)));
        }

        let receipt: TicketReceipt = serde_json::from_value(value)
            .map_err(|e| RequestError::Decode(e.to_string()))?;
        info!(id = %display_field(receipt.id.as_ref()), "ticket created");
        Ok(receipt)
    }

    pub async fn list_tickets(&self) -> Result<Vec<Ticket>, RequestError> {
        let response = self.client.get(&self.url).send().await?;

        if !response.status().is_success() {
            return Err(RequestError::Status(response.status()));
        }

        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| RequestError::Decode(e.to_string()))
    }
}
