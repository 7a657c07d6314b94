use log::{debug, warn};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::web::error::ChatError;

/// A validated chat request. Built leniently from the raw body: malformed
/// history entries are dropped instead of failing the whole request.
#[derive(Debug)]
pub struct ChatRequest {
    pub message: String,
    pub history: Vec<Message>,
}

impl ChatRequest {
    pub fn parse(body: &[u8]) -> Result<Self, ChatError> {
        let value: Value = if body.iter().all(u8::is_ascii_whitespace) {
            Value::Object(Default::default())
        } else {
            serde_json::from_slice(body).map_err(|e| {
                warn!("Request body is not valid JSON: {}", e);
                ChatError::InternalError
            })?
        };

        let Value::Object(mut fields) = value else {
            warn!("Request body is not a JSON object");
            return Err(ChatError::InternalError);
        };

        let message = match fields.remove("message") {
            Some(Value::String(message)) if !message.is_empty() => message,
            _ => return Err(ChatError::InvalidRequest),
        };

        let history = match fields.remove("history") {
            Some(Value::Array(entries)) => accepted_history(entries),
            None | Some(Value::Null) => Vec::new(),
            Some(other) => {
                warn!("Ignoring non-array history of type {}", json_type(&other));
                Vec::new()
            }
        };

        Ok(Self { message, history })
    }
}

// TODO: report skipped history entries back to the caller once the frontend
// can surface a warning; today they are only visible in the debug log.
fn accepted_history(entries: Vec<Value>) -> Vec<Message> {
    entries
        .into_iter()
        .enumerate()
        .filter_map(|(index, entry)| match serde_json::from_value::<Message>(entry) {
            Ok(message) => Some(message),
            Err(e) => {
                debug!("Skipping history entry {}: {}", index, e);
                None
            }
        })
        .collect()
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatResponse {
    pub response: String,
    pub model_used: String,
    /// Opaque request correlation id.
    pub timestamp: String,
    pub tokens_used: u32,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    #[serde(rename = "user")]
    User,
    #[serde(rename = "assistant")]
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}
