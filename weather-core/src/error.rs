use serde_json::{Map, Value};

/// Broad category of a failed request, used to pick logging and status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed or incomplete request body.
    Validation,
    /// Token did not match the configured secret.
    Forbidden,
    /// The weather provider answered with a non-success status.
    Upstream,
    /// The weather provider could not be reached or sent garbage.
    BadGateway,
}

/// Error returned to the caller as `{ "message": ..., ...payload }`.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{message}")]
pub struct ApiError {
    pub kind: ErrorKind,
    pub status_code: u16,
    pub message: String,
    pub payload: Option<Map<String, Value>>,
}

impl ApiError {
    pub fn new(kind: ErrorKind, status_code: u16, message: impl Into<String>) -> Self {
        Self { kind, status_code, message: message.into(), payload: None }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, 400, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Forbidden, 403, message)
    }

    /// Reuses the provider's status code and body verbatim.
    pub fn upstream(status_code: u16, body: impl Into<String>) -> Self {
        Self::new(ErrorKind::Upstream, status_code, body)
    }

    pub fn bad_gateway(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::BadGateway, 502, message)
    }

    pub fn missing_field(field: &str) -> Self {
        Self::validation(format!("{field} is required")).with_payload("field", field)
    }

    /// Attach an extra key to the JSON body.
    pub fn with_payload(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.payload.get_or_insert_with(Map::new).insert(key.to_string(), value.into());
        self
    }

    /// JSON body sent to the caller. `message` always wins over a payload key of the same name.
    pub fn body(&self) -> Value {
        let mut body = self.payload.clone().unwrap_or_default();
        body.insert("message".to_string(), Value::String(self.message.clone()));
        Value::Object(body)
    }
}
