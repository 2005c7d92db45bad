use bridge_traits::{BridgeError, HttpResponse};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// Keys that carry a form-level message rather than a field error.
const BANNER_KEYS: &[&str] = &["detail", "non_field_errors", "message", "error"];

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Login failed with status {status}")]
    LoginFailed { status: u16 },

    #[error("Not authenticated")]
    Unauthorized,

    #[error("Access denied")]
    Forbidden,

    #[error("Validation failed with status {status}: {errors}")]
    Validation { status: u16, errors: ValidationErrors },

    #[error("Token refresh failed: {0}")]
    TokenRefreshFailed(RefreshFailure),

    #[error("Request failed with status {status}: {message}")]
    Http { status: u16, message: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Session storage error: {0}")]
    Storage(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Coarse error classes a UI maps to distinct messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// No response reached us.
    Network,
    /// 401-class: missing, expired or rejected credentials.
    Authentication,
    /// 403-class: signed in but not allowed.
    Authorization,
    /// Field-level problems with submitted data.
    Validation,
    Server,
    Client,
    Storage,
    Configuration,
}

impl AuthError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            AuthError::Network(_) => ErrorCategory::Network,
            AuthError::LoginFailed { status } if *status >= 500 => ErrorCategory::Server,
            AuthError::LoginFailed { .. }
            | AuthError::Unauthorized
            | AuthError::TokenRefreshFailed(_) => ErrorCategory::Authentication,
            AuthError::Forbidden => ErrorCategory::Authorization,
            AuthError::Validation { .. } => ErrorCategory::Validation,
            AuthError::Http { status, .. } if *status >= 500 => ErrorCategory::Server,
            AuthError::Http { .. } => ErrorCategory::Client,
            AuthError::InvalidResponse(_) => ErrorCategory::Server,
            AuthError::Storage(_) => ErrorCategory::Storage,
            AuthError::Config(_) => ErrorCategory::Configuration,
        }
    }

    /// HTTP status behind the error, when one was received.
    pub fn status(&self) -> Option<u16> {
        match self {
            AuthError::LoginFailed { status }
            | AuthError::Validation { status, .. }
            | AuthError::Http { status, .. } => Some(*status),
            AuthError::Unauthorized => Some(401),
            AuthError::Forbidden => Some(403),
            AuthError::TokenRefreshFailed(RefreshFailure::Rejected { status }) => Some(*status),
            _ => None,
        }
    }

    /// Classify a non-2xx response.
    pub fn from_response(response: &HttpResponse) -> Self {
        match response.status {
            401 => AuthError::Unauthorized,
            403 => AuthError::Forbidden,
            status @ (400 | 422) => AuthError::Validation {
                status,
                errors: ValidationErrors::from_body(&response.body),
            },
            status => AuthError::Http {
                status,
                message: response_message(response),
            },
        }
    }
}

impl From<BridgeError> for AuthError {
    fn from(err: BridgeError) -> Self {
        match err {
            BridgeError::Network(message) => AuthError::Network(message),
            BridgeError::Storage(message) => AuthError::Storage(message),
            BridgeError::Io(err) => AuthError::Storage(err.to_string()),
            BridgeError::NotAvailable(message) => AuthError::Config(message),
            BridgeError::OperationFailed(message) => AuthError::InvalidResponse(message),
        }
    }
}

/// Why a refresh attempt did not produce a new access token.
///
/// `Clone` so that every caller waiting on a shared refresh sees the same
/// outcome.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RefreshFailure {
    #[error("no refresh token stored")]
    NoRefreshToken,

    #[error("refresh token rejected with status {status}")]
    Rejected { status: u16 },

    #[error("network error: {0}")]
    Network(String),

    #[error("refresh timed out")]
    Timeout,

    #[error("invalid refresh response: {0}")]
    InvalidResponse(String),
}

/// Field-level validation messages returned by the backend.
///
/// Accepts both `{"field": "msg"}` and `{"field": ["msg", ...]}` shapes.
/// `detail` / `non_field_errors` become the banner message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors {
    pub fields: BTreeMap<String, Vec<String>>,
    pub message: Option<String>,
}

impl ValidationErrors {
    pub fn from_body(body: &[u8]) -> Self {
        let Ok(value) = serde_json::from_slice::<Value>(body) else {
            let text = String::from_utf8_lossy(body).trim().to_string();
            return Self {
                fields: BTreeMap::new(),
                message: (!text.is_empty()).then_some(text),
            };
        };

        let mut errors = Self::default();
        match value {
            Value::Object(map) => {
                for (key, value) in map {
                    let messages = collect_messages(&value);
                    if messages.is_empty() {
                        continue;
                    }
                    if BANNER_KEYS.contains(&key.as_str()) {
                        if errors.message.is_none() {
                            errors.message = Some(messages.join(" "));
                        }
                    } else {
                        errors.fields.insert(key, messages);
                    }
                }
            }
            other => {
                let messages = collect_messages(&other);
                if !messages.is_empty() {
                    errors.message = Some(messages.join(" "));
                }
            }
        }
        errors
    }

    /// Banner-level message for a single field.
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .get(name)
            .and_then(|messages| messages.first())
            .map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.message.is_none()
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(message) = &self.message {
            return f.write_str(message);
        }
        match self.fields.iter().next() {
            Some((field, messages)) => write!(f, "{}: {}", field, messages.join(" ")),
            None => f.write_str("invalid request"),
        }
    }
}

fn collect_messages(value: &Value) -> Vec<String> {
    match value {
        Value::String(message) => vec![message.clone()],
        Value::Array(items) => items.iter().flat_map(collect_messages).collect(),
        Value::Null => Vec::new(),
        other => vec![other.to_string()],
    }
}

/// Best human-readable message from an error body.
fn response_message(response: &HttpResponse) -> String {
    if let Ok(Value::Object(map)) = serde_json::from_slice::<Value>(&response.body) {
        for key in BANNER_KEYS {
            if let Some(Value::String(message)) = map.get(*key) {
                return message.clone();
            }
        }
    }
    let text = String::from_utf8_lossy(&response.body);
    let text = text.trim();
    if text.is_empty() {
        format!("HTTP {}", response.status)
    } else {
        text.chars().take(200).collect()
    }
}

pub type Result<T> = std::result::Result<T, AuthError>;
