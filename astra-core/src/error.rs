//! Error types for Data API and DevOps API operations.
//!
//! The same conceptual failures (timeout, HTTP error, unexpected body,
//! API-reported errors) can arise against either REST surface. Rather than
//! two parallel error hierarchies, a single [`Error`] enum carries an
//! [`ApiFamily`] tag so callers can still tell the surfaces apart.

use std::fmt;
use std::time::Duration;

use serde_json::{Map, Value};
use thiserror::Error;

/// Placeholder substituted for secret header values wherever they are logged.
pub const FIXED_SECRET_PLACEHOLDER: &str = "***";

/// Which of the two REST surfaces a request targeted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ApiFamily {
    /// The document/table-level JSON command protocol.
    DataApi,
    /// The control-plane REST protocol for database/keyspace lifecycle.
    DevOpsApi,
}

impl ApiFamily {
    /// Returns the human-readable name used in log and error messages.
    pub fn description(&self) -> &'static str {
        match self {
            ApiFamily::DataApi => "Data API",
            ApiFamily::DevOpsApi => "DevOps API",
        }
    }
}

impl fmt::Display for ApiFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

/// The resolved deadline for one HTTP attempt.
///
/// Created fresh for every outgoing request and never mutated. The `label`
/// names the configuration parameter that produced the value, so timeout
/// error messages can state exactly which knob to raise.
///
/// A `request_ms` of `None` *or* of `Some(0)` both mean "no HTTP-level
/// deadline": an explicitly supplied zero is honored as a value (it is never
/// treated as unset) and disables the transport timeout, matching the
/// underlying HTTP client's convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TimeoutContext {
    /// The overall (multi-call) budget this attempt belongs to, if any.
    pub nominal_ms: Option<u64>,
    /// The deadline for this single attempt, in milliseconds.
    pub request_ms: Option<u64>,
    /// Name of the parameter that produced `request_ms`.
    pub label: Option<&'static str>,
}

impl TimeoutContext {
    /// Creates a context with just a per-request deadline.
    pub fn new(request_ms: Option<u64>) -> Self {
        Self {
            nominal_ms: None,
            request_ms,
            label: None,
        }
    }

    /// Attaches the name of the parameter that produced this deadline.
    pub fn with_label(mut self, label: &'static str) -> Self {
        self.label = Some(label);
        self
    }

    /// Attaches the overall multi-call budget this attempt belongs to.
    pub fn with_nominal_ms(mut self, nominal_ms: Option<u64>) -> Self {
        self.nominal_ms = nominal_ms;
        self
    }

    /// Returns true if any deadline is set at all.
    pub fn is_set(&self) -> bool {
        self.nominal_ms.is_some() || self.request_ms.is_some()
    }

    /// Converts the per-request deadline into a transport timeout.
    ///
    /// Unset and zero both translate to "no timeout".
    pub fn request_timeout(&self) -> Option<Duration> {
        match self.request_ms {
            None | Some(0) => None,
            Some(ms) => Some(Duration::from_millis(ms)),
        }
    }
}

/// One error (or warning) item as reported in an API response body.
///
/// Parses both response shapes: the Data API item
/// (`errorCode`/`message`/`title`, plus free-form extras) and the DevOps API
/// item (numeric `ID`/`message`). Keys not recognized land in `attributes`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ErrorDescriptor {
    /// The `title` field, when present.
    pub title: Option<String>,
    /// The `errorCode` field (or the DevOps API numeric `ID`, stringified).
    pub error_code: Option<String>,
    /// The `message` field.
    pub message: Option<String>,
    /// Any further key-value pairs returned alongside the known fields.
    pub attributes: Map<String, Value>,
}

impl ErrorDescriptor {
    const KNOWN_FIELDS: [&'static str; 4] = ["title", "errorCode", "message", "ID"];

    /// Builds a descriptor from one item of a response's `errors` array.
    ///
    /// A bare string item becomes the `message`; anything unexpected yields
    /// an empty descriptor rather than a failure (error reporting must not
    /// itself fail).
    pub fn from_value(item: &Value) -> Self {
        match item {
            Value::String(text) => Self {
                message: Some(text.clone()),
                ..Self::default()
            },
            Value::Object(fields) => Self {
                title: fields.get("title").and_then(Value::as_str).map(str::to_owned),
                error_code: fields
                    .get("errorCode")
                    .and_then(Value::as_str)
                    .map(str::to_owned)
                    .or_else(|| fields.get("ID").map(|id| id.to_string())),
                message: fields
                    .get("message")
                    .and_then(Value::as_str)
                    .map(str::to_owned),
                attributes: fields
                    .iter()
                    .filter(|(k, _)| !Self::KNOWN_FIELDS.contains(&k.as_str()))
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect(),
            },
            _ => Self::default(),
        }
    }

    /// Renders a succinct one-line description of this item.
    pub fn summary(&self) -> String {
        let non_code_part = match (&self.title, &self.message) {
            (Some(title), Some(message)) => Some(format!("{title}: {message}")),
            (Some(title), None) => Some(title.clone()),
            (None, Some(message)) => Some(message.clone()),
            (None, None) => None,
        };
        match (non_code_part, &self.error_code) {
            (Some(text), Some(code)) => format!("{text} ({code})"),
            (Some(text), None) => text,
            (None, Some(code)) => code.clone(),
            (None, None) => String::new(),
        }
    }
}

/// Extracts all descriptors from a parsed response body's `errors` array.
pub fn error_descriptors(raw_response: &Value) -> Vec<ErrorDescriptor> {
    raw_response
        .get("errors")
        .and_then(Value::as_array)
        .map(|items| items.iter().map(ErrorDescriptor::from_value).collect())
        .unwrap_or_default()
}

/// The main error type for Data API and DevOps API operations.
#[derive(Debug, Error)]
pub enum Error {
    /// The HTTP call did not complete within the resolved deadline, or a
    /// multi-call budget was exhausted before a request could be issued.
    /// Carries the [`TimeoutContext`] so the message can name the
    /// configuration parameter responsible.
    #[error("{family} timeout: {message}")]
    Timeout {
        /// Which API surface the request targeted.
        family: ApiFamily,
        /// A textual description of the event.
        message: String,
        /// The deadline (value and source label) that was in force.
        context: TimeoutContext,
    },

    /// A non-2xx HTTP status was returned.
    #[error("{family} HTTP error {status}: {message}")]
    Http {
        /// Which API surface the request targeted.
        family: ApiFamily,
        /// The HTTP status code.
        status: u16,
        /// A textual description of the failure.
        message: String,
        /// The literal response body, for diagnostics.
        raw_body: String,
        /// Any error items found in the response body.
        error_descriptors: Vec<ErrorDescriptor>,
    },

    /// The response body could not be parsed, or a required field was
    /// absent where the caller expected one.
    #[error("unexpected {family} response: {message}")]
    UnexpectedResponse {
        /// Which API surface the request targeted.
        family: ApiFamily,
        /// A textual description naming the command involved.
        message: String,
        /// The literal response text, for diagnostics.
        raw_text: String,
    },

    /// The API understood the request and reported failure through a
    /// non-empty `errors` array (possibly with HTTP 200).
    #[error("{family} response error: {message}")]
    ApiResponse {
        /// Which API surface the request targeted.
        family: ApiFamily,
        /// A summary assembled from the reported error items.
        message: String,
        /// The command payload that led to the response, if any.
        command: Option<Value>,
        /// The full parsed response.
        raw_response: Value,
        /// One descriptor per item of the response's `errors` array.
        error_descriptors: Vec<ErrorDescriptor>,
    },

    /// A transport-level failure other than a timeout (connection refused,
    /// DNS failure, broken stream).
    #[error("{family} connection error: {message}")]
    Connection {
        /// Which API surface the request targeted.
        family: ApiFamily,
        /// A textual description of the failure.
        message: String,
    },

    /// A payload contained a value the active codec mode cannot represent.
    /// Raised before any network activity.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Invalid client-side settings (bad header name, malformed endpoint).
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl Error {
    /// Builds an [`Error::ApiResponse`] from a parsed response body.
    pub fn api_response(family: ApiFamily, command: Option<Value>, raw_response: Value) -> Self {
        let descriptors = error_descriptors(&raw_response);
        let message = match descriptors.len() {
            0 => "the API response reported errors".to_owned(),
            1 => descriptors[0].summary(),
            n => format!("{} (+{} more errors)", descriptors[0].summary(), n - 1),
        };
        Error::ApiResponse {
            family,
            message,
            command,
            raw_response,
            error_descriptors: descriptors,
        }
    }

    /// Builds an [`Error::Http`] from a non-2xx status and its body text.
    pub fn http(family: ApiFamily, status: u16, raw_body: String) -> Self {
        let descriptors = serde_json::from_str::<Value>(&raw_body)
            .map(|parsed| error_descriptors(&parsed))
            .unwrap_or_default();
        let message = match descriptors.first() {
            Some(first) => first.summary(),
            None => format!("server returned HTTP {status}"),
        };
        Error::Http {
            family,
            status,
            message,
            raw_body,
            error_descriptors: descriptors,
        }
    }

    /// Returns the API family this error is tagged with, if any.
    pub fn family(&self) -> Option<ApiFamily> {
        match self {
            Error::Timeout { family, .. }
            | Error::Http { family, .. }
            | Error::UnexpectedResponse { family, .. }
            | Error::ApiResponse { family, .. }
            | Error::Connection { family, .. } => Some(*family),
            Error::Serialization(_) | Error::Configuration(_) => None,
        }
    }

    /// Returns true for transport-timeout and budget-exhaustion errors.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Error::Timeout { .. })
    }
}

/// A specialized `Result` type for Data API and DevOps API operations.
pub type Result<T> = std::result::Result<T, Error>;
