//! Error types for the CRM client core.
//!
//! # Design
//! Three kinds of failure reach callers: the service answered with a non-2xx
//! status (`Transport`), a payload could not be mapped to or from a typed
//! entity (`Marshalling`), or the caller named a sub-resource that is absent
//! from the set they last fetched (`Lookup`). Codec and envelope functions
//! return `MarshallingError` directly; facade `build_*` / `parse_*` methods
//! return `ApiError`, which only adds the operation name.

use thiserror::Error;

/// A value could not be converted between its typed and wire forms, or a
/// pre-flight identifier check failed.
#[derive(Debug, Error)]
pub enum MarshallingError {
    /// A mapped property held a value its field type cannot represent.
    #[error("property `{property}` cannot be read as {expected}: got {found}")]
    Coercion {
        property: String,
        expected: &'static str,
        found: String,
    },

    /// An update-style operation was attempted without a server-assigned id.
    #[error("{entity} must have an id of at least 1")]
    MissingId { entity: &'static str },

    /// A create-style operation was handed an entity that already has an id.
    #[error("{entity} must not carry an id ({id}) when created")]
    UnexpectedId { entity: &'static str, id: i64 },

    /// A value the operation cannot do without is absent.
    #[error("{entity} requires `{field}` to be set")]
    MissingField {
        entity: &'static str,
        field: &'static str,
    },

    /// The payload parsed as JSON but does not have the expected shape.
    #[error("malformed payload: {0}")]
    Malformed(String),

    /// The payload is not valid JSON, or a typed record failed to (de)serialize.
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// A caller-supplied key does not exist in the collection it refers to.
#[derive(Debug, Error)]
#[error("{resource} `{key}` does not exist")]
pub struct LookupError {
    pub resource: &'static str,
    pub key: String,
}

/// Client configuration could not be assembled.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("no credentials found: set HUBSPOT_API_KEY or HUBSPOT_ACCESS_TOKEN")]
    MissingCredentials,

    #[error("base url `{0}` must start with http:// or https://")]
    InvalidBaseUrl(String),
}

/// What went wrong inside a facade operation.
#[derive(Debug, Error)]
pub enum ErrorKind {
    /// The service returned a non-2xx status. The raw body is kept verbatim,
    /// including any per-item batch failure report.
    #[error("HTTP {status}: {body}")]
    Transport { status: u16, body: String },

    #[error(transparent)]
    Marshalling(#[from] MarshallingError),

    #[error(transparent)]
    Lookup(#[from] LookupError),
}

/// Error returned by facade `build_*` and `parse_*` methods.
#[derive(Debug, Error)]
#[error("{operation}: {kind}")]
pub struct ApiError {
    /// Dotted operation name, e.g. `contacts.update`.
    pub operation: &'static str,
    #[source]
    pub kind: ErrorKind,
}

impl ApiError {
    pub fn new(operation: &'static str, kind: impl Into<ErrorKind>) -> Self {
        Self {
            operation,
            kind: kind.into(),
        }
    }

    /// HTTP status for transport failures.
    pub fn status(&self) -> Option<u16> {
        match &self.kind {
            ErrorKind::Transport { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }
}

/// Attach an operation name to lower-level results.
pub(crate) trait Operation<T> {
    fn during(self, operation: &'static str) -> Result<T, ApiError>;
}

impl<T, E: Into<ErrorKind>> Operation<T> for Result<T, E> {
    fn during(self, operation: &'static str) -> Result<T, ApiError> {
        self.map_err(|e| ApiError::new(operation, e))
    }
}
