//! Unified application error model and mapping helpers.
//! One tagged enum shared by the service layer and the HTTP frontend, so
//! every surface reports the same codes and the same status mapping.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

use crate::storage::StoreError;

/// A single field-scoped validation failure. Forms collect the full list so
/// the client can render every failing field inline in one pass.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FieldError {
    pub field: String,
    pub code: String,
    pub message: String,
}

impl FieldError {
    pub fn new<S: Into<String>>(field: S, code: S, message: S) -> Self {
        FieldError { field: field.into(), code: code.into(), message: message.into() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PortalError {
    /// Bad credentials or a registration the auth collaborator refused.
    Auth { code: String, message: String },
    /// Capability check failed. The message stays generic: which roles exist
    /// is not disclosed to the caller.
    Forbidden { code: String, message: String },
    /// Malformed submission; carries one entry per failing field and blocks
    /// the write entirely.
    Validation { code: String, message: String, fields: Vec<FieldError> },
    NotFound { code: String, message: String },
    Csrf { code: String, message: String },
    /// Backend collaborator unreachable or erroring; the operation failed and
    /// may be retried by the user. No automatic retry happens here.
    Unavailable { code: String, message: String },
    Internal { code: String, message: String },
}

impl PortalError {
    pub fn code_str(&self) -> &str {
        match self {
            PortalError::Auth { code, .. }
            | PortalError::Forbidden { code, .. }
            | PortalError::Validation { code, .. }
            | PortalError::NotFound { code, .. }
            | PortalError::Csrf { code, .. }
            | PortalError::Unavailable { code, .. }
            | PortalError::Internal { code, .. } => code.as_str(),
        }
    }

    pub fn message(&self) -> &str {
        match self {
            PortalError::Auth { message, .. }
            | PortalError::Forbidden { message, .. }
            | PortalError::Validation { message, .. }
            | PortalError::NotFound { message, .. }
            | PortalError::Csrf { message, .. }
            | PortalError::Unavailable { message, .. }
            | PortalError::Internal { message, .. } => message.as_str(),
        }
    }

    pub fn fields(&self) -> &[FieldError] {
        match self {
            PortalError::Validation { fields, .. } => fields.as_slice(),
            _ => &[],
        }
    }

    pub fn auth(code: impl Into<String>, msg: impl Into<String>) -> Self {
        PortalError::Auth { code: code.into(), message: msg.into() }
    }

    /// The one generic denial used for every failed capability check.
    pub fn access_denied() -> Self {
        PortalError::Forbidden { code: "access_denied".into(), message: "Access denied".into() }
    }

    pub fn validation(fields: Vec<FieldError>) -> Self {
        PortalError::Validation {
            code: "invalid_fields".into(),
            message: "one or more fields failed validation".into(),
            fields,
        }
    }

    pub fn not_found(code: impl Into<String>, msg: impl Into<String>) -> Self {
        PortalError::NotFound { code: code.into(), message: msg.into() }
    }

    pub fn csrf(code: impl Into<String>, msg: impl Into<String>) -> Self {
        PortalError::Csrf { code: code.into(), message: msg.into() }
    }

    pub fn unavailable(code: impl Into<String>, msg: impl Into<String>) -> Self {
        PortalError::Unavailable { code: code.into(), message: msg.into() }
    }

    pub fn internal(code: impl Into<String>, msg: impl Into<String>) -> Self {
        PortalError::Internal { code: code.into(), message: msg.into() }
    }

    /// Map to HTTP status code.
    pub fn http_status(&self) -> u16 {
        match self {
            PortalError::Auth { .. } => 401,
            PortalError::Forbidden { .. } => 403,
            PortalError::Validation { .. } => 422,
            PortalError::NotFound { .. } => 404,
            PortalError::Csrf { .. } => 403,
            PortalError::Unavailable { .. } => 503,
            PortalError::Internal { .. } => 500,
        }
    }
}

impl Display for PortalError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code_str(), self.message())
    }
}

impl std::error::Error for PortalError {}

pub type PortalResult<T> = Result<T, PortalError>;

impl From<StoreError> for PortalError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound => PortalError::not_found("not_found", "record not found"),
            // Duplicates surface where callers can say something specific;
            // the fallback keeps the retryable contract.
            other => PortalError::unavailable("backend_unavailable", other.to_string()),
        }
    }
}

impl From<anyhow::Error> for PortalError {
    fn from(err: anyhow::Error) -> Self {
        PortalError::Internal { code: "internal".into(), message: err.to_string() }
    }
}
