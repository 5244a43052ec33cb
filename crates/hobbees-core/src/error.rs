//! Error types for `hobbees-core`.
//!
//! Validation failures ([`SchemaError`], [`FormErrors`]) are produced locally
//! and never reach the network. Everything else is surfaced by a gateway.

use std::{collections::BTreeMap, fmt};

use thiserror::Error;

use crate::schema::FieldRule;

// ─── Validation ──────────────────────────────────────────────────────────────

/// Why a schema draft (or a schema received from elsewhere) is unusable.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
  #[error("a schema needs at least one field")]
  NoFields,

  #[error("field name must not be blank")]
  BlankFieldName,

  #[error("category name must not be blank")]
  BlankCategoryName,

  #[error("duplicate field name: {0:?}")]
  DuplicateField(String),

  #[error("this hobby already has a category named {0:?}")]
  DuplicateCategory(String),
}

/// A single field that failed validation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FieldError {
  #[error("this field is required")]
  Required,

  #[error("expected a {expected} value, got {input:?}")]
  Type { expected: FieldRule, input: String },

  #[error("no such field in this schema")]
  UnknownField,
}

/// Per-field errors collected while submitting a form, keyed by field name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormErrors(BTreeMap<String, FieldError>);

impl FormErrors {
  pub fn new() -> Self { Self::default() }

  pub fn insert(&mut self, field: impl Into<String>, error: FieldError) {
    self.0.insert(field.into(), error);
  }

  pub fn get(&self, field: &str) -> Option<&FieldError> { self.0.get(field) }

  pub fn is_empty(&self) -> bool { self.0.is_empty() }

  pub fn len(&self) -> usize { self.0.len() }

  pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldError)> {
    self.0.iter().map(|(k, v)| (k.as_str(), v))
  }
}

impl fmt::Display for FormErrors {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "invalid fields: ")?;
    for (i, (field, error)) in self.0.iter().enumerate() {
      if i > 0 {
        write!(f, "; ")?;
      }
      write!(f, "{field} ({error})")?;
    }
    Ok(())
  }
}

impl std::error::Error for FormErrors {}

// ─── Crate error ─────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum Error {
  #[error("invalid schema: {0}")]
  Schema(#[from] SchemaError),

  #[error("{0}")]
  Form(#[from] FormErrors),

  /// The target entity no longer exists (HTTP 404).
  #[error("not found: {0}")]
  NotFound(String),

  /// The credential was missing or rejected (HTTP 401/403).
  #[error("not authorized: {0}")]
  Unauthorized(String),

  #[error("network error: {0}")]
  Network(String),

  /// The client was set up with unusable settings, e.g. a malformed base URL.
  #[error("invalid configuration: {0}")]
  Config(String),

  /// Any other non-success response from the backend.
  #[error("server returned {status}: {detail}")]
  Remote { status: u16, detail: String },

  /// The user declined a confirmation prompt; nothing was sent.
  #[error("action cancelled")]
  NotConfirmed,

  #[error("credential storage error: {0}")]
  Credentials(String),

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

impl Error {
  /// Local validation failure; no request was issued.
  pub fn is_validation(&self) -> bool {
    matches!(self, Self::Schema(_) | Self::Form(_))
  }

  /// The session must be cleared and the user must log in again.
  pub fn is_auth(&self) -> bool { matches!(self, Self::Unauthorized(_)) }

  pub fn is_not_found(&self) -> bool { matches!(self, Self::NotFound(_)) }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
