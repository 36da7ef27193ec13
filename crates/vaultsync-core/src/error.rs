//! Error types for backend calls and local validation.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Machine-readable error codes reported by the vault backend.
pub mod codes {
    pub const AUTH_VAULT_LOCKED: &str = "AUTH002";
    pub const AUTH_UNKNOWN: &str = "AUTH999";

    pub const CATEGORY_INVALID_NAME: &str = "CAT001";
    pub const CATEGORY_DUPLICATE_NAME: &str = "CAT002";
    pub const CATEGORY_NOT_FOUND: &str = "CAT003";
    pub const CATEGORY_NOT_FOUND_BY_NAME: &str = "CAT004";
    pub const CATEGORY_UNKNOWN: &str = "CAT999";

    pub const ENTRY_NOT_FOUND: &str = "ENTRY003";
    pub const ENTRY_UNKNOWN: &str = "ENTRY999";

    pub const VAULT_OPERATION_FAILED: &str = "VAULT001";
    pub const VAULT_UNKNOWN: &str = "VAULT999";

    pub const UNKNOWN: &str = "UNKNOWN999";
}

/// Broad family an error code belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ErrorKind {
    Auth,
    Crypto,
    Category,
    Entry,
    PasswordGeneration,
    Vault,
    Io,
    Data,
    Validation,
    Unknown,
}

/// Typed failure of a backend command.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[error("{message} [{code}]")]
pub struct BackendError {
    pub kind: ErrorKind,
    pub code: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl BackendError {
    pub fn new(kind: ErrorKind, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            code: code.into(),
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn vault_locked() -> Self {
        Self::new(ErrorKind::Auth, codes::AUTH_VAULT_LOCKED, "Vault is locked")
    }

    pub fn entry_not_found(id: impl std::fmt::Display) -> Self {
        Self::new(ErrorKind::Entry, codes::ENTRY_NOT_FOUND, "Entry not found")
            .with_details(format!("Entry ID: {id}"))
    }

    pub fn category_not_found(id: impl std::fmt::Display) -> Self {
        Self::new(ErrorKind::Category, codes::CATEGORY_NOT_FOUND, "Category not found")
            .with_details(format!("Category ID: {id}"))
    }

    pub fn invalid_category_name(name: &str) -> Self {
        Self::new(
            ErrorKind::Category,
            codes::CATEGORY_INVALID_NAME,
            format!("Invalid category name: '{name}'"),
        )
    }

    pub fn duplicate_category_name(name: &str) -> Self {
        Self::new(
            ErrorKind::Category,
            codes::CATEGORY_DUPLICATE_NAME,
            format!("Category with name '{name}' already exists"),
        )
        .with_details(format!("Category: {name}"))
    }

    pub fn operation_failed(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Vault, codes::VAULT_OPERATION_FAILED, message)
    }

    pub fn is_code(&self, code: &str) -> bool {
        self.code == code
    }

    /// Message suitable for a notification, with context appended when the
    /// backend supplied any.
    pub fn user_message(&self) -> String {
        match &self.details {
            Some(details) if !details.is_empty() => format!("{} ({})", self.message, details),
            _ => self.message.clone(),
        }
    }
}

/// Input rejected before any backend call is made.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Category name cannot be empty.")]
    EmptyCategoryName,
}

/// Any failure surfaced by the synchronization engine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyncError {
    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error(transparent)]
    Validation(#[from] ValidationError),
}

impl SyncError {
    pub fn user_message(&self) -> String {
        match self {
            SyncError::Backend(err) => err.user_message(),
            SyncError::Validation(err) => err.to_string(),
        }
    }
}
