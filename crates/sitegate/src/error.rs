//! Error types for sitegate.
//!
//! This module defines all error types used throughout the sitegate crate,
//! providing detailed context for debugging and a short user-facing message
//! for every failure.

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for sitegate operations.
#[derive(Error, Debug)]
pub enum Error {
    // === Storage Errors ===
    /// Failed to open or create the database.
    #[error("failed to open database at {path}: {source}")]
    DatabaseOpen {
        /// Path to the database file.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: rusqlite::Error,
    },

    /// A database query failed.
    #[error("database query failed: {0}")]
    DatabaseQuery(#[from] rusqlite::Error),

    /// Failed to run database migrations.
    #[error("database migration failed: {message}")]
    DatabaseMigration {
        /// Description of what went wrong.
        message: String,
    },

    /// A stored value could not be decoded into its domain type.
    #[error("corrupt {column} value in storage: {value}")]
    CorruptValue {
        /// Column the value was read from.
        column: &'static str,
        /// The raw stored value.
        value: String,
    },

    // === Configuration Errors ===
    /// Failed to load configuration.
    #[error("failed to load configuration: {0}")]
    ConfigLoad(Box<figment::Error>),

    /// Configuration validation failed.
    #[error("invalid configuration: {message}")]
    ConfigValidation {
        /// Description of the validation failure.
        message: String,
    },

    // === Session Errors ===
    /// No user profile matches the requested session identity.
    #[error("no user profile for {email}")]
    UnknownUser {
        /// The email the session was requested for.
        email: String,
    },

    /// The user profile exists but is not active.
    #[error("user {email} is not active")]
    InactiveUser {
        /// The inactive user's email.
        email: String,
    },

    /// The session's role does not grant the required permission.
    #[error("access denied: {role} cannot {permission}")]
    AccessDenied {
        /// Role held by the session.
        role: String,
        /// The permission that was required.
        permission: String,
    },

    // === RAMS Gate Errors ===
    /// The minimum reading time has not elapsed.
    #[error("reading incomplete: {elapsed}s of {required}s read")]
    ReadingIncomplete {
        /// Seconds read so far.
        elapsed: u32,
        /// Minimum seconds required.
        required: u32,
    },

    /// The document has not been scrolled far enough.
    #[error("document not scrolled to the end ({percent}% of {required}%)")]
    ScrollIncomplete {
        /// Scroll position reached, in percent.
        percent: u32,
        /// Scroll position required, in percent.
        required: u32,
    },

    /// A signature was submitted with no image data.
    #[error("signature is empty")]
    SignatureMissing,

    /// The signature image exceeds the configured size limit.
    #[error("signature is {size} bytes, limit is {limit}")]
    SignatureTooLarge {
        /// Size of the submitted image.
        size: usize,
        /// Configured maximum.
        limit: usize,
    },

    /// The contractor has already signed this document version.
    #[error("contractor {contractor_id} already signed document {document_id} v{version}")]
    AlreadySigned {
        /// Contractor user id.
        contractor_id: i64,
        /// Document row id.
        document_id: i64,
        /// Document version.
        version: u32,
    },

    /// The requested state transition is not permitted from the current state.
    #[error("cannot {action} while {state}")]
    InvalidTransition {
        /// The current state.
        state: String,
        /// The attempted action.
        action: &'static str,
    },

    /// The document version has been superseded by a newer revision.
    #[error("document {reference} v{version} has been superseded")]
    DocumentSuperseded {
        /// Document series reference.
        reference: String,
        /// The superseded version.
        version: u32,
    },

    /// Skipping the reading timer is disabled.
    #[error("skipping the reading timer is disabled")]
    SkipDisabled,

    /// The contractor has outstanding RAMS for the activity.
    #[error("{activity} is blocked: {outstanding} RAMS document(s) outstanding")]
    ComplianceBlocked {
        /// The blocked activity.
        activity: String,
        /// Number of outstanding documents covering it.
        outstanding: usize,
    },

    // === Record Errors ===
    /// A record was not found.
    #[error("{entity} {id} not found")]
    NotFound {
        /// Kind of record.
        entity: &'static str,
        /// The identifier that was looked up.
        id: String,
    },

    /// Input failed validation.
    #[error("invalid {field}: {message}")]
    Validation {
        /// Name of the offending field.
        field: &'static str,
        /// Description of the problem.
        message: String,
    },

    // === I/O Errors ===
    /// Failed to create a required directory.
    #[error("failed to create directory {path}: {source}")]
    DirectoryCreate {
        /// Path that couldn't be created.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    // === Serialization Errors ===
    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // === Generic Errors ===
    /// An internal error occurred (bug).
    #[error("internal error: {0}")]
    Internal(String),
}

/// A specialized Result type for sitegate operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Self::ConfigLoad(Box::new(err))
    }
}

impl Error {
    /// Create a new internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Create a validation error for a named field.
    #[must_use]
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        Self::Validation {
            field,
            message: message.into(),
        }
    }

    /// Create a not-found error.
    #[must_use]
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// Check if this error was caused by the caller's input or state rather
    /// than by the storage or environment.
    #[must_use]
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            Self::UnknownUser { .. }
                | Self::InactiveUser { .. }
                | Self::AccessDenied { .. }
                | Self::ReadingIncomplete { .. }
                | Self::ScrollIncomplete { .. }
                | Self::SignatureMissing
                | Self::SignatureTooLarge { .. }
                | Self::AlreadySigned { .. }
                | Self::InvalidTransition { .. }
                | Self::DocumentSuperseded { .. }
                | Self::SkipDisabled
                | Self::ComplianceBlocked { .. }
                | Self::NotFound { .. }
                | Self::Validation { .. }
        )
    }

    /// Check if this error is an access-control failure.
    #[must_use]
    pub fn is_access_denied(&self) -> bool {
        matches!(
            self,
            Self::AccessDenied { .. } | Self::InactiveUser { .. } | Self::UnknownUser { .. }
        )
    }

    /// Short message suitable for showing to the person who triggered the action.
    ///
    /// User errors repeat their own description; anything else collapses to a
    /// generic failure so storage details never reach the operator's screen.
    #[must_use]
    pub fn user_message(&self) -> String {
        if self.is_user_error() {
            let mut msg = self.to_string();
            if let Some(first) = msg.get_mut(0..1) {
                first.make_ascii_uppercase();
            }
            msg
        } else {
            "Something went wrong. Nothing was changed, please try again.".to_string()
        }
    }
}
