//! Error types for the webhook-triggered check domain.
//!
//! [`WebhookError`] is the closed taxonomy of request outcomes that reach the
//! notifier. Every HTTP status the listener writes is derived from it by an
//! exhaustive `match`; no other error type is inspected at the transport layer.
//!
//! The remaining types are collaborator-level errors. They are converted into a
//! [`WebhookError`] at the service boundary, or reported as events when they
//! occur on the asynchronous dispatch path.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ResourceConfigId;

// ---------------------------------------------------------------------------
// Request outcome taxonomy
// ---------------------------------------------------------------------------

/// Why an inbound webhook request was not accepted.
///
/// [`WebhookError::BackendFailure`] is never conflated with
/// [`WebhookError::Unauthorized`]: a credential store outage must not look like
/// a wrong token to the notifier.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum WebhookError {
    /// A required query parameter was absent or empty.
    #[error("missing required parameter '{parameter}'")]
    InputMissing {
        /// Name of the missing query parameter.
        parameter: String,
    },

    /// The addressed pipeline or resource does not exist, or a shared webhook
    /// matched no resource.
    #[error("{message}")]
    NotFound {
        /// Human-readable description; never contains the supplied token.
        message: String,
    },

    /// The supplied token does not equal the resource's evaluated secret.
    #[error("invalid webhook token")]
    Unauthorized,

    /// Persistence or credential evaluation failed.
    #[error("{message}")]
    BackendFailure {
        /// Human-readable description of the failing backend.
        message: String,
    },
}

impl WebhookError {
    /// Creates an [`WebhookError::InputMissing`] for `parameter`.
    pub fn input_missing(parameter: impl Into<String>) -> Self {
        Self::InputMissing {
            parameter: parameter.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Collaborator errors
// ---------------------------------------------------------------------------

/// Errors raised by the persistence layer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The backing store could not serve the request.
    #[error("store unavailable: {message}")]
    Backend {
        /// Description of the failure.
        message: String,
    },

    /// Stored records contradict each other.
    #[error("store is inconsistent: {message}")]
    Inconsistent {
        /// Description of the contradiction.
        message: String,
    },
}

/// Errors raised while evaluating a templated credential.
///
/// None of these variants may be treated as a token mismatch.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CredentialError {
    /// The template references a variable no source defines.
    #[error("undefined credential variable '{name}'")]
    UndefinedVariable {
        /// Name of the missing variable.
        name: String,
    },

    /// The template is syntactically invalid.
    #[error("malformed credential template: {reason}")]
    MalformedTemplate {
        /// What is wrong with the template; never contains the template text.
        reason: String,
    },

    /// The credential backend could not be reached or returned an error.
    #[error("credential backend failure: {message}")]
    Backend {
        /// Description of the failure.
        message: String,
    },
}

/// Errors raised by the scanning subsystem when a scan is triggered.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScanError {
    /// The scanner refused the request (client-side problem).
    #[error("scan rejected ({status}): {message}")]
    Rejected {
        /// Status code returned by the scanner.
        status: u16,
        /// Body or reason returned by the scanner.
        message: String,
    },

    /// The scanner is temporarily unable to accept scans.
    #[error("scanner unavailable ({status}): {message}")]
    Unavailable {
        /// Status code returned by the scanner.
        status: u16,
        /// Body or reason returned by the scanner.
        message: String,
    },

    /// The scanner could not be reached.
    #[error("scanner transport failure: {message}")]
    Transport {
        /// Description of the failure.
        message: String,
    },
}

/// Errors raised while determining where a scan should resume.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResumePointError {
    /// The configuration identity or latest version could not be looked up.
    #[error(transparent)]
    Lookup(#[from] StoreError),

    /// The latest version belongs to a different configuration identity than
    /// the one it was requested for.
    #[error("latest version belongs to resource config {found}, expected {expected}")]
    IdentityMismatch {
        /// Identity the lookup was made for.
        expected: ResourceConfigId,
        /// Identity carried by the returned version.
        found: ResourceConfigId,
    },
}
