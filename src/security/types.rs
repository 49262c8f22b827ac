/*!
 * Security Types
 * Access decisions and initialization errors
 */

use crate::core::types::ErrorCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::sandbox::path::CanonicalPath;

/// Why a request was refused before reaching the filesystem
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "reason", content = "code")]
pub enum DenyReason {
    /// Canonicalization hit a non-ENOENT OS error (or the input was malformed)
    ResolutionFailed(ErrorCode),
    /// No allow-list root covers the canonical path
    PathNotCovered,
    /// A resolution buffer could not be allocated
    OutOfMemory,
}

impl DenyReason {
    /// Code surfaced to the caller for this denial
    #[must_use]
    pub const fn error_code(&self) -> ErrorCode {
        match self {
            DenyReason::ResolutionFailed(code) => *code,
            DenyReason::PathNotCovered => ErrorCode::ACCESS_DENIED,
            DenyReason::OutOfMemory => ErrorCode::OUT_OF_MEMORY,
        }
    }
}

/// Outcome of validating one path
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessDecision {
    Admitted(CanonicalPath),
    Denied(DenyReason),
}

impl AccessDecision {
    #[inline]
    #[must_use]
    pub const fn is_admitted(&self) -> bool {
        matches!(self, AccessDecision::Admitted(_))
    }

    #[inline]
    #[must_use]
    pub const fn is_denied(&self) -> bool {
        matches!(self, AccessDecision::Denied(_))
    }

    /// Canonical path if admitted
    #[must_use]
    pub fn canonical(&self) -> Option<&CanonicalPath> {
        match self {
            AccessDecision::Admitted(path) => Some(path),
            AccessDecision::Denied(_) => None,
        }
    }

    /// Deny reason if denied
    #[must_use]
    pub const fn deny_reason(&self) -> Option<DenyReason> {
        match self {
            AccessDecision::Admitted(_) => None,
            AccessDecision::Denied(reason) => Some(*reason),
        }
    }
}

/// Session initialization errors.
///
/// Any of these leaves the broker refusing ordinary operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InitError {
    #[error("Broker session already initialized")]
    AlreadyInitialized,

    #[error("No broker configuration supplied")]
    MissingConfiguration,

    #[error("Unsandboxed mode cannot be combined with allow-list roots")]
    ConflictingModes,

    #[error("Failed to read configuration {path}: {reason}")]
    ConfigRead { path: String, reason: String },

    #[error("Invalid configuration: {0}")]
    ConfigParse(String),

    #[error("Allow-list root must not be empty")]
    EmptyRoot,

    #[error("Allow-list root {0:?} is not absolute")]
    RelativeRoot(String),

    #[error("Allow-list root \"/\" is only available through unsandboxed mode")]
    WildcardRoot,

    #[error("Allow-list root {root:?} is not a directory")]
    NotADirectory { root: String },

    #[error("Allow-list root {root:?} could not be resolved: {code}")]
    RootResolution { root: String, code: ErrorCode },
}
