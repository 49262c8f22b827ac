/*!
 * Core Types
 * Identifiers and the portable error code shared by broker and caller
 */

use nix::errno::Errno;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Channel identifier (one per client connection)
pub type ChannelId = u64;

/// Portable result code carried by every response.
///
/// `0` is success, positive values are raw POSIX errno values from the host,
/// and negative values are broker sentinels that can never collide with an errno.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ErrorCode(i32);

impl ErrorCode {
    /// Operation succeeded
    pub const SUCCESS: ErrorCode = ErrorCode(0);

    /// Path falls outside every allow-list root, or the session is not initialized
    pub const ACCESS_DENIED: ErrorCode = ErrorCode(-1);

    /// A bounded buffer could not grow far enough, or allocation failed
    pub const OUT_OF_MEMORY: ErrorCode = ErrorCode(-2);

    /// Wrap a raw errno value.
    ///
    /// Zero or negative input is not a valid errno; it is mapped to `EIO`
    /// so a failed syscall is never reported as success or as a sentinel.
    #[inline]
    #[must_use]
    pub const fn from_errno(errno: i32) -> Self {
        if errno > 0 {
            Self(errno)
        } else {
            Self(libc::EIO)
        }
    }

    /// Extract the errno from an I/O error (EIO when the error carries none)
    #[must_use]
    pub fn from_io_error(err: &std::io::Error) -> Self {
        Self::from_errno(err.raw_os_error().unwrap_or(libc::EIO))
    }

    /// Rebuild a code from its wire value
    #[inline]
    #[must_use]
    pub const fn from_raw(raw: i32) -> Self {
        Self(raw)
    }

    #[inline]
    #[must_use]
    pub const fn raw(self) -> i32 {
        self.0
    }

    #[inline]
    #[must_use]
    pub const fn is_success(self) -> bool {
        self.0 == 0
    }

    #[inline]
    #[must_use]
    pub const fn is_access_denied(self) -> bool {
        self.0 == Self::ACCESS_DENIED.0
    }

    #[inline]
    #[must_use]
    pub const fn is_out_of_memory(self) -> bool {
        self.0 == Self::OUT_OF_MEMORY.0
    }

    /// The errno value, if this code carries one
    #[inline]
    #[must_use]
    pub const fn errno(self) -> Option<i32> {
        if self.0 > 0 {
            Some(self.0)
        } else {
            None
        }
    }

    /// Human-readable message (strerror text for OS errors)
    #[must_use]
    pub fn message(self) -> String {
        match self.0 {
            0 => "Success".to_string(),
            -1 => "Access denied by broker policy".to_string(),
            -2 => "Out of memory".to_string(),
            errno if errno > 0 => Errno::from_raw(errno).desc().to_string(),
            other => format!("Unknown broker code {}", other),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.message(), self.0)
    }
}

/// Opaque caller-side handle identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HandleId(u64);

impl HandleId {
    #[inline]
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    #[inline]
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for HandleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "handle#{}", self.0)
    }
}
