/*!
 * Operation Requests
 * Every filesystem operation a caller can ask the broker to perform
 */

use serde::{Deserialize, Serialize};
use std::os::fd::RawFd;

/// Filesystem operation request.
///
/// Paths are raw caller input; the broker resolves and validates them.
/// Timestamps are milliseconds since the Unix epoch.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum OperationRequest {
    // ========================================================================
    // Handle lifecycle
    // ========================================================================
    /// Open (or create) a file; `mode` is only consulted with `O_CREAT`
    Open { path: String, flags: i32, mode: u32 },

    /// Read up to `count` bytes
    Read { fd: RawFd, count: usize },

    /// Write `data`, returning the number of bytes written
    Write { fd: RawFd, data: Vec<u8> },

    /// Close a descriptor the caller owns
    Close { fd: RawFd },

    // ========================================================================
    // Metadata
    // ========================================================================
    Stat { path: String },

    /// Stat without following a final symlink
    Lstat { path: String },

    Fstat { fd: RawFd },

    Chmod { path: String, mode: u32 },

    Fchmod { fd: RawFd, mode: u32 },

    Utimes { path: String, atime_ms: f64, mtime_ms: f64 },

    /// Set times on a symlink itself
    Lutimes { path: String, atime_ms: f64, mtime_ms: f64 },

    Futimes { fd: RawFd, atime_ms: f64, mtime_ms: f64 },

    Truncate { path: String, length: i64 },

    Ftruncate { fd: RawFd, length: i64 },

    // ========================================================================
    // Directory entries
    // ========================================================================
    Unlink { path: String },

    Mkdir { path: String, mode: u32 },

    Rmdir { path: String },

    /// Both paths are validated
    Rename { from: String, to: String },

    /// Entry names excluding `.` and `..`
    Readdir { path: String },

    /// Create `link` pointing at `target`. Only `link` is validated; the
    /// target text is stored verbatim.
    Symlink { target: String, link: String },

    Readlink { path: String },
}

impl OperationRequest {
    /// Operation name for logging and tracing
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Open { .. } => "open",
            Self::Read { .. } => "read",
            Self::Write { .. } => "write",
            Self::Close { .. } => "close",
            Self::Stat { .. } => "stat",
            Self::Lstat { .. } => "lstat",
            Self::Fstat { .. } => "fstat",
            Self::Chmod { .. } => "chmod",
            Self::Fchmod { .. } => "fchmod",
            Self::Utimes { .. } => "utimes",
            Self::Lutimes { .. } => "lutimes",
            Self::Futimes { .. } => "futimes",
            Self::Truncate { .. } => "truncate",
            Self::Ftruncate { .. } => "ftruncate",
            Self::Unlink { .. } => "unlink",
            Self::Mkdir { .. } => "mkdir",
            Self::Rmdir { .. } => "rmdir",
            Self::Rename { .. } => "rename",
            Self::Readdir { .. } => "readdir",
            Self::Symlink { .. } => "symlink",
            Self::Readlink { .. } => "readlink",
        }
    }

    /// True for operations on an already-open descriptor (no path validation)
    #[must_use]
    pub const fn is_handle_based(&self) -> bool {
        matches!(
            self,
            Self::Read { .. }
                | Self::Write { .. }
                | Self::Close { .. }
                | Self::Fstat { .. }
                | Self::Fchmod { .. }
                | Self::Futimes { .. }
                | Self::Ftruncate { .. }
        )
    }
}
