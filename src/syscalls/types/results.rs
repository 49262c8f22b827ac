/*!
 * Operation Results
 * Responses, payloads, and the stat record
 */

use crate::core::types::ErrorCode;
use crate::syscalls::time::to_millis;
use serde::{Deserialize, Serialize};
use std::fs::Metadata;
use std::os::fd::OwnedFd;
use std::os::unix::fs::MetadataExt;

/// Snapshot of the 13 stat fields plus the code of the call that produced it
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatResult {
    pub dev: u64,
    pub ino: u64,
    pub mode: u32,
    pub nlink: u64,
    pub uid: u32,
    pub gid: u32,
    pub rdev: u64,
    pub size: u64,
    pub blksize: u64,
    pub blocks: u64,
    pub atime_ms: f64,
    pub mtime_ms: f64,
    pub ctime_ms: f64,
    pub error: ErrorCode,
}

impl StatResult {
    #[must_use]
    pub fn from_metadata(meta: &Metadata) -> Self {
        Self {
            dev: meta.dev(),
            ino: meta.ino(),
            mode: meta.mode(),
            nlink: meta.nlink(),
            uid: meta.uid(),
            gid: meta.gid(),
            rdev: meta.rdev(),
            size: meta.size(),
            blksize: meta.blksize(),
            blocks: meta.blocks(),
            atime_ms: to_millis(meta.atime(), meta.atime_nsec()),
            mtime_ms: to_millis(meta.mtime(), meta.mtime_nsec()),
            ctime_ms: to_millis(meta.ctime(), meta.ctime_nsec()),
            error: ErrorCode::SUCCESS,
        }
    }

    /// Zeroed record carrying only the failure code
    #[must_use]
    pub fn failed(error: ErrorCode) -> Self {
        Self {
            error,
            ..Self::default()
        }
    }

    #[inline]
    fn file_type(&self) -> u32 {
        self.mode & libc::S_IFMT as u32
    }

    #[must_use]
    pub fn is_file(&self) -> bool {
        self.file_type() == libc::S_IFREG as u32
    }

    #[must_use]
    pub fn is_directory(&self) -> bool {
        self.file_type() == libc::S_IFDIR as u32
    }

    #[must_use]
    pub fn is_block_device(&self) -> bool {
        self.file_type() == libc::S_IFBLK as u32
    }

    #[must_use]
    pub fn is_character_device(&self) -> bool {
        self.file_type() == libc::S_IFCHR as u32
    }

    #[must_use]
    pub fn is_symbolic_link(&self) -> bool {
        self.file_type() == libc::S_IFLNK as u32
    }

    #[must_use]
    pub fn is_fifo(&self) -> bool {
        self.file_type() == libc::S_IFIFO as u32
    }

    #[must_use]
    pub fn is_socket(&self) -> bool {
        self.file_type() == libc::S_IFSOCK as u32
    }

    /// Permission bits only
    #[must_use]
    pub fn permissions(&self) -> u32 {
        self.mode & 0o7777
    }
}

/// Operation-specific success payload
#[derive(Debug)]
pub enum ResponsePayload {
    None,
    /// Newly opened descriptor; ownership passes to the receiver
    Descriptor(OwnedFd),
    /// Bytes read, sized to what the OS returned
    Data(Vec<u8>),
    /// Bytes written, or -1 on failure
    Written(isize),
    Stat(StatResult),
    Entries(Vec<String>),
    Link(String),
}

/// One response per request
#[derive(Debug)]
pub struct OperationResponse {
    pub error: ErrorCode,
    pub payload: ResponsePayload,
}

impl OperationResponse {
    #[inline]
    #[must_use]
    pub fn new(error: ErrorCode, payload: ResponsePayload) -> Self {
        Self { error, payload }
    }

    /// Success with no payload
    #[inline]
    #[must_use]
    pub fn ok() -> Self {
        Self::new(ErrorCode::SUCCESS, ResponsePayload::None)
    }

    #[inline]
    #[must_use]
    pub fn success(payload: ResponsePayload) -> Self {
        Self::new(ErrorCode::SUCCESS, payload)
    }

    #[inline]
    #[must_use]
    pub fn failure(error: ErrorCode) -> Self {
        Self::new(error, ResponsePayload::None)
    }

    /// Empty success, or the failure code
    #[must_use]
    pub fn completed(result: Result<(), ErrorCode>) -> Self {
        match result {
            Ok(()) => Self::ok(),
            Err(code) => Self::failure(code),
        }
    }

    /// Refused by the allow-list or session state
    #[inline]
    #[must_use]
    pub fn denied() -> Self {
        Self::failure(ErrorCode::ACCESS_DENIED)
    }

    #[must_use]
    pub fn stat(stat: StatResult) -> Self {
        Self::new(stat.error, ResponsePayload::Stat(stat))
    }

    /// Stat-family failures still carry a record so the code travels with it
    #[must_use]
    pub fn stat_failure(error: ErrorCode) -> Self {
        Self::stat(StatResult::failed(error))
    }

    /// Write-family failures report -1 bytes
    #[must_use]
    pub fn write_failure(error: ErrorCode) -> Self {
        Self::new(error, ResponsePayload::Written(-1))
    }

    #[inline]
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.error.is_success()
    }

    pub fn descriptor(&self) -> Option<&OwnedFd> {
        match &self.payload {
            ResponsePayload::Descriptor(fd) => Some(fd),
            _ => None,
        }
    }

    /// Take ownership of an opened descriptor
    pub fn into_descriptor(self) -> Option<OwnedFd> {
        match self.payload {
            ResponsePayload::Descriptor(fd) => Some(fd),
            _ => None,
        }
    }

    pub fn data(&self) -> Option<&[u8]> {
        match &self.payload {
            ResponsePayload::Data(data) => Some(data),
            _ => None,
        }
    }

    pub fn written(&self) -> Option<isize> {
        match self.payload {
            ResponsePayload::Written(n) => Some(n),
            _ => None,
        }
    }

    pub fn stat_result(&self) -> Option<&StatResult> {
        match &self.payload {
            ResponsePayload::Stat(stat) => Some(stat),
            _ => None,
        }
    }

    pub fn entries(&self) -> Option<&[String]> {
        match &self.payload {
            ResponsePayload::Entries(entries) => Some(entries),
            _ => None,
        }
    }

    pub fn link(&self) -> Option<&str> {
        match &self.payload {
            ResponsePayload::Link(target) => Some(target),
            _ => None,
        }
    }
}
