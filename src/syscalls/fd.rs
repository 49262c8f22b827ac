/*!
 * Handle-Based Operations
 * Operate on descriptors the caller already holds; no path validation
 */

use crate::core::types::ErrorCode;
use std::fs::Permissions;
use std::os::fd::RawFd;
use std::os::unix::fs::PermissionsExt;
use tracing::trace;

use super::executor::OperationDispatcher;
use super::sys;
use super::types::{OperationResponse, ResponsePayload, StatResult};

impl OperationDispatcher {
    pub(super) fn read(&self, fd: RawFd, count: usize) -> OperationResponse {
        match sys::read(fd, count) {
            Ok(data) => {
                trace!(fd, requested = count, read = data.len(), "Read");
                OperationResponse::success(ResponsePayload::Data(data))
            }
            Err(code) => OperationResponse::failure(code),
        }
    }

    pub(super) fn write(&self, fd: RawFd, data: &[u8]) -> OperationResponse {
        match sys::write(fd, data) {
            Ok(n) => {
                trace!(fd, written = n, "Write");
                // A single write never exceeds isize::MAX bytes
                OperationResponse::success(ResponsePayload::Written(n as isize))
            }
            Err(code) => OperationResponse::write_failure(code),
        }
    }

    /// The descriptor arrives with the request; closing it ends its life
    pub(super) fn close(&self, fd: RawFd) -> OperationResponse {
        match sys::close(fd) {
            Ok(()) => OperationResponse::ok(),
            Err(code) => OperationResponse::failure(code),
        }
    }

    pub(super) fn fstat(&self, fd: RawFd) -> OperationResponse {
        let result = sys::borrow_file(fd)
            .and_then(|file| file.metadata().map_err(|e| ErrorCode::from_io_error(&e)));
        match result {
            Ok(meta) => OperationResponse::stat(StatResult::from_metadata(&meta)),
            Err(code) => OperationResponse::stat_failure(code),
        }
    }

    pub(super) fn fchmod(&self, fd: RawFd, mode: u32) -> OperationResponse {
        let result = sys::borrow_file(fd).and_then(|file| {
            file.set_permissions(Permissions::from_mode(mode))
                .map_err(|e| ErrorCode::from_io_error(&e))
        });
        OperationResponse::completed(result)
    }

    pub(super) fn futimes(&self, fd: RawFd, atime_ms: f64, mtime_ms: f64) -> OperationResponse {
        OperationResponse::completed(sys::futimes(fd, atime_ms, mtime_ms))
    }

    pub(super) fn ftruncate(&self, fd: RawFd, length: i64) -> OperationResponse {
        let Ok(length) = u64::try_from(length) else {
            return OperationResponse::failure(ErrorCode::from_errno(libc::EINVAL));
        };
        let result = sys::borrow_file(fd)
            .and_then(|file| file.set_len(length).map_err(|e| ErrorCode::from_io_error(&e)));
        OperationResponse::completed(result)
    }
}

