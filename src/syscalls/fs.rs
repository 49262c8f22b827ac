/*!
 * Path-Based Operations
 * Every handler validates its path(s) before touching the filesystem
 */

use crate::core::types::ErrorCode;
use std::fs::{self, DirBuilder, Permissions};
use std::io;
use std::os::unix::fs::{DirBuilderExt, PermissionsExt};
use tracing::{debug, trace};

use super::executor::OperationDispatcher;
use super::flags::{wants_write, O_NOFOLLOW};
use super::sys;
use super::types::{OperationResponse, ResponsePayload, StatResult};
use crate::security::ResolveMode;

#[inline]
fn io_code(err: io::Error) -> ErrorCode {
    ErrorCode::from_io_error(&err)
}

fn stat_response(result: Result<fs::Metadata, ErrorCode>) -> OperationResponse {
    match result {
        Ok(meta) => OperationResponse::stat(StatResult::from_metadata(&meta)),
        Err(code) => OperationResponse::stat_failure(code),
    }
}

impl OperationDispatcher {
    /// With `O_NOFOLLOW` the final component is checked and opened as is, so a
    /// trailing symlink fails with `ELOOP` instead of being followed.
    pub(super) fn open(&self, path: &str, flags: i32, mode: u32) -> OperationResponse {
        let resolve = if flags & O_NOFOLLOW != 0 {
            ResolveMode::NoFollow
        } else {
            ResolveMode::Follow
        };
        let target = match self.admit(path, resolve) {
            Ok(target) => target,
            Err(code) => return OperationResponse::failure(code),
        };

        match sys::open(&target, flags, mode) {
            Ok(fd) => {
                debug!(path = ?target, flags, write = wants_write(flags), "Opened");
                OperationResponse::success(ResponsePayload::Descriptor(fd))
            }
            Err(code) => OperationResponse::failure(code),
        }
    }

    pub(super) fn stat(&self, path: &str) -> OperationResponse {
        stat_response(
            self.admit(path, ResolveMode::Follow)
                .and_then(|target| fs::metadata(target).map_err(io_code)),
        )
    }

    pub(super) fn lstat(&self, path: &str) -> OperationResponse {
        stat_response(
            self.admit(path, ResolveMode::NoFollow)
                .and_then(|target| fs::symlink_metadata(target).map_err(io_code)),
        )
    }

    pub(super) fn chmod(&self, path: &str, mode: u32) -> OperationResponse {
        OperationResponse::completed(self.admit(path, ResolveMode::Follow).and_then(|target| {
            fs::set_permissions(target, Permissions::from_mode(mode)).map_err(io_code)
        }))
    }

    pub(super) fn utimes(&self, path: &str, atime_ms: f64, mtime_ms: f64) -> OperationResponse {
        OperationResponse::completed(
            self.admit(path, ResolveMode::Follow)
                .and_then(|target| sys::utimes(&target, atime_ms, mtime_ms)),
        )
    }

    pub(super) fn lutimes(&self, path: &str, atime_ms: f64, mtime_ms: f64) -> OperationResponse {
        OperationResponse::completed(
            self.admit(path, ResolveMode::NoFollow)
                .and_then(|target| sys::lutimes(&target, atime_ms, mtime_ms)),
        )
    }

    pub(super) fn truncate(&self, path: &str, length: i64) -> OperationResponse {
        OperationResponse::completed(
            self.admit(path, ResolveMode::Follow)
                .and_then(|target| sys::truncate(&target, length)),
        )
    }

    pub(super) fn unlink(&self, path: &str) -> OperationResponse {
        OperationResponse::completed(
            self.admit(path, ResolveMode::NoFollow)
                .and_then(|target| fs::remove_file(target).map_err(io_code)),
        )
    }

    pub(super) fn mkdir(&self, path: &str, mode: u32) -> OperationResponse {
        OperationResponse::completed(self.admit(path, ResolveMode::NoFollow).and_then(|target| {
            DirBuilder::new()
                .mode(mode)
                .create(target)
                .map_err(io_code)
        }))
    }

    pub(super) fn rmdir(&self, path: &str) -> OperationResponse {
        OperationResponse::completed(
            self.admit(path, ResolveMode::NoFollow)
                .and_then(|target| fs::remove_dir(target).map_err(io_code)),
        )
    }

    /// Both ends must be admitted; the link itself is moved, never its target
    pub(super) fn rename(&self, from: &str, to: &str) -> OperationResponse {
        let source = match self.admit(from, ResolveMode::NoFollow) {
            Ok(source) => source,
            Err(code) => return OperationResponse::failure(code),
        };
        let destination = match self.admit(to, ResolveMode::NoFollow) {
            Ok(destination) => destination,
            Err(code) => return OperationResponse::failure(code),
        };

        trace!(from = ?source, to = ?destination, "Renaming");
        OperationResponse::completed(fs::rename(source, destination).map_err(io_code))
    }

    pub(super) fn readdir(&self, path: &str) -> OperationResponse {
        let target = match self.admit(path, ResolveMode::Follow) {
            Ok(target) => target,
            Err(code) => return OperationResponse::failure(code),
        };

        match list_entries(&target) {
            Ok(entries) => OperationResponse::success(ResponsePayload::Entries(entries)),
            Err(code) => OperationResponse::failure(code),
        }
    }

    /// Only the link location is validated; `target` is stored verbatim
    pub(super) fn symlink(&self, target: &str, link: &str) -> OperationResponse {
        OperationResponse::completed(self.admit(link, ResolveMode::NoFollow).and_then(|location| {
            std::os::unix::fs::symlink(target, location).map_err(io_code)
        }))
    }

    pub(super) fn readlink(&self, path: &str) -> OperationResponse {
        let target = match self.admit(path, ResolveMode::NoFollow) {
            Ok(target) => target,
            Err(code) => return OperationResponse::failure(code),
        };

        match sys::readlink(&target) {
            Ok(bytes) => OperationResponse::success(ResponsePayload::Link(
                String::from_utf8_lossy(&bytes).into_owned(),
            )),
            Err(code) => OperationResponse::failure(code),
        }
    }
}

/// Entry names in directory order, without `.` and `..`
fn list_entries(dir: &std::path::Path) -> Result<Vec<String>, ErrorCode> {
    let mut names = Vec::new();
    for entry in fs::read_dir(dir).map_err(io_code)? {
        let name = entry.map_err(io_code)?.file_name();
        if name == "." || name == ".." {
            continue;
        }
        names.push(name.to_string_lossy().into_owned());
    }
    Ok(names)
}
