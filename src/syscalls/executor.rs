/*!
 * Operation Dispatcher
 * Validate, execute, respond: one handler per request variant
 */

use crate::core::types::{ChannelId, ErrorCode};
use crate::monitoring::span_operation;
use crate::security::{AccessDecision, AccessValidator, ResolveMode};
use std::path::PathBuf;
use tracing::{debug, warn};

use super::types::{OperationRequest, OperationResponse};

/// Executes validated requests against the host filesystem.
///
/// Holds nothing but the immutable validator, so one dispatcher can be shared
/// by every channel without locking.
#[derive(Debug, Clone)]
pub struct OperationDispatcher {
    pub(super) validator: AccessValidator,
}

impl OperationDispatcher {
    pub fn new(validator: AccessValidator) -> Self {
        Self { validator }
    }

    pub fn validator(&self) -> &AccessValidator {
        &self.validator
    }

    /// Execute one request
    pub fn dispatch(&self, request: OperationRequest) -> OperationResponse {
        self.dispatch_for(None, request)
    }

    /// Execute one request on behalf of `channel`
    pub fn dispatch_for(
        &self,
        channel: Option<ChannelId>,
        request: OperationRequest,
    ) -> OperationResponse {
        let span = span_operation(request.name(), channel);
        let _guard = span.enter();

        let response = match request {
            // Handle lifecycle
            OperationRequest::Open { path, flags, mode } => self.open(&path, flags, mode),
            OperationRequest::Read { fd, count } => self.read(fd, count),
            OperationRequest::Write { fd, data } => self.write(fd, &data),
            OperationRequest::Close { fd } => self.close(fd),

            // Metadata
            OperationRequest::Stat { path } => self.stat(&path),
            OperationRequest::Lstat { path } => self.lstat(&path),
            OperationRequest::Fstat { fd } => self.fstat(fd),
            OperationRequest::Chmod { path, mode } => self.chmod(&path, mode),
            OperationRequest::Fchmod { fd, mode } => self.fchmod(fd, mode),
            OperationRequest::Utimes {
                path,
                atime_ms,
                mtime_ms,
            } => self.utimes(&path, atime_ms, mtime_ms),
            OperationRequest::Lutimes {
                path,
                atime_ms,
                mtime_ms,
            } => self.lutimes(&path, atime_ms, mtime_ms),
            OperationRequest::Futimes {
                fd,
                atime_ms,
                mtime_ms,
            } => self.futimes(fd, atime_ms, mtime_ms),
            OperationRequest::Truncate { path, length } => self.truncate(&path, length),
            OperationRequest::Ftruncate { fd, length } => self.ftruncate(fd, length),

            // Directory entries
            OperationRequest::Unlink { path } => self.unlink(&path),
            OperationRequest::Mkdir { path, mode } => self.mkdir(&path, mode),
            OperationRequest::Rmdir { path } => self.rmdir(&path),
            OperationRequest::Rename { from, to } => self.rename(&from, &to),
            OperationRequest::Readdir { path } => self.readdir(&path),
            OperationRequest::Symlink { target, link } => self.symlink(&target, &link),
            OperationRequest::Readlink { path } => self.readlink(&path),
        };

        span.record_code(response.error);
        if !response.is_success() && !response.error.is_access_denied() {
            debug!(code = %response.error, "Operation failed");
        }
        response
    }

    /// Validate `path`, yielding the canonical target or the denial code
    pub(super) fn admit(&self, path: &str, mode: ResolveMode) -> Result<PathBuf, ErrorCode> {
        match self.validator.check(path, mode) {
            AccessDecision::Admitted(canonical) => Ok(canonical.target()),
            AccessDecision::Denied(reason) => {
                warn!(path = %path, ?reason, "Access denied");
                Err(reason.error_code())
            }
        }
    }
}
