/*!
 * Broker Client
 * Caller-side API: typed operations over a channel, and ownership of the
 * descriptors the broker hands out
 */

use crate::core::errors::BrokerResult;
use crate::core::types::{ErrorCode, HandleId};
use crate::ipc::{BrokerService, ChannelHandle, TransportError};
use crate::syscalls::{OperationRequest, OperationResponse, ResponsePayload, StatResult};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::os::fd::{AsRawFd, IntoRawFd, OwnedFd, RawFd};
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;
use tracing::debug;

/// Caller-side errors
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("{message} (errno {code})")]
    Os { code: i32, message: String },

    #[error("Access denied by broker policy")]
    AccessDenied,

    #[error("Out of memory")]
    OutOfMemory,

    #[error("Unknown handle {0}")]
    UnknownHandle(HandleId),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("Unexpected response payload for {0}")]
    UnexpectedPayload(&'static str),
}

impl ClientError {
    /// errno for OS failures
    pub fn errno(&self) -> Option<i32> {
        match self {
            ClientError::Os { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// True when the operation may or may not have happened
    pub fn is_transport(&self) -> bool {
        matches!(self, ClientError::Transport(_))
    }
}

impl From<ErrorCode> for ClientError {
    fn from(code: ErrorCode) -> Self {
        if code.is_access_denied() {
            ClientError::AccessDenied
        } else if code.is_out_of_memory() {
            ClientError::OutOfMemory
        } else {
            ClientError::Os {
                code: code.raw(),
                message: code.message(),
            }
        }
    }
}

pub type ClientResult<T> = Result<T, ClientError>;

/// Descriptors owned by this caller, keyed by opaque handle.
///
/// Dropping the table closes whatever is still open.
#[derive(Debug, Default)]
pub struct HandleTable {
    handles: Mutex<HashMap<HandleId, OwnedFd>>,
    next: AtomicU64,
}

impl HandleTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, fd: OwnedFd) -> HandleId {
        let id = HandleId::new(self.next.fetch_add(1, Ordering::Relaxed) + 1);
        self.handles.lock().insert(id, fd);
        id
    }

    /// Raw descriptor for a live handle. Valid until the handle is taken.
    pub fn raw(&self, id: HandleId) -> Option<RawFd> {
        self.handles.lock().get(&id).map(AsRawFd::as_raw_fd)
    }

    /// Remove a handle, transferring ownership of its descriptor
    pub fn take(&self, id: HandleId) -> Option<OwnedFd> {
        self.handles.lock().remove(&id)
    }

    pub fn contains(&self, id: HandleId) -> bool {
        self.handles.lock().contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.handles.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.lock().is_empty()
    }
}

/// Typed client over one broker channel
pub struct BrokerClient {
    channel: ChannelHandle,
    handles: HandleTable,
}

impl BrokerClient {
    pub fn new(channel: ChannelHandle) -> Self {
        Self {
            channel,
            handles: HandleTable::new(),
        }
    }

    /// Open a dedicated channel on `service`
    pub fn connect(service: &BrokerService) -> BrokerResult<Self> {
        Ok(Self::new(service.open_channel()?))
    }

    pub fn handles(&self) -> &HandleTable {
        &self.handles
    }

    pub fn channel(&self) -> &ChannelHandle {
        &self.channel
    }

    /// Send a raw request; the response is returned whatever its code
    pub fn request(&self, request: OperationRequest) -> ClientResult<OperationResponse> {
        Ok(self.channel.call(request)?)
    }

    pub async fn request_async(&self, request: OperationRequest) -> ClientResult<OperationResponse> {
        Ok(self.channel.call_async(request).await?)
    }

    fn call(&self, request: OperationRequest) -> ClientResult<OperationResponse> {
        let response = self.channel.call(request)?;
        if response.is_success() {
            Ok(response)
        } else {
            Err(response.error.into())
        }
    }

    fn call_unit(&self, request: OperationRequest) -> ClientResult<()> {
        self.call(request).map(|_| ())
    }

    fn fd(&self, handle: HandleId) -> ClientResult<RawFd> {
        self.handles
            .raw(handle)
            .ok_or(ClientError::UnknownHandle(handle))
    }

    // ========================================================================
    // Handle lifecycle
    // ========================================================================

    pub fn open(&self, path: &str, flags: i32, mode: u32) -> ClientResult<HandleId> {
        let response = self.call(OperationRequest::Open {
            path: path.to_string(),
            flags,
            mode,
        })?;
        let fd = response
            .into_descriptor()
            .ok_or(ClientError::UnexpectedPayload("open"))?;
        let handle = self.handles.insert(fd);
        debug!(%handle, path, "Handle opened");
        Ok(handle)
    }

    pub fn read(&self, handle: HandleId, count: usize) -> ClientResult<Vec<u8>> {
        let fd = self.fd(handle)?;
        match self.call(OperationRequest::Read { fd, count })?.payload {
            ResponsePayload::Data(data) => Ok(data),
            _ => Err(ClientError::UnexpectedPayload("read")),
        }
    }

    pub fn write(&self, handle: HandleId, data: &[u8]) -> ClientResult<usize> {
        let fd = self.fd(handle)?;
        let response = self.call(OperationRequest::Write {
            fd,
            data: data.to_vec(),
        })?;
        match response.written() {
            Some(n) if n >= 0 => Ok(n as usize),
            _ => Err(ClientError::UnexpectedPayload("write")),
        }
    }

    /// Hand the descriptor to the broker to close. The handle is gone either way.
    ///
    /// If the request never reached the OS (refused by the session, or the
    /// channel was already closed) the descriptor is closed here instead.
    pub fn close(&self, handle: HandleId) -> ClientResult<()> {
        let fd = self
            .handles
            .take(handle)
            .ok_or(ClientError::UnknownHandle(handle))?;

        match self.channel.call(OperationRequest::Close {
            fd: fd.as_raw_fd(),
        }) {
            Ok(response) if response.error.is_access_denied() => {
                debug!(%handle, "Close refused; closing locally");
                drop(fd);
                Err(ClientError::AccessDenied)
            }
            Ok(response) => {
                // The broker's close released the descriptor, whatever it returned
                let _ = fd.into_raw_fd();
                if response.is_success() {
                    Ok(())
                } else {
                    Err(response.error.into())
                }
            }
            Err(TransportError::Disconnected) => {
                drop(fd);
                Err(TransportError::Disconnected.into())
            }
            Err(err) => {
                // The close may have run; closing again could hit a reused number
                let _ = fd.into_raw_fd();
                Err(err.into())
            }
        }
    }

    // ========================================================================
    // Metadata
    // ========================================================================

    fn stat_of(&self, request: OperationRequest) -> ClientResult<StatResult> {
        let name = request.name();
        match self.call(request)?.payload {
            ResponsePayload::Stat(stat) => Ok(stat),
            _ => Err(ClientError::UnexpectedPayload(name)),
        }
    }

    pub fn stat(&self, path: &str) -> ClientResult<StatResult> {
        self.stat_of(OperationRequest::Stat {
            path: path.to_string(),
        })
    }

    pub fn lstat(&self, path: &str) -> ClientResult<StatResult> {
        self.stat_of(OperationRequest::Lstat {
            path: path.to_string(),
        })
    }

    pub fn fstat(&self, handle: HandleId) -> ClientResult<StatResult> {
        let fd = self.fd(handle)?;
        self.stat_of(OperationRequest::Fstat { fd })
    }

    pub fn chmod(&self, path: &str, mode: u32) -> ClientResult<()> {
        self.call_unit(OperationRequest::Chmod {
            path: path.to_string(),
            mode,
        })
    }

    pub fn fchmod(&self, handle: HandleId, mode: u32) -> ClientResult<()> {
        let fd = self.fd(handle)?;
        self.call_unit(OperationRequest::Fchmod { fd, mode })
    }

    pub fn utimes(&self, path: &str, atime_ms: f64, mtime_ms: f64) -> ClientResult<()> {
        self.call_unit(OperationRequest::Utimes {
            path: path.to_string(),
            atime_ms,
            mtime_ms,
        })
    }

    pub fn lutimes(&self, path: &str, atime_ms: f64, mtime_ms: f64) -> ClientResult<()> {
        self.call_unit(OperationRequest::Lutimes {
            path: path.to_string(),
            atime_ms,
            mtime_ms,
        })
    }

    pub fn futimes(&self, handle: HandleId, atime_ms: f64, mtime_ms: f64) -> ClientResult<()> {
        let fd = self.fd(handle)?;
        self.call_unit(OperationRequest::Futimes {
            fd,
            atime_ms,
            mtime_ms,
        })
    }

    pub fn truncate(&self, path: &str, length: i64) -> ClientResult<()> {
        self.call_unit(OperationRequest::Truncate {
            path: path.to_string(),
            length,
        })
    }

    pub fn ftruncate(&self, handle: HandleId, length: i64) -> ClientResult<()> {
        let fd = self.fd(handle)?;
        self.call_unit(OperationRequest::Ftruncate { fd, length })
    }

    // ========================================================================
    // Directory entries
    // ========================================================================

    pub fn unlink(&self, path: &str) -> ClientResult<()> {
        self.call_unit(OperationRequest::Unlink {
            path: path.to_string(),
        })
    }

    pub fn mkdir(&self, path: &str, mode: u32) -> ClientResult<()> {
        self.call_unit(OperationRequest::Mkdir {
            path: path.to_string(),
            mode,
        })
    }

    pub fn rmdir(&self, path: &str) -> ClientResult<()> {
        self.call_unit(OperationRequest::Rmdir {
            path: path.to_string(),
        })
    }

    pub fn rename(&self, from: &str, to: &str) -> ClientResult<()> {
        self.call_unit(OperationRequest::Rename {
            from: from.to_string(),
            to: to.to_string(),
        })
    }

    pub fn readdir(&self, path: &str) -> ClientResult<Vec<String>> {
        match self
            .call(OperationRequest::Readdir {
                path: path.to_string(),
            })?
            .payload
        {
            ResponsePayload::Entries(entries) => Ok(entries),
            _ => Err(ClientError::UnexpectedPayload("readdir")),
        }
    }

    pub fn symlink(&self, target: &str, link: &str) -> ClientResult<()> {
        self.call_unit(OperationRequest::Symlink {
            target: target.to_string(),
            link: link.to_string(),
        })
    }

    pub fn readlink(&self, path: &str) -> ClientResult<String> {
        match self
            .call(OperationRequest::Readlink {
                path: path.to_string(),
            })?
            .payload
        {
            ResponsePayload::Link(target) => Ok(target),
            _ => Err(ClientError::UnexpectedPayload("readlink")),
        }
    }
}
