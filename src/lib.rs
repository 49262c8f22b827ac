/*!
 * OS File Broker Library
 * Privilege-separated filesystem access: a broker validates every path against
 * an allow-list of canonical roots, performs the system call, and returns the
 * result (or an errno) to an unprivileged caller.
 */

pub mod api;
pub mod core;
pub mod ipc;
pub mod monitoring;
pub mod security;
pub mod syscalls;

// Re-exports
pub use api::{BrokerClient, BrokerSession, ClientError};
pub use crate::core::errors::{BrokerError, BrokerResult};
pub use crate::core::types::{ChannelId, ErrorCode, HandleId};
pub use ipc::{BrokerService, ChannelHandle, TransportError};
pub use monitoring::init_tracing;
pub use security::{
    AccessDecision, AccessValidator, AllowList, BrokerConfig, CanonicalPath, DenyReason,
    InitError, PathResolver, ResolveMode, SandboxMode,
};
pub use syscalls::{
    OperationDispatcher, OperationRequest, OperationResponse, ResponsePayload, StatResult,
};
