/*!
 * Broker Session
 * One-time initialization; refuses every operation until it succeeds
 */

use crate::core::types::{ChannelId, ErrorCode};
use crate::security::{AccessValidator, BrokerConfig, InitError};
use crate::syscalls::{OperationDispatcher, OperationRequest, OperationResponse};
use std::sync::OnceLock;
use tracing::{error, info, warn};

enum SessionState {
    Ready(OperationDispatcher),
    Failed(InitError),
}

/// Broker session.
///
/// `initialize` runs at most once. A failed initialization is permanent: the
/// session never falls back to unrestricted access.
#[derive(Default)]
pub struct BrokerSession {
    state: OnceLock<SessionState>,
}

impl BrokerSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the allow-list from `config`
    pub fn initialize(&self, config: &BrokerConfig) -> Result<(), InitError> {
        let mut attempted = false;
        let state = self.state.get_or_init(|| {
            attempted = true;
            Self::build(config)
        });

        if !attempted {
            warn!("Re-initialization refused");
            return Err(InitError::AlreadyInitialized);
        }

        match state {
            SessionState::Ready(_) => Ok(()),
            SessionState::Failed(err) => Err(err.clone()),
        }
    }

    fn build(config: &BrokerConfig) -> SessionState {
        match config.build_allow_list() {
            Ok(allow_list) => {
                if allow_list.is_unrestricted() {
                    warn!("Broker session running unsandboxed");
                } else {
                    info!(roots = allow_list.len(), "Broker session ready");
                }
                SessionState::Ready(OperationDispatcher::new(AccessValidator::new(allow_list)))
            }
            Err(err) => {
                error!(%err, "Broker session initialization failed");
                SessionState::Failed(err)
            }
        }
    }

    /// True once initialization has succeeded
    pub fn is_ready(&self) -> bool {
        matches!(self.state.get(), Some(SessionState::Ready(_)))
    }

    /// The initialization failure, if there was one
    pub fn init_error(&self) -> Option<&InitError> {
        match self.state.get() {
            Some(SessionState::Failed(err)) => Some(err),
            _ => None,
        }
    }

    pub fn dispatcher(&self) -> Option<&OperationDispatcher> {
        match self.state.get() {
            Some(SessionState::Ready(dispatcher)) => Some(dispatcher),
            _ => None,
        }
    }

    pub fn dispatch(&self, request: OperationRequest) -> OperationResponse {
        self.dispatch_for(None, request)
    }

    pub fn dispatch_for(
        &self,
        channel: Option<ChannelId>,
        request: OperationRequest,
    ) -> OperationResponse {
        match self.dispatcher() {
            Some(dispatcher) => dispatcher.dispatch_for(channel, request),
            None => {
                warn!(
                    operation = request.name(),
                    channel,
                    "Refusing operation: session not initialized"
                );
                refusal(&request)
            }
        }
    }
}

/// Access-denied response shaped like the operation's own failures
fn refusal(request: &OperationRequest) -> OperationResponse {
    match request {
        OperationRequest::Stat { .. }
        | OperationRequest::Lstat { .. }
        | OperationRequest::Fstat { .. } => OperationResponse::stat_failure(ErrorCode::ACCESS_DENIED),
        OperationRequest::Write { .. } => OperationResponse::write_failure(ErrorCode::ACCESS_DENIED),
        _ => OperationResponse::denied(),
    }
}
