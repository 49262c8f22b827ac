/*!
 * Error Types
 * Centralized error handling with thiserror and miette
 */

use miette::Diagnostic;
use thiserror::Error;

// Re-export subsystem errors
pub use crate::api::client::ClientError;
pub use crate::core::serialization::BincodeError;
pub use crate::ipc::codec::CodecError;
pub use crate::ipc::channel::TransportError;
pub use crate::security::types::InitError;

/// Broker-level result
pub type BrokerResult<T> = Result<T, BrokerError>;

/// Unified broker error type with miette diagnostics.
///
/// Only session setup and channel management surface these; individual
/// operations always answer with an error code instead.
#[derive(Error, Debug, Diagnostic)]
pub enum BrokerError {
    #[error("Initialization failed: {0}")]
    #[diagnostic(
        code(broker::init_failed),
        help("The broker refuses all operations until it is restarted with a valid allow-list.")
    )]
    Init(#[from] InitError),

    #[error("Codec error: {0}")]
    #[diagnostic(
        code(broker::codec_error),
        help("Peer sent a malformed or incompatible frame. Check both sides run the same version.")
    )]
    Codec(#[from] CodecError),

    #[error("Transport error: {0}")]
    #[diagnostic(
        code(broker::transport_error),
        help("The operation state is unknown. Re-validate before retrying create, rename or unlink.")
    )]
    Transport(#[from] TransportError),

    #[error("I/O error: {0}")]
    #[diagnostic(
        code(broker::io_error),
        help("Broker could not allocate an OS resource such as a worker thread.")
    )]
    Io(String),
}

impl From<std::io::Error> for BrokerError {
    fn from(err: std::io::Error) -> Self {
        BrokerError::Io(err.to_string())
    }
}
