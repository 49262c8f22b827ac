/*!
 * Syscalls Module
 * Operation dispatch and the system calls behind it
 */

mod executor;
mod fd;
pub mod flags;
mod fs;
pub mod sys;
pub mod time;
mod types;

// Re-export public API
pub use executor::OperationDispatcher;
pub use types::{OperationRequest, OperationResponse, ResponsePayload, StatResult};
