/*!
 * Operation Types Module
 * Request enum, response payloads, and the stat record
 */

mod results;
mod syscall;

// Re-export all public types
pub use results::{OperationResponse, ResponsePayload, StatResult};
pub use syscall::OperationRequest;
