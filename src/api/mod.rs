/*!
 * API Module
 * Session lifecycle and the caller-side client
 */

pub mod client;
pub mod session;

// Re-export for convenience
pub use client::{BrokerClient, ClientError, ClientResult, HandleTable};
pub use session::BrokerSession;
