/*!
 * Core Module
 * Fundamental broker types, error handling and serialization
 */

pub mod errors;
pub mod serialization;
pub mod types;

// Re-export for convenience
pub use errors::*;
pub use types::*;
