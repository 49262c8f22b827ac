/*!
 * Security Module
 * Allow-list sandboxing of caller paths
 */

pub mod sandbox;
pub mod types;

// Re-export for convenience
pub use sandbox::{
    AccessValidator, AllowList, AllowListEntry, BrokerConfig, CanonicalPath, PathResolver,
    Resolution, ResolveError, ResolveMode, SandboxMode,
};
pub use types::*;
