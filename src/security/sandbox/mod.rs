/*!
 * Path Sandbox
 *
 * - Canonical resolution with ancestor walk for paths that do not exist yet
 * - Segment-aware allow-list of canonical roots
 * - Validator combining both in front of every path-based operation
 */

pub mod allowlist;
pub mod config;
pub mod path;
pub mod validator;

pub use allowlist::{AllowList, AllowListEntry};
pub use config::{BrokerConfig, SandboxMode};
pub use path::{CanonicalPath, PathResolver, Resolution, ResolveError, ResolveMode};
pub use validator::AccessValidator;
