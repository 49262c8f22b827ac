/*!
 * Access Validator
 * Resolve-then-check gate in front of every path-based operation
 */

use super::allowlist::AllowList;
use super::path::{PathResolver, ResolveMode};
use crate::security::types::{AccessDecision, DenyReason};
use std::path::Path;
use tracing::trace;

/// Combines path resolution with the allow-list.
///
/// A path is admitted only if it resolves and its canonical target lies
/// under some root. Link target text (the first argument of `symlink`) is
/// never passed through here.
#[derive(Debug, Clone)]
pub struct AccessValidator {
    allow_list: AllowList,
    resolver: PathResolver,
}

impl AccessValidator {
    pub fn new(allow_list: AllowList) -> Self {
        Self {
            allow_list,
            resolver: PathResolver::new(),
        }
    }

    /// Validate one caller path
    pub fn check(&self, path: impl AsRef<Path>, mode: ResolveMode) -> AccessDecision {
        let path = path.as_ref();
        let canonical = match self.resolver.resolve(path, mode) {
            Ok(canonical) => canonical,
            Err(err) => {
                trace!(?path, ?err, "Resolution failed");
                return AccessDecision::Denied(err.into());
            }
        };

        let target = canonical.target();
        if self.allow_list.covers(&target) {
            trace!(?path, ?target, "Path admitted");
            AccessDecision::Admitted(canonical)
        } else {
            AccessDecision::Denied(DenyReason::PathNotCovered)
        }
    }

    pub fn allow_list(&self) -> &AllowList {
        &self.allow_list
    }
}
