/*!
 * Allow-List
 * Canonical directory roots under which operations are permitted
 */

use crate::core::types::ErrorCode;
use crate::security::types::InitError;
use super::path::{PathResolver, ResolveError, ResolveMode};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// One allow-list root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllowListEntry {
    root: PathBuf,
    configured: String,
}

impl AllowListEntry {
    /// Normalize a configured root.
    ///
    /// Roots must be absolute. They are cleaned lexically and then resolved
    /// with the same ancestor walk used for requests, so a root that does not
    /// exist yet is still anchored at its canonical existing ancestor.
    pub fn new(configured: &str) -> Result<Self, InitError> {
        if configured.is_empty() {
            return Err(InitError::EmptyRoot);
        }
        if !Path::new(configured).is_absolute() {
            return Err(InitError::RelativeRoot(configured.to_string()));
        }

        let cleaned = PathBuf::from(path_clean::clean(configured));
        let resolved = PathResolver::new()
            .resolve(&cleaned, ResolveMode::Follow)
            .map_err(|err| InitError::RootResolution {
                root: configured.to_string(),
                code: match err {
                    ResolveError::Os(code) => code,
                    ResolveError::OutOfMemory => ErrorCode::OUT_OF_MEMORY,
                },
            })?;

        if resolved.is_fully_resolved() {
            if !resolved.existing().is_dir() {
                return Err(InitError::NotADirectory {
                    root: configured.to_string(),
                });
            }
        } else {
            debug!(
                root = %configured,
                existing = ?resolved.existing(),
                "Allow-list root does not exist yet"
            );
        }
        let root = resolved.target();

        if root == Path::new("/") {
            return Err(InitError::WildcardRoot);
        }

        Ok(Self {
            root,
            configured: configured.to_string(),
        })
    }

    /// Canonical root
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Root as it appeared in configuration
    pub fn configured(&self) -> &str {
        &self.configured
    }

    /// Segment-aware containment: `/data` covers `/data` and `/data/x`, not `/database`
    pub fn covers(&self, path: &Path) -> bool {
        path.starts_with(&self.root)
    }
}

/// Ordered set of permitted roots
#[derive(Debug, Clone, Default)]
pub struct AllowList {
    entries: Vec<AllowListEntry>,
    unrestricted: bool,
}

impl AllowList {
    /// Build from configured roots. An empty list denies every path.
    pub fn sandboxed<I, S>(roots: I) -> Result<Self, InitError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let entries = roots
            .into_iter()
            .map(|root| AllowListEntry::new(root.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;

        info!(roots = entries.len(), "Allow-list built");
        for entry in &entries {
            debug!(root = ?entry.root(), configured = %entry.configured(), "Allow-list root");
        }

        Ok(Self {
            entries,
            unrestricted: false,
        })
    }

    /// Every canonical path is covered
    pub fn unrestricted() -> Self {
        info!("Allow-list is unrestricted");
        Self {
            entries: Vec::new(),
            unrestricted: true,
        }
    }

    /// True if `path` (already canonical) lies under some root
    pub fn covers(&self, path: &Path) -> bool {
        self.unrestricted || self.entries.iter().any(|entry| entry.covers(path))
    }

    pub fn is_unrestricted(&self) -> bool {
        self.unrestricted
    }

    pub fn entries(&self) -> &[AllowListEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
