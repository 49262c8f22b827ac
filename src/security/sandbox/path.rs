/*!
 * Canonical Path Resolution
 * Resolves caller paths into canonical form once, before any access check
 *
 * A path that does not fully exist yet is resolved through its deepest
 * existing ancestor: the ancestor is canonicalized by the OS and the missing
 * tail is re-attached verbatim. The allow-list check and the system call both
 * use the same joined target.
 */

use crate::core::types::ErrorCode;
use std::fs;
use std::os::unix::ffi::OsStrExt;
use std::path::{Component, Path, PathBuf};

use crate::security::types::DenyReason;

/// How the final component of a path is treated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResolveMode {
    /// Resolve symlinks in every component, including the last
    Follow,
    /// Resolve the parent directory only; the final name is kept as-is so
    /// operations on a link act on the link itself
    NoFollow,
}

/// Resolution failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolveError {
    /// Canonicalization failed with this code (ENOENT for an unresolvable
    /// tail, EINVAL for malformed input)
    Os(ErrorCode),
    /// The component buffer could not be allocated
    OutOfMemory,
}

impl ResolveError {
    fn errno(errno: i32) -> Self {
        ResolveError::Os(ErrorCode::from_errno(errno))
    }
}

impl From<ResolveError> for DenyReason {
    fn from(err: ResolveError) -> Self {
        match err {
            ResolveError::Os(code) => DenyReason::ResolutionFailed(code),
            ResolveError::OutOfMemory => DenyReason::OutOfMemory,
        }
    }
}

/// Result of resolving one path
pub type Resolution = Result<CanonicalPath, ResolveError>;

/// A resolved path: canonical existing ancestor plus the missing tail
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CanonicalPath {
    existing: PathBuf,
    remainder: PathBuf,
}

impl CanonicalPath {
    /// Deepest ancestor the OS canonicalized
    pub fn existing(&self) -> &Path {
        &self.existing
    }

    /// Components below the ancestor that did not exist (or were not followed)
    pub fn remainder(&self) -> &Path {
        &self.remainder
    }

    /// True when the whole path was canonicalized
    pub fn is_fully_resolved(&self) -> bool {
        self.remainder.as_os_str().is_empty()
    }

    /// Path checked against the allow-list and handed to the system call
    pub fn target(&self) -> PathBuf {
        if self.is_fully_resolved() {
            self.existing.clone()
        } else {
            self.existing.join(&self.remainder)
        }
    }
}

/// Resolves caller-supplied paths
#[derive(Debug, Clone, Copy, Default)]
pub struct PathResolver;

impl PathResolver {
    pub fn new() -> Self {
        Self
    }

    /// Resolve `path` according to `mode`
    pub fn resolve(&self, path: impl AsRef<Path>, mode: ResolveMode) -> Resolution {
        let path = path.as_ref();
        check_well_formed(path)?;

        match mode {
            ResolveMode::Follow => resolve_following(path),
            ResolveMode::NoFollow => resolve_parent(path),
        }
    }
}

fn check_well_formed(path: &Path) -> Result<(), ResolveError> {
    let bytes = path.as_os_str().as_bytes();
    if bytes.is_empty() || bytes.contains(&0) || !path.is_absolute() {
        return Err(ResolveError::errno(libc::EINVAL));
    }
    Ok(())
}

/// Canonicalize the parent and append the final name unresolved
fn resolve_parent(path: &Path) -> Resolution {
    let name = match path.components().next_back() {
        Some(Component::Normal(name)) => name,
        // "/" or a trailing ".." names a directory, not an entry
        _ => return resolve_following(path),
    };
    let parent = path.parent().unwrap_or_else(|| Path::new("/"));

    let resolved = resolve_following(parent)?;
    Ok(CanonicalPath {
        existing: resolved.existing,
        remainder: resolved.remainder.join(name),
    })
}

/// Walk up from the full path until the OS can canonicalize a prefix
fn resolve_following(path: &Path) -> Resolution {
    let count = path.components().count();

    let mut parts: Vec<Component<'_>> = Vec::new();
    parts
        .try_reserve_exact(count)
        .map_err(|_| ResolveError::OutOfMemory)?;
    parts.extend(path.components());

    let mut tail: Vec<Component<'_>> = Vec::new();
    tail.try_reserve_exact(count)
        .map_err(|_| ResolveError::OutOfMemory)?;

    loop {
        let candidate: PathBuf = parts.iter().collect();
        match fs::canonicalize(&candidate) {
            Ok(existing) => {
                tail.reverse();
                return attach_tail(existing, &tail);
            }
            Err(err) if err.raw_os_error() == Some(libc::ENOENT) => {
                // The root always exists; running out of components means no progress
                if parts.len() <= 1 {
                    return Err(ResolveError::errno(libc::ENOENT));
                }
                if let Some(component) = parts.pop() {
                    tail.push(component);
                }
            }
            Err(err) => return Err(ResolveError::Os(ErrorCode::from_io_error(&err))),
        }
    }
}

fn attach_tail(existing: PathBuf, tail: &[Component<'_>]) -> Resolution {
    if tail.is_empty() {
        return Ok(CanonicalPath {
            existing,
            remainder: PathBuf::new(),
        });
    }

    // "." and ".." below a missing directory cannot be evaluated by the OS
    if !tail.iter().all(|c| matches!(c, Component::Normal(_))) {
        return Err(ResolveError::errno(libc::ENOENT));
    }

    // An entry that lstat sees but canonicalize cannot is a dangling link;
    // creating through it would land wherever the link points
    if fs::symlink_metadata(existing.join(tail[0])).is_ok() {
        return Err(ResolveError::errno(libc::ENOENT));
    }

    Ok(CanonicalPath {
        existing,
        remainder: tail.iter().collect(),
    })
}
