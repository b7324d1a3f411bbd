//! Filesystem node customizations.

use crate::error::{Error, Result};

/// A directory that must exist in a tree regardless of its other content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Directory {
    path: String,
    mode: Option<u32>,
    ensure_parents: bool,
}

impl Directory {
    /// `path` must be absolute, normalized, and not `/` itself.
    pub fn new(path: &str, mode: Option<u32>, ensure_parents: bool) -> Result<Self> {
        validate_path(path)?;
        if let Some(mode) = mode {
            if mode & !0o7777 != 0 {
                return Err(Error::InvalidNode {
                    path: path.to_string(),
                    reason: format!("mode {mode:#o} has bits outside 0o7777"),
                });
            }
        }
        Ok(Self {
            path: path.to_string(),
            mode,
            ensure_parents,
        })
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn mode(&self) -> Option<u32> {
        self.mode
    }

    pub fn ensure_parents(&self) -> bool {
        self.ensure_parents
    }
}

fn validate_path(path: &str) -> Result<()> {
    let invalid = |reason: &str| Error::InvalidNode {
        path: path.to_string(),
        reason: reason.to_string(),
    };

    if !path.starts_with('/') {
        return Err(invalid("path must be absolute"));
    }
    if path == "/" {
        return Err(invalid("path must not be the root directory"));
    }
    if path.ends_with('/') || path.contains("//") {
        return Err(invalid("path must be normalized"));
    }
    // Path::components() drops interior "." so split by hand.
    if path.split('/').any(|part| part == "." || part == "..") {
        return Err(invalid("path must not contain '.' or '..' components"));
    }
    Ok(())
}
