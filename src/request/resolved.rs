//! Resolver output loaded from JSON.
//!
//! ```json
//! {
//!   "depsolved": { "build": { "packages": [...], "repos": [...] } },
//!   "containers": { "build": [ { "source": "...", "image_id": "sha256:..." } ] }
//! }
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::container::Spec;
use crate::manifest::Manifest;
use crate::rpmmd::DepsolvedSet;

/// Resolved specs keyed by pipeline name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Resolved {
    pub depsolved: BTreeMap<String, DepsolvedSet>,
    pub containers: BTreeMap<String, Vec<Spec>>,
}

pub fn load_resolved(path: &Path) -> Result<Resolved> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("reading resolver output '{}'", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("parsing resolver output '{}'", path.display()))
}

impl Resolved {
    /// Reject entries for pipelines the manifest does not have. A typo in a
    /// pipeline name would otherwise silently leave that pipeline unresolved.
    pub fn check_against(&self, manifest: &Manifest) -> Result<()> {
        let names = self.depsolved.keys().chain(self.containers.keys());
        for name in names {
            if manifest.pipeline(name).is_none() {
                bail!("resolver output names unknown pipeline '{}'", name);
            }
        }
        Ok(())
    }
}
