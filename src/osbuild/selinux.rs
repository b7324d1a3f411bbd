//! `org.osbuild.selinux`: apply SELinux file labels to the tree.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::osbuild::{Stage, StageOptions};

/// Label for binaries that must run as the installer domain inside the
/// build root.
pub const INSTALL_EXEC_LABEL: &str = "system_u:object_r:install_exec_t:s0";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SelinuxStageOptions {
    /// File contexts database, relative to the tree root.
    pub file_contexts: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub exclude_paths: Vec<String>,
    /// Explicit path to label overrides.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
}

/// `etc/selinux/<policy>/contexts/files/file_contexts`
pub fn file_contexts_path(policy: &str) -> String {
    format!("etc/selinux/{policy}/contexts/files/file_contexts")
}

pub fn selinux_stage(options: SelinuxStageOptions) -> Stage {
    Stage::new(
        "org.osbuild.selinux",
        BTreeMap::new(),
        Some(StageOptions::Selinux(options)),
    )
}
