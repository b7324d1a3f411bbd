//! `org.osbuild.mkdir`: create directories in the tree.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::fsnode::Directory;
use crate::osbuild::{Stage, StageOptions};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MkdirStageOptions {
    pub paths: Vec<MkdirPath>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MkdirPath {
    /// `tree://` URL of the directory.
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<u32>,
    pub parents: bool,
    pub exist_ok: bool,
}

pub fn mkdir_stage(options: MkdirStageOptions) -> Stage {
    Stage::new(
        "org.osbuild.mkdir",
        BTreeMap::new(),
        Some(StageOptions::Mkdir(options)),
    )
}

/// One mkdir stage per directory. Existing directories are accepted.
pub fn directory_stages(dirs: &[Directory]) -> Vec<Stage> {
    dirs.iter()
        .map(|dir| {
            mkdir_stage(MkdirStageOptions {
                paths: vec![MkdirPath {
                    path: format!("tree://{}", dir.path()),
                    mode: dir.mode(),
                    parents: dir.ensure_parents(),
                    exist_ok: true,
                }],
            })
        })
        .collect()
}
