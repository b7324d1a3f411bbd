//! `org.osbuild.copy`: copy files from inputs into the tree.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::osbuild::{Input, Stage, StageOptions};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CopyStageOptions {
    pub paths: Vec<CopyPath>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CopyPath {
    pub from: String,
    pub to: String,
}

impl CopyPath {
    /// Copy `path` from the tree input `input_name` to the same path in the
    /// tree being built.
    pub fn same_path(input_name: &str, path: &str) -> Self {
        Self {
            from: format!("input://{input_name}{path}"),
            to: format!("tree://{path}"),
        }
    }
}

pub fn copy_stage(options: CopyStageOptions, inputs: BTreeMap<String, Input>) -> Stage {
    Stage::new("org.osbuild.copy", inputs, Some(StageOptions::Copy(options)))
}
