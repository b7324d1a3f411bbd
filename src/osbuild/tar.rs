//! `org.osbuild.tar`: archive an input tree.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::osbuild::{Input, Stage, StageOptions};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TarStageOptions {
    pub filename: String,
}

pub fn tar_stage(options: TarStageOptions, inputs: BTreeMap<String, Input>) -> Stage {
    Stage::new("org.osbuild.tar", inputs, Some(StageOptions::Tar(options)))
}
