//! Low-level build instructions consumed by the execution engine.
//!
//! Only the part of the schema the pipelines in this crate emit is modelled:
//!
//! - [`Manifest`] - the version 2 document: pipelines plus sources
//! - [`Pipeline`] - a named list of stages, optionally run inside a build root
//! - [`Stage`] - one step, with typed inputs and options
//!
//! Stage constructors live in one module per stage type ([`rpm`],
//! [`selinux`], [`container_deploy`], [`mkdir`], [`copy`], [`tar`]);
//! [`sources`] describes where the execution engine fetches resolved content.

pub mod container_deploy;
pub mod copy;
pub mod mkdir;
pub mod rpm;
pub mod selinux;
pub mod sources;
pub mod tar;

use std::collections::BTreeMap;

use serde::Serialize;

pub use container_deploy::{ContainerDeployOptions, ContainersInput};
pub use copy::{CopyPath, CopyStageOptions};
pub use mkdir::{MkdirPath, MkdirStageOptions};
pub use rpm::{FilesInput, RpmStageOptions};
pub use selinux::SelinuxStageOptions;
pub use sources::Sources;
pub use tar::TarStageOptions;

/// Top-level document handed to the execution engine.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Manifest {
    pub version: String,
    pub pipelines: Vec<Pipeline>,
    pub sources: Sources,
}

impl Manifest {
    pub fn new(pipelines: Vec<Pipeline>, sources: Sources) -> Self {
        Self {
            version: "2".to_string(),
            pipelines,
            sources,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Pipeline {
    pub name: String,
    /// `name:<pipeline>` of the build root this pipeline runs in.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub build: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub runner: Option<String>,
    pub stages: Vec<Stage>,
}

impl Pipeline {
    pub fn new(name: impl Into<String>, build: Option<&str>) -> Self {
        Self {
            name: name.into(),
            build: build.map(pipeline_reference),
            runner: None,
            stages: Vec::new(),
        }
    }

    pub fn add_stage(&mut self, stage: Stage) {
        self.stages.push(stage);
    }

    /// Stages of the given type, in emission order.
    pub fn stages_of<'a>(&'a self, kind: &'a str) -> impl Iterator<Item = &'a Stage> + 'a {
        self.stages.iter().filter(move |stage| stage.kind == kind)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Stage {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub inputs: BTreeMap<String, Input>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<StageOptions>,
}

impl Stage {
    pub(crate) fn new(
        kind: &str,
        inputs: BTreeMap<String, Input>,
        options: Option<StageOptions>,
    ) -> Self {
        Self {
            kind: kind.to_string(),
            inputs,
            options,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum StageOptions {
    Rpm(RpmStageOptions),
    Selinux(SelinuxStageOptions),
    ContainerDeploy(ContainerDeployOptions),
    Mkdir(MkdirStageOptions),
    Copy(CopyStageOptions),
    Tar(TarStageOptions),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Input {
    Files(FilesInput),
    Containers(ContainersInput),
    Tree(TreeInput),
}

/// The output tree of another pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TreeInput {
    #[serde(rename = "type")]
    pub kind: String,
    pub origin: String,
    pub references: Vec<String>,
}

impl TreeInput {
    pub fn new(pipeline: &str) -> Self {
        Self {
            kind: "org.osbuild.tree".to_string(),
            origin: "org.osbuild.pipeline".to_string(),
            references: vec![pipeline_reference(pipeline)],
        }
    }
}

/// Inputs map with a single pipeline tree input under `input_name`.
pub fn pipeline_tree_inputs(input_name: &str, pipeline: &str) -> BTreeMap<String, Input> {
    BTreeMap::from([(
        input_name.to_string(),
        Input::Tree(TreeInput::new(pipeline)),
    )])
}

/// `name:<pipeline>`, the engine's way of pointing at another pipeline.
pub fn pipeline_reference(pipeline: &str) -> String {
    format!("name:{pipeline}")
}
