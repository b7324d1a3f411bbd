//! Content pipeline that tars the tree of another pipeline.

use crate::error::Result;
use crate::manifest::pipeline::{Base, Pipeline};
use crate::manifest::Distro;
use crate::osbuild::tar::tar_stage;
use crate::osbuild::{self, pipeline_tree_inputs, TarStageOptions};

#[derive(Debug)]
pub struct Archive {
    base: Base,
    source: String,
    filename: String,
}

impl Archive {
    /// Archive the output of the pipeline named `source` as `filename`.
    pub fn new(name: &str, source: &str, filename: &str) -> Self {
        Self {
            base: Base::new(name, None),
            source: source.to_string(),
            filename: filename.to_string(),
        }
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }
}

impl Pipeline for Archive {
    fn base(&self) -> &Base {
        &self.base
    }

    fn base_mut(&mut self) -> &mut Base {
        &mut self.base
    }

    fn get_build_packages(&self, _distro: Distro) -> Vec<String> {
        vec!["tar".to_string()]
    }

    fn referenced_pipelines(&self) -> Vec<&str> {
        vec![self.source.as_str()]
    }

    fn serialize(&self) -> Result<osbuild::Pipeline> {
        let mut pipeline = self.base.serialize();
        pipeline.add_stage(tar_stage(
            TarStageOptions {
                filename: self.filename.clone(),
            },
            pipeline_tree_inputs("tree", &self.source),
        ));
        Ok(pipeline)
    }
}
