//! The pipeline contract shared by build roots and content pipelines.

use std::fmt;

use crate::container::{SourceSpec, Spec};
use crate::error::Result;
use crate::manifest::build::Build;
use crate::manifest::{BuildRef, Distro, ManifestId};
use crate::osbuild;
use crate::rpmmd::{DepsolvedSet, PackageSet};

/// Resolver output handed to one pipeline at the start of serialization.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Inputs {
    pub depsolved: DepsolvedSet,
    pub containers: Vec<Spec>,
}

/// State every pipeline carries: its name, the build root it runs in, the
/// checkpoint flag and the manifest it was registered with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Base {
    name: String,
    build: Option<String>,
    checkpoint: bool,
    manifest: Option<ManifestId>,
}

impl Base {
    pub fn new(name: impl Into<String>, build: Option<&BuildRef>) -> Self {
        Self {
            name: name.into(),
            build: build.map(|b| b.name().to_string()),
            checkpoint: false,
            manifest: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Name of the build root this pipeline runs in, if any.
    pub fn build(&self) -> Option<&str> {
        self.build.as_deref()
    }

    pub fn checkpoint(&mut self) {
        self.checkpoint = true;
    }

    pub fn is_checkpoint(&self) -> bool {
        self.checkpoint
    }

    /// The owning manifest. Lookup only; the manifest owns the pipeline.
    pub fn manifest(&self) -> Option<ManifestId> {
        self.manifest
    }

    pub(crate) fn set_build(&mut self, build: &str) {
        self.build = Some(build.to_string());
    }

    pub(crate) fn attach(&mut self, manifest: ManifestId) {
        self.manifest = Some(manifest);
    }

    /// An empty low-level pipeline with this pipeline's name and build root.
    pub fn serialize(&self) -> osbuild::Pipeline {
        osbuild::Pipeline::new(&self.name, self.build.as_deref())
    }
}

/// A unit of work in the manifest graph.
///
/// Serialization is two-phase: the manifest hands each pipeline its resolved
/// [`Inputs`] through [`serialize_start`](Pipeline::serialize_start), calls
/// [`serialize`](Pipeline::serialize), then clears the inputs again with
/// [`serialize_end`](Pipeline::serialize_end). Pipelines without resolved
/// inputs can rely on the default no-op implementations.
pub trait Pipeline: fmt::Debug {
    fn base(&self) -> &Base;

    fn base_mut(&mut self) -> &mut Base;

    fn name(&self) -> &str {
        self.base().name()
    }

    /// Mark the output of this pipeline as a caching boundary.
    fn checkpoint(&mut self) {
        self.base_mut().checkpoint();
    }

    /// Packages this pipeline needs inside the build root it runs in.
    fn get_build_packages(&self, _distro: Distro) -> Vec<String> {
        Vec::new()
    }

    /// Packages to resolve for this pipeline. `dependents` are the pipelines
    /// registered as running inside this one, in registration order; only
    /// build roots get a non-empty slice.
    fn get_package_set_chain(
        &self,
        _distro: Distro,
        _dependents: &[&dyn Pipeline],
    ) -> Vec<PackageSet> {
        Vec::new()
    }

    fn get_container_sources(&self) -> Vec<SourceSpec> {
        Vec::new()
    }

    /// Other pipelines whose output this pipeline consumes. They must be
    /// registered before this one.
    fn referenced_pipelines(&self) -> Vec<&str> {
        Vec::new()
    }

    fn serialize_start(&mut self, _inputs: Inputs) -> Result<()> {
        Ok(())
    }

    fn serialize_end(&mut self) -> Result<()> {
        Ok(())
    }

    fn serialize(&self) -> Result<osbuild::Pipeline>;

    fn as_build(&self) -> Option<&dyn Build> {
        None
    }

    fn as_build_mut(&mut self) -> Option<&mut dyn Build> {
        None
    }
}
