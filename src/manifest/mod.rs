//! The manifest graph.
//!
//! A [`Manifest`] owns every pipeline of one image build and emits them in
//! registration order. A pipeline can only reference pipelines that are
//! already registered, so registration order is a topological order.
//!
//! # Lifecycle
//!
//! ```text
//! new_build / new_build_from_container / new_bootstrap
//!     │
//!     ├── add_dependent(build, pipeline)      (repeat)
//!     │
//!     ├── get_package_set_chains()            → external package resolver
//!     ├── get_container_source_specs()        → external container resolver
//!     │
//!     └── serialize(depsolved, containers)
//!             serialize_start → serialize → serialize_end, for every pipeline
//! ```
//!
//! After `serialize` returns, every pipeline is back in its unresolved state
//! and the manifest can be inspected or serialized again.

pub mod archive;
pub mod build;
pub mod pipeline;
pub mod tree;

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::{debug, info, warn};

use crate::container::{SourceSpec, Spec};
use crate::distro::Id;
use crate::error::{Error, InvariantViolation, Result};
use crate::osbuild::{self, Sources};
use crate::rpmmd::{DepsolvedSet, PackageSet};

pub use archive::Archive;
pub use build::{
    new_bootstrap, new_build, new_build_from_container, Build, BuildOptions,
    BuildrootFromContainer, BuildrootFromPackages,
};
pub use pipeline::{Base, Inputs, Pipeline};
pub use tree::Tree;

static NEXT_MANIFEST_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of a [`Manifest`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ManifestId(u64);

/// Position of a pipeline in its manifest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PipelineId(usize);

/// Handle to a build root registered in a manifest.
///
/// Content pipelines join a build root by passing its handle to
/// [`Manifest::add_dependent`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildRef {
    manifest: ManifestId,
    id: PipelineId,
    name: String,
}

impl BuildRef {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The manifest owning this build root.
    pub fn manifest(&self) -> ManifestId {
        self.manifest
    }

    pub fn id(&self) -> PipelineId {
        self.id
    }
}

/// Distro context handed to pipelines when they report build packages.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Distro {
    #[default]
    Null,
    El7,
    El8,
    El9,
    El10,
    Fedora,
}

impl Distro {
    pub fn from_id(id: &Id) -> Self {
        match (id.name.as_str(), id.major) {
            ("fedora", _) => Distro::Fedora,
            ("rhel" | "centos" | "almalinux" | "rocky", 7) => Distro::El7,
            ("rhel" | "centos" | "almalinux" | "rocky", 8) => Distro::El8,
            ("rhel" | "centos" | "almalinux" | "rocky", 9) => Distro::El9,
            ("rhel" | "centos" | "almalinux" | "rocky", 10) => Distro::El10,
            _ => Distro::Null,
        }
    }

    pub fn is_el(&self) -> bool {
        matches!(
            self,
            Distro::El7 | Distro::El8 | Distro::El9 | Distro::El10
        )
    }
}

/// Owner of all pipelines of one image build.
#[derive(Debug)]
pub struct Manifest {
    id: ManifestId,
    distro: Distro,
    pipelines: Vec<Box<dyn Pipeline>>,
}

impl Manifest {
    pub fn new(distro: Distro) -> Self {
        Self {
            id: ManifestId(NEXT_MANIFEST_ID.fetch_add(1, Ordering::Relaxed)),
            distro,
            pipelines: Vec::new(),
        }
    }

    pub fn id(&self) -> ManifestId {
        self.id
    }

    pub fn distro(&self) -> Distro {
        self.distro
    }

    pub(crate) fn ensure_owned(&self, build: &BuildRef, dependent: &str) -> Result<()> {
        if build.manifest != self.id {
            return Err(InvariantViolation::ForeignBuild {
                build: build.name.clone(),
                dependent: dependent.to_string(),
            }
            .into());
        }
        Ok(())
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.pipelines.iter().position(|p| p.name() == name)
    }

    fn add_pipeline(&mut self, mut pipeline: Box<dyn Pipeline>) -> Result<PipelineId> {
        let name = pipeline.name().to_string();
        if self.position(&name).is_some() {
            return Err(Error::DuplicatePipeline { name });
        }

        let missing = pipeline
            .base()
            .build()
            .into_iter()
            .chain(pipeline.referenced_pipelines())
            .find(|reference| self.position(reference).is_none())
            .map(str::to_string);
        if let Some(missing) = missing {
            return Err(Error::UnknownPipeline { name: missing });
        }

        pipeline.base_mut().attach(self.id);
        let id = PipelineId(self.pipelines.len());
        self.pipelines.push(pipeline);
        debug!(pipeline = %name, position = id.0, "pipeline registered");
        Ok(id)
    }

    pub(crate) fn add_build(&mut self, pipeline: Box<dyn Pipeline>) -> Result<BuildRef> {
        let name = pipeline.name().to_string();
        let bootstrap = pipeline.base().build().map(str::to_string);
        let id = self.add_pipeline(pipeline)?;
        if let Some(pos) = bootstrap.and_then(|b| self.position(&b)) {
            if let Some(root) = self.pipelines[pos].as_build_mut() {
                root.add_dependent(id);
            }
        }
        Ok(BuildRef {
            manifest: self.id,
            id,
            name,
        })
    }

    /// Register `pipeline` as running inside `build`.
    ///
    /// This is the only way to join a build root: the pipeline moves into
    /// the manifest and is recorded as a dependent of exactly one build.
    pub fn add_dependent<P: Pipeline + 'static>(
        &mut self,
        build: &BuildRef,
        pipeline: P,
    ) -> Result<PipelineId> {
        let mut pipeline: Box<dyn Pipeline> = Box::new(pipeline);
        self.ensure_owned(build, pipeline.name())?;
        self.build(build)?;

        pipeline.base_mut().set_build(build.name());
        let id = self.add_pipeline(pipeline)?;
        if let Some(root) = self
            .pipelines
            .get_mut(build.id.0)
            .and_then(|p| p.as_build_mut())
        {
            root.add_dependent(id);
        }
        debug!(build = build.name(), dependent = id.0, "dependent registered");
        Ok(id)
    }

    /// The build root behind a handle.
    pub fn build(&self, build: &BuildRef) -> Result<&dyn Build> {
        self.ensure_owned(build, build.name())?;
        self.pipelines
            .get(build.id.0)
            .and_then(|p| p.as_build())
            .ok_or_else(|| Error::UnknownPipeline {
                name: build.name.clone(),
            })
    }

    pub fn pipeline(&self, name: &str) -> Option<&dyn Pipeline> {
        self.pipelines
            .iter()
            .find(|p| p.name() == name)
            .map(|p| p.as_ref())
    }

    /// All pipelines in emission order.
    pub fn pipelines(&self) -> impl Iterator<Item = &dyn Pipeline> + '_ {
        self.pipelines.iter().map(|p| p.as_ref())
    }

    pub fn pipeline_names(&self) -> Vec<&str> {
        self.pipelines.iter().map(|p| p.name()).collect()
    }

    /// Dependents of a build root, in registration order.
    pub fn dependents_of(&self, build: &BuildRef) -> Result<Vec<&dyn Pipeline>> {
        let root = self.build(build)?;
        Ok(self.resolve_ids(root.dependents()))
    }

    fn resolve_ids(&self, ids: &[PipelineId]) -> Vec<&dyn Pipeline> {
        ids.iter()
            .filter_map(|id| self.pipelines.get(id.0))
            .map(|p| p.as_ref())
            .collect()
    }

    pub fn checkpoint(&mut self, name: &str) -> Result<()> {
        let pipeline = self
            .pipelines
            .iter_mut()
            .find(|p| p.name() == name)
            .ok_or_else(|| Error::UnknownPipeline {
                name: name.to_string(),
            })?;
        pipeline.checkpoint();
        Ok(())
    }

    /// Names of checkpointed pipelines, for the execution engine.
    pub fn checkpoints(&self) -> Vec<String> {
        self.pipelines
            .iter()
            .filter(|p| p.base().is_checkpoint())
            .map(|p| p.name().to_string())
            .collect()
    }

    /// Package sets to resolve, keyed by pipeline name. Pipelines that need
    /// no packages are left out.
    pub fn get_package_set_chains(&self) -> BTreeMap<String, Vec<PackageSet>> {
        let mut chains = BTreeMap::new();
        for pipeline in &self.pipelines {
            let dependents = pipeline
                .as_build()
                .map(|root| self.resolve_ids(root.dependents()))
                .unwrap_or_default();
            let chain = pipeline.get_package_set_chain(self.distro, &dependents);
            if !chain.is_empty() {
                chains.insert(pipeline.name().to_string(), chain);
            }
        }
        chains
    }

    /// Containers to resolve, keyed by pipeline name.
    pub fn get_container_source_specs(&self) -> BTreeMap<String, Vec<SourceSpec>> {
        self.pipelines
            .iter()
            .map(|p| (p.name().to_string(), p.get_container_sources()))
            .filter(|(_, sources)| !sources.is_empty())
            .collect()
    }

    /// Serialize every pipeline with the resolver output injected.
    ///
    /// Resolved inputs are keyed by pipeline name. Every pipeline is
    /// returned to its unresolved state before this returns, whether
    /// serialization succeeded or not.
    pub fn serialize(
        &mut self,
        depsolved: &BTreeMap<String, DepsolvedSet>,
        containers: &BTreeMap<String, Vec<Spec>>,
    ) -> Result<osbuild::Manifest> {
        info!(pipelines = self.pipelines.len(), "serializing manifest");

        for idx in 0..self.pipelines.len() {
            let name = self.pipelines[idx].name().to_string();
            let inputs = Inputs {
                depsolved: depsolved.get(&name).cloned().unwrap_or_default(),
                containers: containers.get(&name).cloned().unwrap_or_default(),
            };
            if let Err(err) = self.pipelines[idx].serialize_start(inputs) {
                self.abort_serialization(idx);
                return Err(err);
            }
        }

        let serialized: Result<Vec<osbuild::Pipeline>> =
            self.pipelines.iter().map(|p| p.serialize()).collect();
        let pipelines = match serialized {
            Ok(pipelines) => pipelines,
            Err(err) => {
                self.abort_serialization(self.pipelines.len());
                return Err(err);
            }
        };

        let mut end_error = None;
        for pipeline in &mut self.pipelines {
            if let Err(err) = pipeline.serialize_end() {
                warn!(pipeline = pipeline.name(), error = %err, "ending serialization");
                end_error.get_or_insert(err);
            }
        }
        if let Some(err) = end_error {
            return Err(err);
        }

        let mut sources = Sources::default();
        for pipeline in &self.pipelines {
            if let Some(set) = depsolved.get(pipeline.name()) {
                sources.add_packages(&set.packages);
            }
            if let Some(specs) = containers.get(pipeline.name()) {
                sources.add_containers(specs);
            }
        }

        Ok(osbuild::Manifest::new(pipelines, sources))
    }

    // Best-effort end for the first `started` pipelines after a failure.
    fn abort_serialization(&mut self, started: usize) {
        for pipeline in self.pipelines.iter_mut().take(started) {
            if let Err(err) = pipeline.serialize_end() {
                warn!(
                    pipeline = pipeline.name(),
                    error = %err,
                    "ending serialization after failure"
                );
            }
        }
    }
}
