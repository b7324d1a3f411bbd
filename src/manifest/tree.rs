//! Content pipeline that installs a package set into an empty tree.

use tracing::debug;

use crate::error::{InvariantViolation, Result};
use crate::manifest::pipeline::{Base, Inputs, Pipeline};
use crate::manifest::Distro;
use crate::osbuild::rpm::rpm_stage;
use crate::osbuild::{self, FilesInput, RpmStageOptions};
use crate::rpmmd::{filter_repos, PackageSet, PackageSpec, RepoConfig};

#[derive(Debug)]
pub struct Tree {
    base: Base,
    packages: Vec<String>,
    exclude: Vec<String>,
    repos: Vec<RepoConfig>,
    install_weak_deps: bool,
    extra_build_packages: Vec<String>,
    // None outside the serialization window.
    package_specs: Option<Vec<PackageSpec>>,
}

impl Tree {
    /// `repos` is filtered down to the ones that apply to `name`.
    pub fn new(name: &str, packages: Vec<String>, repos: &[RepoConfig]) -> Self {
        Self {
            base: Base::new(name, None),
            packages,
            exclude: Vec::new(),
            repos: filter_repos(repos, name),
            install_weak_deps: true,
            extra_build_packages: Vec::new(),
            package_specs: None,
        }
    }

    pub fn with_exclude(mut self, exclude: Vec<String>) -> Self {
        self.exclude = exclude;
        self
    }

    pub fn with_weak_deps(mut self, install_weak_deps: bool) -> Self {
        self.install_weak_deps = install_weak_deps;
        self
    }

    /// Additional packages the build root must provide for this tree.
    pub fn with_build_packages(mut self, packages: Vec<String>) -> Self {
        self.extra_build_packages = packages;
        self
    }
}

impl Pipeline for Tree {
    fn base(&self) -> &Base {
        &self.base
    }

    fn base_mut(&mut self) -> &mut Base {
        &mut self.base
    }

    fn get_build_packages(&self, distro: Distro) -> Vec<String> {
        let mut packages = vec!["rpm".to_string()];
        if distro.is_el() {
            packages.push("policycoreutils".to_string());
        }
        packages.extend(self.extra_build_packages.iter().cloned());
        packages
    }

    fn get_package_set_chain(
        &self,
        _distro: Distro,
        _dependents: &[&dyn Pipeline],
    ) -> Vec<PackageSet> {
        if self.packages.is_empty() {
            return Vec::new();
        }
        vec![PackageSet {
            include: self.packages.clone(),
            exclude: self.exclude.clone(),
            repositories: self.repos.clone(),
            install_weak_deps: self.install_weak_deps,
        }]
    }

    fn serialize_start(&mut self, inputs: Inputs) -> Result<()> {
        if self.package_specs.is_some() {
            return Err(InvariantViolation::DoubleStart {
                pipeline: self.base.name().to_string(),
            }
            .into());
        }
        debug!(
            pipeline = self.base.name(),
            packages = inputs.depsolved.packages.len(),
            "serialization started"
        );
        self.package_specs = Some(inputs.depsolved.packages);
        Ok(())
    }

    fn serialize_end(&mut self) -> Result<()> {
        if self.package_specs.take().is_none() {
            return Err(InvariantViolation::NotInProgress {
                pipeline: self.base.name().to_string(),
            }
            .into());
        }
        debug!(pipeline = self.base.name(), "serialization ended");
        Ok(())
    }

    fn serialize(&self) -> Result<osbuild::Pipeline> {
        let specs = self
            .package_specs
            .as_deref()
            .ok_or_else(|| InvariantViolation::NotStarted {
                pipeline: self.base.name().to_string(),
            })?;

        let mut pipeline = self.base.serialize();
        if !specs.is_empty() {
            pipeline.add_stage(rpm_stage(
                RpmStageOptions::from_repos(&self.repos),
                FilesInput::from_package_specs(specs),
            ));
        }
        Ok(pipeline)
    }
}
