//! Build roots: the environments other pipelines execute in.
//!
//! As a general rule, the tools needed to build a pipeline are taken from
//! its build root rather than from the pipeline itself. Without a build root
//! the host's filesystem would be used, which is neither predictable nor
//! reproducible. The build root itself is built on the host (or inside a
//! bootstrap root), so it must assume as little as possible.
//!
//! Two kinds exist:
//!
//! - [`BuildrootFromPackages`] - installs an aggregated package set
//! - [`BuildrootFromContainer`] - deploys a single container image
//!
//! Both hold resolved specs only between `serialize_start()` and
//! `serialize_end()`. Calling the lifecycle out of order returns a fatal
//! [`InvariantViolation`].

use std::collections::BTreeMap;

use tracing::debug;

use crate::container::{SourceSpec, Spec};
use crate::error::{InvariantViolation, Result};
use crate::fsnode::Directory;
use crate::manifest::pipeline::{Base, Inputs, Pipeline};
use crate::manifest::{BuildRef, Distro, Manifest, PipelineId};
use crate::osbuild::container_deploy::container_deploy_stage;
use crate::osbuild::copy::copy_stage;
use crate::osbuild::mkdir::directory_stages;
use crate::osbuild::rpm::rpm_stage;
use crate::osbuild::selinux::{file_contexts_path, selinux_stage, INSTALL_EXEC_LABEL};
use crate::osbuild::{
    self, pipeline_tree_inputs, ContainerDeployOptions, ContainersInput, CopyPath,
    CopyStageOptions, FilesInput, RpmStageOptions, SelinuxStageOptions,
};
use crate::rpmmd::{filter_repos, PackageSet, PackageSpec, RepoConfig};
use crate::runner::{self, Runner};

pub const DEFAULT_BUILD_NAME: &str = "build";
pub const BOOTSTRAP_BUILD_NAME: &str = "bootstrap-buildroot";
pub const DEFAULT_SELINUX_POLICY: &str = "targeted";

const COPY_TREE_INPUT: &str = "copy-tree";

pub(crate) mod sealed {
    use crate::manifest::PipelineId;

    pub trait Dependents {
        fn add_dependent(&mut self, dep: PipelineId);
    }
}

/// A pipeline other pipelines can run inside.
///
/// Dependents are registered through [`Manifest::add_dependent`], which
/// moves the pipeline into the manifest and records it here in one step.
pub trait Build: Pipeline + sealed::Dependents {
    /// Pipelines running inside this build root, in registration order.
    fn dependents(&self) -> &[PipelineId];
}

#[derive(Debug, Clone, Default)]
pub struct BuildOptions {
    /// Keep the build root usable when the build itself runs in a container,
    /// i.e. do not rely on a host-installed SELinux policy for osbuild.
    pub container_buildable: bool,

    /// Skip SELinux labeling. Not advised; needed for cross-arch builds.
    pub disable_selinux: bool,

    /// Defaults to [`DEFAULT_SELINUX_POLICY`].
    pub selinux_policy: Option<String>,

    /// Run this build root inside the given bootstrap root (cross-arch).
    pub bootstrap_pipeline: Option<BuildRef>,

    /// Defaults to [`DEFAULT_BUILD_NAME`].
    pub pipeline_name: Option<String>,

    /// Container build roots only: source pipeline to paths to copy in.
    pub copy_files_from: BTreeMap<String, Vec<String>>,

    /// Container build roots only: directories that must exist.
    pub ensure_dirs: Vec<Directory>,
}

impl BuildOptions {
    fn name(&self) -> String {
        self.pipeline_name
            .as_deref()
            .filter(|name| !name.is_empty())
            .unwrap_or(DEFAULT_BUILD_NAME)
            .to_string()
    }

    fn selinux_policy(&self) -> String {
        self.selinux_policy
            .as_deref()
            .filter(|policy| !policy.is_empty())
            .unwrap_or(DEFAULT_SELINUX_POLICY)
            .to_string()
    }
}

/// Build root assembled by installing packages into an empty tree.
#[derive(Debug)]
pub struct BuildrootFromPackages {
    base: Base,
    runner: Box<dyn Runner>,
    dependents: Vec<PipelineId>,
    repos: Vec<RepoConfig>,
    // Repositories discovered by the resolver are kept apart from `repos`
    // and dropped in serialize_end, so repeated cycles never accumulate
    // them in the captured list.
    depsolved_repos: Vec<RepoConfig>,
    package_specs: Vec<PackageSpec>,
    container_buildable: bool,
    // Bootstrap containers rarely ship setfiles(8), so labeling has to be
    // skipped until the engine can run setfiles from inside the root.
    disable_selinux: bool,
    selinux_policy: String,
}

/// Create the package-based build root and register it with `manifest`.
pub fn new_build(
    manifest: &mut Manifest,
    runner: Box<dyn Runner>,
    repos: &[RepoConfig],
    opts: BuildOptions,
) -> Result<BuildRef> {
    let name = opts.name();
    if let Some(bootstrap) = &opts.bootstrap_pipeline {
        manifest.ensure_owned(bootstrap, &name)?;
    }

    let pipeline = BuildrootFromPackages {
        base: Base::new(&name, opts.bootstrap_pipeline.as_ref()),
        runner,
        dependents: Vec::new(),
        repos: filter_repos(repos, &name),
        depsolved_repos: Vec::new(),
        package_specs: Vec::new(),
        container_buildable: opts.container_buildable,
        disable_selinux: opts.disable_selinux,
        selinux_policy: opts.selinux_policy(),
    };
    manifest.add_build(Box::new(pipeline))
}

impl BuildrootFromPackages {
    pub fn selinux_policy(&self) -> &str {
        &self.selinux_policy
    }

    /// Resolved packages; empty outside the serialization window.
    pub fn get_package_specs(&self) -> &[PackageSpec] {
        &self.package_specs
    }

    /// Repositories the build root installs from: the filtered request
    /// repositories plus any the resolver added for this cycle.
    pub fn repositories(&self) -> Vec<RepoConfig> {
        let mut repos = self.repos.clone();
        repos.extend(self.depsolved_repos.iter().cloned());
        repos
    }

    /// Labels derived from the packages the resolver actually picked.
    ///
    /// File context mappings ship with the package that owns the binary, so
    /// only binaries from resolved packages can be labeled.
    pub fn get_selinux_labels(&self) -> BTreeMap<String, String> {
        let mut labels = BTreeMap::new();
        for pkg in &self.package_specs {
            match pkg.name.as_str() {
                "coreutils" => {
                    labels.insert("/usr/bin/cp".to_string(), INSTALL_EXEC_LABEL.to_string());
                    if self.container_buildable {
                        insert_mount_labels(&mut labels);
                    }
                }
                "tar" => {
                    labels.insert("/usr/bin/tar".to_string(), INSTALL_EXEC_LABEL.to_string());
                }
                _ => {}
            }
        }
        labels
    }
}

impl sealed::Dependents for BuildrootFromPackages {
    fn add_dependent(&mut self, dep: PipelineId) {
        self.dependents.push(dep);
    }
}

impl Build for BuildrootFromPackages {
    fn dependents(&self) -> &[PipelineId] {
        &self.dependents
    }
}

impl Pipeline for BuildrootFromPackages {
    fn base(&self) -> &Base {
        &self.base
    }

    fn base_mut(&mut self) -> &mut Base {
        &mut self.base
    }

    fn get_package_set_chain(
        &self,
        distro: Distro,
        dependents: &[&dyn Pipeline],
    ) -> Vec<PackageSet> {
        // coreutils and xz are always requested, even when no dependent
        // ends up calling cp or xz.
        let mut packages = vec![
            format!("selinux-policy-{}", self.selinux_policy),
            "coreutils".to_string(),
            "xz".to_string(),
        ];
        packages.extend(self.runner.build_packages());
        for dependent in dependents {
            packages.extend(dependent.get_build_packages(distro));
        }

        vec![PackageSet {
            include: packages,
            exclude: Vec::new(),
            repositories: self.repositories(),
            install_weak_deps: true,
        }]
    }

    fn serialize_start(&mut self, inputs: Inputs) -> Result<()> {
        if !self.package_specs.is_empty() {
            return Err(InvariantViolation::DoubleStart {
                pipeline: self.base.name().to_string(),
            }
            .into());
        }
        debug!(
            pipeline = self.base.name(),
            packages = inputs.depsolved.packages.len(),
            extra_repos = inputs.depsolved.repos.len(),
            "serialization started"
        );
        self.package_specs = inputs.depsolved.packages;
        self.depsolved_repos = inputs.depsolved.repos;
        Ok(())
    }

    fn serialize_end(&mut self) -> Result<()> {
        if self.package_specs.is_empty() {
            return Err(InvariantViolation::NotInProgress {
                pipeline: self.base.name().to_string(),
            }
            .into());
        }
        self.package_specs.clear();
        self.depsolved_repos.clear();
        debug!(pipeline = self.base.name(), "serialization ended");
        Ok(())
    }

    fn serialize(&self) -> Result<osbuild::Pipeline> {
        if self.package_specs.is_empty() {
            return Err(InvariantViolation::NotStarted {
                pipeline: self.base.name().to_string(),
            }
            .into());
        }

        let mut pipeline = self.base.serialize();
        pipeline.runner = Some(self.runner.to_string());
        pipeline.add_stage(rpm_stage(
            RpmStageOptions::from_repos(&self.repositories()),
            FilesInput::from_package_specs(&self.package_specs),
        ));
        if !self.disable_selinux {
            pipeline.add_stage(selinux_stage(SelinuxStageOptions {
                file_contexts: file_contexts_path(&self.selinux_policy),
                exclude_paths: Vec::new(),
                labels: self.get_selinux_labels(),
            }));
        }
        Ok(pipeline)
    }

    fn as_build(&self) -> Option<&dyn Build> {
        Some(self)
    }

    fn as_build_mut(&mut self) -> Option<&mut dyn Build> {
        Some(self)
    }
}

/// Build root assembled by deploying one container image.
#[derive(Debug)]
pub struct BuildrootFromContainer {
    base: Base,
    runner: Box<dyn Runner>,
    dependents: Vec<PipelineId>,
    containers: Vec<SourceSpec>,
    container_specs: Vec<Spec>,
    container_buildable: bool,
    disable_selinux: bool,
    selinux_policy: String,
    copy_files_from: BTreeMap<String, Vec<String>>,
    ensure_dirs: Vec<Directory>,
}

/// Create a container-based build root and register it with `manifest`.
pub fn new_build_from_container(
    manifest: &mut Manifest,
    runner: Box<dyn Runner>,
    container_sources: Vec<SourceSpec>,
    opts: BuildOptions,
) -> Result<BuildRef> {
    let name = opts.name();
    if let Some(bootstrap) = &opts.bootstrap_pipeline {
        manifest.ensure_owned(bootstrap, &name)?;
    }

    let pipeline = BuildrootFromContainer {
        base: Base::new(&name, opts.bootstrap_pipeline.as_ref()),
        runner,
        dependents: Vec::new(),
        containers: container_sources,
        container_specs: Vec::new(),
        container_buildable: opts.container_buildable,
        disable_selinux: opts.disable_selinux,
        selinux_policy: opts.selinux_policy(),
        copy_files_from: opts.copy_files_from,
        ensure_dirs: opts.ensure_dirs,
    };
    manifest.add_build(Box::new(pipeline))
}

/// Create the bootstrap root used to run a cross-arch build root.
///
/// It uses the minimal runner because nothing can be assumed about the
/// environment, and labeling is off because bootstrap containers typically
/// do not ship setfiles(8).
pub fn new_bootstrap(
    manifest: &mut Manifest,
    container_sources: Vec<SourceSpec>,
) -> Result<BuildRef> {
    let pipeline = BuildrootFromContainer {
        base: Base::new(BOOTSTRAP_BUILD_NAME, None),
        runner: Box::new(runner::Linux),
        dependents: Vec::new(),
        containers: container_sources,
        container_specs: Vec::new(),
        container_buildable: true,
        disable_selinux: true,
        selinux_policy: DEFAULT_SELINUX_POLICY.to_string(),
        copy_files_from: BTreeMap::new(),
        ensure_dirs: Vec::new(),
    };
    manifest.add_build(Box::new(pipeline))
}

impl BuildrootFromContainer {
    /// Resolved containers; empty outside the serialization window.
    pub fn get_container_specs(&self) -> &[Spec] {
        &self.container_specs
    }

    pub fn get_selinux_labels(&self) -> BTreeMap<String, String> {
        let mut labels = BTreeMap::new();
        if self.disable_selinux {
            return labels;
        }
        labels.insert("/usr/bin/ostree".to_string(), INSTALL_EXEC_LABEL.to_string());
        if self.container_buildable {
            insert_mount_labels(&mut labels);
        }
        labels
    }
}

impl sealed::Dependents for BuildrootFromContainer {
    fn add_dependent(&mut self, dep: PipelineId) {
        self.dependents.push(dep);
    }
}

impl Build for BuildrootFromContainer {
    fn dependents(&self) -> &[PipelineId] {
        &self.dependents
    }
}

impl Pipeline for BuildrootFromContainer {
    fn base(&self) -> &Base {
        &self.base
    }

    fn base_mut(&mut self) -> &mut Base {
        &mut self.base
    }

    fn get_container_sources(&self) -> Vec<SourceSpec> {
        self.containers.clone()
    }

    fn referenced_pipelines(&self) -> Vec<&str> {
        self.copy_files_from.keys().map(String::as_str).collect()
    }

    fn serialize_start(&mut self, inputs: Inputs) -> Result<()> {
        if !self.container_specs.is_empty() {
            return Err(InvariantViolation::DoubleStart {
                pipeline: self.base.name().to_string(),
            }
            .into());
        }
        debug!(
            pipeline = self.base.name(),
            containers = inputs.containers.len(),
            "serialization started"
        );
        self.container_specs = inputs.containers;
        Ok(())
    }

    fn serialize_end(&mut self) -> Result<()> {
        if self.container_specs.is_empty() {
            return Err(InvariantViolation::NotInProgress {
                pipeline: self.base.name().to_string(),
            }
            .into());
        }
        self.container_specs.clear();
        debug!(pipeline = self.base.name(), "serialization ended");
        Ok(())
    }

    fn serialize(&self) -> Result<osbuild::Pipeline> {
        let spec = match self.container_specs.as_slice() {
            [] => {
                return Err(InvariantViolation::NotStarted {
                    pipeline: self.base.name().to_string(),
                }
                .into())
            }
            [spec] => spec,
            specs => {
                return Err(InvariantViolation::ContainerCardinality {
                    pipeline: self.base.name().to_string(),
                    count: specs.len(),
                }
                .into())
            }
        };

        let mut pipeline = self.base.serialize();
        pipeline.runner = Some(self.runner.to_string());

        // Signatures are stripped on copy until signature-preserving copies
        // work upstream (containers/image#2599).
        let image = ContainersInput::for_single_source(spec);
        pipeline.add_stage(container_deploy_stage(
            image,
            ContainerDeployOptions {
                remove_signatures: true,
                ..Default::default()
            },
        )?);

        for stage in directory_stages(&self.ensure_dirs) {
            pipeline.add_stage(stage);
        }

        for (source, paths) in &self.copy_files_from {
            for path in paths {
                pipeline.add_stage(copy_stage(
                    CopyStageOptions {
                        paths: vec![CopyPath::same_path(COPY_TREE_INPUT, path)],
                    },
                    pipeline_tree_inputs(COPY_TREE_INPUT, source),
                ));
            }
        }

        if !self.disable_selinux {
            // A container root may carry an embedded deployment under
            // /sysroot which must keep its own labels.
            pipeline.add_stage(selinux_stage(SelinuxStageOptions {
                file_contexts: file_contexts_path(&self.selinux_policy),
                exclude_paths: vec!["/sysroot".to_string()],
                labels: self.get_selinux_labels(),
            }));
        }

        Ok(pipeline)
    }

    fn as_build(&self) -> Option<&dyn Build> {
        Some(self)
    }

    fn as_build_mut(&mut self) -> Option<&mut dyn Build> {
        Some(self)
    }
}

fn insert_mount_labels(labels: &mut BTreeMap<String, String>) {
    labels.insert("/usr/bin/mount".to_string(), INSTALL_EXEC_LABEL.to_string());
    labels.insert("/usr/bin/umount".to_string(), INSTALL_EXEC_LABEL.to_string());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::manifest::testutil::{depsolved, resolved_container, Fixed};
    use crate::osbuild::StageOptions;
    use crate::runner::Linux;

    fn packages_root(container_buildable: bool) -> BuildrootFromPackages {
        BuildrootFromPackages {
            base: Base::new("build", None),
            runner: Box::new(Linux),
            dependents: Vec::new(),
            repos: Vec::new(),
            depsolved_repos: Vec::new(),
            package_specs: Vec::new(),
            container_buildable,
            disable_selinux: false,
            selinux_policy: DEFAULT_SELINUX_POLICY.to_string(),
        }
    }

    fn container_root(disable_selinux: bool) -> BuildrootFromContainer {
        BuildrootFromContainer {
            base: Base::new("build", None),
            runner: Box::new(Linux),
            dependents: Vec::new(),
            containers: vec![SourceSpec::new("registry.example.com/buildroot:latest")],
            container_specs: Vec::new(),
            container_buildable: false,
            disable_selinux,
            selinux_policy: DEFAULT_SELINUX_POLICY.to_string(),
            copy_files_from: BTreeMap::new(),
            ensure_dirs: Vec::new(),
        }
    }

    fn package_inputs(names: &[&str]) -> Inputs {
        Inputs {
            depsolved: depsolved(names),
            containers: Vec::new(),
        }
    }

    fn container_inputs(count: usize) -> Inputs {
        Inputs {
            depsolved: Default::default(),
            containers: (0..count)
                .map(|i| resolved_container(&format!("registry.example.com/img{i}")))
                .collect(),
        }
    }

    fn selinux_options(pipeline: &osbuild::Pipeline) -> Option<SelinuxStageOptions> {
        pipeline
            .stages_of("org.osbuild.selinux")
            .find_map(|stage| match &stage.options {
                Some(StageOptions::Selinux(options)) => Some(options.clone()),
                _ => None,
            })
    }

    #[test]
    fn double_start_is_fatal() {
        let mut root = packages_root(false);
        root.serialize_start(package_inputs(&["coreutils"])).unwrap();
        let err = root.serialize_start(package_inputs(&["xz"])).unwrap_err();
        assert!(err.is_fatal());
        assert_eq!(
            err.violation(),
            Some(&InvariantViolation::DoubleStart {
                pipeline: "build".into()
            })
        );
        // The first window is untouched.
        assert_eq!(root.get_package_specs()[0].name, "coreutils");
    }

    #[test]
    fn container_double_start_is_fatal() {
        let mut root = container_root(false);
        root.serialize_start(container_inputs(1)).unwrap();
        let err = root.serialize_start(container_inputs(1)).unwrap_err();
        assert!(err.is_fatal());
        assert_eq!(
            err.violation(),
            Some(&InvariantViolation::DoubleStart {
                pipeline: "build".into()
            })
        );
        assert_eq!(root.get_container_specs().len(), 1);

        root.serialize_end().unwrap();
        assert!(root.get_container_specs().is_empty());
    }

    #[test]
    fn serialize_before_start_is_fatal() {
        let err = packages_root(false).serialize().unwrap_err();
        assert!(matches!(
            err.violation(),
            Some(InvariantViolation::NotStarted { .. })
        ));

        let err = container_root(false).serialize().unwrap_err();
        assert!(matches!(
            err.violation(),
            Some(InvariantViolation::NotStarted { .. })
        ));
    }

    #[test]
    fn end_without_start_is_fatal() {
        let err = packages_root(false).serialize_end().unwrap_err();
        assert!(matches!(
            err.violation(),
            Some(InvariantViolation::NotInProgress { .. })
        ));

        let err = container_root(false).serialize_end().unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    fn window_closes_after_end() {
        let mut root = packages_root(false);
        root.serialize_start(Inputs {
            depsolved: crate::rpmmd::DepsolvedSet {
                packages: depsolved(&["coreutils"]).packages,
                repos: vec![RepoConfig {
                    id: "extra".into(),
                    ..Default::default()
                }],
            },
            containers: Vec::new(),
        })
        .unwrap();
        assert_eq!(root.repositories().len(), 1);

        root.serialize_end().unwrap();
        assert!(root.get_package_specs().is_empty());
        assert!(root.repositories().is_empty());
        assert!(root.serialize().is_err());
        root.serialize_start(package_inputs(&["coreutils"])).unwrap();
    }

    #[test]
    fn package_chain_aggregates_dependents_in_order() {
        let mut m = Manifest::new(Distro::Null);
        let build = new_build(&mut m, Box::new(Linux), &[], BuildOptions::default()).unwrap();
        m.add_dependent(&build, Fixed::new("os", &["foo"])).unwrap();
        m.add_dependent(&build, Fixed::new("image", &["bar"])).unwrap();

        let chains = m.get_package_set_chains();
        let chain = &chains["build"];
        assert_eq!(chain.len(), 1);
        assert_eq!(
            chain[0].include,
            vec![
                "selinux-policy-targeted",
                "coreutils",
                "xz",
                "glibc",
                "systemd",
                "python3",
                "foo",
                "bar"
            ]
        );
        assert!(chain[0].exclude.is_empty());
        assert!(chain[0].install_weak_deps);
        assert_eq!(chains, m.get_package_set_chains());
    }

    #[test]
    fn package_chain_uses_selinux_policy_and_filtered_repos() {
        let repos = vec![
            RepoConfig {
                id: "everywhere".into(),
                ..Default::default()
            },
            RepoConfig {
                id: "os-only".into(),
                package_sets: vec!["os".into()],
                ..Default::default()
            },
            RepoConfig {
                id: "build-only".into(),
                package_sets: vec!["build".into()],
                ..Default::default()
            },
        ];
        let mut m = Manifest::new(Distro::Null);
        new_build(
            &mut m,
            Box::new(Linux),
            &repos,
            BuildOptions {
                selinux_policy: Some("mls".into()),
                ..Default::default()
            },
        )
        .unwrap();

        let chain = &m.get_package_set_chains()["build"];
        assert_eq!(chain[0].include[0], "selinux-policy-mls");
        let ids: Vec<_> = chain[0].repositories.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["everywhere", "build-only"]);
    }

    #[test]
    fn empty_options_fall_back_to_defaults() {
        let mut m = Manifest::new(Distro::Null);
        let build = new_build(
            &mut m,
            Box::new(Linux),
            &[],
            BuildOptions {
                pipeline_name: Some(String::new()),
                selinux_policy: Some(String::new()),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(build.name(), DEFAULT_BUILD_NAME);
        let chain = &m.get_package_set_chains()["build"];
        assert_eq!(chain[0].include[0], "selinux-policy-targeted");
    }

    #[test]
    fn labels_follow_resolved_packages() {
        let mut root = packages_root(true);
        root.serialize_start(package_inputs(&["coreutils", "tar", "bash"]))
            .unwrap();
        let labels = root.get_selinux_labels();
        assert_eq!(
            labels.keys().collect::<Vec<_>>(),
            vec!["/usr/bin/cp", "/usr/bin/mount", "/usr/bin/tar", "/usr/bin/umount"]
        );
        assert!(labels.values().all(|label| label == INSTALL_EXEC_LABEL));
    }

    #[test]
    fn labels_without_container_buildable() {
        let mut root = packages_root(false);
        root.serialize_start(package_inputs(&["coreutils"])).unwrap();
        let labels = root.get_selinux_labels();
        assert_eq!(labels.keys().collect::<Vec<_>>(), vec!["/usr/bin/cp"]);

        let mut root = packages_root(false);
        root.serialize_start(package_inputs(&["bash"])).unwrap();
        assert!(root.get_selinux_labels().is_empty());
    }

    #[test]
    fn packages_root_serializes_rpm_and_selinux() {
        let mut root = packages_root(false);
        root.serialize_start(package_inputs(&["coreutils", "xz"])).unwrap();
        let pipeline = root.serialize().unwrap();

        assert_eq!(pipeline.name, "build");
        assert!(pipeline.build.is_none());
        assert_eq!(pipeline.runner.as_deref(), Some("org.osbuild.linux"));
        let kinds: Vec<_> = pipeline.stages.iter().map(|s| s.kind.as_str()).collect();
        assert_eq!(kinds, vec!["org.osbuild.rpm", "org.osbuild.selinux"]);

        let selinux = selinux_options(&pipeline).unwrap();
        assert_eq!(
            selinux.file_contexts,
            "etc/selinux/targeted/contexts/files/file_contexts"
        );
        assert!(selinux.exclude_paths.is_empty());
    }

    #[test]
    fn disabled_selinux_emits_no_label_stage() {
        let mut root = packages_root(false);
        root.disable_selinux = true;
        root.serialize_start(package_inputs(&["coreutils"])).unwrap();
        let pipeline = root.serialize().unwrap();
        assert_eq!(pipeline.stages_of("org.osbuild.selinux").count(), 0);

        let mut root = container_root(true);
        root.serialize_start(container_inputs(1)).unwrap();
        let pipeline = root.serialize().unwrap();
        assert_eq!(pipeline.stages_of("org.osbuild.selinux").count(), 0);
        assert!(root.get_selinux_labels().is_empty());
    }

    #[test]
    fn container_root_requires_exactly_one_image() {
        let mut root = container_root(false);
        root.serialize_start(container_inputs(2)).unwrap();
        let err = root.serialize().unwrap_err();
        assert!(err.is_fatal());
        assert_eq!(
            err.violation(),
            Some(&InvariantViolation::ContainerCardinality {
                pipeline: "build".into(),
                count: 2
            })
        );
        root.serialize_end().unwrap();
    }

    #[test]
    fn container_root_stage_order() {
        let mut root = container_root(false);
        root.container_buildable = true;
        root.ensure_dirs = vec![
            Directory::new("/var/tmp", None, false).unwrap(),
            Directory::new("/run/osbuild", Some(0o755), true).unwrap(),
        ];
        root.copy_files_from = BTreeMap::from([(
            "os".to_string(),
            vec![
                "/etc/containers/policy.json".to_string(),
                "/etc/pki/ca-trust".to_string(),
            ],
        )]);
        root.serialize_start(container_inputs(1)).unwrap();

        let pipeline = root.serialize().unwrap();
        let kinds: Vec<_> = pipeline.stages.iter().map(|s| s.kind.as_str()).collect();
        assert_eq!(
            kinds,
            vec![
                "org.osbuild.container-deploy",
                "org.osbuild.mkdir",
                "org.osbuild.mkdir",
                "org.osbuild.copy",
                "org.osbuild.copy",
                "org.osbuild.selinux"
            ]
        );

        let deploy = &pipeline.stages[0];
        assert!(deploy.inputs.contains_key("images"));
        assert_eq!(
            deploy.options,
            Some(StageOptions::ContainerDeploy(ContainerDeployOptions {
                remove_signatures: true,
                exclude: Vec::new(),
            }))
        );

        let copy = &pipeline.stages[3];
        assert_eq!(
            copy.options,
            Some(StageOptions::Copy(CopyStageOptions {
                paths: vec![CopyPath {
                    from: "input://copy-tree/etc/containers/policy.json".into(),
                    to: "tree:///etc/containers/policy.json".into(),
                }]
            }))
        );

        let selinux = selinux_options(&pipeline).unwrap();
        assert_eq!(selinux.exclude_paths, vec!["/sysroot"]);
        assert_eq!(
            selinux.labels.keys().collect::<Vec<_>>(),
            vec!["/usr/bin/mount", "/usr/bin/ostree", "/usr/bin/umount"]
        );
    }

    #[test]
    fn unresolved_image_id_is_reportable() {
        let mut root = container_root(false);
        let mut inputs = container_inputs(1);
        inputs.containers[0].image_id = "latest".into();
        root.serialize_start(inputs).unwrap();
        let err = root.serialize().unwrap_err();
        assert!(matches!(err, Error::Stage(_)));
        assert!(!err.is_fatal());
    }

    #[test]
    fn copy_source_must_be_registered_first() {
        let mut m = Manifest::new(Distro::Null);
        let err = new_build_from_container(
            &mut m,
            Box::new(Linux),
            vec![SourceSpec::new("registry.example.com/buildroot")],
            BuildOptions {
                copy_files_from: BTreeMap::from([("os".to_string(), vec!["/etc".to_string()])]),
                ..Default::default()
            },
        )
        .unwrap_err();
        assert!(matches!(err, Error::UnknownPipeline { ref name } if name == "os"));
    }

    #[test]
    fn bootstrap_root_configuration() {
        let mut m = Manifest::new(Distro::Null);
        let bootstrap = new_bootstrap(
            &mut m,
            vec![SourceSpec::new("registry.example.com/bootstrap:latest")],
        )
        .unwrap();
        assert_eq!(bootstrap.name(), BOOTSTRAP_BUILD_NAME);

        let build = new_build(
            &mut m,
            Box::new(Linux),
            &[],
            BuildOptions {
                bootstrap_pipeline: Some(bootstrap.clone()),
                disable_selinux: true,
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(m.pipeline_names(), vec!["bootstrap-buildroot", "build"]);
        assert_eq!(m.pipeline("build").unwrap().base().build(), Some(BOOTSTRAP_BUILD_NAME));
        let dependents = m.dependents_of(&bootstrap).unwrap();
        assert_eq!(dependents.len(), 1);
        assert_eq!(dependents[0].name(), build.name());

        let depsolved = BTreeMap::from([("build".to_string(), depsolved(&["coreutils"]))]);
        let containers = BTreeMap::from([(
            BOOTSTRAP_BUILD_NAME.to_string(),
            vec![resolved_container("registry.example.com/bootstrap:latest")],
        )]);
        let out = m.serialize(&depsolved, &containers).unwrap();

        let root = &out.pipelines[0];
        assert_eq!(root.runner.as_deref(), Some("org.osbuild.linux"));
        assert_eq!(root.stages_of("org.osbuild.selinux").count(), 0);
        assert_eq!(out.pipelines[1].build.as_deref(), Some("name:bootstrap-buildroot"));
        assert_eq!(out.sources.skopeo.items.len(), 1);
    }

    #[test]
    fn foreign_bootstrap_is_fatal() {
        let mut other = Manifest::new(Distro::Null);
        let bootstrap = new_bootstrap(&mut other, Vec::new()).unwrap();

        let mut m = Manifest::new(Distro::Null);
        let err = new_build(
            &mut m,
            Box::new(Linux),
            &[],
            BuildOptions {
                bootstrap_pipeline: Some(bootstrap),
                ..Default::default()
            },
        )
        .unwrap_err();
        assert_eq!(
            err.violation(),
            Some(&InvariantViolation::ForeignBuild {
                build: BOOTSTRAP_BUILD_NAME.into(),
                dependent: DEFAULT_BUILD_NAME.into()
            })
        );
        assert!(m.pipeline_names().is_empty());
    }

    #[test]
    fn end_to_end_packages_root() {
        let mut m = Manifest::new(Distro::Null);
        let build = new_build(
            &mut m,
            Box::new(Linux),
            &[],
            BuildOptions {
                container_buildable: true,
                ..Default::default()
            },
        )
        .unwrap();
        m.add_dependent(&build, Fixed::new("os", &["foo"])).unwrap();
        m.add_dependent(&build, Fixed::new("image", &["bar"])).unwrap();

        let chain = &m.get_package_set_chains()["build"];
        let include = &chain[0].include;
        let foo = include.iter().position(|p| p == "foo").unwrap();
        let bar = include.iter().position(|p| p == "bar").unwrap();
        assert!(foo < bar);

        let depsolved = BTreeMap::from([(
            "build".to_string(),
            depsolved(&["coreutils", "tar", "xz"]),
        )]);
        let out = m.serialize(&depsolved, &BTreeMap::new()).unwrap();
        let names: Vec<_> = out.pipelines.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["build", "os", "image"]);

        let labels = selinux_options(&out.pipelines[0]).unwrap().labels;
        for path in ["/usr/bin/cp", "/usr/bin/mount", "/usr/bin/umount", "/usr/bin/tar"] {
            assert_eq!(labels[path], INSTALL_EXEC_LABEL);
        }
        assert_eq!(out.pipelines[1].build.as_deref(), Some("name:build"));
    }

    #[test]
    fn end_to_end_baseline_resolution() {
        let mut m = Manifest::new(Distro::Null);
        let build = new_build(&mut m, Box::new(Linux), &[], BuildOptions::default()).unwrap();
        m.add_dependent(&build, Fixed::new("os", &["foo"])).unwrap();
        m.add_dependent(&build, Fixed::new("image", &["bar"])).unwrap();

        let depsolved = BTreeMap::from([(
            "build".to_string(),
            depsolved(&["coreutils", "xz", "selinux-policy-targeted"]),
        )]);
        let out = m.serialize(&depsolved, &BTreeMap::new()).unwrap();

        let root = &out.pipelines[0];
        let rpm = root.stages_of("org.osbuild.rpm").next().unwrap();
        let files = serde_json::to_value(&rpm.inputs["packages"]).unwrap();
        assert_eq!(files["references"].as_array().unwrap().len(), 3);
        let labels = selinux_options(root).unwrap().labels;
        assert_eq!(labels.keys().collect::<Vec<_>>(), vec!["/usr/bin/cp"]);

        let err = m.build(&build).unwrap().serialize().unwrap_err();
        assert!(matches!(
            err.violation(),
            Some(InvariantViolation::NotStarted { .. })
        ));
    }
}
