//! Image requests loaded from TOML.
//!
//! A request names the target distro and architecture, the build root to
//! use, the repositories, and the content pipelines to run inside the build
//! root. [`ImageRequest::build_manifest`] turns it into a [`Manifest`].

pub mod resolved;

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use tracing::{debug, info};

use crate::arch::Arch;
use crate::container::SourceSpec;
use crate::distro::idparser::Parser;
use crate::distro::Id;
use crate::fsnode::Directory;
use crate::manifest::{
    new_bootstrap, new_build, new_build_from_container, Archive, BuildOptions, Distro, Manifest,
    Tree,
};
use crate::rpmmd::RepoConfig;
use crate::runner::runner_for;

pub use resolved::{load_resolved, Resolved};

#[derive(Debug, Clone)]
pub struct ImageRequest {
    pub path: PathBuf,
    pub distro: Id,
    pub arch: Arch,
    pub buildroot: BuildrootRequest,
    pub repositories: Vec<RepoConfig>,
    pub pipelines: Vec<PipelineRequest>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildrootKind {
    Packages,
    Container { source: String },
}

#[derive(Debug, Clone)]
pub struct BuildrootRequest {
    pub kind: BuildrootKind,
    pub selinux_policy: Option<String>,
    pub disable_selinux: bool,
    pub container_buildable: bool,
    pub pipeline_name: Option<String>,
    pub bootstrap_container: Option<String>,
    pub checkpoint: bool,
    pub ensure_dirs: Vec<Directory>,
    pub copy_files_from: BTreeMap<String, Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineRequest {
    pub name: String,
    pub checkpoint: bool,
    pub kind: PipelineKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineKind {
    Tree {
        packages: Vec<String>,
        exclude: Vec<String>,
        install_weak_deps: bool,
        build_packages: Vec<String>,
    },
    Archive {
        source: String,
        filename: String,
    },
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RequestToml {
    request: RequestSectionToml,
    buildroot: BuildrootToml,
    #[serde(default)]
    repositories: Vec<RepoConfig>,
    #[serde(default)]
    pipelines: Vec<PipelineToml>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RequestSectionToml {
    distro: String,
    arch: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct BuildrootToml {
    kind: String,
    container: Option<String>,
    selinux_policy: Option<String>,
    #[serde(default)]
    disable_selinux: bool,
    #[serde(default)]
    container_buildable: bool,
    pipeline_name: Option<String>,
    bootstrap_container: Option<String>,
    #[serde(default)]
    checkpoint: bool,
    #[serde(default)]
    ensure_dirs: Vec<DirectoryToml>,
    #[serde(default)]
    copy_files_from: BTreeMap<String, Vec<String>>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct DirectoryToml {
    path: String,
    mode: Option<u32>,
    #[serde(default)]
    parents: bool,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct PipelineToml {
    kind: String,
    name: String,
    #[serde(default)]
    checkpoint: bool,
    packages: Option<Vec<String>>,
    exclude: Option<Vec<String>>,
    install_weak_deps: Option<bool>,
    build_packages: Option<Vec<String>>,
    source: Option<String>,
    filename: Option<String>,
}

pub fn load_request(path: &Path) -> Result<ImageRequest> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("reading image request '{}'", path.display()))?;
    let parsed: RequestToml = toml::from_str(&raw)
        .with_context(|| format!("parsing image request '{}'", path.display()))?;

    let distro = Parser::default()
        .parse(parsed.request.distro.trim())
        .with_context(|| format!("invalid image request '{}': request.distro", path.display()))?;

    let arch = match parsed.request.arch.as_deref() {
        Some(raw) => raw.parse::<Arch>().with_context(|| {
            format!("invalid image request '{}': request.arch", path.display())
        })?,
        None => match Arch::host() {
            Some(host) => host,
            None => bail!(
                "invalid image request '{}': request.arch is required on this host",
                path.display()
            ),
        },
    };

    let buildroot = parse_buildroot(parsed.buildroot, path)?;
    if arch.is_cross() && buildroot.bootstrap_container.is_none() {
        bail!(
            "invalid image request '{}': building for '{}' on a different host arch requires buildroot.bootstrap_container",
            path.display(),
            arch
        );
    }

    let pipelines = parsed
        .pipelines
        .into_iter()
        .map(|pipeline| parse_pipeline(pipeline, path))
        .collect::<Result<Vec<_>>>()?;

    debug!(
        request = %path.display(),
        distro = %distro,
        arch = %arch,
        pipelines = pipelines.len(),
        "image request loaded"
    );

    Ok(ImageRequest {
        path: path.to_path_buf(),
        distro,
        arch,
        buildroot,
        repositories: parsed.repositories,
        pipelines,
    })
}

fn parse_buildroot(raw: BuildrootToml, path: &Path) -> Result<BuildrootRequest> {
    let kind = match raw.kind.trim().to_ascii_lowercase().as_str() {
        "packages" => {
            if raw.container.is_some() {
                bail!(
                    "invalid image request '{}': buildroot.container is only valid with kind 'container'",
                    path.display()
                );
            }
            if !raw.ensure_dirs.is_empty() || !raw.copy_files_from.is_empty() {
                bail!(
                    "invalid image request '{}': buildroot.ensure_dirs and buildroot.copy_files_from need kind 'container'",
                    path.display()
                );
            }
            BuildrootKind::Packages
        }
        "container" => match raw.container {
            Some(source) if !source.trim().is_empty() => BuildrootKind::Container {
                source: source.trim().to_string(),
            },
            _ => bail!(
                "invalid image request '{}': buildroot.container is required for kind 'container'",
                path.display()
            ),
        },
        other => bail!(
            "invalid image request '{}': unsupported buildroot.kind '{}' (expected 'packages' or 'container')",
            path.display(),
            other
        ),
    };

    let ensure_dirs = raw
        .ensure_dirs
        .iter()
        .map(|dir| {
            Directory::new(&dir.path, dir.mode, dir.parents).with_context(|| {
                format!(
                    "invalid image request '{}': buildroot.ensure_dirs",
                    path.display()
                )
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(BuildrootRequest {
        kind,
        selinux_policy: raw.selinux_policy,
        disable_selinux: raw.disable_selinux,
        container_buildable: raw.container_buildable,
        pipeline_name: raw.pipeline_name,
        bootstrap_container: raw.bootstrap_container,
        checkpoint: raw.checkpoint,
        ensure_dirs,
        copy_files_from: raw.copy_files_from,
    })
}

fn parse_pipeline(raw: PipelineToml, path: &Path) -> Result<PipelineRequest> {
    let name = raw.name.trim().to_string();
    if name.is_empty() {
        bail!(
            "invalid image request '{}': pipelines.name must not be empty",
            path.display()
        );
    }

    let kind = match raw.kind.trim().to_ascii_lowercase().as_str() {
        "tree" => PipelineKind::Tree {
            packages: raw.packages.unwrap_or_default(),
            exclude: raw.exclude.unwrap_or_default(),
            install_weak_deps: raw.install_weak_deps.unwrap_or(true),
            build_packages: raw.build_packages.unwrap_or_default(),
        },
        "archive" => {
            let (Some(source), Some(filename)) = (raw.source, raw.filename) else {
                bail!(
                    "invalid image request '{}': archive pipeline '{}' needs source and filename",
                    path.display(),
                    name
                );
            };
            PipelineKind::Archive { source, filename }
        }
        other => bail!(
            "invalid image request '{}': pipeline '{}' has unsupported kind '{}' (expected 'tree' or 'archive')",
            path.display(),
            name,
            other
        ),
    };

    Ok(PipelineRequest {
        name,
        checkpoint: raw.checkpoint,
        kind,
    })
}

impl ImageRequest {
    /// Assemble the manifest graph for this request.
    pub fn build_manifest(&self) -> Result<Manifest> {
        let mut manifest = Manifest::new(Distro::from_id(&self.distro));
        let runner = runner_for(&self.distro);
        let buildroot = &self.buildroot;

        let bootstrap_pipeline = match &buildroot.bootstrap_container {
            Some(source) => Some(
                new_bootstrap(&mut manifest, vec![SourceSpec::new(source.as_str())])
                    .context("creating bootstrap build root")?,
            ),
            None => None,
        };

        let opts = BuildOptions {
            container_buildable: buildroot.container_buildable,
            disable_selinux: buildroot.disable_selinux,
            selinux_policy: buildroot.selinux_policy.clone(),
            bootstrap_pipeline,
            pipeline_name: buildroot.pipeline_name.clone(),
            copy_files_from: buildroot.copy_files_from.clone(),
            ensure_dirs: buildroot.ensure_dirs.clone(),
        };

        // Copy sources must exist before the container root references them,
        // so copy_files_from can only name pipelines that do not run in it.
        let build = match &buildroot.kind {
            BuildrootKind::Packages => {
                new_build(&mut manifest, runner, &self.repositories, opts)
            }
            BuildrootKind::Container { source } => new_build_from_container(
                &mut manifest,
                runner,
                vec![SourceSpec::new(source.as_str())],
                opts,
            ),
        }
        .with_context(|| format!("creating build root for '{}'", self.path.display()))?;

        if buildroot.checkpoint {
            manifest.checkpoint(build.name())?;
        }

        for pipeline in &self.pipelines {
            let added = match &pipeline.kind {
                PipelineKind::Tree {
                    packages,
                    exclude,
                    install_weak_deps,
                    build_packages,
                } => manifest.add_dependent(
                    &build,
                    Tree::new(&pipeline.name, packages.clone(), &self.repositories)
                        .with_exclude(exclude.clone())
                        .with_weak_deps(*install_weak_deps)
                        .with_build_packages(build_packages.clone()),
                ),
                PipelineKind::Archive { source, filename } => manifest.add_dependent(
                    &build,
                    Archive::new(&pipeline.name, source, filename),
                ),
            };
            added.with_context(|| format!("adding pipeline '{}'", pipeline.name))?;
            if pipeline.checkpoint {
                manifest.checkpoint(&pipeline.name)?;
            }
        }

        info!(
            distro = %self.distro,
            arch = %self.arch,
            pipelines = manifest.pipeline_names().len(),
            "manifest assembled"
        );
        Ok(manifest)
    }
}
