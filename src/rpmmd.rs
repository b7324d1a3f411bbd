//! RPM package metadata exchanged with the dependency resolver.
//!
//! [`PackageSet`] is what the manifest asks for; [`PackageSpec`] and
//! [`DepsolvedSet`] are what the resolver answers with.

use serde::{Deserialize, Serialize};

/// A repository the resolver may pull packages from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepoConfig {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub baseurls: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metalink: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mirrorlist: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub gpg_keys: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub check_gpg: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub check_repo_gpg: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ignore_ssl: Option<bool>,
    pub rhsm: bool,
    /// Pipelines this repository applies to. Empty means all of them.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub package_sets: Vec<String>,
}

impl RepoConfig {
    pub fn applies_to(&self, pipeline: &str) -> bool {
        self.package_sets.is_empty() || self.package_sets.iter().any(|name| name == pipeline)
    }
}

/// Repositories applicable to the named pipeline, in their original order.
pub fn filter_repos(repos: &[RepoConfig], pipeline: &str) -> Vec<RepoConfig> {
    repos
        .iter()
        .filter(|repo| repo.applies_to(pipeline))
        .cloned()
        .collect()
}

/// An unresolved request for packages.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageSet {
    pub include: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exclude: Vec<String>,
    pub repositories: Vec<RepoConfig>,
    pub install_weak_deps: bool,
}

/// A resolved package.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PackageSpec {
    pub name: String,
    pub epoch: u32,
    pub version: String,
    pub release: String,
    pub arch: String,
    pub remote_location: String,
    /// `<algorithm>:<hex digest>` of the package file.
    pub checksum: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secrets: Option<String>,
    pub check_gpg: bool,
    pub ignore_ssl: bool,
    pub repo_id: String,
}

impl PackageSpec {
    /// `name-[epoch:]version-release.arch`
    pub fn nevra(&self) -> String {
        if self.epoch == 0 {
            format!(
                "{}-{}-{}.{}",
                self.name, self.version, self.release, self.arch
            )
        } else {
            format!(
                "{}-{}:{}-{}.{}",
                self.name, self.epoch, self.version, self.release, self.arch
            )
        }
    }
}

/// The resolver's answer for one pipeline.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DepsolvedSet {
    pub packages: Vec<PackageSpec>,
    /// Repositories the resolver used that the request did not list.
    pub repos: Vec<RepoConfig>,
}
