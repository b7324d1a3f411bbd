//! `org.osbuild.rpm`: install resolved packages into the tree.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::osbuild::{Input, Stage, StageOptions};
use crate::rpmmd::{PackageSpec, RepoConfig};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RpmStageOptions {
    /// Armored GPG keys to import before installing.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub gpgkeys: Vec<String>,
}

impl RpmStageOptions {
    /// Keys of every repository with GPG checking enabled, first seen first.
    pub fn from_repos(repos: &[RepoConfig]) -> Self {
        let mut gpgkeys: Vec<String> = Vec::new();
        for repo in repos.iter().filter(|repo| repo.check_gpg == Some(true)) {
            for key in &repo.gpg_keys {
                if !gpgkeys.contains(key) {
                    gpgkeys.push(key.clone());
                }
            }
        }
        Self { gpgkeys }
    }
}

/// Package files fetched by the engine's sources, referenced by checksum.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FilesInput {
    #[serde(rename = "type")]
    pub kind: String,
    pub origin: String,
    pub references: Vec<FileReference>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileReference {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<FileReferenceOptions>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileReferenceOptions {
    pub metadata: RpmMetadata,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RpmMetadata {
    #[serde(rename = "rpm.check_gpg")]
    pub check_gpg: bool,
}

impl FilesInput {
    pub fn from_package_specs(specs: &[PackageSpec]) -> Self {
        let references = specs
            .iter()
            .map(|spec| FileReference {
                id: spec.checksum.clone(),
                options: spec.check_gpg.then_some(FileReferenceOptions {
                    metadata: RpmMetadata { check_gpg: true },
                }),
            })
            .collect();
        Self {
            kind: "org.osbuild.files".to_string(),
            origin: "org.osbuild.source".to_string(),
            references,
        }
    }
}

pub fn rpm_stage(options: RpmStageOptions, packages: FilesInput) -> Stage {
    Stage::new(
        "org.osbuild.rpm",
        BTreeMap::from([("packages".to_string(), Input::Files(packages))]),
        Some(StageOptions::Rpm(options)),
    )
}
