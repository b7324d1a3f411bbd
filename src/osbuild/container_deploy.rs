//! `org.osbuild.container-deploy`: unpack a container image as the tree.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::container::Spec;
use crate::error::StageError;
use crate::osbuild::{Input, Stage, StageOptions};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ContainerDeployOptions {
    /// Strip image signatures while copying.
    #[serde(rename = "remove-signatures", skip_serializing_if = "std::ops::Not::not")]
    pub remove_signatures: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub exclude: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContainersInput {
    #[serde(rename = "type")]
    pub kind: String,
    pub origin: String,
    /// Image id to local name.
    pub references: BTreeMap<String, ContainerReference>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContainerReference {
    pub name: String,
}

impl ContainersInput {
    pub fn for_single_source(spec: &Spec) -> Self {
        let kind = if spec.local_storage {
            "org.osbuild.containers-storage"
        } else {
            "org.osbuild.containers"
        };
        Self {
            kind: kind.to_string(),
            origin: "org.osbuild.source".to_string(),
            references: BTreeMap::from([(
                spec.image_id.clone(),
                ContainerReference {
                    name: spec.name().to_string(),
                },
            )]),
        }
    }
}

/// Builds the deploy stage. Fails when the input does not reference exactly
/// one image or when the image id is not a sha256 digest, which happens when
/// a spec reaches serialization without having been resolved.
pub fn container_deploy_stage(
    images: ContainersInput,
    options: ContainerDeployOptions,
) -> Result<Stage, StageError> {
    if images.references.len() != 1 {
        return Err(StageError::ImageCount(images.references.len()));
    }
    for image_id in images.references.keys() {
        if !is_sha256_digest(image_id) {
            return Err(StageError::InvalidImageId {
                id: image_id.clone(),
            });
        }
    }

    Ok(Stage::new(
        "org.osbuild.container-deploy",
        BTreeMap::from([("images".to_string(), Input::Containers(images))]),
        Some(StageOptions::ContainerDeploy(options)),
    ))
}

fn is_sha256_digest(value: &str) -> bool {
    value.strip_prefix("sha256:").is_some_and(|hex| {
        hex.len() == 64 && hex.bytes().all(|b| b.is_ascii_hexdigit())
    })
}
