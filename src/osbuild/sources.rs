//! Where the execution engine fetches resolved content from.
//!
//! Packages are downloaded with curl keyed by checksum, registry images are
//! copied with skopeo keyed by image id, and local images come from the
//! host's containers-storage.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::container::Spec;
use crate::rpmmd::PackageSpec;

const RHSM_SECRETS: &str = "org.osbuild.rhsm";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Sources {
    #[serde(rename = "org.osbuild.curl", skip_serializing_if = "CurlSource::is_empty")]
    pub curl: CurlSource,
    #[serde(
        rename = "org.osbuild.skopeo",
        skip_serializing_if = "SkopeoSource::is_empty"
    )]
    pub skopeo: SkopeoSource,
    #[serde(
        rename = "org.osbuild.containers-storage",
        skip_serializing_if = "ContainersStorageSource::is_empty"
    )]
    pub containers_storage: ContainersStorageSource,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CurlSource {
    pub items: BTreeMap<String, CurlItem>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CurlItem {
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secrets: Option<Secrets>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub insecure: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Secrets {
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SkopeoSource {
    pub items: BTreeMap<String, SkopeoItem>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkopeoItem {
    pub image: SkopeoImage,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkopeoImage {
    pub name: String,
    pub digest: String,
    #[serde(rename = "tls-verify", skip_serializing_if = "Option::is_none")]
    pub tls_verify: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ContainersStorageSource {
    pub items: BTreeMap<String, ContainersStorageItem>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ContainersStorageItem {}

impl CurlSource {
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl SkopeoSource {
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl ContainersStorageSource {
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl Sources {
    pub fn add_packages<'a>(&mut self, packages: impl IntoIterator<Item = &'a PackageSpec>) {
        for pkg in packages {
            let secrets = match pkg.secrets.as_deref() {
                Some(RHSM_SECRETS) => Some(Secrets {
                    name: RHSM_SECRETS.to_string(),
                }),
                _ => None,
            };
            self.curl.items.insert(
                pkg.checksum.clone(),
                CurlItem {
                    url: pkg.remote_location.clone(),
                    secrets,
                    insecure: pkg.ignore_ssl,
                },
            );
        }
    }

    pub fn add_containers<'a>(&mut self, containers: impl IntoIterator<Item = &'a Spec>) {
        for spec in containers {
            if spec.local_storage {
                self.containers_storage
                    .items
                    .insert(spec.image_id.clone(), ContainersStorageItem {});
                continue;
            }
            self.skopeo.items.insert(
                spec.image_id.clone(),
                SkopeoItem {
                    image: SkopeoImage {
                        name: spec.source.clone(),
                        digest: spec.digest.clone(),
                        tls_verify: spec.tls_verify,
                    },
                },
            );
        }
    }

    pub fn is_empty(&self) -> bool {
        self.curl.is_empty() && self.skopeo.is_empty() && self.containers_storage.is_empty()
    }
}
