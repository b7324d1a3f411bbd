//! Container references exchanged with the container resolver.

use serde::{Deserialize, Serialize};

/// An unresolved container reference.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceSpec {
    /// Registry reference, e.g. `registry.example.com/el9/buildroot:latest`.
    pub source: String,
    /// Name to store the image under locally; defaults to `source`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tls_verify: Option<bool>,
    /// Take the image from local containers-storage instead of a registry.
    pub local: bool,
}

impl SourceSpec {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            ..Default::default()
        }
    }
}

/// A resolved container image.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Spec {
    pub source: String,
    /// Manifest digest the image was pinned to.
    pub digest: String,
    /// `sha256:<hex>` id of the image config.
    pub image_id: String,
    pub local_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub list_digest: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tls_verify: Option<bool>,
    pub local_storage: bool,
}

impl Spec {
    /// Name to refer to the image by inside the build.
    pub fn name(&self) -> &str {
        if self.local_name.is_empty() {
            &self.source
        } else {
            &self.local_name
        }
    }
}
