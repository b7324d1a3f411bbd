//! Build roots and the manifest graph for image builds.
//!
//! An image build is a graph of pipelines. Every content pipeline runs inside
//! a build root: an environment assembled either from packages or from a
//! container image. This crate models that graph and turns it into the
//! low-level instructions consumed by the execution engine.
//!
//! - **Manifest** - owns the pipelines, in registration order
//! - **Build roots** - package-based, container-based and bootstrap
//! - **Two-phase serialization** - resolved specs are injected, used, cleared
//! - **Requests** - TOML image requests and JSON resolver output
//!
//! # Architecture
//!
//! ```text
//! request.toml ──► request::load_request ──► Manifest
//!                                               │
//!                    get_package_set_chains() ◄─┤─► external resolvers
//!                get_container_source_specs() ◄─┘         │
//!                                                         ▼
//!                                   resolved.json ──► Manifest::serialize
//!                                                         │
//!                                                         ▼
//!                                                 osbuild::Manifest (JSON)
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use distro_manifest::manifest::{new_build, BuildOptions, Distro, Manifest, Tree};
//! use distro_manifest::runner::Linux;
//!
//! let mut m = Manifest::new(Distro::Null);
//! let build = new_build(&mut m, Box::new(Linux), &repos, BuildOptions::default())?;
//! m.add_dependent(&build, Tree::new("os", vec!["bash".into()], &repos))?;
//!
//! let chains = m.get_package_set_chains();
//! let depsolved = resolve(chains);
//! let out = m.serialize(&depsolved, &Default::default())?;
//! ```

pub mod arch;
pub mod container;
pub mod distro;
pub mod error;
pub mod fsnode;
pub mod manifest;
pub mod osbuild;
pub mod request;
pub mod rpmmd;
pub mod runner;

pub use arch::Arch;
pub use error::{Error, InvariantViolation, Result};
pub use manifest::{BuildRef, Distro, Manifest};
