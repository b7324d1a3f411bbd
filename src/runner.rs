//! Execution runners.
//!
//! A runner is the script the execution engine uses to set up a build root
//! before running stages inside it. Each runner needs a few packages inside
//! the build root, which [`Runner::build_packages`] reports so they end up in
//! the build root's package set.

use std::fmt;

use crate::distro::Id;

pub trait Runner: fmt::Display + fmt::Debug {
    /// Packages the runner itself needs inside the build root.
    fn build_packages(&self) -> Vec<String>;
}

/// Minimal runner that makes no assumption about the host.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Linux;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fedora {
    pub version: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rhel {
    pub major: u32,
    pub minor: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CentOs {
    pub version: u32,
}

fn base_packages() -> Vec<String> {
    vec![
        "glibc".to_string(),   // ldconfig
        "systemd".to_string(), // systemd-tmpfiles and systemd-sysusers
    ]
}

impl Runner for Linux {
    fn build_packages(&self) -> Vec<String> {
        let mut packages = base_packages();
        packages.push("python3".to_string());
        packages
    }
}

impl fmt::Display for Linux {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("org.osbuild.linux")
    }
}

impl Runner for Fedora {
    fn build_packages(&self) -> Vec<String> {
        let mut packages = base_packages();
        packages.push("python3".to_string());
        packages
    }
}

impl fmt::Display for Fedora {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "org.osbuild.fedora{}", self.version)
    }
}

impl Runner for Rhel {
    fn build_packages(&self) -> Vec<String> {
        let mut packages = base_packages();
        if self.major < 8 {
            packages.push("python".to_string());
        } else {
            packages.push("platform-python".to_string());
        }
        if (self.major == 8 && self.minor >= 6) || self.major > 8 {
            packages.push("python3-pyyaml".to_string());
        }
        packages
    }
}

impl fmt::Display for Rhel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "org.osbuild.rhel{}{}", self.major, self.minor)
    }
}

impl Runner for CentOs {
    fn build_packages(&self) -> Vec<String> {
        let mut packages = base_packages();
        packages.push("platform-python".to_string());
        if self.version >= 9 {
            packages.push("python3-pyyaml".to_string());
        }
        packages
    }
}

impl fmt::Display for CentOs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "org.osbuild.centos{}", self.version)
    }
}

/// Pick the runner matching a distro identity, falling back to [`Linux`].
pub fn runner_for(id: &Id) -> Box<dyn Runner> {
    match id.name.as_str() {
        "fedora" => Box::new(Fedora { version: id.major }),
        "rhel" => Box::new(Rhel {
            major: id.major,
            minor: id.minor.unwrap_or(0),
        }),
        "centos" => Box::new(CentOs { version: id.major }),
        _ => Box::new(Linux),
    }
}
