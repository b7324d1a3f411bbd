//! Distribution identity.
//!
//! A distro is identified by a name and a version, written as
//! `<name>-<major>[.<minor>]` (`fedora-41`, `rhel-9.4`). The catalog of
//! distributions, architectures and image types lives outside this crate;
//! this module only turns the human string into a structured [`Id`].
//! See [`idparser`] for the accepted spellings.

pub mod idparser;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Structured distro identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Id {
    pub name: String,
    pub major: u32,
    pub minor: Option<u32>,
}

impl Id {
    pub fn new(name: impl Into<String>, major: u32, minor: Option<u32>) -> Self {
        Self {
            name: name.into(),
            major,
            minor,
        }
    }

    /// Parse the generic `<name>-<major>[.<minor>]` form.
    pub fn parse(id: &str) -> Result<Id> {
        let invalid = |reason: &str| Error::InvalidId {
            id: id.to_string(),
            reason: reason.to_string(),
        };

        let (name, version) = id
            .rsplit_once('-')
            .ok_or_else(|| invalid("expected '<name>-<version>'"))?;
        if name.is_empty() {
            return Err(invalid("empty distro name"));
        }

        let parts: Vec<&str> = version.split('.').collect();
        let parse_part = |part: &str| {
            part.parse::<u32>()
                .map_err(|_| invalid(&format!("version component '{part}' is not a number")))
        };
        match parts.as_slice() {
            [major] => Ok(Id::new(name, parse_part(major)?, None)),
            [major, minor] => Ok(Id::new(name, parse_part(major)?, Some(parse_part(minor)?))),
            _ => Err(invalid("expected at most '<major>.<minor>'")),
        }
    }

    /// Version string without the name (`9.4`, `41`).
    pub fn version(&self) -> String {
        match self.minor {
            Some(minor) => format!("{}.{}", self.major, minor),
            None => self.major.to_string(),
        }
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.name, self.version())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_major_only() {
        assert_eq!(Id::parse("fedora-41").unwrap(), Id::new("fedora", 41, None));
    }

    #[test]
    fn parse_major_minor() {
        assert_eq!(Id::parse("rhel-9.4").unwrap(), Id::new("rhel", 9, Some(4)));
    }

    #[test]
    fn parse_keeps_dashes_in_name() {
        assert_eq!(
            Id::parse("centos-stream-9").unwrap(),
            Id::new("centos-stream", 9, None)
        );
    }

    #[test]
    fn parse_rejects_three_components() {
        assert!(Id::parse("fedora-41.1.1").is_err());
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!(Id::parse("fedora").is_err());
        assert!(Id::parse("-9").is_err());
        assert!(Id::parse("rhel-nine").is_err());
    }

    #[test]
    fn display_round_trips() {
        assert_eq!(Id::new("rhel", 8, Some(10)).to_string(), "rhel-8.10");
        assert_eq!(Id::new("fedora", 41, None).to_string(), "fedora-41");
    }
}
