//! Distro id parsing with pluggable rules.
//!
//! A [`Parser`] holds an ordered list of parse rules. Every rule is tried;
//! exactly one may accept the string. When no rule accepts it, the generic
//! `<name>-<major>[.<minor>]` form is used. Two rules accepting the same
//! string is a broken rule set and is reported as a fatal violation.
//!
//! The default rules accept the compact RHEL spellings still found in old
//! configurations: `rhel-810` is RHEL 8.10 and `rhel-90` is RHEL 9.0.

use tracing::debug;

use crate::distro::Id;
use crate::error::{Error, InvariantViolation, Result};

/// A parse rule. Returns an error when the rule does not apply.
pub type ParseFn = fn(&str) -> Result<Id>;

pub struct Parser {
    rules: Vec<ParseFn>,
}

impl Parser {
    pub fn new(rules: Vec<ParseFn>) -> Self {
        Self { rules }
    }

    pub fn parse(&self, id: &str) -> Result<Id> {
        let mut matched: Vec<Id> = self.rules.iter().filter_map(|rule| rule(id).ok()).collect();
        if matched.len() > 1 {
            return Err(InvariantViolation::AmbiguousId {
                id: id.to_string(),
                matches: matched.len(),
            }
            .into());
        }

        match matched.pop() {
            Some(parsed) => {
                debug!(id, parsed = %parsed, "distro id matched by rule");
                Ok(parsed)
            }
            None => Id::parse(id),
        }
    }
}

impl Default for Parser {
    fn default() -> Self {
        Self::new(vec![parse_rhel8_compact, parse_rhel9_compact])
    }
}

/// Generic rule, usable as an explicit entry in a custom rule set.
pub fn parse_generic(id: &str) -> Result<Id> {
    Id::parse(id)
}

pub fn parse_rhel8_compact(id: &str) -> Result<Id> {
    parse_rhel_compact(id, 8)
}

pub fn parse_rhel9_compact(id: &str) -> Result<Id> {
    parse_rhel_compact(id, 9)
}

// `rhel-<major><minor>` with a one digit major and a one or two digit minor.
fn parse_rhel_compact(id: &str, major: u32) -> Result<Id> {
    let not_compact = || Error::InvalidId {
        id: id.to_string(),
        reason: format!("not a compact rhel-{major} id"),
    };

    let version = id.strip_prefix("rhel-").ok_or_else(not_compact)?;
    if !(2..=3).contains(&version.len()) || !version.bytes().all(|b| b.is_ascii_digit()) {
        return Err(not_compact());
    }
    let minor = version
        .strip_prefix(&major.to_string())
        .ok_or_else(not_compact)?
        .parse::<u32>()
        .map_err(|_| not_compact())?;

    Ok(Id::new("rhel", major, Some(minor)))
}
