//! Error types for manifest assembly and serialization.
//!
//! Two classes of failure exist:
//!
//! - [`Error::Invariant`] - a caller broke a lifecycle or graph invariant
//!   (double start, serialize before start, ...). These are programming
//!   errors. They are surfaced as a distinct kind so callers and tests can
//!   assert on them, but they must never be retried or papered over.
//! - Everything else - reportable errors caused by input that a user can
//!   reach (malformed container digests, unknown pipeline names, bad distro
//!   ids).

/// Result type alias for manifest operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while assembling or serializing a manifest.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Fatal invariant violation.
    #[error("invariant violation: {0}")]
    Invariant(#[from] InvariantViolation),

    /// Low-level stage construction failed.
    #[error(transparent)]
    Stage(#[from] StageError),

    /// Two pipelines with the same name in one manifest.
    #[error("pipeline '{name}' is already registered in this manifest")]
    DuplicatePipeline { name: String },

    /// A pipeline name that the manifest does not know about.
    #[error("no pipeline named '{name}' in this manifest")]
    UnknownPipeline { name: String },

    /// A distro id string that no parser accepts.
    #[error("invalid distro id '{id}': {reason}")]
    InvalidId { id: String, reason: String },

    /// An architecture name that is not supported.
    #[error("unsupported architecture '{0}'")]
    InvalidArch(String),

    /// A filesystem node customization with an unusable path.
    #[error("invalid filesystem node '{path}': {reason}")]
    InvalidNode { path: String, reason: String },
}

impl Error {
    /// True for invariant violations, which indicate a broken caller.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::Invariant(_))
    }

    /// The violated invariant, if this is a fatal error.
    pub fn violation(&self) -> Option<&InvariantViolation> {
        match self {
            Error::Invariant(violation) => Some(violation),
            _ => None,
        }
    }
}

/// Lifecycle and graph invariants that callers must uphold.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvariantViolation {
    #[error("double call to serialize_start() on pipeline '{pipeline}'")]
    DoubleStart { pipeline: String },

    #[error("serialization not started for pipeline '{pipeline}'")]
    NotStarted { pipeline: String },

    #[error("serialize_end() called on pipeline '{pipeline}' when serialization is not in progress")]
    NotInProgress { pipeline: String },

    #[error("build root '{pipeline}' expects exactly one container input, got {count}")]
    ContainerCardinality { pipeline: String, count: usize },

    #[error("cannot add dependent '{dependent}' to build '{build}': the build is not owned by this manifest")]
    ForeignBuild { build: String, dependent: String },

    #[error("distro id '{id}' is matched by {matches} parsers")]
    AmbiguousId { id: String, matches: usize },
}

/// Failures building low-level stages from otherwise valid graph state.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StageError {
    #[error("container-deploy stage expects exactly one image, got {0}")]
    ImageCount(usize),

    #[error("invalid container image id '{id}': expected 'sha256:' followed by 64 hex digits")]
    InvalidImageId { id: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invariant_errors_are_fatal() {
        let err = Error::from(InvariantViolation::DoubleStart {
            pipeline: "build".into(),
        });
        assert!(err.is_fatal());
        assert_eq!(
            err.violation(),
            Some(&InvariantViolation::DoubleStart {
                pipeline: "build".into()
            })
        );
        assert_eq!(
            err.to_string(),
            "invariant violation: double call to serialize_start() on pipeline 'build'"
        );
    }

    #[test]
    fn stage_errors_are_reportable() {
        let err = Error::from(StageError::ImageCount(2));
        assert!(!err.is_fatal());
        assert!(err.violation().is_none());
        assert_eq!(
            err.to_string(),
            "container-deploy stage expects exactly one image, got 2"
        );
    }
}
