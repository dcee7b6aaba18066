use std::collections::TryReserveError;
use std::fmt;

use thiserror::Error as ThisError;

/// What kind of name a failed lookup was for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lookup {
    Resource,
    Interface,
    Property,
}

impl fmt::Display for Lookup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Lookup::Resource => "resource",
            Lookup::Interface => "interface",
            Lookup::Property => "property",
        })
    }
}

#[derive(ThisError, Debug, Clone, PartialEq, Eq)]
pub enum ResourceError {
    #[error("\"{name}\": no such {kind}")]
    NotFound { kind: Lookup, name: String },

    #[error("\"{property}\": not accessible via \"{interface}\"")]
    NotAccessible {
        property: String,
        interface: &'static str,
    },

    #[error("\"{property}\": property is read-only")]
    ReadOnly { property: String },

    #[error("\"{property}\": invalid {type_name} value: {reason}")]
    InvalidFormat {
        property: String,
        type_name: &'static str,
        reason: &'static str,
    },

    #[error("\"{0}\": expected <prop>=<value>")]
    MalformedAssignment(String),

    #[error("resource does not support updates")]
    NotSupported,

    #[error("update rejected: {reason}")]
    Rejected { reason: String },

    #[error("namespace \"{prefix}\" overlaps registered namespace \"{existing}\"")]
    DuplicatePrefix { prefix: String, existing: String },

    #[error("namespace prefix \"{0}\" must end with '/'")]
    InvalidPrefix(String),

    #[error("resource \"{suffix}\" appears twice in namespace \"{prefix}\"")]
    DuplicateResource { prefix: String, suffix: String },

    #[error("interface \"{0}\" is already registered")]
    DuplicateInterface(&'static str),

    #[error("state snapshot does not belong to this resource")]
    StateMismatch,

    #[error("out of memory")]
    AllocationFailure,
}

impl ResourceError {
    pub(crate) fn not_found(kind: Lookup, name: impl Into<String>) -> Self {
        ResourceError::NotFound {
            kind,
            name: name.into(),
        }
    }
}

impl From<TryReserveError> for ResourceError {
    fn from(_: TryReserveError) -> Self {
        ResourceError::AllocationFailure
    }
}

pub type Result<T> = std::result::Result<T, ResourceError>;
