use thiserror::Error;

use crate::dependency::DependencyKind;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Malformed dependency notation {notation}: {reason}")]
    MalformedNotation { notation: String, reason: &'static str },

    #[error("Unsupported dependency notation {notation}")]
    UnsupportedNotation { notation: String },

    #[error(
        "Configuring action for {expected} cannot be applied to {found} dependency {notation}"
    )]
    ActionTypeMismatch {
        expected: DependencyKind,
        found: DependencyKind,
        notation: String,
    },

    #[error("Configuration '{child}' cannot extend from '{parent}', it would create a cycle")]
    CyclicInheritance { child: String, parent: String },

    #[error("No value present for {description}")]
    MissingValue { description: String },

    #[error("Expected a single value from {description}, got {count}")]
    TooManyValues { description: String, count: usize },

    #[error("Configuration with name '{0}' already exists")]
    DuplicateConfigurationName(String),

    #[error("Configuration with name '{0}' not found")]
    UnknownConfiguration(String),

    #[error("Cannot change configuration '{0}' after it has been observed")]
    ConfigurationFrozen(String),

    #[error("Couldn't expand file set.\n{0}")]
    FileSet(#[from] FileSetError),

    #[error("Provider failed.\n{0}")]
    Provider(anyhow::Error),

    #[error("Couldn't parse manifest.\n{0}")]
    Manifest(#[from] serde_json::Error),

    #[error("Couldn't read manifest.\n{0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub(crate) fn malformed(notation: impl std::fmt::Debug, reason: &'static str) -> Self {
        Error::MalformedNotation {
            notation: format!("{notation:?}"),
            reason,
        }
    }

    pub(crate) fn unsupported(notation: impl std::fmt::Debug) -> Self {
        Error::UnsupportedNotation {
            notation: format!("{notation:?}"),
        }
    }

    pub(crate) fn missing(description: impl Into<String>) -> Self {
        Error::MissingValue {
            description: description.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum FileSetError {
    #[error("Couldn't compile glob pattern.\n{0}")]
    GlobPattern(#[from] glob::PatternError),

    #[error("Couldn't run glob.\n{0}")]
    Glob(#[from] glob::GlobError),

    #[error("Couldn't convert path to UTF-8.\n{0}")]
    PathFormat(#[from] camino::FromPathBufError),
}
