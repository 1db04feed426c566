//! Composition errors

use crate::computed::CommandError;
use crate::config::SubstitutionError;
use std::path::PathBuf;

/// Broad class of a [`LaunchError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Invalid or out-of-domain argument value, bad template, failed computed parameter
    Configuration,
    /// Package, executable or parameter file not found
    MissingResource,
}

/// Errors that abort argument resolution or composition
#[derive(Debug, thiserror::Error)]
pub enum LaunchError {
    #[error("Argument '{0}' is declared more than once")]
    DuplicateArgument(String),

    #[error("Default '{default}' of argument '{name}' is not one of {choices:?}")]
    DefaultNotAllowed {
        name: String,
        default: String,
        choices: Vec<String>,
    },

    #[error("Value '{value}' for argument '{name}' is not one of {choices:?}")]
    InvalidChoice {
        name: String,
        value: String,
        choices: Vec<String>,
    },

    #[error("Unknown argument: {0}")]
    UnknownArgument(String),

    #[error("Node '{node}': condition refers to undeclared argument '{argument}'")]
    UndeclaredConditionArgument { node: String, argument: String },

    #[error("Substitution failed in {context}: {source}")]
    SubstitutionFailed {
        context: String,
        #[source]
        source: SubstitutionError,
    },

    #[error("Computed parameter '{parameter}' of node '{node}' failed: {source}")]
    ComputedParameterFailed {
        node: String,
        parameter: String,
        #[source]
        source: CommandError,
    },

    #[error("Parameter file for node '{node}' not found: {}", .path.display())]
    MissingParameterFile { node: String, path: PathBuf },
}

impl LaunchError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            LaunchError::SubstitutionFailed {
                source: SubstitutionError::Package(_),
                ..
            }
            | LaunchError::MissingParameterFile { .. } => ErrorKind::MissingResource,
            _ => ErrorKind::Configuration,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PackageError;

    #[test]
    fn test_error_kind() {
        let err = LaunchError::SubstitutionFailed {
            context: "argument 'param_file'".into(),
            source: SubstitutionError::Package(PackageError::PackageNotFound {
                package: "turtlebot4_bringup".into(),
                searched: 0,
            }),
        };
        assert_eq!(err.kind(), ErrorKind::MissingResource);

        let err = LaunchError::SubstitutionFailed {
            context: "argument 'param_file'".into(),
            source: SubstitutionError::UndefinedArg("model".into()),
        };
        assert_eq!(err.kind(), ErrorKind::Configuration);

        assert_eq!(
            LaunchError::UnknownArgument("speed".into()).kind(),
            ErrorKind::Configuration
        );
    }
}
