//! Conversion of directives into ROS 2 command lines

use crate::config::{OutputMode, PackageError, PackageIndex, ScalarValue};
use crate::directive::{ParameterSource, ProcessDirective};
use indexmap::IndexMap;
use std::path::{Path, PathBuf};

/// Executable plus arguments for one directive
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
    /// Process name (for logging)
    pub name: String,
    /// Executable path
    pub program: PathBuf,
    /// Command line arguments
    pub args: Vec<String>,
    /// Where output goes
    pub output: OutputMode,
}

impl CommandLine {
    /// Build the command line, writing inline parameters into `param_dir`
    pub fn from_directive(
        directive: &ProcessDirective,
        packages: &PackageIndex,
        param_dir: &Path,
    ) -> Result<Self, CommandLineError> {
        let program = packages.executable(&directive.package, &directive.executable)?;

        let mut args = vec!["--ros-args".to_string()];

        if let Some(node_name) = &directive.node_name {
            args.push("-r".to_string());
            args.push(format!("__node:={}", node_name));
        }

        let namespace = ros_namespace(&directive.namespace);
        if !namespace.is_empty() {
            args.push("-r".to_string());
            args.push(format!("__ns:={}", namespace));
        }

        for (index, source) in directive.parameters.iter().enumerate() {
            let path = match source {
                ParameterSource::File(path) => path.clone(),
                ParameterSource::Inline(params) => {
                    let path = param_dir.join(format!("{}_{}.yaml", directive.name, index));
                    write_parameter_file(&path, params)?;
                    path
                }
            };
            args.push("--params-file".to_string());
            args.push(path.to_string_lossy().into_owned());
        }

        Ok(Self {
            name: directive.name.clone(),
            program,
            args,
            output: directive.output,
        })
    }
}

impl std::fmt::Display for CommandLine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.program.display(), self.args.join(" "))
    }
}

/// Absolute namespace, empty for the root namespace
fn ros_namespace(namespace: &str) -> String {
    let trimmed = namespace.trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("/{}", trimmed)
    }
}

/// Write inline parameters as a wildcard-node parameter file
fn write_parameter_file(
    path: &Path,
    params: &IndexMap<String, ScalarValue>,
) -> Result<(), CommandLineError> {
    let mut ros_parameters = IndexMap::new();
    ros_parameters.insert("ros__parameters", params);
    let mut document = IndexMap::new();
    document.insert("/**", ros_parameters);

    let content = serde_yaml::to_string(&document)?;
    std::fs::write(path, content).map_err(|e| CommandLineError::WriteParameters {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Errors building a command line
#[derive(Debug, thiserror::Error)]
pub enum CommandLineError {
    #[error(transparent)]
    Package(#[from] PackageError),

    #[error("Failed to write parameter file '{}': {source}", .path.display())]
    WriteParameters {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize parameters: {0}")]
    Yaml(#[from] serde_yaml::Error),
}
