//! Launch description YAML schema definitions

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Root launch description
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LaunchFile {
    /// Launch file format version
    #[serde(default = "default_version")]
    pub version: String,

    /// Argument declarations, in declaration order
    #[serde(default)]
    pub args: IndexMap<String, ArgDefinition>,

    /// Namespace applied to every node
    #[serde(default)]
    pub namespace: NamespaceSource,

    /// Node templates (ordered map for deterministic directive order)
    pub nodes: IndexMap<String, NodeTemplate>,
}

fn default_version() -> String {
    "1.0".to_string()
}

/// Argument declaration with default value
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArgDefinition {
    /// Default value, may contain substitutions
    pub default: ScalarValue,
    /// Allowed values (empty = unconstrained)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub choices: Vec<String>,
    /// Optional description
    #[serde(default)]
    pub description: Option<String>,
}

/// Scalar values can be strings, booleans, or numbers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ScalarValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
}

impl ScalarValue {
    /// Infer the scalar type of a resolved string
    pub fn parse_scalar(s: &str) -> Self {
        if s == "true" || s == "True" {
            return ScalarValue::Bool(true);
        }
        if s == "false" || s == "False" {
            return ScalarValue::Bool(false);
        }
        if let Ok(i) = s.parse::<i64>() {
            return ScalarValue::Int(i);
        }
        // "inf"/"nan" parse as floats but stay strings
        if s.chars().any(|c| c.is_ascii_digit()) {
            if let Ok(f) = s.parse::<f64>() {
                return ScalarValue::Float(f);
            }
        }
        ScalarValue::String(s.to_string())
    }
}

impl fmt::Display for ScalarValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScalarValue::Bool(b) => write!(f, "{}", b),
            ScalarValue::Int(i) => write!(f, "{}", i),
            ScalarValue::Float(v) => write!(f, "{:?}", v),
            ScalarValue::String(s) => f.write_str(s),
        }
    }
}

impl From<&str> for ScalarValue {
    fn from(s: &str) -> Self {
        ScalarValue::String(s.to_string())
    }
}

impl From<String> for ScalarValue {
    fn from(s: String) -> Self {
        ScalarValue::String(s)
    }
}

impl From<bool> for ScalarValue {
    fn from(b: bool) -> Self {
        ScalarValue::Bool(b)
    }
}

/// Where the namespace comes from
///
/// ```yaml
/// namespace: barista_id
/// # or
/// namespace:
///   env: ROBOT_NAMESPACE
///   default: ""
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NamespaceSource {
    /// Fixed namespace, may contain substitutions
    Fixed(String),
    /// Environment variable with a fallback
    FromEnv {
        env: String,
        #[serde(default)]
        default: String,
    },
}

impl Default for NamespaceSource {
    fn default() -> Self {
        NamespaceSource::Fixed(String::new())
    }
}

/// Template for one process directive
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeTemplate {
    /// Package providing the executable
    pub package: String,

    /// Executable name within the package
    pub executable: String,

    /// Node name remapping (`__node`); the executable's own name when unset
    #[serde(default)]
    pub name: Option<String>,

    /// Where subprocess output goes
    #[serde(default)]
    pub output: OutputMode,

    /// Parameter sources, applied in order
    #[serde(default)]
    pub parameters: Vec<ParameterTemplate>,

    /// Activation predicate
    #[serde(default)]
    pub condition: Condition,
}

/// Subprocess output handling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputMode {
    /// Forward output to the console
    Screen,
    /// Keep output in the debug log only
    #[default]
    Log,
    /// Console and log
    Both,
}

impl fmt::Display for OutputMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputMode::Screen => f.write_str("screen"),
            OutputMode::Log => f.write_str("log"),
            OutputMode::Both => f.write_str("both"),
        }
    }
}

/// Activation predicate, evaluated once during composition
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Condition {
    /// Always included
    #[default]
    Always,
    /// Included only when the argument equals the value
    IfEquals { arg: String, value: String },
    /// Included unless the argument equals the value
    UnlessEquals { arg: String, value: String },
}

impl Condition {
    /// Argument the predicate reads, if any
    pub fn argument(&self) -> Option<&str> {
        match self {
            Condition::Always => None,
            Condition::IfEquals { arg, .. } | Condition::UnlessEquals { arg, .. } => Some(arg),
        }
    }

    /// Evaluate against a resolved argument value
    pub fn holds(&self, resolved: Option<&str>) -> bool {
        match self {
            Condition::Always => true,
            Condition::IfEquals { value, .. } => resolved == Some(value.as_str()),
            Condition::UnlessEquals { value, .. } => resolved != Some(value.as_str()),
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Condition::Always => f.write_str("always"),
            Condition::IfEquals { arg, value } => write!(f, "if {} == {}", arg, value),
            Condition::UnlessEquals { arg, value } => write!(f, "unless {} == {}", arg, value),
        }
    }
}

/// Parameter source before substitution
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParameterTemplate {
    /// Path to a parameter file
    File(String),
    /// Inline key-value mapping
    Inline(IndexMap<String, InlineValue>),
}

/// Inline parameter value
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum InlineValue {
    /// Output of an external command
    Computed(ComputedValue),
    /// Literal or substituted scalar
    Scalar(ScalarValue),
}

/// Parameter value produced by running a command
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ComputedValue {
    /// Program followed by its arguments; each element may contain substitutions
    pub command: Vec<String>,
}

impl LaunchFile {
    /// Load launch file from a YAML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, LaunchFileError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| LaunchFileError::Io {
            path: path.display().to_string(),
            source: e,
        })?;
        Self::from_yaml(&content)
    }

    /// Parse launch file from YAML string
    pub fn from_yaml(content: &str) -> Result<Self, LaunchFileError> {
        let launch_file: LaunchFile =
            serde_yaml::from_str(content).map_err(LaunchFileError::Parse)?;
        launch_file.validate()?;
        Ok(launch_file)
    }

    /// Validate the launch file configuration
    pub fn validate(&self) -> Result<(), LaunchFileError> {
        for (name, arg) in &self.args {
            let default = arg.default.to_string();
            if !arg.choices.is_empty()
                && !default.contains("$(")
                && !arg.choices.contains(&default)
            {
                return Err(LaunchFileError::Validation(format!(
                    "Argument '{}': default '{}' is not one of {:?}",
                    name, default, arg.choices
                )));
            }
        }

        for (name, node) in &self.nodes {
            if node.package.trim().is_empty() || node.executable.trim().is_empty() {
                return Err(LaunchFileError::Validation(format!(
                    "Node '{}': 'package' and 'executable' must not be empty",
                    name
                )));
            }

            if let Some(arg) = node.condition.argument() {
                if !self.args.contains_key(arg) {
                    return Err(LaunchFileError::Validation(format!(
                        "Node '{}': condition refers to undeclared argument '{}'",
                        name, arg
                    )));
                }
            }

            for param in &node.parameters {
                if let ParameterTemplate::Inline(map) = param {
                    for (key, value) in map {
                        if let InlineValue::Computed(computed) = value {
                            if computed.command.is_empty() {
                                return Err(LaunchFileError::Validation(format!(
                                    "Node '{}': computed parameter '{}' has an empty command",
                                    name, key
                                )));
                            }
                        }
                    }
                }
            }
        }

        Ok(())
    }
}

/// Errors that can occur when loading a launch file
#[derive(Debug, thiserror::Error)]
pub enum LaunchFileError {
    #[error("Failed to read launch file '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse launch file: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("Validation error: {0}")]
    Validation(String),
}
