//! Launch plan - resolved arguments plus directives, for dry runs

use crate::composer::ResolvedArguments;
use crate::directive::{ParameterSource, ProcessDirective};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// Result of resolving and composing a launch description
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LaunchPlan {
    pub arguments: ResolvedArguments,
    pub directives: Vec<ProcessDirective>,
}

/// Output format for a rendered plan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlanFormat {
    #[default]
    Text,
    Json,
    Yaml,
}

impl FromStr for PlanFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(PlanFormat::Text),
            "json" => Ok(PlanFormat::Json),
            "yaml" => Ok(PlanFormat::Yaml),
            _ => Err(format!(
                "Invalid format '{}'. Expected one of: text, json, yaml",
                s
            )),
        }
    }
}

impl LaunchPlan {
    pub fn render(&self, format: PlanFormat) -> Result<String, PlanError> {
        match format {
            PlanFormat::Text => Ok(self.to_string()),
            PlanFormat::Json => Ok(serde_json::to_string_pretty(self)?),
            PlanFormat::Yaml => {
                // Go through JSON so enums render as plain maps instead of YAML tags
                let value = serde_json::to_value(self)?;
                Ok(serde_yaml::to_string(&value)?)
            }
        }
    }
}

/// Errors rendering a plan
#[derive(Debug, thiserror::Error)]
pub enum PlanError {
    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML serialization failed: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Display the launch plan in a human-readable format
impl fmt::Display for LaunchPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Launch Plan")?;
        writeln!(f, "===========")?;
        writeln!(f)?;

        if !self.arguments.is_empty() {
            writeln!(f, "Arguments:")?;
            for (key, value) in self.arguments.iter() {
                writeln!(f, "  {}: {}", key, value)?;
            }
            writeln!(f)?;
        }

        let namespace = self.arguments.namespace();
        writeln!(
            f,
            "Namespace: {}",
            if namespace.is_empty() { "/" } else { namespace }
        )?;
        writeln!(f)?;

        writeln!(f, "Nodes (in launch order):")?;
        for (i, directive) in self.directives.iter().enumerate() {
            writeln!(f)?;
            writeln!(f, "  {}. {} [{}]", i + 1, directive.name, directive.qualified_name())?;
            writeln!(
                f,
                "     Executable: {}/{}",
                directive.package, directive.executable
            )?;
            writeln!(f, "     Output: {}", directive.output)?;
            writeln!(f, "     Condition: {}", directive.condition)?;

            if !directive.parameters.is_empty() {
                writeln!(f, "     Parameters:")?;
                for source in &directive.parameters {
                    match source {
                        ParameterSource::File(path) => {
                            writeln!(f, "       file: {}", path.display())?;
                        }
                        ParameterSource::Inline(map) => {
                            for (key, value) in map {
                                writeln!(f, "       {}: {}", key, summarize(&value.to_string()))?;
                            }
                        }
                    }
                }
            }
        }

        Ok(())
    }
}

/// First line of a long value, e.g. a robot description
fn summarize(value: &str) -> String {
    const MAX_CHARS: usize = 60;
    let first_line = value.lines().next().unwrap_or("");
    let truncated = first_line.chars().count() > MAX_CHARS || value.lines().nth(1).is_some();
    if truncated {
        let head: String = first_line.chars().take(MAX_CHARS).collect();
        format!("{}... ({} bytes)", head, value.len())
    } else {
        first_line.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_format() {
        assert_eq!("json".parse::<PlanFormat>(), Ok(PlanFormat::Json));
        assert_eq!("YAML".parse::<PlanFormat>(), Ok(PlanFormat::Yaml));
        assert_eq!("text".parse::<PlanFormat>(), Ok(PlanFormat::Text));
        assert!("toml".parse::<PlanFormat>().is_err());
    }

    #[test]
    fn test_summarize() {
        assert_eq!(summarize("standard"), "standard");
        assert_eq!(summarize(""), "");

        let xml = "<?xml version=\"1.0\"?>\n<robot name=\"turtlebot4\">\n</robot>\n";
        assert_eq!(
            summarize(xml),
            format!("<?xml version=\"1.0\"?>... ({} bytes)", xml.len())
        );
    }
}
