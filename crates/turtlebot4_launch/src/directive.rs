//! Fully resolved process directives

use crate::config::{Condition, OutputMode, ScalarValue};
use indexmap::IndexMap;
use serde::Serialize;
use std::path::PathBuf;

/// Instruction to start one external process
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProcessDirective {
    /// Display name (the node's key in the launch description)
    pub name: String,
    /// Package providing the executable
    pub package: String,
    /// Executable within the package
    pub executable: String,
    /// Node name remapping, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub node_name: Option<String>,
    /// Resolved namespace, empty for the root namespace
    pub namespace: String,
    pub output: OutputMode,
    /// Parameter sources in application order
    pub parameters: Vec<ParameterSource>,
    /// Predicate that admitted this directive
    pub condition: Condition,
}

/// Resolved parameter payload handed to the process
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ParameterSource {
    /// Opaque parameter file
    File(PathBuf),
    /// Inline key-value mapping
    Inline(IndexMap<String, ScalarValue>),
}

impl ProcessDirective {
    /// Fully qualified node path, e.g. `/barista_id/turtlebot4_node`
    pub fn qualified_name(&self) -> String {
        let node = self.node_name.as_deref().unwrap_or(&self.executable);
        let namespace = self.namespace.trim_matches('/');
        if namespace.is_empty() {
            format!("/{}", node)
        } else {
            format!("/{}/{}", namespace, node)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn directive(namespace: &str, node_name: Option<&str>) -> ProcessDirective {
        ProcessDirective {
            name: "turtlebot4_node".into(),
            package: "turtlebot4_node".into(),
            executable: "turtlebot4_node".into(),
            node_name: node_name.map(String::from),
            namespace: namespace.into(),
            output: OutputMode::Screen,
            parameters: Vec::new(),
            condition: Condition::Always,
        }
    }

    #[test]
    fn test_qualified_name() {
        assert_eq!(directive("", None).qualified_name(), "/turtlebot4_node");
        assert_eq!(
            directive("barista_id", None).qualified_name(),
            "/barista_id/turtlebot4_node"
        );
        assert_eq!(
            directive("/robot1/", Some("interface")).qualified_name(),
            "/robot1/interface"
        );
    }

    #[test]
    fn test_serialize_parameter_sources() {
        let mut inline = IndexMap::new();
        inline.insert("model".to_string(), ScalarValue::String("lite".into()));
        inline.insert("use_sim_time".to_string(), ScalarValue::Bool(false));

        let json = serde_json::to_value(vec![
            ParameterSource::File(PathBuf::from("/opt/turtlebot4.yaml")),
            ParameterSource::Inline(inline),
        ])
        .unwrap();

        assert_eq!(
            json,
            serde_json::json!([
                {"file": "/opt/turtlebot4.yaml"},
                {"inline": {"model": "lite", "use_sim_time": false}}
            ])
        );
    }
}
