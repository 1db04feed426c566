//! Launch descriptions shipped with the binary

use crate::config::launch_file::{LaunchFile, LaunchFileError};
use std::fmt;
use std::str::FromStr;

const ROBOT_LAUNCH: &str = include_str!("../../launch/robot.launch.yaml");
const ROBOT_FULL_LAUNCH: &str = include_str!("../../launch/robot_full.launch.yaml");

/// Built-in launch description
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuiltinLaunch {
    /// Robot interface and base controller, fixed namespace
    Robot,
    /// Adds robot state publishing and the lidar driver, namespace from `ROBOT_NAMESPACE`
    RobotFull,
}

impl BuiltinLaunch {
    pub const ALL: [BuiltinLaunch; 2] = [BuiltinLaunch::Robot, BuiltinLaunch::RobotFull];

    pub fn name(&self) -> &'static str {
        match self {
            BuiltinLaunch::Robot => "robot",
            BuiltinLaunch::RobotFull => "robot_full",
        }
    }

    /// Raw YAML source
    pub fn source(&self) -> &'static str {
        match self {
            BuiltinLaunch::Robot => ROBOT_LAUNCH,
            BuiltinLaunch::RobotFull => ROBOT_FULL_LAUNCH,
        }
    }

    pub fn launch_file(&self) -> Result<LaunchFile, LaunchFileError> {
        LaunchFile::from_yaml(self.source())
    }
}

impl fmt::Display for BuiltinLaunch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for BuiltinLaunch {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.strip_suffix(".launch.yaml").unwrap_or(s);
        BuiltinLaunch::ALL
            .into_iter()
            .find(|b| b.name() == name)
            .ok_or_else(|| format!("Unknown built-in launch description '{}'", s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Condition, NamespaceSource};

    #[test]
    fn test_builtins_parse() {
        for builtin in BuiltinLaunch::ALL {
            let launch_file = builtin.launch_file().unwrap();
            assert_eq!(
                launch_file.args.keys().collect::<Vec<_>>(),
                vec!["use_sim", "model", "param_file"],
                "{}",
                builtin
            );
            assert_eq!(
                launch_file.nodes["turtlebot4_base_node"].condition,
                Condition::IfEquals {
                    arg: "model".into(),
                    value: "standard".into()
                }
            );
        }
    }

    #[test]
    fn test_builtin_namespaces() {
        let robot = BuiltinLaunch::Robot.launch_file().unwrap();
        assert_eq!(robot.namespace, NamespaceSource::Fixed("barista_id".into()));

        let full = BuiltinLaunch::RobotFull.launch_file().unwrap();
        assert_eq!(
            full.namespace,
            NamespaceSource::FromEnv {
                env: "ROBOT_NAMESPACE".into(),
                default: String::new()
            }
        );
    }

    #[test]
    fn test_from_str() {
        assert_eq!("robot".parse::<BuiltinLaunch>(), Ok(BuiltinLaunch::Robot));
        assert_eq!(
            "robot_full.launch.yaml".parse::<BuiltinLaunch>(),
            Ok(BuiltinLaunch::RobotFull)
        );
        assert!("launch/custom.launch.yaml".parse::<BuiltinLaunch>().is_err());
    }
}
