//! Command-line interface for turtlebot4_launch

use crate::config::{BuiltinLaunch, LaunchFile, LaunchFileError};
use crate::plan::PlanFormat;
use argh::FromArgs;
use std::collections::HashMap;
use std::path::PathBuf;

/// Compose and run the Turtlebot4 robot bring-up
#[derive(FromArgs, Debug)]
pub struct LaunchArgs {
    /// built-in launch description (robot, robot_full) or path to a launch YAML file
    #[argh(positional, default = "String::from(\"robot\")")]
    pub launch: String,

    /// override launch arguments (format: key:=value)
    #[argh(option, short = 'a', from_str_fn(parse_arg_override))]
    pub arg: Vec<(String, String)>,

    /// install prefix searched before AMENT_PREFIX_PATH (repeatable)
    #[argh(option)]
    pub prefix: Vec<PathBuf>,

    /// show launch plan without executing
    #[argh(switch)]
    pub dry_run: bool,

    /// validate the launch description and list its arguments
    #[argh(switch)]
    pub validate: bool,

    /// plan output format for --dry-run (text, json, yaml)
    #[argh(option, default = "PlanFormat::Text")]
    pub format: PlanFormat,

    /// log level (error, warn, info, debug, trace)
    #[argh(option, short = 'l', default = "String::from(\"info\")")]
    pub log_level: String,
}

/// Parse argument override in format "key:=value"
fn parse_arg_override(s: &str) -> Result<(String, String), String> {
    match s.split_once(":=") {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.to_string()))
        }
        _ => Err(format!(
            "Invalid argument format '{}'. Expected 'key:=value'",
            s
        )),
    }
}

impl LaunchArgs {
    /// Convert argument overrides to a HashMap (later values win)
    pub fn arg_overrides(&self) -> HashMap<String, String> {
        self.arg.iter().cloned().collect()
    }

    /// Load the selected launch description
    pub fn load_launch_file(&self) -> Result<LaunchFile, LaunchFileError> {
        match self.launch.parse::<BuiltinLaunch>() {
            Ok(builtin) if !PathBuf::from(&self.launch).is_file() => builtin.launch_file(),
            _ => LaunchFile::from_file(&self.launch),
        }
    }

    /// Log filter, falling back to info for unknown levels
    pub fn log_filter(&self) -> &'static str {
        match self.log_level.to_lowercase().as_str() {
            "error" => "error",
            "warn" => "warn",
            "debug" => "debug",
            "trace" => "trace",
            _ => "info",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> LaunchArgs {
        LaunchArgs::from_args(&["turtlebot4_launch"], args).unwrap()
    }

    #[test]
    fn test_parse_arg_override() {
        let result = parse_arg_override("model:=lite");
        assert_eq!(result, Ok(("model".to_string(), "lite".to_string())));
    }

    #[test]
    fn test_parse_arg_override_with_separator_in_value() {
        let result = parse_arg_override("param_file:=/tmp/a:=b.yaml");
        assert_eq!(
            result,
            Ok(("param_file".to_string(), "/tmp/a:=b.yaml".to_string()))
        );
    }

    #[test]
    fn test_parse_arg_override_invalid() {
        assert!(parse_arg_override("invalid").is_err());
        assert!(parse_arg_override(":=lite").is_err());
    }

    #[test]
    fn test_defaults() {
        let args = parse(&[]);
        assert_eq!(args.launch, "robot");
        assert_eq!(args.format, PlanFormat::Text);
        assert_eq!(args.log_filter(), "info");
        assert!(args.arg_overrides().is_empty());
    }

    #[test]
    fn test_full_command_line() {
        let args = parse(&[
            "robot_full",
            "-a",
            "model:=lite",
            "-a",
            "use_sim:=true",
            "--prefix",
            "/opt/ws/install",
            "--dry-run",
            "--format",
            "json",
            "-l",
            "DEBUG",
        ]);

        assert_eq!(args.launch, "robot_full");
        let overrides = args.arg_overrides();
        assert_eq!(overrides["model"], "lite");
        assert_eq!(overrides["use_sim"], "true");
        assert_eq!(args.prefix, vec![PathBuf::from("/opt/ws/install")]);
        assert!(args.dry_run);
        assert_eq!(args.format, PlanFormat::Json);
        assert_eq!(args.log_filter(), "debug");
    }

    #[test]
    fn test_load_builtin_and_file() {
        let builtin = parse(&["robot_full"]).load_launch_file().unwrap();
        assert!(builtin.nodes.contains_key("rplidar"));

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.launch.yaml");
        std::fs::write(
            &path,
            "nodes:\n  interface:\n    package: turtlebot4_node\n    executable: turtlebot4_node\n",
        )
        .unwrap();
        let custom = parse(&[path.to_str().unwrap()]).load_launch_file().unwrap();
        assert_eq!(custom.nodes.len(), 1);

        assert!(matches!(
            parse(&["/nonexistent/launch.yaml"]).load_launch_file(),
            Err(LaunchFileError::Io { .. })
        ));
    }
}
