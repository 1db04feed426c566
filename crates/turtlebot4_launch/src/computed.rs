//! Computed parameter values produced by external commands

use std::process::Command;

/// Runs a command and returns its standard output
pub trait CommandRunner: Send + Sync {
    fn run(&self, argv: &[String]) -> Result<String, CommandError>;
}

/// Runs commands as child processes, blocking until they exit
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemCommandRunner;

impl CommandRunner for SystemCommandRunner {
    fn run(&self, argv: &[String]) -> Result<String, CommandError> {
        let (program, args) = argv.split_first().ok_or(CommandError::Empty)?;

        log::debug!("Running command: {}", argv.join(" "));
        let output = Command::new(program)
            .args(args)
            .output()
            .map_err(|e| CommandError::Spawn {
                program: program.clone(),
                source: e,
            })?;

        if !output.status.success() {
            return Err(CommandError::Failed {
                program: program.clone(),
                code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        String::from_utf8(output.stdout).map_err(|_| CommandError::NonUtf8Output {
            program: program.clone(),
        })
    }
}

impl<F> CommandRunner for F
where
    F: Fn(&[String]) -> Result<String, CommandError> + Send + Sync,
{
    fn run(&self, argv: &[String]) -> Result<String, CommandError> {
        self(argv)
    }
}

/// Errors from running a computed parameter command
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error("Command is empty")]
    Empty,

    #[error("Failed to run '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("'{program}' exited with code {code:?}: {stderr}")]
    Failed {
        program: String,
        code: Option<i32>,
        stderr: String,
    },

    #[error("'{program}' produced output that is not valid UTF-8")]
    NonUtf8Output { program: String },
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn argv(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_system_runner_output() {
        let output = SystemCommandRunner
            .run(&argv(&["sh", "-c", "printf '<robot/>'"]))
            .unwrap();
        assert_eq!(output, "<robot/>");
    }

    #[test]
    fn test_system_runner_failure() {
        let result = SystemCommandRunner.run(&argv(&["sh", "-c", "echo bad >&2; exit 3"]));
        match result {
            Err(CommandError::Failed { code, stderr, .. }) => {
                assert_eq!(code, Some(3));
                assert_eq!(stderr, "bad");
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_system_runner_missing_program() {
        let result = SystemCommandRunner.run(&argv(&["/nonexistent/xacro"]));
        assert!(matches!(result, Err(CommandError::Spawn { .. })));
        assert!(matches!(SystemCommandRunner.run(&[]), Err(CommandError::Empty)));
    }
}
