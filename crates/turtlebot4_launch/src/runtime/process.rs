//! Managed node process

use crate::runtime::command::CommandLine;
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::mpsc;

/// Process status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessStatus {
    /// Not started yet
    Pending,
    /// Process is running
    Running,
    /// Process has stopped with exit code
    Stopped(Option<i32>),
    /// Process failed to start
    Failed,
}

impl ProcessStatus {
    pub fn is_running(&self) -> bool {
        matches!(self, ProcessStatus::Running)
    }

    pub fn is_stopped(&self) -> bool {
        matches!(self, ProcessStatus::Stopped(_) | ProcessStatus::Failed)
    }
}

/// Event emitted by a managed process
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessEvent {
    /// Process started
    Started { pid: u32 },
    /// Process output line (stdout or stderr)
    Output { line: String, is_stderr: bool },
    /// Process exited
    Exited { code: Option<i32> },
}

pub type EventSender = mpsc::UnboundedSender<(String, ProcessEvent)>;

/// A child process started from a [`CommandLine`]
pub struct ManagedProcess {
    pub command: CommandLine,
    pub status: ProcessStatus,
    pub pid: Option<u32>,
    started_at: Option<Instant>,
    child: Option<Child>,
    event_tx: Option<EventSender>,
}

impl ManagedProcess {
    pub fn new(command: CommandLine) -> Self {
        Self {
            command,
            status: ProcessStatus::Pending,
            pid: None,
            started_at: None,
            child: None,
            event_tx: None,
        }
    }

    /// Set the event sender for this process
    pub fn with_event_sender(mut self, tx: EventSender) -> Self {
        self.event_tx = Some(tx);
        self
    }

    pub fn name(&self) -> &str {
        &self.command.name
    }

    fn emit(&self, event: ProcessEvent) {
        if let Some(tx) = &self.event_tx {
            let _ = tx.send((self.command.name.clone(), event));
        }
    }

    /// Start the process
    pub async fn start(&mut self) -> Result<(), ProcessError> {
        if self.status.is_running() {
            return Err(ProcessError::AlreadyRunning(self.command.name.clone()));
        }

        log::info!("[{}] Starting: {}", self.command.name, self.command);

        let mut cmd = Command::new(&self.command.program);
        cmd.args(&self.command.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) => {
                self.status = ProcessStatus::Failed;
                return Err(ProcessError::SpawnFailed {
                    name: self.command.name.clone(),
                    source: e,
                });
            }
        };

        let pid = child.id().unwrap_or(0);
        self.pid = Some(pid);
        self.status = ProcessStatus::Running;
        self.started_at = Some(Instant::now());
        self.emit(ProcessEvent::Started { pid });

        if let Some(tx) = self.event_tx.clone() {
            if let Some(stdout) = child.stdout.take() {
                forward_lines(self.command.name.clone(), stdout, false, tx.clone());
            }
            if let Some(stderr) = child.stderr.take() {
                forward_lines(self.command.name.clone(), stderr, true, tx);
            }
        }

        self.child = Some(child);
        Ok(())
    }

    /// Stop the process (SIGINT, then SIGKILL after timeout)
    pub async fn stop(&mut self, timeout: Duration) -> Result<(), ProcessError> {
        let Some(mut child) = self.child.take() else {
            return Err(ProcessError::NotRunning(self.command.name.clone()));
        };

        log::info!("[{}] Stopping process...", self.command.name);

        // ROS nodes shut down cleanly on SIGINT
        #[cfg(unix)]
        {
            use nix::sys::signal::{kill, Signal};
            use nix::unistd::Pid;

            if let Some(pid) = self.pid {
                let _ = kill(Pid::from_raw(pid as i32), Signal::SIGINT);
            }
        }

        #[cfg(not(unix))]
        {
            let _ = child.start_kill();
        }

        let code = match tokio::time::timeout(timeout, child.wait()).await {
            Ok(Ok(status)) => status.code(),
            Ok(Err(e)) => {
                log::error!("[{}] Error waiting for process: {}", self.command.name, e);
                None
            }
            Err(_) => {
                log::warn!(
                    "[{}] Process did not exit within {:?}, forcing kill",
                    self.command.name,
                    timeout
                );
                let _ = child.kill().await;
                None
            }
        };

        if let Some(uptime) = self.uptime() {
            log::debug!("[{}] Ran for {:.1}s", self.command.name, uptime.as_secs_f64());
        }

        self.status = ProcessStatus::Stopped(code);
        self.pid = None;
        self.emit(ProcessEvent::Exited { code });
        Ok(())
    }

    /// Poll the child and update the status if it exited
    pub fn check_status(&mut self) -> ProcessStatus {
        if let Some(child) = &mut self.child {
            match child.try_wait() {
                Ok(Some(status)) => {
                    let code = status.code();
                    self.status = ProcessStatus::Stopped(code);
                    self.pid = None;
                    self.child = None;
                    self.emit(ProcessEvent::Exited { code });
                }
                Ok(None) => {}
                Err(e) => {
                    log::error!(
                        "[{}] Error checking process status: {}",
                        self.command.name,
                        e
                    );
                }
            }
        }

        self.status
    }

    pub fn uptime(&self) -> Option<Duration> {
        self.started_at.map(|t| t.elapsed())
    }
}

fn forward_lines<R>(name: String, stream: R, is_stderr: bool, tx: EventSender)
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut lines = BufReader::new(stream).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            if tx
                .send((name.clone(), ProcessEvent::Output { line, is_stderr }))
                .is_err()
            {
                break;
            }
        }
    });
}

/// Errors that can occur with managed processes
#[derive(Debug, thiserror::Error)]
pub enum ProcessError {
    #[error("Process '{0}' is already running")]
    AlreadyRunning(String),

    #[error("Failed to spawn process '{name}': {source}")]
    SpawnFailed {
        name: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Process '{0}' is not running")]
    NotRunning(String),
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::config::OutputMode;
    use std::path::PathBuf;

    fn shell(name: &str, script: &str) -> CommandLine {
        CommandLine {
            name: name.to_string(),
            program: PathBuf::from("sh"),
            args: vec!["-c".to_string(), script.to_string()],
            output: OutputMode::Screen,
        }
    }

    #[tokio::test]
    async fn test_output_and_exit_events() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut process =
            ManagedProcess::new(shell("echo", "echo ready; echo oops >&2")).with_event_sender(tx);

        process.start().await.unwrap();
        assert!(process.status.is_running());

        let mut stdout = Vec::new();
        let mut stderr = Vec::new();
        while let Some((name, event)) = rx.recv().await {
            assert_eq!(name, "echo");
            match event {
                ProcessEvent::Output { line, is_stderr: false } => stdout.push(line),
                ProcessEvent::Output { line, is_stderr: true } => stderr.push(line),
                _ => {}
            }
            if !stdout.is_empty() && !stderr.is_empty() {
                break;
            }
        }
        assert_eq!(stdout, vec!["ready"]);
        assert_eq!(stderr, vec!["oops"]);

        let mut status = process.check_status();
        while status.is_running() {
            tokio::time::sleep(Duration::from_millis(20)).await;
            status = process.check_status();
        }
        assert_eq!(status, ProcessStatus::Stopped(Some(0)));
    }

    #[tokio::test]
    async fn test_stop_running_process() {
        let mut process = ManagedProcess::new(shell("sleeper", "exec sleep 30"));
        process.start().await.unwrap();
        assert!(process.pid.is_some());

        process.stop(Duration::from_secs(5)).await.unwrap();
        assert!(process.status.is_stopped());
        assert!(process.pid.is_none());
        assert!(matches!(
            process.stop(Duration::from_secs(1)).await,
            Err(ProcessError::NotRunning(_))
        ));
    }

    #[tokio::test]
    async fn test_spawn_failure() {
        let mut process = ManagedProcess::new(CommandLine {
            name: "missing".to_string(),
            program: PathBuf::from("/nonexistent/turtlebot4_node"),
            args: Vec::new(),
            output: OutputMode::Log,
        });

        assert!(matches!(
            process.start().await,
            Err(ProcessError::SpawnFailed { .. })
        ));
        assert_eq!(process.status, ProcessStatus::Failed);
    }
}
