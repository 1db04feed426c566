//! Supervisor - starts directives in order and shuts them down in reverse

use crate::config::{OutputMode, PackageIndex};
use crate::directive::ProcessDirective;
use crate::error::ErrorKind;
use crate::runtime::command::{CommandLine, CommandLineError};
use crate::runtime::process::{ManagedProcess, ProcessError, ProcessEvent, ProcessStatus};
use indexmap::IndexMap;
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::{mpsc, watch};

/// Supervisor configuration
#[derive(Debug, Clone)]
pub struct SupervisorConfig {
    /// Time each process gets to exit after SIGINT
    pub shutdown_timeout: Duration,
    /// Directory for generated inline parameter files
    pub parameter_dir: PathBuf,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            shutdown_timeout: Duration::from_secs(5),
            parameter_dir: std::env::temp_dir()
                .join(format!("turtlebot4_launch_{}", std::process::id())),
        }
    }
}

/// Runs the processes named by a directive list
pub struct Supervisor {
    config: SupervisorConfig,
    processes: IndexMap<String, ManagedProcess>,
    event_tx: mpsc::UnboundedSender<(String, ProcessEvent)>,
    event_rx: mpsc::UnboundedReceiver<(String, ProcessEvent)>,
}

impl Supervisor {
    pub fn new(config: SupervisorConfig) -> Self {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        Self {
            config,
            processes: IndexMap::new(),
            event_tx,
            event_rx,
        }
    }

    /// Build every command line before anything is spawned
    pub fn prepare(
        &mut self,
        directives: &[ProcessDirective],
        packages: &PackageIndex,
    ) -> Result<(), SupervisorError> {
        std::fs::create_dir_all(&self.config.parameter_dir).map_err(|e| {
            SupervisorError::ParameterDir {
                path: self.config.parameter_dir.clone(),
                source: e,
            }
        })?;

        let mut processes = IndexMap::with_capacity(directives.len());
        for directive in directives {
            let command =
                match CommandLine::from_directive(directive, packages, &self.config.parameter_dir)
                {
                    Ok(command) => command,
                    Err(e) => {
                        self.remove_parameter_dir();
                        return Err(SupervisorError::Command {
                            node: directive.name.clone(),
                            source: e,
                        });
                    }
                };
            let process = ManagedProcess::new(command).with_event_sender(self.event_tx.clone());
            processes.insert(directive.name.clone(), process);
        }

        self.processes = processes;
        Ok(())
    }

    fn remove_parameter_dir(&self) {
        if let Err(e) = std::fs::remove_dir_all(&self.config.parameter_dir) {
            log::debug!(
                "Could not remove parameter dir '{}': {}",
                self.config.parameter_dir.display(),
                e
            );
        }
    }

    /// Start all prepared processes in directive order
    pub async fn launch(&mut self, shutdown_rx: &watch::Receiver<()>) -> Result<(), SupervisorError> {
        log::info!("Launching {} nodes...", self.processes.len());

        for process in self.processes.values_mut() {
            if shutdown_rx.has_changed().unwrap_or(false) {
                log::info!("Shutdown requested, aborting launch");
                return Ok(());
            }

            process
                .start()
                .await
                .map_err(|e| SupervisorError::Process {
                    node: process.name().to_string(),
                    source: e,
                })?;
        }

        log::info!("All nodes launched successfully");
        Ok(())
    }

    /// Forward process events until shutdown or until every process has exited
    pub async fn wait(&mut self, mut shutdown_rx: watch::Receiver<()>) {
        // Ticks on a fixed schedule however often output events arrive
        let mut poll = tokio::time::interval(Duration::from_secs(1));
        poll.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = shutdown_rx.changed() => {
                    log::info!("Shutdown signal received");
                    break;
                }

                event = self.event_rx.recv() => {
                    if let Some((name, event)) = event {
                        self.log_event(&name, event);
                    }
                }

                _ = poll.tick() => {
                    let mut all_stopped = true;
                    for process in self.processes.values_mut() {
                        if process.check_status().is_running() {
                            all_stopped = false;
                        }
                    }
                    if all_stopped {
                        log::info!("All processes have stopped");
                        break;
                    }
                }
            }
        }

        // Drain what is already queued so exit events are not lost
        while let Ok((name, event)) = self.event_rx.try_recv() {
            self.log_event(&name, event);
        }
    }

    fn log_event(&self, name: &str, event: ProcessEvent) {
        let output = self
            .processes
            .get(name)
            .map(|p| p.command.output)
            .unwrap_or_default();

        match event {
            ProcessEvent::Output { line, is_stderr } => match output {
                OutputMode::Screen | OutputMode::Both if is_stderr => {
                    log::warn!("[{}] {}", name, line)
                }
                OutputMode::Screen | OutputMode::Both => log::info!("[{}] {}", name, line),
                OutputMode::Log => log::debug!("[{}] {}", name, line),
            },
            ProcessEvent::Started { pid } => {
                log::info!("[{}] Process started with PID: {}", name, pid);
            }
            ProcessEvent::Exited { code } => {
                log::info!("[{}] Process exited with code: {:?}", name, code);
            }
        }
    }

    /// Stop running processes in reverse launch order
    pub async fn shutdown(&mut self) {
        log::info!("Shutting down all processes...");

        for process in self.processes.values_mut().rev() {
            if process.check_status().is_running() {
                if let Err(e) = process.stop(self.config.shutdown_timeout).await {
                    log::error!("[{}] Error stopping process: {}", process.name(), e);
                }
            }
        }

        self.remove_parameter_dir();

        log::info!("All processes shut down");
    }

    /// Process status summary in launch order
    pub fn status(&self) -> Vec<(&str, ProcessStatus)> {
        self.processes
            .iter()
            .map(|(name, process)| (name.as_str(), process.status))
            .collect()
    }
}

/// Errors that can occur while supervising
#[derive(Debug, thiserror::Error)]
pub enum SupervisorError {
    #[error("Failed to create parameter directory '{}': {source}", .path.display())]
    ParameterDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot build command for node '{node}': {source}")]
    Command {
        node: String,
        #[source]
        source: CommandLineError,
    },

    #[error("Process failed for node '{node}': {source}")]
    Process {
        node: String,
        #[source]
        source: ProcessError,
    },
}

impl SupervisorError {
    /// Classification shared with composition errors, if any applies
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            SupervisorError::Command {
                source: CommandLineError::Package(_),
                ..
            } => Some(ErrorKind::MissingResource),
            _ => None,
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::config::Condition;
    use std::os::unix::fs::PermissionsExt;
    use std::path::Path;

    fn install_script(prefix: &Path, package: &str, executable: &str, script: &str) {
        let lib = prefix.join("lib").join(package);
        std::fs::create_dir_all(&lib).unwrap();
        let path = lib.join(executable);
        std::fs::write(&path, format!("#!/bin/sh\n{}\n", script)).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    }

    fn directive(package: &str, executable: &str) -> ProcessDirective {
        ProcessDirective {
            name: executable.to_string(),
            package: package.to_string(),
            executable: executable.to_string(),
            node_name: None,
            namespace: "robot1".to_string(),
            output: OutputMode::Screen,
            parameters: Vec::new(),
            condition: Condition::Always,
        }
    }

    fn config(dir: &Path) -> SupervisorConfig {
        SupervisorConfig {
            shutdown_timeout: Duration::from_secs(2),
            parameter_dir: dir.join("params"),
        }
    }

    #[tokio::test]
    async fn test_launch_runs_until_all_exit() {
        let prefix = tempfile::tempdir().unwrap();
        install_script(prefix.path(), "turtlebot4_node", "turtlebot4_node", "echo \"$@\"");
        install_script(prefix.path(), "turtlebot4_base", "turtlebot4_base_node", "exit 0");
        let packages = PackageIndex::new(vec![prefix.path().to_path_buf()]);

        let mut supervisor = Supervisor::new(config(prefix.path()));
        supervisor
            .prepare(
                &[
                    directive("turtlebot4_node", "turtlebot4_node"),
                    directive("turtlebot4_base", "turtlebot4_base_node"),
                ],
                &packages,
            )
            .unwrap();

        let (_shutdown_tx, shutdown_rx) = watch::channel(());
        supervisor.launch(&shutdown_rx).await.unwrap();
        tokio::time::timeout(Duration::from_secs(10), supervisor.wait(shutdown_rx))
            .await
            .unwrap();

        let status = supervisor.status();
        assert_eq!(
            status.iter().map(|(n, _)| *n).collect::<Vec<_>>(),
            vec!["turtlebot4_node", "turtlebot4_base_node"]
        );
        assert!(status
            .iter()
            .all(|(_, s)| *s == ProcessStatus::Stopped(Some(0))));

        supervisor.shutdown().await;
        assert!(!prefix.path().join("params").exists());
    }

    #[tokio::test]
    async fn test_shutdown_stops_running_processes() {
        let prefix = tempfile::tempdir().unwrap();
        install_script(prefix.path(), "rplidar_ros", "rplidar_composition", "exec sleep 30");
        let packages = PackageIndex::new(vec![prefix.path().to_path_buf()]);

        let mut supervisor = Supervisor::new(config(prefix.path()));
        supervisor
            .prepare(&[directive("rplidar_ros", "rplidar_composition")], &packages)
            .unwrap();

        let (shutdown_tx, shutdown_rx) = watch::channel(());
        supervisor.launch(&shutdown_rx).await.unwrap();
        shutdown_tx.send(()).unwrap();
        supervisor.wait(shutdown_rx).await;
        supervisor.shutdown().await;

        assert!(supervisor.status()[0].1.is_stopped());
    }

    #[test]
    fn test_prepare_fails_before_spawning() {
        let prefix = tempfile::tempdir().unwrap();
        install_script(prefix.path(), "turtlebot4_node", "turtlebot4_node", "exit 0");
        let packages = PackageIndex::new(vec![prefix.path().to_path_buf()]);

        let mut supervisor = Supervisor::new(config(prefix.path()));
        let result = supervisor.prepare(
            &[
                directive("turtlebot4_node", "turtlebot4_node"),
                directive("turtlebot4_base", "turtlebot4_base_node"),
            ],
            &packages,
        );

        let err = result.unwrap_err();
        assert!(matches!(
            err,
            SupervisorError::Command { ref node, .. } if node == "turtlebot4_base_node"
        ));
        assert_eq!(err.kind(), Some(ErrorKind::MissingResource));
        assert!(supervisor.status().is_empty());
        assert!(!prefix.path().join("params").exists());
    }

    #[tokio::test]
    async fn test_exit_observed_while_sibling_is_chatty() {
        let prefix = tempfile::tempdir().unwrap();
        install_script(
            prefix.path(),
            "rplidar_ros",
            "rplidar_composition",
            "while true; do echo scan; sleep 0.1; done",
        );
        install_script(prefix.path(), "turtlebot4_base", "turtlebot4_base_node", "exit 3");
        let packages = PackageIndex::new(vec![prefix.path().to_path_buf()]);

        let mut supervisor = Supervisor::new(config(prefix.path()));
        supervisor
            .prepare(
                &[
                    directive("rplidar_ros", "rplidar_composition"),
                    directive("turtlebot4_base", "turtlebot4_base_node"),
                ],
                &packages,
            )
            .unwrap();

        let (_shutdown_tx, shutdown_rx) = watch::channel(());
        supervisor.launch(&shutdown_rx).await.unwrap();

        // The chatty process never exits, so wait only returns on timeout
        let waited =
            tokio::time::timeout(Duration::from_secs(4), supervisor.wait(shutdown_rx)).await;
        assert!(waited.is_err());

        let status = supervisor.status();
        assert_eq!(status[0].1, ProcessStatus::Running);
        assert_eq!(status[1].1, ProcessStatus::Stopped(Some(3)));

        supervisor.shutdown().await;
        assert!(supervisor.status()[0].1.is_stopped());
    }
}
