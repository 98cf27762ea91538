//! Solver execution.
//!
//! [`TrialExecutor`] is the seam between the harness loops and the solver.
//! [`SolverProcess`] is the real backend: one child process per trial,
//! spawned in its own process group so a timeout can take down anything the
//! solver started.

use std::process::Stdio;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, Command};
use tracing::{debug, warn};

use crate::error::{HarnessError, HarnessResult};
use crate::solver::{SolverConfig, TrialRequest};

/// Result of one plain solver run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TrialOutcome {
    Solved,
    Timeout,
    Error { exit_code: Option<i32> },
}

impl TrialOutcome {
    pub fn is_timeout(&self) -> bool {
        matches!(self, TrialOutcome::Timeout)
    }
}

/// Result of a classify-mode run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassifyOutcome {
    Solved,
    NoSolution,
    Timeout,
}

impl ClassifyOutcome {
    /// Parse the first line printed in classify mode.
    pub fn from_line(line: &str) -> HarnessResult<Self> {
        match line.trim_end_matches(['\n', '\r']) {
            "Solved" => Ok(ClassifyOutcome::Solved),
            "No solution" => Ok(ClassifyOutcome::NoSolution),
            _ => Err(HarnessError::ProtocolViolation {
                output: line.to_string(),
            }),
        }
    }
}

/// Runs solver invocations.
#[async_trait]
pub trait TrialExecutor: Send + Sync {
    /// Run to completion or until `request.timeout` elapses.
    async fn run(&self, request: &TrialRequest) -> HarnessResult<TrialOutcome>;

    /// Run in classify mode and read the verdict line.
    async fn classify(&self, request: &TrialRequest) -> HarnessResult<ClassifyOutcome>;
}

/// Executor backed by the solver binary.
#[derive(Debug, Clone)]
pub struct SolverProcess {
    config: SolverConfig,
}

impl SolverProcess {
    pub fn new(config: SolverConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    fn command(&self, request: &TrialRequest, classify: bool) -> Command {
        let mut cmd = Command::new(self.config.binary_path());
        cmd.args(request.args(&self.config.disabled, classify))
            .stdin(Stdio::null())
            .stderr(Stdio::inherit())
            .kill_on_drop(true);
        #[cfg(unix)]
        cmd.process_group(0);
        cmd
    }

    fn spawn(&self, mut cmd: Command) -> HarnessResult<Child> {
        cmd.spawn().map_err(|source| HarnessError::Spawn {
            binary: self.config.binary_path().display().to_string(),
            source,
        })
    }
}

/// Kill the child and its process group, then reap it.
///
/// Safe to call on a child that already exited.
async fn terminate(child: &mut Child) {
    if let Some(pid) = child.id() {
        kill_group(pid).await;
    }
    if let Err(e) = child.start_kill() {
        debug!(error = %e, "Child already gone");
    }
    if let Err(e) = child.wait().await {
        warn!(error = %e, "Failed to reap solver process");
    }
}

/// SIGKILL the process group led by `pid` through kill(1).
#[cfg(unix)]
async fn kill_group(pid: u32) {
    let group = format!("-{pid}");
    match Command::new("kill")
        .args(["-KILL", "--", &group])
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await
    {
        Ok(status) if !status.success() => {
            debug!(pgid = pid, code = ?status.code(), "Process group already gone")
        }
        Ok(_) => {}
        Err(e) => warn!(pgid = pid, error = %e, "Failed to run kill"),
    }
}

#[cfg(not(unix))]
async fn kill_group(_pid: u32) {}

#[async_trait]
impl TrialExecutor for SolverProcess {
    async fn run(&self, request: &TrialRequest) -> HarnessResult<TrialOutcome> {
        let start = Instant::now();
        let mut cmd = self.command(request, false);
        cmd.stdout(Stdio::null());
        let mut child = self.spawn(cmd)?;

        let outcome = match tokio::time::timeout(request.timeout, child.wait()).await {
            Ok(status) => {
                let status = status?;
                if status.success() {
                    TrialOutcome::Solved
                } else {
                    TrialOutcome::Error {
                        exit_code: status.code(),
                    }
                }
            }
            Err(_) => {
                terminate(&mut child).await;
                TrialOutcome::Timeout
            }
        };

        debug!(
            seed = ?request.seed,
            duration_ms = start.elapsed().as_millis() as u64,
            outcome = ?outcome,
            "Trial finished"
        );
        Ok(outcome)
    }

    async fn classify(&self, request: &TrialRequest) -> HarnessResult<ClassifyOutcome> {
        let mut cmd = self.command(request, true);
        cmd.stdout(Stdio::piped());
        let mut child = self.spawn(cmd)?;

        let Some(stdout) = child.stdout.take() else {
            terminate(&mut child).await;
            return Err(HarnessError::Io(std::io::Error::other(
                "solver stdout was not captured",
            )));
        };

        let budget = request.timeout + Duration::from_millis(self.config.classify_grace_ms);
        let mut reader = BufReader::new(stdout);
        let mut line = String::new();
        let read = tokio::time::timeout(budget, reader.read_line(&mut line)).await;
        drop(reader);
        terminate(&mut child).await;

        match read {
            Err(_) => Ok(ClassifyOutcome::Timeout),
            Ok(result) => {
                result?;
                ClassifyOutcome::from_line(&line)
            }
        }
    }
}
