//! The external process which builds the constraint model and runs the solver.
//!
//! A backend is started as
//! ```text
//! <program> <args>... --instance <path> --solver <name> --time-limit <seconds>
//!     [--num-workers <n>] [--warmstart] [--display]
//! ```
//! and reports its result as a JSON object on a line of its standard output, e.g.
//! ```json
//! {"status": "Feasible", "objective": 130, "lower_bound": 100, "runtime": 60.2}
//! ```
//! The last such line counts. Other output is forwarded to the log.

use std::io::BufRead;
use std::io::BufReader;
use std::io::Read;
use std::path::PathBuf;
use std::process::Child;
use std::process::Command;
use std::process::ExitStatus;
use std::process::Stdio;
use std::sync::mpsc;
use std::sync::mpsc::Receiver;
use std::sync::mpsc::RecvTimeoutError;
use std::time::Duration;
use std::time::Instant;

use log::debug;
use log::info;
use log::warn;
use serde::Deserialize;
use thiserror::Error;
use wait_timeout::ChildExt;

use super::termination::TerminationCondition;
use crate::config::BackendCommand;
use crate::Stopwatch;

/// How often the termination condition is checked while waiting for the backend.
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// How long the output of the backend is still read after the backend itself has exited.
const OUTPUT_GRACE: Duration = Duration::from_secs(2);

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("failed to start backend '{program}': {source}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },

    #[error("failed while waiting for the backend: {0}")]
    Wait(#[from] std::io::Error),

    #[error("backend exited with {0}")]
    Exit(ExitStatus),

    #[error("backend finished without reporting a result")]
    NoResult,
}

/// What a backend is asked to do.
#[derive(Clone, Debug, PartialEq)]
pub struct BackendRequest {
    pub instance_path: PathBuf,
    pub solver: String,
    /// Seconds.
    pub time_limit: f64,
    pub num_workers: Option<u32>,
    pub warmstart: bool,
    /// Whether the backend should show the solver progress.
    pub display: bool,
}

/// The result line reported by a backend.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct BackendResult {
    pub status: String,
    #[serde(default)]
    pub objective: Option<f64>,
    #[serde(default)]
    pub lower_bound: Option<f64>,
    #[serde(default)]
    pub runtime: Option<f64>,
    #[serde(default)]
    pub warmstart_makespan: Option<f64>,
    #[serde(default)]
    pub warmstart_time: Option<f64>,
}

/// How a backend run ended.
#[derive(Clone, Debug, PartialEq)]
pub enum BackendOutcome {
    /// The backend exited normally and reported a result.
    Finished(BackendResult),
    /// The backend was killed because it exceeded its time budget.
    TimedOut,
    /// The backend was stopped due to the termination condition.
    Interrupted,
    /// The backend ran out of memory.
    OutOfMemory,
}

pub trait SolverBackend {
    fn run(&mut self, request: &BackendRequest) -> Result<BackendOutcome, BackendError>;
}

/// Runs the backend as a child process.
///
/// On unix the backend gets its own process group, and stopping it kills the whole group. A
/// backend which starts the solver as a separate process, as `uv run` does, is therefore stopped
/// completely.
#[derive(Debug)]
pub struct CommandBackend<Termination> {
    command: BackendCommand,
    /// The time the backend is given on top of the solver time limit before it is killed.
    kill_grace: Duration,
    termination: Termination,
}

impl<Termination: TerminationCondition> CommandBackend<Termination> {
    pub fn new(
        command: BackendCommand,
        kill_grace: Duration,
        termination: Termination,
    ) -> CommandBackend<Termination> {
        CommandBackend {
            command,
            kill_grace,
            termination,
        }
    }

    fn command_for(&self, request: &BackendRequest) -> Command {
        let mut command = Command::new(&self.command.program);

        let _ = command
            .args(&self.command.args)
            .arg("--instance")
            .arg(&request.instance_path)
            .arg("--solver")
            .arg(&request.solver)
            .arg("--time-limit")
            .arg(request.time_limit.to_string());

        if let Some(num_workers) = request.num_workers {
            let _ = command.arg("--num-workers").arg(num_workers.to_string());
        }
        if request.warmstart {
            let _ = command.arg("--warmstart");
        }
        if request.display {
            let _ = command.arg("--display");
        }

        let _ = command
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            let _ = command.process_group(0);
        }

        command
    }

    /// Wait for the child to exit, killing it if the budget is exceeded or termination is
    /// requested. If the child was stopped, the outcome describing why is returned as the error.
    ///
    /// A backend which exits because it received the same SIGINT or SIGTERM as the orchestrator
    /// counts as interrupted.
    fn wait(
        &mut self,
        child: &mut Child,
        budget: Duration,
    ) -> Result<Result<ExitStatus, BackendOutcome>, BackendError> {
        let stopwatch = Stopwatch::starting_now();

        loop {
            if let Some(status) = child.wait_timeout(POLL_INTERVAL)? {
                if self.termination.should_stop() || stopped_by_termination_signal(status) {
                    warn!("Termination requested, the backend exited with {status}");
                    kill_process_group(child);
                    return Ok(Err(BackendOutcome::Interrupted));
                }

                return Ok(Ok(status));
            }

            let outcome = if self.termination.should_stop() {
                warn!("Termination requested, stopping the backend");
                BackendOutcome::Interrupted
            } else if stopwatch.elapsed() >= budget {
                warn!(
                    "The backend exceeded its budget of {:.1}s, stopping it",
                    budget.as_secs_f64()
                );
                BackendOutcome::TimedOut
            } else {
                continue;
            };

            kill_process_group(child);
            // The child may exit on its own between the last wait and the kill.
            if let Err(error) = child.kill() {
                debug!("Failed to kill the backend: {error}");
            }
            let _ = child.wait()?;

            return Ok(Err(outcome));
        }
    }
}

impl<Termination: TerminationCondition> SolverBackend for CommandBackend<Termination> {
    fn run(&mut self, request: &BackendRequest) -> Result<BackendOutcome, BackendError> {
        let mut command = self.command_for(request);
        debug!("Starting backend: {command:?}");

        let mut child = command.spawn().map_err(|source| BackendError::Spawn {
            program: self.command.program.clone(),
            source,
        })?;

        let display = request.display;
        let stdout_lines = child
            .stdout
            .take()
            .map(|stdout| spawn_reader(stdout, move |line| forward_stdout(line, display)));
        let stderr_lines = child
            .stderr
            .take()
            .map(|stderr| spawn_reader(stderr, |line| debug!("[backend] {line}")));

        let budget = duration_from_secs(request.time_limit).saturating_add(self.kill_grace);
        let waited = self.wait(&mut child, budget)?;

        let deadline = Instant::now() + OUTPUT_GRACE;
        let stdout = collect_lines(stdout_lines, deadline);
        let stderr = collect_lines(stderr_lines, deadline);

        let status = match waited {
            Ok(status) => status,
            Err(outcome) => return Ok(outcome),
        };

        if was_out_of_memory(status, &stderr) {
            return Ok(BackendOutcome::OutOfMemory);
        }

        if !status.success() {
            if let Some(last_line) = stderr.last() {
                warn!("Backend error output ends with: {last_line}");
            }
            return Err(BackendError::Exit(status));
        }

        last_result(&stdout)
            .map(BackendOutcome::Finished)
            .ok_or(BackendError::NoResult)
    }
}

fn forward_stdout(line: &str, display: bool) {
    if display {
        info!("[backend] {line}");
    } else {
        debug!("[backend] {line}");
    }
}

/// Read lines from `source` on a separate thread, so the pipe of the child never fills up.
///
/// The thread ends once the pipe is closed, which may be after the child itself has exited.
fn spawn_reader(
    source: impl Read + Send + 'static,
    forward: impl Fn(&str) + Send + 'static,
) -> Receiver<String> {
    let (sender, receiver) = mpsc::channel();

    let _ = std::thread::spawn(move || {
        for line in BufReader::new(source).lines() {
            match line {
                Ok(line) => {
                    forward(&line);
                    if sender.send(line).is_err() {
                        break;
                    }
                }
                Err(error) => {
                    debug!("Stopped reading backend output: {error}");
                    break;
                }
            }
        }
    });

    receiver
}

/// The lines read until the pipe is closed or `deadline` passes, whichever is first.
fn collect_lines(lines: Option<Receiver<String>>, deadline: Instant) -> Vec<String> {
    let Some(lines) = lines else {
        return vec![];
    };

    let mut collected = vec![];
    loop {
        match lines.recv_timeout(deadline.saturating_duration_since(Instant::now())) {
            Ok(line) => collected.push(line),
            Err(RecvTimeoutError::Disconnected) => break,
            Err(RecvTimeoutError::Timeout) => {
                warn!(
                    "The backend output is still open after the backend exited, ignoring the rest"
                );
                break;
            }
        }
    }

    collected
}

fn duration_from_secs(seconds: f64) -> Duration {
    Duration::try_from_secs_f64(seconds).unwrap_or(Duration::MAX)
}

/// The last line of the output which is a JSON object with a `status` field.
fn last_result(lines: &[String]) -> Option<BackendResult> {
    lines.iter().rev().find_map(|line| {
        let line = line.trim();
        if !line.starts_with('{') {
            return None;
        }
        serde_json::from_str(line).ok()
    })
}

fn was_out_of_memory(status: ExitStatus, stderr: &[String]) -> bool {
    if stderr.iter().any(|line| line.contains("MemoryError")) {
        return true;
    }

    killed_by_sigkill(status)
}

#[cfg(unix)]
fn killed_by_sigkill(status: ExitStatus) -> bool {
    use std::os::unix::process::ExitStatusExt;

    status.signal() == Some(signal_hook::consts::SIGKILL)
}

#[cfg(not(unix))]
fn killed_by_sigkill(_status: ExitStatus) -> bool {
    false
}

#[cfg(unix)]
fn stopped_by_termination_signal(status: ExitStatus) -> bool {
    use std::os::unix::process::ExitStatusExt;

    matches!(
        status.signal(),
        Some(signal_hook::consts::SIGINT | signal_hook::consts::SIGTERM)
    )
}

#[cfg(not(unix))]
fn stopped_by_termination_signal(_status: ExitStatus) -> bool {
    false
}

/// Kill every process in the process group of the backend, including the processes it started.
#[cfg(unix)]
fn kill_process_group(child: &Child) {
    let group = format!("-{}", child.id());
    let killed = Command::new("kill")
        .args(["-KILL", "--", &group])
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status();

    match killed {
        Ok(status) if status.success() => debug!("Killed the process group of the backend"),
        Ok(status) => debug!("Killing the process group of the backend exited with {status}"),
        Err(error) => debug!("Failed to kill the process group of the backend: {error}"),
    }
}

#[cfg(not(unix))]
fn kill_process_group(_child: &Child) {}
