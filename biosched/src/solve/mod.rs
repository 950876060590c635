//! Running a single instance with a single parameter combination.
//!
//! The run itself is executed by a [`SolverBackend`]; this module turns whatever happens to the
//! backend into exactly one [`SummaryRecord`] and stores it in a fresh summary file.

mod backend;
mod termination;

use std::fs::File;
use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;

use log::debug;
use log::info;
use log::warn;
use summary_format::compute_gap;
use summary_format::format_bool;
use summary_format::format_float;
use summary_format::writer::SummaryWriter;
use summary_format::Status;
use summary_format::SummaryRecord;
use thiserror::Error;

pub use backend::*;
pub use termination::*;

use crate::config::BackendCommand;
use crate::instance::instance_path;
use crate::instance::instance_stem;
use crate::instance::ProblemData;
use crate::Stopwatch;

#[derive(Debug, Error)]
pub enum SolveError {
    #[error("invalid solve options: {0}")]
    InvalidOptions(String),

    #[error("failed to create summary directory '{path}': {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to write summary file '{path}': {source}")]
    WriteSummary {
        path: PathBuf,
        source: std::io::Error,
    },
}

#[derive(Clone, Debug)]
pub struct SolveOptions {
    /// The instance file name, with or without the `.json` extension.
    pub instance_name: String,
    pub instances_dir: PathBuf,
    /// The solver time limit in seconds.
    pub time_limit: f64,
    pub num_workers: Option<u32>,
    pub warmstart: bool,
    pub solver: String,
    pub display: bool,
    /// Where the summary file is written. Created if it does not exist.
    pub summary_dir: PathBuf,
    pub backend: BackendCommand,
    /// How long the backend may run past the time limit before it is killed.
    pub kill_grace: Duration,
}

impl SolveOptions {
    pub fn new(instance_name: impl Into<String>, backend: BackendCommand) -> SolveOptions {
        SolveOptions {
            instance_name: instance_name.into(),
            instances_dir: PathBuf::from("instances"),
            time_limit: 60.0,
            num_workers: None,
            warmstart: false,
            solver: "cpoptimizer".to_owned(),
            display: false,
            summary_dir: PathBuf::from("."),
            backend,
            kill_grace: Duration::from_secs(60),
        }
    }

    pub fn validate(&self) -> Result<(), SolveError> {
        let invalid = |message: &str| Err(SolveError::InvalidOptions(message.to_owned()));

        if self.instance_name.trim().is_empty() {
            return invalid("the instance name must not be blank");
        }
        if !self.time_limit.is_finite() || self.time_limit <= 0.0 {
            return invalid("the time limit must be a positive number of seconds");
        }
        if self.solver.trim().is_empty() {
            return invalid("the solver name must not be blank");
        }
        if self.num_workers == Some(0) {
            return invalid("the number of workers must be positive");
        }

        Ok(())
    }

    /// The backend process described by these options. It is stopped early when `termination`
    /// triggers.
    pub fn command_backend<Termination: TerminationCondition>(
        &self,
        termination: Termination,
    ) -> CommandBackend<Termination> {
        CommandBackend::new(self.backend.clone(), self.kill_grace, termination)
    }

    /// The name of the summary file for this run. Every call yields a new name.
    pub fn summary_file_name(&self) -> String {
        format!(
            "summary_{}_TL{}_S{}_W{}_{}.csv",
            instance_stem(&self.instance_name),
            format_float(self.time_limit),
            sanitize_file_name(&self.solver),
            format_bool(self.warmstart),
            uuid::Uuid::new_v4().simple(),
        )
    }
}

/// Replace the characters which cannot appear in a file name.
fn sanitize_file_name(text: &str) -> String {
    text.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || "-_.".contains(c) {
                c
            } else {
                '_'
            }
        })
        .collect()
}

#[derive(Debug)]
pub struct SolveReport {
    pub record: SummaryRecord,
    pub summary_path: PathBuf,
}

/// Run the instance described by `options` with `backend` and write the outcome to a new summary
/// file.
///
/// Failures of the run itself, including a missing or broken instance, are recorded in the
/// summary file and do not make this function fail. Only invalid options and errors writing the
/// summary are reported as errors.
pub fn solve(
    options: &SolveOptions,
    backend: &mut impl SolverBackend,
) -> Result<SolveReport, SolveError> {
    options.validate()?;

    info!(
        "Running {} instance. Warmstart: {}. Time limit: {}s",
        options.instance_name,
        format_bool(options.warmstart),
        format_float(options.time_limit)
    );

    let stopwatch = Stopwatch::starting_now();
    let record = run(options, backend);
    debug!("The run took {}s", stopwatch.elapsed_secs());

    let summary_path = options.summary_dir.join(options.summary_file_name());
    write_summary(&options.summary_dir, &summary_path, &record)?;

    if record.status.is_failure() {
        warn!(
            "Instance '{}' failed with: {}",
            options.instance_name, record.status
        );
    }
    info!("Done. Summary written to: {}", summary_path.display());

    Ok(SolveReport {
        record,
        summary_path,
    })
}

fn run(options: &SolveOptions, backend: &mut impl SolverBackend) -> SummaryRecord {
    let failed = |status: Status| {
        SummaryRecord::failed(
            status,
            options.time_limit,
            options.solver.clone(),
            options.instance_name.clone(),
            options.warmstart,
        )
    };

    let instance_path = instance_path(&options.instances_dir, &options.instance_name);
    if !instance_path.exists() {
        warn!("Instance file not found: {}", instance_path.display());
    }

    if let Err(error) = ProblemData::from_file(&instance_path) {
        return failed(Status::Failure(error.to_string()));
    }

    let request = BackendRequest {
        instance_path,
        solver: options.solver.clone(),
        time_limit: options.time_limit,
        num_workers: options.num_workers,
        warmstart: options.warmstart,
        display: options.display,
    };

    info!(
        "Starting solve: instance={}, solver={}, time_limit={}, warmstart={}",
        options.instance_name,
        options.solver,
        format_float(options.time_limit),
        if options.warmstart { "yes" } else { "no" }
    );

    match backend.run(&request) {
        Ok(BackendOutcome::Finished(result)) => record_from_result(options, result),
        Ok(BackendOutcome::TimedOut) => failed(Status::TimeLimitException),
        Ok(BackendOutcome::Interrupted) => failed(Status::Interrupted),
        Ok(BackendOutcome::OutOfMemory) => failed(Status::MemoryException),
        Err(error) => failed(Status::Failure(error.to_string())),
    }
}

fn record_from_result(options: &SolveOptions, result: BackendResult) -> SummaryRecord {
    let warmstart_time = if options.warmstart {
        result.warmstart_time
    } else {
        Some(0.0)
    };

    SummaryRecord {
        status: Status::parse(&result.status),
        objective: result.objective,
        runtime: result.runtime,
        warmstart_time,
        lower_bound: result.lower_bound,
        gap: compute_gap(result.objective, result.lower_bound),
        time_limit: options.time_limit,
        solver: options.solver.clone(),
        instance_name: options.instance_name.clone(),
        warmstart: options.warmstart,
        warmstart_makespan: result.warmstart_makespan,
    }
}

fn write_summary(
    summary_dir: &Path,
    summary_path: &Path,
    record: &SummaryRecord,
) -> Result<(), SolveError> {
    std::fs::create_dir_all(summary_dir).map_err(|source| SolveError::CreateDir {
        path: summary_dir.to_path_buf(),
        source,
    })?;

    let write_error = |source: std::io::Error| SolveError::WriteSummary {
        path: summary_path.to_path_buf(),
        source,
    };

    let file = File::create(summary_path).map_err(write_error)?;
    let mut writer = SummaryWriter::new(file);
    writer.write_header().map_err(write_error)?;
    writer.write_record(record).map_err(write_error)?;
    let _ = writer.finish().map_err(write_error)?;

    Ok(())
}
