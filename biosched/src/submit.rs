//! Submission of an experiment to the cluster scheduler.
//!
//! Every run of the experiment grid becomes one batch job. All jobs of an experiment share an
//! experiment directory, which receives a copy of the configuration and, once the jobs finish,
//! their summary files.

use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use std::process::Command;
use std::process::Stdio;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use log::debug;
use log::info;
use log::warn;
use thiserror::Error;

use crate::config::Config;
use crate::config::ConfigError;
use crate::grid;
use crate::instance::discover_instances;
use crate::instance::InstanceError;
use crate::jobscript::JobContext;

#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("failed to create directory '{path}': {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Instance(#[from] InstanceError),

    #[error("the config lists no instance names and the instance directory is not scanned")]
    NoInstances,

    #[error("failed to run '{program}': {source}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },

    #[error("'{program}' rejected the job ({status}): {stderr}")]
    Rejected {
        program: String,
        status: std::process::ExitStatus,
        stderr: String,
    },

    #[error("failed to write job script: {0}")]
    Io(#[from] std::io::Error),

    #[error(
        "submitting job '{job_name}' failed after {submitted} successful submissions, whose \
         results are collected in '{}': {reason}",
        .experiment_dir.display()
    )]
    Aborted {
        job_name: String,
        submitted: usize,
        experiment_dir: PathBuf,
        reason: Box<SubmitError>,
    },
}

/// The directory collecting the results of one submission of an experiment.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExperimentDir {
    path: PathBuf,
}

impl ExperimentDir {
    /// The experiment directory for the given experiment and submission time, without creating
    /// it.
    pub fn new(root: impl AsRef<Path>, experiment_name: &str, timestamp: u64) -> ExperimentDir {
        ExperimentDir {
            path: root
                .as_ref()
                .join(format!("summary_{experiment_name}_{timestamp}")),
        }
    }

    /// Create `{root}/summary_{experiment_name}_{timestamp}`, including missing parents.
    pub fn create(
        root: impl AsRef<Path>,
        experiment_name: &str,
        timestamp: u64,
    ) -> Result<ExperimentDir, SubmitError> {
        let experiment_dir = ExperimentDir::new(root, experiment_name, timestamp);
        create_dir(&experiment_dir.path)?;
        Ok(experiment_dir)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Where the copy of the experiment configuration is stored.
    pub fn config_path(&self) -> PathBuf {
        self.path.join("config.json")
    }
}

fn create_dir(path: &Path) -> Result<(), SubmitError> {
    std::fs::create_dir_all(path).map_err(|source| SubmitError::CreateDir {
        path: path.to_path_buf(),
        source,
    })
}

/// Seconds since the unix epoch; `0` if the clock is set before 1970.
pub fn unix_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|duration| duration.as_secs())
        .unwrap_or_default()
}

/// The outcome of submitting a single job.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Submission {
    pub job_name: String,
    /// The identifier assigned by the scheduler, if it reported one.
    pub job_id: Option<u64>,
}

/// Hands job scripts to a cluster scheduler.
pub trait Submitter {
    fn submit(&mut self, job_name: &str, script: &str) -> Result<Submission, SubmitError>;

    /// Whether the jobs are actually executed. Side effects which are only needed by running
    /// jobs, such as creating the log directory, are skipped otherwise.
    fn executes_jobs(&self) -> bool {
        true
    }
}

/// Submits jobs by piping the script into `sbatch`.
#[derive(Clone, Debug)]
pub struct Sbatch {
    program: String,
}

impl Sbatch {
    pub fn new(program: impl Into<String>) -> Sbatch {
        Sbatch {
            program: program.into(),
        }
    }
}

impl Default for Sbatch {
    fn default() -> Self {
        Sbatch::new("sbatch")
    }
}

impl Submitter for Sbatch {
    fn submit(&mut self, job_name: &str, script: &str) -> Result<Submission, SubmitError> {
        let spawn_error = |source: std::io::Error| SubmitError::Spawn {
            program: self.program.clone(),
            source,
        };

        let mut child = Command::new(&self.program)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(spawn_error)?;

        // The stdin handle is dropped before waiting, so the scheduler sees the end of the script.
        let written = match child.stdin.take() {
            Some(mut stdin) => stdin.write_all(script.as_bytes()),
            None => Ok(()),
        };

        let output = child.wait_with_output().map_err(spawn_error)?;
        written?;
        if !output.status.success() {
            return Err(SubmitError::Rejected {
                program: self.program.clone(),
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_owned(),
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let job_id = parse_job_id(&stdout);
        match job_id {
            Some(id) => info!("Submitted {job_name} as job {id}"),
            None => warn!("Submitted {job_name}, but '{}' did not report a job id", self.program),
        }

        Ok(Submission {
            job_name: job_name.to_owned(),
            job_id,
        })
    }
}

/// Extract the job id from the `Submitted batch job <id>` line printed by `sbatch`.
fn parse_job_id(output: &str) -> Option<u64> {
    output
        .lines()
        .find_map(|line| line.trim().strip_prefix("Submitted batch job "))
        .and_then(|id| id.trim().parse().ok())
}

/// Writes the job scripts to a sink instead of submitting them.
#[derive(Debug)]
pub struct DryRun<W> {
    sink: W,
}

impl<W: Write> DryRun<W> {
    pub fn new(sink: W) -> DryRun<W> {
        DryRun { sink }
    }

    pub fn into_inner(self) -> W {
        self.sink
    }
}

impl<W: Write> Submitter for DryRun<W> {
    fn submit(&mut self, job_name: &str, script: &str) -> Result<Submission, SubmitError> {
        writeln!(self.sink, "{script}")?;

        Ok(Submission {
            job_name: job_name.to_owned(),
            job_id: None,
        })
    }

    fn executes_jobs(&self) -> bool {
        false
    }
}

#[derive(Clone, Debug)]
pub struct SubmitOptions {
    /// Run every file in the instance directory instead of the configured instance names.
    pub solve_dir: bool,
    /// The directory below which the experiment directory is created.
    pub summaries_root: PathBuf,
    /// Identifies this submission of the experiment.
    pub timestamp: u64,
}

impl Default for SubmitOptions {
    fn default() -> Self {
        SubmitOptions {
            solve_dir: false,
            summaries_root: PathBuf::from("summaries"),
            timestamp: unix_timestamp(),
        }
    }
}

#[derive(Debug)]
pub struct SubmitReport {
    pub experiment_dir: ExperimentDir,
    pub submissions: Vec<Submission>,
}

/// Submit one job for every run of the experiment.
///
/// Jobs are submitted in the order of [`grid::expand`]. The first failing submission aborts the
/// remaining ones.
pub fn submit_experiment(
    config: &Config,
    options: &SubmitOptions,
    submitter: &mut impl Submitter,
) -> Result<SubmitReport, SubmitError> {
    let instance_names = if options.solve_dir {
        discover_instances(&config.instances_dir)?
    } else if config.instance_names.is_empty() {
        return Err(SubmitError::NoInstances);
    } else {
        config.instance_names.clone()
    };

    let experiment_dir = ExperimentDir::create(
        &options.summaries_root,
        &config.experiment_name,
        options.timestamp,
    )?;
    info!(
        "Summary directory created at: {}",
        experiment_dir.path().display()
    );

    config.write_pretty(experiment_dir.config_path())?;
    info!(
        "Config file saved at: {}",
        experiment_dir.config_path().display()
    );
    info!(
        "Once the jobs are done, combine the results with: biosched summarize --dir \"{}\"",
        experiment_dir.path().display()
    );

    if submitter.executes_jobs() {
        create_dir(&config.slurm.output_dir)?;
    }

    let runs = grid::expand(
        &instance_names,
        &config.time_limits,
        &config.warmstarts,
        &config.solvers,
    );
    debug!("Expanded the experiment into {} runs", runs.len());

    let context = JobContext::from_config(config, experiment_dir.path());

    let mut submissions = Vec::with_capacity(runs.len());
    for run in &runs {
        let job_name = run.job_name();
        let script = context.render(run);

        match submitter.submit(&job_name, &script) {
            Ok(submission) => submissions.push(submission),
            Err(error) => {
                return Err(SubmitError::Aborted {
                    job_name,
                    submitted: submissions.len(),
                    experiment_dir: experiment_dir.path().to_path_buf(),
                    reason: Box::new(error),
                })
            }
        }
    }

    Ok(SubmitReport {
        experiment_dir,
        submissions,
    })
}
