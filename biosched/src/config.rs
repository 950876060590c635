//! The declarative description of an experiment.
//!
//! An experiment configuration is a JSON file such as
//! ```json
//! {
//!     "instances_dir": "instances",
//!     "instance_names": ["V100_NBA.json", "V200_NBA.json"],
//!     "time_limits": [60, 600],
//!     "buffer_wall_time": 300,
//!     "solvers": ["cpoptimizer", "ortools"],
//!     "warmstarts": [true, false],
//!     "num_workers": 8,
//!     "experiment_name": "baseline"
//! }
//! ```
//! with optional `slurm`, `runner` and `backend` sections, see [`Config`].

use std::fs::File;
use std::io::BufWriter;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config '{path}': {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to write config '{path}': {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid config JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Which instances to run and with which parameter values.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// The directory containing the instance files.
    pub instances_dir: PathBuf,
    /// The instance files to run. May be left empty when the whole instance directory is run.
    #[serde(default)]
    pub instance_names: Vec<String>,
    /// The solver time limits to try, in seconds.
    pub time_limits: Vec<u64>,
    /// Seconds added on top of the time limit to obtain the wall-time of a batch job.
    pub buffer_wall_time: u64,
    /// The solvers the backend should use.
    pub solvers: Vec<String>,
    /// Whether to warm-start the solver; usually `[true, false]` or a single value.
    pub warmstarts: Vec<bool>,
    /// The number of worker threads per run. The backend decides if absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub num_workers: Option<u32>,
    /// Used to name the experiment directory.
    pub experiment_name: String,
    #[serde(default)]
    pub slurm: SlurmSettings,
    /// The command which is invoked inside a batch job to execute a single run.
    #[serde(default = "default_runner")]
    pub runner: String,
    /// The solver backend passed on to every run. If absent, the runner's default is used.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backend: Option<BackendCommand>,
}

/// The resources requested for every batch job.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct SlurmSettings {
    pub partition: String,
    pub ntasks: u32,
    pub cpus_per_task: u32,
    /// Memory per CPU in a format SLURM understands, e.g. `3968MB`.
    pub mem_per_cpu: String,
    pub account: Option<String>,
    pub mail_type: Option<String>,
    /// Where SLURM writes the standard output and error of the jobs.
    pub output_dir: PathBuf,
}

impl Default for SlurmSettings {
    fn default() -> Self {
        SlurmSettings {
            partition: "compute".to_owned(),
            ntasks: 1,
            cpus_per_task: 8,
            mem_per_cpu: "3968MB".to_owned(),
            account: Some("Research-EEMCS-ST".to_owned()),
            mail_type: Some("FAIL".to_owned()),
            output_dir: PathBuf::from("slurm"),
        }
    }
}

/// An external program together with the arguments that precede the per-run arguments.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BackendCommand {
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
}

impl BackendCommand {
    pub fn new(program: impl Into<String>) -> BackendCommand {
        BackendCommand {
            program: program.into(),
            args: vec![],
        }
    }
}

fn default_runner() -> String {
    "biosched".to_owned()
}

impl Config {
    /// Read and validate a configuration file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Config, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        Config::from_json(&contents)
    }

    /// Parse and validate a configuration.
    pub fn from_json(json: &str) -> Result<Config, ConfigError> {
        let config: Config = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Check the configuration for values that cannot produce a sensible experiment; the first
    /// violation is reported.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |message: &str| Err(ConfigError::Invalid(message.to_owned()));

        if self.time_limits.is_empty() {
            return invalid("'time_limits' must not be empty");
        }
        if self.time_limits.contains(&0) {
            return invalid("every time limit must be positive");
        }
        if self.solvers.is_empty() {
            return invalid("'solvers' must not be empty");
        }
        if self.solvers.iter().any(|solver| solver.trim().is_empty()) {
            return invalid("solver names must not be blank");
        }
        if self.warmstarts.is_empty() {
            return invalid("'warmstarts' must not be empty");
        }
        if self.instance_names.iter().any(|name| name.trim().is_empty()) {
            return invalid("instance names must not be blank");
        }
        if self.experiment_name.is_empty() {
            return invalid("'experiment_name' must not be empty");
        }
        if self
            .experiment_name
            .chars()
            .any(|c| c == '/' || c == '\\' || c.is_whitespace())
        {
            return invalid("'experiment_name' must not contain path separators or whitespace");
        }
        if self.num_workers == Some(0) {
            return invalid("'num_workers' must be positive");
        }
        if self.slurm.ntasks == 0 || self.slurm.cpus_per_task == 0 {
            return invalid("'slurm.ntasks' and 'slurm.cpus_per_task' must be positive");
        }
        if self.runner.trim().is_empty() {
            return invalid("'runner' must not be blank");
        }
        if self
            .backend
            .as_ref()
            .is_some_and(|backend| backend.program.trim().is_empty())
        {
            return invalid("'backend.program' must not be blank");
        }

        Ok(())
    }

    /// Write the configuration as JSON indented by four spaces.
    pub fn write_pretty(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let write_error = |source: std::io::Error| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        };

        let file = File::create(path).map_err(write_error)?;
        let mut writer = BufWriter::new(file);

        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut serializer = serde_json::Serializer::with_formatter(&mut writer, formatter);
        self.serialize(&mut serializer)?;

        writeln!(writer).map_err(write_error)?;
        writer.flush().map_err(write_error)
    }
}
