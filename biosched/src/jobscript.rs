//! Rendering of the SLURM batch scripts.

use std::fmt::Write;
use std::path::Path;
use std::path::PathBuf;

use crate::config::BackendCommand;
use crate::config::Config;
use crate::config::SlurmSettings;
use crate::grid::RunSpec;

/// Format a number of seconds as a SLURM wall-time, `HH:MM:SS`.
///
/// ```
/// use biosched::jobscript::format_walltime;
///
/// assert_eq!(format_walltime(0), "00:00:00");
/// assert_eq!(format_walltime(3 * 3600 + 25 * 60 + 7), "03:25:07");
/// assert_eq!(format_walltime(100 * 3600), "100:00:00");
/// ```
pub fn format_walltime(seconds: u64) -> String {
    let (minutes, seconds) = (seconds / 60, seconds % 60);
    let (hours, minutes) = (minutes / 60, minutes % 60);
    format!("{hours:02}:{minutes:02}:{seconds:02}")
}

/// Everything a job script needs besides the run itself. This is shared by all runs of an
/// experiment.
#[derive(Clone, Debug)]
pub struct JobContext {
    pub instances_dir: PathBuf,
    pub summary_dir: PathBuf,
    pub buffer_wall_time: u64,
    pub num_workers: Option<u32>,
    pub slurm: SlurmSettings,
    /// The command executing a run. It is written into the script verbatim, so it may consist of
    /// several words.
    pub runner: String,
    pub backend: Option<BackendCommand>,
}

impl JobContext {
    pub fn from_config(config: &Config, summary_dir: impl Into<PathBuf>) -> JobContext {
        JobContext {
            instances_dir: config.instances_dir.clone(),
            summary_dir: summary_dir.into(),
            buffer_wall_time: config.buffer_wall_time,
            num_workers: config.num_workers,
            slurm: config.slurm.clone(),
            runner: config.runner.clone(),
            backend: config.backend.clone(),
        }
    }

    /// Render the batch script executing `run`.
    pub fn render(&self, run: &RunSpec) -> String {
        let job_name = run.job_name();
        let slurm = &self.slurm;
        let output_dir = slurm.output_dir.display();

        let mut script = String::from("#!/bin/bash\n");
        let mut directive = |option: &str, value: &dyn std::fmt::Display| {
            // Formatting into a `String` cannot fail.
            let _ = writeln!(script, "#SBATCH --{option}={value}");
        };

        directive("job-name", &job_name);
        directive(
            "time",
            &format_walltime(run.time_limit.saturating_add(self.buffer_wall_time)),
        );
        directive("ntasks", &slurm.ntasks);
        directive("cpus-per-task", &slurm.cpus_per_task);
        directive("partition", &slurm.partition);
        directive("mem-per-cpu", &slurm.mem_per_cpu);
        if let Some(account) = &slurm.account {
            directive("account", account);
        }
        directive("output", &format!("{output_dir}/output_{job_name}_%j.out"));
        directive("error", &format!("{output_dir}/error_{job_name}_%j.err"));
        if let Some(mail_type) = &slurm.mail_type {
            directive("mail-type", mail_type);
        }

        script.push('\n');
        script.push_str(&self.runner);
        script.push_str(" solve");

        for argument in self.solve_arguments(run) {
            script.push_str(" \\\n  ");
            script.push_str(&argument);
        }
        script.push('\n');

        script
    }

    /// The arguments of the `solve` invocation, one option and its value per entry, quoted for
    /// the shell.
    fn solve_arguments(&self, run: &RunSpec) -> Vec<String> {
        let option = |name: &str, value: &str| format!("--{name} {}", shell_quote(value));

        let mut arguments = vec![
            option("instances-dir", &path_str(&self.instances_dir)),
            option("instance-name", &run.instance_name),
            option("time-limit", &run.time_limit.to_string()),
            option("solver", &run.solver),
        ];

        if let Some(num_workers) = self.num_workers {
            arguments.push(option("num-workers", &num_workers.to_string()));
        }

        arguments.push(if run.warmstart {
            "--warmstart".to_owned()
        } else {
            "--no-warmstart".to_owned()
        });

        arguments.push(option("summary-dir", &path_str(&self.summary_dir)));

        if let Some(backend) = &self.backend {
            arguments.push(option("backend", &backend.program));
            for argument in &backend.args {
                // Values starting with a dash have to be attached to the option.
                arguments.push(format!(
                    "--backend-arg={}",
                    shell_quote(argument)
                ));
            }
        }

        arguments
    }
}

fn path_str(path: &Path) -> String {
    path.display().to_string()
}

/// Quote `value` for a POSIX shell if it contains characters with a special meaning.
///
/// ```
/// use biosched::jobscript::shell_quote;
///
/// assert_eq!(shell_quote("instances/V100.json"), "instances/V100.json");
/// assert_eq!(shell_quote("my instances"), "'my instances'");
/// assert_eq!(shell_quote("it's"), r"'it'\''s'");
/// assert_eq!(shell_quote(""), "''");
/// ```
pub fn shell_quote(value: &str) -> String {
    let is_plain = |c: char| c.is_ascii_alphanumeric() || "_./=:@%+-,".contains(c);

    if !value.is_empty() && value.chars().all(is_plain) {
        value.to_owned()
    } else {
        format!("'{}'", value.replace('\'', r"'\''"))
    }
}
