//! Locating and reading benchmark instances.
//!
//! An instance is a JSON file describing the jobs, tasks, resources, processing modes and
//! constraints of a single scheduling problem. The file is handed to the solver backend as is;
//! it is only read here to fail early on broken instances and to report what an instance
//! contains.

use std::collections::BTreeMap;
use std::fmt::Display;
use std::fmt::Formatter;
use std::path::Path;
use std::path::PathBuf;

use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum InstanceError {
    #[error("instance file not found: {0}")]
    NotFound(PathBuf),

    #[error("failed to read '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("'{path}' is not a valid instance: {source}")]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("instance is inconsistent: {0}")]
    Inconsistent(String),

    #[error("no instance files found in {0}")]
    NoInstances(PathBuf),
}

/// The location of the instance called `name` inside `dir`.
///
/// Names are given with or without the `.json` extension.
pub fn instance_path(dir: impl AsRef<Path>, name: &str) -> PathBuf {
    if name.ends_with(".json") {
        dir.as_ref().join(name)
    } else {
        dir.as_ref().join(format!("{name}.json"))
    }
}

/// The instance name without its `.json` extension.
pub fn instance_stem(name: &str) -> &str {
    name.strip_suffix(".json").unwrap_or(name)
}

/// The names of all files directly inside `dir`, sorted.
pub fn discover_instances(dir: impl AsRef<Path>) -> Result<Vec<String>, InstanceError> {
    let dir = dir.as_ref();
    let io_error = |source: std::io::Error| InstanceError::Io {
        path: dir.to_path_buf(),
        source,
    };

    let mut names = vec![];
    for entry in std::fs::read_dir(dir).map_err(io_error)? {
        let entry = entry.map_err(io_error)?;
        if !entry.file_type().map_err(io_error)?.is_file() {
            continue;
        }

        match entry.file_name().into_string() {
            Ok(name) => names.push(name),
            Err(name) => log::warn!("Skipping instance with a non UTF-8 name: {name:?}"),
        }
    }

    if names.is_empty() {
        return Err(InstanceError::NoInstances(dir.to_path_buf()));
    }

    names.sort();
    Ok(names)
}

/// The contents of an instance file, as far as they are of interest for validation and
/// reporting. Fields that are not listed here are ignored.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct ProblemData {
    #[serde(default)]
    pub jobs: Vec<Job>,
    #[serde(default)]
    pub resources: Vec<serde_json::Value>,
    #[serde(default)]
    pub tasks: Vec<Task>,
    #[serde(default)]
    pub modes: Vec<Mode>,
    /// Constraint lists keyed by constraint kind, e.g. `end_before_start`.
    #[serde(default)]
    pub constraints: BTreeMap<String, serde_json::Value>,
    #[serde(default)]
    pub objective: Option<serde_json::Value>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct Job {
    #[serde(default)]
    pub tasks: Vec<usize>,
}

#[derive(Clone, Copy, Debug, Default, Deserialize)]
pub struct Task {
    #[serde(default)]
    pub job: Option<usize>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Mode {
    pub task: usize,
    #[serde(default)]
    pub resources: Vec<usize>,
}

impl ProblemData {
    /// Read an instance file and check that it is consistent.
    pub fn from_file(path: impl AsRef<Path>) -> Result<ProblemData, InstanceError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(InstanceError::NotFound(path.to_path_buf()));
        }

        let contents = std::fs::read_to_string(path).map_err(|source| InstanceError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let data: ProblemData =
            serde_json::from_str(&contents).map_err(|source| InstanceError::Json {
                path: path.to_path_buf(),
                source,
            })?;

        data.validate()?;
        Ok(data)
    }

    /// Check that all indices refer to existing jobs, tasks and resources.
    pub fn validate(&self) -> Result<(), InstanceError> {
        for (job_index, job) in self.jobs.iter().enumerate() {
            if let Some(task) = job.tasks.iter().find(|&&task| task >= self.tasks.len()) {
                return Err(InstanceError::Inconsistent(format!(
                    "job {job_index} refers to task {task}, but there are {} tasks",
                    self.tasks.len()
                )));
            }
        }

        for (task_index, task) in self.tasks.iter().enumerate() {
            if let Some(job) = task.job.filter(|&job| job >= self.jobs.len()) {
                return Err(InstanceError::Inconsistent(format!(
                    "task {task_index} refers to job {job}, but there are {} jobs",
                    self.jobs.len()
                )));
            }
        }

        for (mode_index, mode) in self.modes.iter().enumerate() {
            if mode.task >= self.tasks.len() {
                return Err(InstanceError::Inconsistent(format!(
                    "mode {mode_index} refers to task {}, but there are {} tasks",
                    mode.task,
                    self.tasks.len()
                )));
            }

            if let Some(resource) = mode
                .resources
                .iter()
                .find(|&&resource| resource >= self.resources.len())
            {
                return Err(InstanceError::Inconsistent(format!(
                    "mode {mode_index} refers to resource {resource}, but there are {} resources",
                    self.resources.len()
                )));
            }
        }

        Ok(())
    }

    pub fn summary(&self) -> InstanceSummary {
        let constraints = self
            .constraints
            .iter()
            .filter_map(|(kind, list)| list.as_array().map(|list| (kind.clone(), list.len())))
            .filter(|(_, count)| *count > 0)
            .collect();

        let tasks_without_modes = (0..self.tasks.len())
            .filter(|&task| self.modes.iter().all(|mode| mode.task != task))
            .count();

        InstanceSummary {
            num_jobs: self.jobs.len(),
            num_tasks: self.tasks.len(),
            num_resources: self.resources.len(),
            num_modes: self.modes.len(),
            tasks_without_modes,
            constraints,
        }
    }
}

/// The size of an instance.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InstanceSummary {
    pub num_jobs: usize,
    pub num_tasks: usize,
    pub num_resources: usize,
    pub num_modes: usize,
    /// Tasks which cannot be scheduled because no mode processes them.
    pub tasks_without_modes: usize,
    /// The number of constraints per constraint kind; kinds without constraints are left out.
    pub constraints: BTreeMap<String, usize>,
}

impl InstanceSummary {
    /// The summary as (label, value) pairs.
    pub fn rows(&self) -> Vec<(String, String)> {
        let mut rows = vec![
            ("jobs".to_owned(), self.num_jobs.to_string()),
            ("tasks".to_owned(), self.num_tasks.to_string()),
            ("resources".to_owned(), self.num_resources.to_string()),
            ("modes".to_owned(), self.num_modes.to_string()),
        ];

        if self.tasks_without_modes > 0 {
            rows.push((
                "tasks without modes".to_owned(),
                self.tasks_without_modes.to_string(),
            ));
        }

        for (kind, count) in &self.constraints {
            rows.push((kind.clone(), count.to_string()));
        }

        rows
    }
}

impl Display for InstanceSummary {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} jobs, {} tasks, {} resources, {} modes, {} constraints",
            self.num_jobs,
            self.num_tasks,
            self.num_resources,
            self.num_modes,
            self.constraints.values().sum::<usize>()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SMALL: &str = r#"{
        "jobs": [{"tasks": [0, 1], "name": "batch"}],
        "resources": [{"name": "fermenter"}, {"name": "centrifuge"}],
        "tasks": [{"job": 0}, {"job": 0}],
        "modes": [
            {"task": 0, "resources": [0], "duration": 12},
            {"task": 1, "resources": [1], "duration": 3}
        ],
        "constraints": {
            "end_before_start": [{"task1": 0, "task2": 1}],
            "setup_times": [],
            "consecutive": null
        }
    }"#;

    fn parse(json: &str) -> ProblemData {
        serde_json::from_str(json).expect("valid instance json")
    }

    #[test]
    fn names_resolve_with_and_without_extension() {
        assert_eq!(
            instance_path("instances", "V100_NBA.json"),
            PathBuf::from("instances/V100_NBA.json")
        );
        assert_eq!(
            instance_path("instances", "V100_NBA"),
            PathBuf::from("instances/V100_NBA.json")
        );
        assert_eq!(instance_stem("V100_NBA.json"), "V100_NBA");
        assert_eq!(instance_stem("V100_NBA"), "V100_NBA");
    }

    #[test]
    fn summary_counts_non_empty_constraint_lists() {
        let data = parse(SMALL);
        data.validate().unwrap();

        let summary = data.summary();
        assert_eq!(summary.num_jobs, 1);
        assert_eq!(summary.num_tasks, 2);
        assert_eq!(summary.num_resources, 2);
        assert_eq!(summary.num_modes, 2);
        assert_eq!(summary.tasks_without_modes, 0);
        assert_eq!(
            summary.constraints,
            BTreeMap::from([("end_before_start".to_owned(), 1)])
        );
        assert_eq!(
            summary.to_string(),
            "1 jobs, 2 tasks, 2 resources, 2 modes, 1 constraints"
        );
    }

    #[test]
    fn mode_with_unknown_task_is_inconsistent() {
        let data = parse(r#"{"tasks": [{}], "modes": [{"task": 1}]}"#);
        assert!(matches!(
            data.validate(),
            Err(InstanceError::Inconsistent(_))
        ));
    }

    #[test]
    fn mode_with_unknown_resource_is_inconsistent() {
        let data = parse(r#"{"tasks": [{}], "modes": [{"task": 0, "resources": [0]}]}"#);
        assert!(data.validate().is_err());
    }

    #[test]
    fn job_with_unknown_task_is_inconsistent() {
        let data = parse(r#"{"jobs": [{"tasks": [3]}], "tasks": [{"job": 0}]}"#);
        assert!(data.validate().is_err());
    }

    #[test]
    fn task_without_mode_is_counted() {
        let data = parse(r#"{"tasks": [{}, {}], "modes": [{"task": 1}]}"#);
        assert_eq!(data.summary().tasks_without_modes, 1);
    }

    #[test]
    fn missing_file_is_reported() {
        let result = ProblemData::from_file("does/not/exist.json");
        assert!(matches!(result, Err(InstanceError::NotFound(_))));
    }

    #[test]
    fn discovered_instances_are_sorted_files() {
        let dir = std::env::temp_dir().join(format!(
            "biosched-instances-{}",
            uuid::Uuid::new_v4().simple()
        ));
        std::fs::create_dir_all(dir.join("nested")).unwrap();
        for name in ["b.json", "a.json", "c.json"] {
            std::fs::write(dir.join(name), "{}").unwrap();
        }

        let names = discover_instances(&dir);
        std::fs::remove_dir_all(&dir).unwrap();

        assert_eq!(names.unwrap(), ["a.json", "b.json", "c.json"]);
    }

    #[test]
    fn empty_directory_has_no_instances() {
        let dir = std::env::temp_dir().join(format!(
            "biosched-empty-{}",
            uuid::Uuid::new_v4().simple()
        ));
        std::fs::create_dir_all(&dir).unwrap();

        let result = discover_instances(&dir);
        std::fs::remove_dir_all(&dir).unwrap();

        assert!(matches!(result, Err(InstanceError::NoInstances(_))));
    }
}
