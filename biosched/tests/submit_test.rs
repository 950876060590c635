mod helpers;

use helpers::fixture;
use helpers::Workspace;
use regex::Regex;

fn job_names(scripts: &str) -> Vec<String> {
    let job_name = Regex::new(r"(?m)^#SBATCH --job-name=(\S+)$").unwrap();
    job_name
        .captures_iter(scripts)
        .map(|captures| captures[1].to_owned())
        .collect()
}

#[test]
fn dry_run_prints_one_script_per_run() {
    let workspace = Workspace::new("dry-run");
    let config = fixture("configs/dry_run.json");

    let run = workspace.run(["submit", "--config", config.to_str().unwrap(), "--dry-run"]);
    let _ = run.assert_success();

    let names = job_names(&run.stdout);
    assert_eq!(names.len(), 16);
    assert_eq!(
        names[..4],
        [
            "small-wsTrue-tl60-scpoptimizer",
            "small-wsTrue-tl60-sortools",
            "small-wsFalse-tl60-scpoptimizer",
            "small-wsFalse-tl60-sortools",
        ]
    );
    assert_eq!(names[15], "medium-wsFalse-tl600-sortools");

    let walltime = Regex::new(r"(?m)^#SBATCH --time=(\d\d:\d\d:\d\d)$").unwrap();
    let walltimes = walltime
        .captures_iter(&run.stdout)
        .map(|captures| captures[1].to_owned())
        .collect::<Vec<_>>();
    assert_eq!(walltimes[0], "00:06:00");
    assert_eq!(walltimes[4], "00:15:00");

    assert!(!run.stdout.contains("#SBATCH --account"));
    assert!(run.stdout.contains("  --num-workers 8 \\\n"));
    assert!(run.stdout.contains("16 jobs generated."));

    let experiment_dirs = workspace.files_starting_with("summaries", "summary_integration_");
    assert_eq!(experiment_dirs.len(), 1);
    assert!(experiment_dirs[0].join("config.json").is_file());
    assert!(!workspace.path("slurm").exists());

    let hint = Regex::new(r#"biosched summarize --dir "summaries/summary_integration_\d+""#).unwrap();
    assert!(hint.is_match(&run.stdout), "{}", run.stdout);
}

#[test]
fn stored_config_is_the_submitted_config() {
    let workspace = Workspace::new("stored-config");
    let config = fixture("configs/dry_run.json");

    let _ = workspace
        .run([
            "submit",
            "--config",
            config.to_str().unwrap(),
            "--dry-run",
            "--summaries-root",
            "results",
        ])
        .assert_success();

    let experiment_dirs = workspace.files_starting_with("results", "summary_integration_");
    let stored = biosched::Config::from_file(experiment_dirs[0].join("config.json")).unwrap();

    assert_eq!(stored, biosched::Config::from_file(config).unwrap());
}

#[cfg(unix)]
#[test]
fn scripts_are_piped_into_the_scheduler() {
    use std::os::unix::fs::PermissionsExt;

    let workspace = Workspace::new("pipe").with_instances();
    let config = fixture("configs/scan_dir.json");

    let scheduler = workspace.write(
        "fake_sbatch",
        "#!/bin/sh\ncat >> submitted.sh\necho \"Submitted batch job 42\"\n",
    );
    std::fs::set_permissions(&scheduler, std::fs::Permissions::from_mode(0o755)).unwrap();

    let run = workspace.run([
        "submit",
        "--config",
        config.to_str().unwrap(),
        "--solve-dir",
        "--sbatch-program",
        scheduler.to_str().unwrap(),
    ]);
    let _ = run.assert_success();

    let submitted = std::fs::read_to_string(workspace.path("submitted.sh")).unwrap();
    assert_eq!(
        job_names(&submitted),
        ["medium-wsFalse-tl30-sortools", "small-wsFalse-tl30-sortools"]
    );
    assert!(submitted.contains("  --backend sh \\\n  --backend-arg=backends/fake_solver.sh \\\n"));
    assert!(workspace.path("slurm").is_dir());
    assert!(run.stdout.contains("2 jobs submitted."));
}

#[cfg(unix)]
#[test]
fn rejected_submission_fails() {
    let workspace = Workspace::new("rejected");
    let config = fixture("configs/dry_run.json");

    let run = workspace.run([
        "submit",
        "--config",
        config.to_str().unwrap(),
        "--sbatch-program",
        "false",
    ]);

    assert_eq!(run.status.code(), Some(1));
    assert!(run.stdout.contains("Execution failed"));
    assert!(run.stdout.contains("after 0 successful submissions"));
    assert!(run.stdout.contains("results are collected in 'summaries/summary_"));
}

#[test]
fn invalid_config_fails() {
    let workspace = Workspace::new("invalid-config");
    let config = workspace.write(
        "config.json",
        r#"{
            "instances_dir": "instances",
            "instance_names": ["small.json"],
            "time_limits": [],
            "buffer_wall_time": 300,
            "solvers": ["cpoptimizer"],
            "warmstarts": [false],
            "experiment_name": "empty"
        }"#,
    );

    let run = workspace.run(["submit", "--config", config.to_str().unwrap(), "--dry-run"]);

    assert_eq!(run.status.code(), Some(1));
    assert!(run.stdout.contains("'time_limits' must not be empty"));
    assert!(!workspace.path("summaries").exists());
}
