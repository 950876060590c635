//! Runs the `biosched` binary for the integration tests.

#![allow(dead_code, reason = "not every test uses every helper")]

use std::fs::File;
use std::path::Path;
use std::path::PathBuf;
use std::process::Child;
use std::process::Command;
use std::process::ExitStatus;
use std::process::Stdio;
use std::time::Duration;
use std::time::Instant;

use wait_timeout::ChildExt;

const TEST_TIMEOUT: Duration = Duration::from_secs(60);

/// A fresh directory in which a test runs the binary.
#[derive(Debug)]
pub struct Workspace {
    pub root: PathBuf,
}

impl Workspace {
    pub fn new(test_name: &str) -> Workspace {
        let root = Path::new(env!("CARGO_TARGET_TMPDIR"))
            .join("biosched-tests")
            .join(format!("{test_name}-{}", uuid::Uuid::new_v4().simple()));
        std::fs::create_dir_all(&root).expect("Failed to create the test workspace.");

        Workspace { root }
    }

    /// Copy the fixture instances into `instances/` of the workspace.
    pub fn with_instances(self) -> Workspace {
        let target = self.root.join("instances");
        std::fs::create_dir_all(&target).expect("Failed to create the instance directory.");

        for entry in std::fs::read_dir(fixture("instances")).expect("Failed to list fixtures.") {
            let path = entry.expect("Failed to list fixtures.").path();
            let _ = std::fs::copy(&path, target.join(path.file_name().unwrap()))
                .expect("Failed to copy a fixture instance.");
        }

        self
    }

    pub fn path(&self, relative: impl AsRef<Path>) -> PathBuf {
        self.root.join(relative)
    }

    pub fn write(&self, relative: impl AsRef<Path>, contents: &str) -> PathBuf {
        let path = self.path(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("Failed to create a parent directory.");
        }
        std::fs::write(&path, contents).expect("Failed to write a test file.");
        path
    }

    /// Run the binary inside the workspace.
    pub fn run<'a>(&self, args: impl IntoIterator<Item = &'a str>) -> Run {
        self.start(args).wait()
    }

    /// Start the binary inside the workspace without waiting for it. On unix it runs in its own
    /// process group.
    pub fn start<'a>(&self, args: impl IntoIterator<Item = &'a str>) -> Running {
        let stdout_path = self.path("stdout.log");
        let stderr_path = self.path("stderr.log");

        let mut command = Command::new(env!("CARGO_BIN_EXE_biosched"));
        let _ = command
            .args(args)
            .current_dir(&self.root)
            .stdin(Stdio::null())
            .stdout(File::create(&stdout_path).expect("Failed to create the stdout file."))
            .stderr(File::create(&stderr_path).expect("Failed to create the stderr file."));

        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            let _ = command.process_group(0);
        }

        Running {
            child: command.spawn().expect("Failed to run biosched."),
            stdout_path,
            stderr_path,
        }
    }

    /// The files directly inside `relative` whose name starts with `prefix`, sorted.
    pub fn files_starting_with(&self, relative: impl AsRef<Path>, prefix: &str) -> Vec<PathBuf> {
        let mut files = std::fs::read_dir(self.path(relative))
            .expect("Failed to list the directory.")
            .map(|entry| entry.expect("Failed to list the directory.").path())
            .filter(|path| {
                path.file_name()
                    .and_then(|name| name.to_str())
                    .is_some_and(|name| name.starts_with(prefix))
            })
            .collect::<Vec<_>>();
        files.sort();
        files
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        if !std::thread::panicking() {
            let _ = std::fs::remove_dir_all(&self.root);
        }
    }
}

/// A started run of the binary.
#[derive(Debug)]
pub struct Running {
    child: Child,
    stdout_path: PathBuf,
    stderr_path: PathBuf,
}

impl Running {
    /// Wait until the standard output contains `needle`.
    pub fn wait_for_output(&self, needle: &str) {
        let started = Instant::now();
        while !self.stdout().contains(needle) {
            assert!(
                started.elapsed() < TEST_TIMEOUT,
                "biosched did not print '{needle}'\nstdout:\n{}",
                self.stdout()
            );
            std::thread::sleep(Duration::from_millis(50));
        }
    }

    /// Send `signal` (e.g. `TERM`) to every process in the process group of the binary.
    #[cfg(unix)]
    pub fn signal_group(&self, signal: &str) {
        let status = Command::new("kill")
            .arg(format!("-{signal}"))
            .arg("--")
            .arg(format!("-{}", self.child.id()))
            .status()
            .expect("Failed to run kill.");
        assert!(status.success(), "kill exited with {status}");
    }

    pub fn wait(mut self) -> Run {
        let status = match self.child.wait_timeout(TEST_TIMEOUT) {
            Ok(Some(status)) => status,
            Ok(None) => {
                let _ = self.child.kill();
                panic!("biosched took more than {} seconds", TEST_TIMEOUT.as_secs())
            }
            Err(e) => panic!("error waiting for biosched: {e}"),
        };

        Run {
            status,
            stdout: self.stdout(),
            stderr: std::fs::read_to_string(&self.stderr_path).expect("Failed to read stderr."),
        }
    }

    fn stdout(&self) -> String {
        std::fs::read_to_string(&self.stdout_path).expect("Failed to read stdout.")
    }
}

#[derive(Debug)]
pub struct Run {
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
}

impl Run {
    #[track_caller]
    pub fn assert_success(&self) -> &Run {
        assert!(
            self.status.success(),
            "biosched failed with {}\nstdout:\n{}\nstderr:\n{}",
            self.status,
            self.stdout,
            self.stderr
        );
        self
    }
}

/// The path of a file under `tests/`.
pub fn fixture(relative: impl AsRef<Path>) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join(relative)
}

/// The arguments selecting the fake shell backend.
pub fn fake_backend_args(mode: &str) -> Vec<String> {
    vec![
        "--backend".to_owned(),
        "sh".to_owned(),
        format!(
            "--backend-arg={}",
            fixture("backends/fake_solver.sh").display()
        ),
        format!("--backend-arg={mode}"),
    ]
}
