//! Combining the summary files of an experiment.

use std::fs::File;
use std::path::Path;
use std::path::PathBuf;

use log::debug;
use log::info;
use log::warn;
use summary_format::format_float;
use summary_format::reader::read_table;
use summary_format::reader::ReadError;
use summary_format::round_to;
use summary_format::writer::write_table;
use summary_format::Status;
use summary_format::Table;
use thiserror::Error;

/// The name of the combined file written into the summaries directory.
pub const COMBINED_FILE_NAME: &str = "combined_summaries.csv";

#[derive(Debug, Error)]
pub enum SummarizeError {
    #[error("folder not found or not a directory: {0}")]
    NotADirectory(PathBuf),

    #[error("failed to list '{path}': {source}")]
    List {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to write '{path}': {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// The result of [`summarize_dir`].
#[derive(Debug)]
pub struct SummarizeReport {
    /// The summary files found in the directory, in the order in which they were read.
    pub files: Vec<PathBuf>,
    /// The files which could not be read, with the reason.
    pub skipped: Vec<(PathBuf, ReadError)>,
    /// The concatenation of all readable files. `None` if no file was readable.
    pub combined: Option<Table>,
    /// Where the combined table was written.
    pub output_path: Option<PathBuf>,
}

/// The summary files directly inside `dir`: files whose name starts with `summary` and ends with
/// `.csv`, sorted by path.
pub fn find_summary_files(dir: &Path) -> Result<Vec<PathBuf>, SummarizeError> {
    let list_error = |source: std::io::Error| SummarizeError::List {
        path: dir.to_path_buf(),
        source,
    };

    let mut files = vec![];
    for entry in std::fs::read_dir(dir).map_err(list_error)? {
        let entry = entry.map_err(list_error)?;
        let path = entry.path();

        let is_summary = path
            .file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| name.starts_with("summary") && name.ends_with(".csv"));

        if is_summary && path.is_file() {
            files.push(path);
        }
    }

    files.sort();
    Ok(files)
}

/// Combine the summary files in `dir` into one table and write it to `output`, or to
/// [`COMBINED_FILE_NAME`] inside `dir` if no output is given.
///
/// Files which cannot be read are skipped with a warning. Finding no (readable) files is not an
/// error; nothing is written in that case.
pub fn summarize_dir(
    dir: &Path,
    output: Option<&Path>,
) -> Result<SummarizeReport, SummarizeError> {
    if !dir.is_dir() {
        return Err(SummarizeError::NotADirectory(dir.to_path_buf()));
    }

    let files = find_summary_files(dir)?;
    info!("Found {} summary files in {}", files.len(), dir.display());

    let mut report = SummarizeReport {
        files,
        skipped: vec![],
        combined: None,
        output_path: None,
    };

    if report.files.is_empty() {
        warn!("No CSV files starting with 'summary' found in the folder.");
        return Ok(report);
    }

    let mut tables = vec![];
    for path in &report.files {
        match File::open(path)
            .map_err(ReadError::from)
            .and_then(read_table)
        {
            Ok(table) => {
                debug!("Read {} rows from {}", table.len(), path.display());
                tables.push(table);
            }
            Err(error) => {
                warn!("Skipping {}: {error}", file_name(path));
                report.skipped.push((path.clone(), error));
            }
        }
    }

    if tables.is_empty() {
        warn!("No readable CSV files found.");
        return Ok(report);
    }

    let combined = Table::concat(tables);
    info!("The length of the combined table is {}.", combined.len());

    let output_path = output
        .map(Path::to_path_buf)
        .unwrap_or_else(|| dir.join(COMBINED_FILE_NAME));
    let write_error = |source: std::io::Error| SummarizeError::Write {
        path: output_path.clone(),
        source,
    };

    let file = File::create(&output_path).map_err(write_error)?;
    write_table(&combined, file).map_err(write_error)?;
    info!("Combined summaries written to {}", output_path.display());

    report.combined = Some(combined);
    report.output_path = Some(output_path);

    Ok(report)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Statistics over the runs sharing a solver, time limit and warm-start setting.
#[derive(Clone, Debug, PartialEq)]
pub struct GroupStats {
    pub solver: String,
    pub time_limit: String,
    pub warmstart: String,
    pub runs: usize,
    /// Runs with an `Optimal` status.
    pub optimal: usize,
    /// Runs which found a schedule.
    pub solved: usize,
    /// Runs which ended abnormally, see [`Status::is_failure`].
    pub failed: usize,
    pub mean_objective: Option<f64>,
    pub mean_runtime: Option<f64>,
    pub mean_gap: Option<f64>,
}

impl GroupStats {
    pub const COLUMNS: [&'static str; 10] = [
        "solver",
        "time_limit",
        "warmstart",
        "runs",
        "optimal",
        "solved",
        "failed",
        "mean_objective",
        "mean_runtime",
        "mean_gap",
    ];

    /// The statistics formatted for printing, in the order of [`GroupStats::COLUMNS`]. Means are
    /// rounded to three decimals.
    pub fn cells(&self) -> Vec<Option<String>> {
        let mean = |value: Option<f64>| value.map(|value| format_float(round_to(value, 3)));

        vec![
            Some(self.solver.clone()),
            Some(self.time_limit.clone()),
            Some(self.warmstart.clone()),
            Some(self.runs.to_string()),
            Some(self.optimal.to_string()),
            Some(self.solved.to_string()),
            Some(self.failed.to_string()),
            mean(self.mean_objective),
            mean(self.mean_runtime),
            mean(self.mean_gap),
        ]
    }
}

/// Running sums of a numeric column.
#[derive(Clone, Copy, Debug, Default)]
struct Mean {
    sum: f64,
    count: usize,
}

impl Mean {
    fn add(&mut self, value: Option<f64>) {
        if let Some(value) = value.filter(|value| value.is_finite()) {
            self.sum += value;
            self.count += 1;
        }
    }

    fn value(&self) -> Option<f64> {
        (self.count > 0).then(|| self.sum / self.count as f64)
    }
}

#[derive(Debug)]
struct Group {
    stats: GroupStats,
    objective: Mean,
    runtime: Mean,
    gap: Mean,
}

/// Group the rows of a combined table by solver, time limit and warm-start setting, in the order
/// in which each group first appears.
///
/// Missing key columns group as empty values. Cells which are not numbers do not count towards
/// the means.
pub fn aggregate(table: &Table) -> Vec<GroupStats> {
    let text = |row: usize, column: &str| table.get(row, column).unwrap_or_default().to_owned();
    let number = |row: usize, column: &str| {
        table
            .get(row, column)
            .and_then(|cell| cell.trim().parse::<f64>().ok())
    };

    let mut groups: Vec<Group> = vec![];

    for row in 0..table.len() {
        let key = (
            text(row, "solver"),
            text(row, "time_limit"),
            text(row, "warmstart"),
        );

        let position = groups.iter().position(|group| {
            group.stats.solver == key.0
                && group.stats.time_limit == key.1
                && group.stats.warmstart == key.2
        });
        let index = match position {
            Some(index) => index,
            None => {
                groups.push(Group {
                    stats: GroupStats {
                        solver: key.0,
                        time_limit: key.1,
                        warmstart: key.2,
                        runs: 0,
                        optimal: 0,
                        solved: 0,
                        failed: 0,
                        mean_objective: None,
                        mean_runtime: None,
                        mean_gap: None,
                    },
                    objective: Mean::default(),
                    runtime: Mean::default(),
                    gap: Mean::default(),
                });
                groups.len() - 1
            }
        };

        let group = &mut groups[index];
        let status = Status::parse(table.get(row, "status").unwrap_or_default());

        group.stats.runs += 1;
        if status == Status::Optimal {
            group.stats.optimal += 1;
        }
        if status.has_solution() {
            group.stats.solved += 1;
        }
        if status.is_failure() {
            group.stats.failed += 1;
        }

        group.objective.add(number(row, "objective"));
        group.runtime.add(number(row, "runtime"));
        group.gap.add(number(row, "gap"));
    }

    groups
        .into_iter()
        .map(|group| GroupStats {
            mean_objective: group.objective.value(),
            mean_runtime: group.runtime.value(),
            mean_gap: group.gap.value(),
            ..group.stats
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use summary_format::reader::read_records;
    use summary_format::SummaryRecord;

    use super::*;

    const HEADER: &str =
        "status,objective,runtime,warmstart_time,lower_bound,gap,time_limit,solver,instance_name,warmstart,warmstart_makespan\n";

    struct Scratch {
        dir: PathBuf,
    }

    impl Scratch {
        fn new() -> Scratch {
            let dir = std::env::temp_dir()
                .join(format!("biosched-summarize-{}", uuid::Uuid::new_v4().simple()));
            std::fs::create_dir_all(&dir).unwrap();
            Scratch { dir }
        }

        fn write(&self, name: &str, contents: &str) {
            std::fs::write(self.dir.join(name), contents).unwrap();
        }
    }

    impl Drop for Scratch {
        fn drop(&mut self) {
            let _ = std::fs::remove_dir_all(&self.dir);
        }
    }

    fn table(rows: &[&str]) -> Table {
        let mut csv = HEADER.to_owned();
        for row in rows {
            csv.push_str(row);
            csv.push('\n');
        }
        read_table(csv.as_bytes()).unwrap()
    }

    #[test]
    fn summary_files_are_combined_in_sorted_order() {
        let scratch = Scratch::new();
        scratch.write(
            "summary_b_TL60.0_Scpoptimizer_WFalse_2.csv",
            &format!("{HEADER}Feasible,120.0,60.0,0.0,100.0,20.0,60.0,cpoptimizer,b.json,False,\n"),
        );
        scratch.write(
            "summary_a_TL60.0_Scpoptimizer_WFalse_1.csv",
            &format!("{HEADER}Optimal,100.0,3.5,0.0,100.0,0.0,60.0,cpoptimizer,a.json,False,\n"),
        );
        scratch.write("notes.csv", "not,a,summary\n");
        scratch.write("summary.txt", "ignored");

        let report = summarize_dir(&scratch.dir, None).unwrap();

        assert_eq!(report.files.len(), 2);
        assert!(report.skipped.is_empty());
        let combined = report.combined.unwrap();
        assert_eq!(combined.get(0, "instance_name"), Some("a.json"));
        assert_eq!(combined.get(1, "instance_name"), Some("b.json"));

        let output_path = report.output_path.unwrap();
        assert_eq!(output_path, scratch.dir.join(COMBINED_FILE_NAME));
        let records = read_records(File::open(output_path).unwrap()).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].objective, Some(120.0));
    }

    #[test]
    fn unreadable_files_are_skipped() {
        let scratch = Scratch::new();
        scratch.write(
            "summary_1.csv",
            &format!("{HEADER}Optimal,100.0,3.5,0.0,100.0,0.0,60.0,cpoptimizer,a.json,False,\n"),
        );
        scratch.write("summary_2.csv", "status,objective\nOptimal\n");

        let report = summarize_dir(&scratch.dir, None).unwrap();

        assert_eq!(report.skipped.len(), 1);
        assert!(matches!(report.skipped[0].1, ReadError::FieldCount { .. }));
        assert_eq!(report.combined.map(|table| table.len()), Some(1));
    }

    #[test]
    fn empty_directory_is_not_an_error() {
        let scratch = Scratch::new();

        let report = summarize_dir(&scratch.dir, None).unwrap();

        assert!(report.files.is_empty());
        assert!(report.combined.is_none());
        assert!(!scratch.dir.join(COMBINED_FILE_NAME).exists());
    }

    #[test]
    fn missing_directory_is_an_error() {
        let scratch = Scratch::new();
        let missing = scratch.dir.join("missing");

        assert!(matches!(
            summarize_dir(&missing, None),
            Err(SummarizeError::NotADirectory(_))
        ));
    }

    #[test]
    fn output_path_can_be_chosen() {
        let scratch = Scratch::new();
        scratch.write("summary_1.csv", "status,solver\nOptimal,ortools\n");
        let output = scratch.dir.join("all.csv");

        let report = summarize_dir(&scratch.dir, Some(&output)).unwrap();

        assert_eq!(report.output_path, Some(output.clone()));
        assert_eq!(
            std::fs::read_to_string(output).unwrap(),
            "status,solver\nOptimal,ortools\n"
        );
    }

    #[test]
    fn rows_are_grouped_in_first_seen_order() {
        let table = table(&[
            "Optimal,100.0,3.0,0.0,100.0,0.0,60.0,ortools,a.json,False,",
            "Feasible,120.0,60.0,1.0,100.0,20.0,60.0,cpoptimizer,a.json,True,110.0",
            "Time-Limit-Exception,,,,,,60.0,ortools,b.json,False,",
            "Feasible,130.0,5.0,0.0,100.0,30.0,60.0,ortools,c.json,False,",
        ]);

        let stats = aggregate(&table);

        assert_eq!(stats.len(), 2);
        assert_eq!(
            stats[0],
            GroupStats {
                solver: "ortools".to_owned(),
                time_limit: "60.0".to_owned(),
                warmstart: "False".to_owned(),
                runs: 3,
                optimal: 1,
                solved: 2,
                failed: 1,
                mean_objective: Some(115.0),
                mean_runtime: Some(4.0),
                mean_gap: Some(15.0),
            }
        );
        assert_eq!(stats[1].solver, "cpoptimizer");
        assert_eq!(stats[1].runs, 1);
    }

    #[test]
    fn groups_without_values_have_no_means() {
        let mut table = Table::new(SummaryRecord::COLUMNS);
        table.push_row(
            SummaryRecord::failed(Status::MemoryException, 600.0, "ortools", "a.json", true)
                .cells()
                .to_vec(),
        );

        let stats = aggregate(&table);
        let cells = stats[0].cells();

        assert_eq!(stats[0].failed, 1);
        assert_eq!(stats[0].mean_objective, None);
        assert_eq!(cells[1], Some("600.0".to_owned()));
        assert_eq!(cells[7], None);
    }
}
