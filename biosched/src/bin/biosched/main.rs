mod result;

use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

use biosched::config::BackendCommand;
use biosched::instance::ProblemData;
use biosched::solve::solve;
use biosched::solve::OsSignal;
use biosched::solve::SolveOptions;
use biosched::submit::submit_experiment;
use biosched::submit::DryRun;
use biosched::submit::Sbatch;
use biosched::submit::SubmitOptions;
use biosched::summarize::aggregate;
use biosched::summarize::summarize_dir;
use biosched::summarize::GroupStats;
use biosched::summary_format::Table;
use biosched::table::render_pretty;
use biosched::table::render_table;
use biosched::Config;
use clap::Parser;
use clap::Subcommand;
use log::error;
use log::info;
use log::LevelFilter;
use result::BioschedError;
use result::BioschedResult;

#[derive(Debug, Parser)]
#[command(
    help_template = "\
{before-help}{name} {version}
Authors: {author}
About: {about}

{usage-heading}\n{tab}{usage}

{all-args}{after-help}
",
    author,
    version,
    about,
    arg_required_else_help = true
)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Log the progress of the command.
    #[arg(short = 'v', long, global = true)]
    verbose: bool,

    /// Log everything, including the output of the solver backend.
    #[arg(long, global = true)]
    debug: bool,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Submit one batch job per run of an experiment.
    Submit {
        /// The experiment configuration, a JSON file.
        #[arg(long)]
        config: PathBuf,

        /// Print the job scripts instead of submitting them.
        #[arg(long)]
        dry_run: bool,

        /// Run every file in the instance directory instead of the configured instance names.
        #[arg(long)]
        solve_dir: bool,

        /// The directory below which the experiment directory is created.
        #[arg(long, default_value = "summaries")]
        summaries_root: PathBuf,

        /// The program receiving the job scripts on its standard input.
        #[arg(long, default_value = "sbatch")]
        sbatch_program: String,
    },

    /// Run a single instance and write a summary file with the outcome.
    Solve {
        /// Name of the instance to solve, with or without the '.json' extension.
        #[arg(long)]
        instance_name: String,

        /// Directory containing the instance files.
        #[arg(long, default_value = "instances")]
        instances_dir: PathBuf,

        /// Solver time limit in seconds.
        #[arg(long, default_value_t = 60.0)]
        time_limit: f64,

        /// Number of worker threads used by the solver. The backend decides if left out.
        #[arg(long)]
        num_workers: Option<u32>,

        /// Warm-start the solver with an initial solution.
        #[arg(long, overrides_with = "no_warmstart")]
        warmstart: bool,

        /// Do not warm-start the solver (the default).
        #[arg(long, overrides_with = "warmstart")]
        no_warmstart: bool,

        /// Underlying solver name.
        #[arg(long, default_value = "cpoptimizer")]
        solver: String,

        /// Show the solver progress output, if supported by the backend.
        #[arg(long)]
        display: bool,

        /// Print the final result to stdout.
        #[arg(long)]
        print_result: bool,

        /// Directory for storing the summary file.
        #[arg(long, default_value = ".")]
        summary_dir: PathBuf,

        /// The solver backend program.
        #[arg(long, default_value = "biosched-backend")]
        backend: String,

        /// An argument passed to the backend before the run arguments. May be repeated.
        #[arg(long = "backend-arg", value_name = "ARG", allow_hyphen_values = true)]
        backend_args: Vec<String>,

        /// Seconds the backend may run past the time limit before it is killed.
        #[arg(long, default_value_t = 60)]
        kill_grace: u64,
    },

    /// Combine the summary files of an experiment.
    Summarize {
        /// Path to the summaries folder, e.g. 'summaries/summary_baseline_1759152789'.
        #[arg(long)]
        dir: PathBuf,

        /// Where to write the combined table. Defaults to 'combined_summaries.csv' in the
        /// summaries folder.
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Report the size of instances.
    Inspect {
        /// The instance files.
        #[arg(required = true)]
        instances: Vec<PathBuf>,
    },
}

fn configure_logging(verbose: bool, debug: bool) {
    let level_filter = if debug {
        LevelFilter::Debug
    } else if verbose {
        LevelFilter::Info
    } else {
        LevelFilter::Warn
    };

    env_logger::Builder::new()
        .format(move |buf, record| writeln!(buf, "[{}] {}", record.level(), record.args()))
        .filter_level(level_filter)
        .target(env_logger::Target::Stdout)
        .init();
    info!("Logging successfully configured");
}

fn main() {
    match run() {
        Ok(()) => {}
        Err(e) => {
            error!("Execution failed, error: {e}");
            std::process::exit(1);
        }
    }
}

fn run() -> BioschedResult<()> {
    let args = Args::parse();
    configure_logging(args.verbose, args.debug);

    match args.command {
        Command::Submit {
            config,
            dry_run,
            solve_dir,
            summaries_root,
            sbatch_program,
        } => {
            let config = Config::from_file(config)?;
            let options = SubmitOptions {
                solve_dir,
                summaries_root,
                ..Default::default()
            };

            let report = if dry_run {
                let stdout = std::io::stdout();
                let mut submitter = DryRun::new(stdout.lock());
                submit_experiment(&config, &options, &mut submitter)?
            } else {
                let mut submitter = Sbatch::new(sbatch_program);
                submit_experiment(&config, &options, &mut submitter)?
            };

            println!(
                "{} jobs {}.",
                report.submissions.len(),
                if dry_run { "generated" } else { "submitted" }
            );
            println!(
                "Once the jobs are done, combine the results with:\n    biosched summarize --dir \"{}\"",
                report.experiment_dir.path().display()
            );
        }

        Command::Solve {
            instance_name,
            instances_dir,
            time_limit,
            num_workers,
            warmstart,
            no_warmstart: _,
            solver,
            display,
            print_result,
            summary_dir,
            backend,
            backend_args,
            kill_grace,
        } => {
            let mut backend_command = BackendCommand::new(backend);
            backend_command.args = backend_args;

            let options = SolveOptions {
                instance_name,
                instances_dir,
                time_limit,
                num_workers,
                warmstart,
                solver,
                display,
                summary_dir,
                backend: backend_command,
                kill_grace: Duration::from_secs(kill_grace),
            };

            let termination = OsSignal::install().map_err(BioschedError::SignalHandlers)?;
            let mut backend = options.command_backend(termination);

            let report = solve(&options, &mut backend)?;

            if print_result {
                let table = Table::from_records(std::slice::from_ref(&report.record));
                print!("{}", render_table(&table));
            }
            println!("Summary written to: {}", report.summary_path.display());
        }

        Command::Summarize { dir, output } => {
            let report = summarize_dir(&dir, output.as_deref())?;
            println!("{}", report.files.len());

            if let Some(combined) = &report.combined {
                println!("The length of the combined table is {}.", combined.len());

                println!("\n=== Combined summaries ===");
                print!("{}", render_table(combined));

                let rows = aggregate(combined)
                    .iter()
                    .map(GroupStats::cells)
                    .collect::<Vec<_>>();
                println!("\n=== Per solver, time limit and warm-start ===");
                print!("{}", render_pretty(&GroupStats::COLUMNS, &rows));
            }
        }

        Command::Inspect { instances } => {
            for path in instances {
                let summary = ProblemData::from_file(&path)
                    .map_err(|source| BioschedError::invalid_instance(path.display(), source))?
                    .summary();

                let rows = summary
                    .rows()
                    .into_iter()
                    .map(|(label, value)| vec![Some(label), Some(value)])
                    .collect::<Vec<_>>();

                println!("{}: {summary}", path.display());
                print!("{}", render_pretty(&["property", "value"], &rows));
            }
        }
    }

    Ok(())
}
