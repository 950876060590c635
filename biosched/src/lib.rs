//! # biosched
//! Tooling for running the biomanufacturing scheduling benchmarks on a SLURM cluster.
//!
//! The scheduling problems themselves are solved by an external constraint programming backend;
//! this crate only orchestrates the runs. A typical experiment consists of three steps:
//! 1. An experiment [`Config`] lists the instances and the parameter values to try. The cartesian
//!    product of these values (see [`grid::expand`]) determines the runs, and
//!    [`submit::submit_experiment`] submits one batch job per run.
//! 2. Each batch job executes a single run through [`solve::solve`], which starts the backend
//!    under a time budget and writes a summary file with the outcome.
//! 3. Once all jobs are done, [`summarize::summarize_dir`] combines the summary files of the
//!    experiment and reports aggregate statistics.

pub mod config;
pub mod grid;
pub mod instance;
pub mod jobscript;
pub mod solve;
pub mod submit;
pub mod summarize;
pub mod table;

mod stopwatch;

pub use config::Config;
pub use stopwatch::Stopwatch;
pub use summary_format;
