//! This crate contains abstractions for dealing with the summary files written after solving a
//! benchmark instance. A summary file is a CSV file with a header line and one line per solver
//! run, recording the outcome (status, objective, bounds, timings) together with the parameters
//! of the run.
//!
//! To read summary files see [`reader::read_table`] and [`reader::read_records`], and to write
//! them see [`writer::SummaryWriter`]. Combining several files into one is done on the level of
//! [`Table`]s, see [`Table::concat`].

mod record;
mod status;
mod table;

pub mod reader;
pub mod writer;

pub use record::*;
pub use status::*;
pub use table::*;
