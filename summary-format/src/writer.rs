//! Implements the writing of summary files.
//!
//! See [`SummaryWriter`] for more information on how to write summaries.

use std::io::BufWriter;
use std::io::Write;

use crate::SummaryRecord;
use crate::Table;

/// Abstraction for writing summary files.
///
/// # Example
/// ```
/// use summary_format::writer::SummaryWriter;
/// use summary_format::Status;
/// use summary_format::SummaryRecord;
///
/// let mut summary: Vec<u8> = Vec::new();
/// let mut writer = SummaryWriter::new(&mut summary);
///
/// let record = SummaryRecord::failed(
///     Status::TimeLimitException,
///     60.0,
///     "cpoptimizer",
///     "V100_NBA.json",
///     false,
/// );
/// writer.write_header().unwrap();
/// writer.write_record(&record).unwrap();
/// writer.finish().unwrap();
///
/// let expected = "
/// status,objective,runtime,warmstart_time,lower_bound,gap,time_limit,solver,instance_name,warmstart,warmstart_makespan
/// Time-Limit-Exception,,,,,,60.0,cpoptimizer,V100_NBA.json,False,
/// ";
/// assert_eq!(std::str::from_utf8(&summary).unwrap(), expected.trim_start());
/// ```
#[derive(Debug)]
pub struct SummaryWriter<W: Write> {
    writer: BufWriter<W>,
}

impl<W: Write> SummaryWriter<W> {
    /// Create a new summary writer which writes to an underlying sink implementing [`Write`].
    pub fn new(writer: W) -> Self {
        SummaryWriter {
            writer: BufWriter::new(writer),
        }
    }

    /// Write the header line with the [`SummaryRecord::COLUMNS`].
    pub fn write_header(&mut self) -> std::io::Result<()> {
        self.write_row(SummaryRecord::COLUMNS.map(Some))
    }

    /// Write a single record as a line.
    pub fn write_record(&mut self, record: &SummaryRecord) -> std::io::Result<()> {
        let cells = record.cells();
        self.write_row(cells.iter().map(Option::as_deref))
    }

    /// Write a line of cells. Missing cells are written as empty fields.
    ///
    /// A row consisting of a single empty cell is written as `""`, as an empty line would not
    /// be read back as a row.
    pub fn write_row<'a>(
        &mut self,
        cells: impl IntoIterator<Item = Option<&'a str>>,
    ) -> std::io::Result<()> {
        let mut num_cells = 0;
        let mut all_empty = true;

        for (index, cell) in cells.into_iter().enumerate() {
            num_cells += 1;
            if index > 0 {
                write!(self.writer, ",")?;
            }

            if let Some(cell) = cell.filter(|cell| !cell.is_empty()) {
                all_empty = false;
                write_field(&mut self.writer, cell)?;
            }
        }

        if num_cells == 1 && all_empty {
            write!(self.writer, "\"\"")?;
        }

        writeln!(self.writer)
    }

    /// Flush the buffered output and return the underlying sink.
    pub fn finish(self) -> std::io::Result<W> {
        self.writer.into_inner().map_err(|error| error.into_error())
    }
}

/// Write a complete table, header included.
pub fn write_table(table: &Table, writer: impl Write) -> std::io::Result<()> {
    let mut writer = SummaryWriter::new(writer);

    writer.write_row(table.columns().iter().map(|column| Some(column.as_str())))?;
    for row in table.rows() {
        writer.write_row(row.iter().map(Option::as_deref))?;
    }

    let _ = writer.finish()?;
    Ok(())
}

fn write_field(writer: &mut impl Write, field: &str) -> std::io::Result<()> {
    if field.contains([',', '"', '\r', '\n']) {
        write!(writer, "\"{}\"", field.replace('"', "\"\""))
    } else {
        write!(writer, "{field}")
    }
}
