//! Implements the reading of summary files.
//!
//! Use [`read_table`] to read any CSV file into a [`Table`], and [`read_records`] to read a
//! summary file into typed [`SummaryRecord`]s.

mod error;
mod parser;

use std::io::Read;

pub use error::ReadError;
use parser::RecordParser;

use crate::parse_bool;
use crate::Status;
use crate::SummaryRecord;
use crate::Table;

/// Read a CSV source into a [`Table`].
///
/// The first record is the header. Every following record must have exactly as many fields as
/// the header.
///
/// # Example
/// ```
/// use summary_format::reader::read_table;
///
/// let source = "status,objective\nOptimal,12.0\nTime-Limit-Exception,\n";
/// let table = read_table(source.as_bytes()).expect("valid summary");
///
/// assert_eq!(table.len(), 2);
/// assert_eq!(table.get(0, "objective"), Some("12.0"));
/// assert_eq!(table.get(1, "objective"), None);
/// ```
pub fn read_table(mut source: impl Read) -> Result<Table, ReadError> {
    let mut bytes = vec![];
    let _ = source.read_to_end(&mut bytes)?;
    let text = String::from_utf8(bytes).map_err(|_| ReadError::InvalidUtf8)?;

    let mut parser = RecordParser::new(&text);

    let header = parser.next_record()?.ok_or(ReadError::MissingHeader)?;
    let columns = header
        .fields
        .into_iter()
        .map(|field| field.unwrap_or_default())
        .collect::<Vec<_>>();

    let mut table = Table::new(columns);
    let expected = table.columns().len();

    while let Some(record) = parser.next_record()? {
        if record.fields.len() != expected {
            return Err(ReadError::FieldCount {
                line_nr: record.line_nr,
                expected,
                actual: record.fields.len(),
            });
        }

        table.push_row(record.fields);
    }

    Ok(table)
}

/// Read a summary file into records.
///
/// The columns `status`, `time_limit`, `solver`, `instance_name` and `warmstart` must be
/// present; the other columns of [`SummaryRecord::COLUMNS`] are optional and taken to be empty
/// when absent. Columns that are not part of a record are ignored.
pub fn read_records(source: impl Read) -> Result<Vec<SummaryRecord>, ReadError> {
    let table = read_table(source)?;
    records_from_table(&table)
}

/// Convert the rows of a table into records. See [`read_records`] for the required columns.
pub fn records_from_table(table: &Table) -> Result<Vec<SummaryRecord>, ReadError> {
    for required in ["status", "time_limit", "solver", "instance_name", "warmstart"] {
        if table.column(required).is_none() {
            return Err(ReadError::MissingColumn(required));
        }
    }

    (0..table.len())
        .map(|row| -> Result<SummaryRecord, ReadError> {
            let float = |column: &'static str| -> Result<Option<f64>, ReadError> {
                table
                    .get(row, column)
                    .map(|value| {
                        value.trim().parse::<f64>().map_err(|_| ReadError::InvalidValue {
                            row,
                            column,
                            value: value.to_owned(),
                            expected: "a number",
                        })
                    })
                    .transpose()
            };

            let warmstart_cell = table.get(row, "warmstart").unwrap_or_default();
            let warmstart = parse_bool(warmstart_cell).ok_or_else(|| ReadError::InvalidValue {
                row,
                column: "warmstart",
                value: warmstart_cell.to_owned(),
                expected: "a boolean",
            })?;

            let time_limit = float("time_limit")?.ok_or(ReadError::InvalidValue {
                row,
                column: "time_limit",
                value: String::new(),
                expected: "a number",
            })?;

            Ok(SummaryRecord {
                status: Status::parse(table.get(row, "status").unwrap_or_default()),
                objective: float("objective")?,
                runtime: float("runtime")?,
                warmstart_time: float("warmstart_time")?,
                lower_bound: float("lower_bound")?,
                gap: float("gap")?,
                time_limit,
                solver: table.get(row, "solver").unwrap_or_default().to_owned(),
                instance_name: table
                    .get(row, "instance_name")
                    .unwrap_or_default()
                    .to_owned(),
                warmstart,
                warmstart_makespan: float("warmstart_makespan")?,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SUMMARY: &str = "\
status,objective,runtime,warmstart_time,lower_bound,gap,time_limit,solver,instance_name,warmstart,warmstart_makespan
Optimal,120.0,3.5,0.0,120.0,0.0,60.0,cpoptimizer,V100_NBA.json,False,
Feasible,130.0,60.1,2.25,100.0,30.0,60.0,ortools,V100_NBA.json,True,160.0
";

    #[test]
    fn summary_records_are_typed() {
        let records = read_records(SUMMARY.as_bytes()).unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].status, Status::Optimal);
        assert_eq!(records[0].warmstart_makespan, None);
        assert!(!records[0].warmstart);
        assert_eq!(records[1].solver, "ortools");
        assert_eq!(records[1].gap, Some(30.0));
        assert_eq!(records[1].warmstart_makespan, Some(160.0));
    }

    #[test]
    fn optional_columns_may_be_absent() {
        let source = "status,time_limit,solver,instance_name,warmstart\nUnknown,10,cbc,a,1\n";
        let records = read_records(source.as_bytes()).unwrap();

        assert_eq!(records[0].time_limit, 10.0);
        assert_eq!(records[0].objective, None);
        assert!(records[0].warmstart);
    }

    #[test]
    fn missing_required_column() {
        let source = "status,time_limit,solver,warmstart\nUnknown,10,cbc,1\n";
        assert!(matches!(
            read_records(source.as_bytes()),
            Err(ReadError::MissingColumn("instance_name"))
        ));
    }

    #[test]
    fn invalid_number_names_the_column() {
        let source = "status,objective,time_limit,solver,instance_name,warmstart\nOptimal,abc,10,cbc,a,True\n";
        match read_records(source.as_bytes()) {
            Err(ReadError::InvalidValue { row, column, .. }) => {
                assert_eq!(row, 0);
                assert_eq!(column, "objective");
            }
            other => panic!("expected an invalid value, got {other:?}"),
        }
    }

    #[test]
    fn ragged_rows_are_rejected() {
        let source = "a,b\n1,2,3\n";
        assert!(matches!(
            read_table(source.as_bytes()),
            Err(ReadError::FieldCount {
                line_nr: 2,
                expected: 2,
                actual: 3
            })
        ));
    }

    #[test]
    fn empty_source_has_no_header() {
        assert!(matches!(
            read_table("".as_bytes()),
            Err(ReadError::MissingHeader)
        ));
    }

    #[test]
    fn header_only_is_an_empty_table() {
        let table = read_table("a,b\n".as_bytes()).unwrap();
        assert!(table.is_empty());
        assert_eq!(table.columns(), ["a", "b"]);
    }
}
