use crate::SummaryRecord;

/// A rectangular collection of optional string cells with named columns.
///
/// Tables are the unit in which summary files are combined: files written by different versions
/// of the tooling may not have the same columns, so combining is done by column name rather than
/// by position.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<Option<String>>>,
}

impl Table {
    /// Create an empty table with the given columns.
    pub fn new(columns: impl IntoIterator<Item = impl Into<String>>) -> Table {
        Table {
            columns: columns.into_iter().map(Into::into).collect(),
            rows: vec![],
        }
    }

    /// Create a table with the [`SummaryRecord::COLUMNS`] and one row per record.
    pub fn from_records(records: &[SummaryRecord]) -> Table {
        let mut table = Table::new(SummaryRecord::COLUMNS);

        for record in records {
            table.rows.push(record.cells().into_iter().collect());
        }

        table
    }

    /// Add a row to the table.
    ///
    /// # Panics
    /// If the number of cells does not match the number of columns.
    pub fn push_row(&mut self, row: Vec<Option<String>>) {
        assert_eq!(
            row.len(),
            self.columns.len(),
            "row length should match the number of columns"
        );
        self.rows.push(row);
    }

    /// Concatenate tables, aligning their columns by name.
    ///
    /// The columns of the result are the union of all columns, in the order in which they are
    /// first encountered. Cells for columns that a source table does not have are empty.
    ///
    /// ```
    /// use summary_format::Table;
    ///
    /// let mut first = Table::new(["a", "b"]);
    /// first.push_row(vec![Some("1".to_owned()), Some("2".to_owned())]);
    /// let mut second = Table::new(["b", "c"]);
    /// second.push_row(vec![Some("3".to_owned()), Some("4".to_owned())]);
    ///
    /// let combined = Table::concat([first, second]);
    /// assert_eq!(combined.columns(), ["a", "b", "c"]);
    /// assert_eq!(combined.get(1, "a"), None);
    /// assert_eq!(combined.get(1, "b"), Some("3"));
    /// ```
    pub fn concat(tables: impl IntoIterator<Item = Table>) -> Table {
        let tables = tables.into_iter().collect::<Vec<_>>();

        let mut combined = Table::default();
        for table in &tables {
            for column in &table.columns {
                if !combined.columns.contains(column) {
                    combined.columns.push(column.clone());
                }
            }
        }

        for table in tables {
            let positions = combined
                .columns
                .iter()
                .map(|column| table.column(column))
                .collect::<Vec<_>>();

            for mut row in table.rows {
                let aligned = positions
                    .iter()
                    .map(|position| position.and_then(|index| row[index].take()))
                    .collect();
                combined.rows.push(aligned);
            }
        }

        combined
    }

    /// The index of the column with the given name.
    pub fn column(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|column| column == name)
    }

    /// The cell in row `row` of column `name`, if both exist and the cell is not empty.
    pub fn get(&self, row: usize, name: &str) -> Option<&str> {
        let index = self.column(name)?;
        self.rows.get(row)?.get(index)?.as_deref()
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Option<String>>] {
        &self.rows
    }

    /// The number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Status;

    fn cell(text: &str) -> Option<String> {
        Some(text.to_owned())
    }

    #[test]
    fn records_become_rows_in_column_order() {
        let record = SummaryRecord::failed(Status::Unknown, 30.0, "ortools", "x.json", false);
        let table = Table::from_records(&[record.clone(), record]);

        assert_eq!(table.len(), 2);
        assert_eq!(table.columns().len(), SummaryRecord::COLUMNS.len());
        assert_eq!(table.get(1, "solver"), Some("ortools"));
        assert_eq!(table.get(0, "objective"), None);
    }

    #[test]
    fn concat_of_identical_layouts_keeps_columns() {
        let mut first = Table::new(["x", "y"]);
        first.push_row(vec![cell("1"), cell("2")]);
        let mut second = Table::new(["x", "y"]);
        second.push_row(vec![cell("3"), None]);

        let combined = Table::concat([first, second]);

        assert_eq!(combined.columns(), ["x", "y"]);
        assert_eq!(
            combined.rows(),
            [vec![cell("1"), cell("2")], vec![cell("3"), None]]
        );
    }

    #[test]
    fn concat_reorders_columns_by_name() {
        let mut first = Table::new(["x", "y"]);
        first.push_row(vec![cell("1"), cell("2")]);
        let mut second = Table::new(["y", "x"]);
        second.push_row(vec![cell("4"), cell("3")]);

        let combined = Table::concat([first, second]);

        assert_eq!(combined.get(1, "x"), Some("3"));
        assert_eq!(combined.get(1, "y"), Some("4"));
    }

    #[test]
    fn concat_of_nothing_is_empty() {
        let combined = Table::concat(Vec::<Table>::new());

        assert!(combined.is_empty());
        assert!(combined.columns().is_empty());
    }

    #[test]
    #[should_panic]
    fn push_row_rejects_wrong_width() {
        let mut table = Table::new(["x"]);
        table.push_row(vec![None, None]);
    }
}
