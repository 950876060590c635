//! Printing of tables in a boxed layout for the terminal.

use summary_format::Table;

/// Render a table with a header, drawing `+---+` borders around the header and the body.
/// Cells are centred in their column; missing cells are left blank.
///
/// ```
/// use biosched::table::render_pretty;
///
/// let rendered = render_pretty(
///     &["status", "objective"],
///     &[vec![Some("Optimal".to_owned()), Some("12.0".to_owned())]],
/// );
///
/// let expected = "\
/// +---------+-----------+
/// | status  | objective |
/// +---------+-----------+
/// | Optimal |   12.0    |
/// +---------+-----------+
/// ";
/// assert_eq!(rendered, expected);
/// ```
pub fn render_pretty(headers: &[impl AsRef<str>], rows: &[Vec<Option<String>>]) -> String {
    let cell_text = |row: &[Option<String>], column: usize| -> String {
        row.get(column).cloned().flatten().unwrap_or_default()
    };

    let widths = (0..headers.len())
        .map(|column| {
            rows.iter()
                .map(|row| cell_text(row, column).chars().count())
                .chain(std::iter::once(headers[column].as_ref().chars().count()))
                .max()
                .unwrap_or_default()
        })
        .collect::<Vec<_>>();

    let separator = {
        let mut line = String::from("+");
        for width in &widths {
            line.push_str(&"-".repeat(width + 2));
            line.push('+');
        }
        line.push('\n');
        line
    };

    let render_line = |cells: Vec<String>| -> String {
        let mut line = String::from("|");
        for (cell, width) in cells.iter().zip(&widths) {
            line.push(' ');
            line.push_str(&centre(cell, *width));
            line.push_str(" |");
        }
        line.push('\n');
        line
    };

    let mut rendered = separator.clone();
    rendered.push_str(&render_line(
        headers
            .iter()
            .map(|header| header.as_ref().to_owned())
            .collect(),
    ));
    rendered.push_str(&separator);

    for row in rows {
        rendered.push_str(&render_line(
            (0..headers.len())
                .map(|column| cell_text(row, column))
                .collect(),
        ));
    }

    if !rows.is_empty() {
        rendered.push_str(&separator);
    }

    rendered
}

/// Render a [`Table`] with [`render_pretty`].
pub fn render_table(table: &Table) -> String {
    render_pretty(table.columns(), table.rows())
}

fn centre(text: &str, width: usize) -> String {
    let padding = width.saturating_sub(text.chars().count());
    let left = padding / 2;
    let right = padding - left;
    format!("{}{text}{}", " ".repeat(left), " ".repeat(right))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_cells_are_blank() {
        let rendered = render_pretty(&["a", "b"], &[vec![Some("x".to_owned()), None]]);

        assert_eq!(
            rendered,
            "+---+---+\n| a | b |\n+---+---+\n| x |   |\n+---+---+\n"
        );
    }

    #[test]
    fn header_only_has_no_closing_line() {
        let rendered = render_pretty(&["column"], &[]);

        assert_eq!(rendered, "+--------+\n| column |\n+--------+\n");
    }

    #[test]
    fn wide_cells_widen_the_column() {
        let rendered = render_pretty(&["n"], &[vec![Some("12345".to_owned())]]);

        assert!(rendered.starts_with("+-------+\n|   n   |\n"));
    }

    #[test]
    fn odd_padding_goes_to_the_right() {
        assert_eq!(centre("ab", 5), " ab  ");
    }
}
