//! Plain-text rendering of catalog rows.

use bookdesk_core::BookRow;

/// Left-aligned columns separated by two spaces, with a header line.
pub fn render_books(rows: &[BookRow]) -> String {
    let mut widths = BookRow::COLUMNS.map(|c| c.chars().count());
    for row in rows {
        for (width, cell) in widths.iter_mut().zip(row.cells()) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let mut out = String::new();
    push_line(&mut out, BookRow::COLUMNS, &widths);
    for row in rows {
        push_line(&mut out, row.cells(), &widths);
    }
    out
}

fn push_line(out: &mut String, cells: [&str; 8], widths: &[usize; 8]) {
    let line: Vec<String> = cells
        .iter()
        .zip(widths)
        .map(|(cell, width)| format!("{cell:<width$}"))
        .collect();
    out.push_str(line.join("  ").trim_end());
    out.push('\n');
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn columns_line_up() {
        let rows = vec![BookRow {
            isbn: "1".to_string(),
            title: "A much longer title".to_string(),
            ..BookRow::default()
        }];
        let text = render_books(&rows);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("isbn  title                author"));
        assert!(lines[1].starts_with("1     A much longer title"));
    }

    #[test]
    fn empty_catalog_is_header_only() {
        assert_eq!(render_books(&[]).lines().count(), 1);
    }
}
