//! Output formatting utilities.

const COLUMN_WIDTHS: [usize; 3] = [16, 20, 36];

/// Formats a table row. Columns past the fixed widths are printed as-is.
pub fn format_row(cells: &[&str]) -> String {
    let mut row = String::new();
    for (i, cell) in cells.iter().enumerate() {
        match COLUMN_WIDTHS.get(i) {
            Some(width) if i + 1 < cells.len() => {
                row.push_str(&format!("{:<width$} ", truncate(cell, *width), width = *width));
            }
            _ => row.push_str(cell),
        }
    }
    row
}

/// Prints a table header.
pub fn print_header(columns: &[&str]) {
    let header = format_row(columns);
    println!("{}", header);
    println!("{}", "-".repeat(header.len().max(40)));
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
