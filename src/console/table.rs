//! Plain-text tables for directory listings.

use crate::directory::{Contact, Room};

/// Cells longer than this are cut and suffixed with `...`.
pub const CELL_WIDTH: usize = 35;

pub fn truncate(value: &str) -> String {
    if value.chars().count() > CELL_WIDTH {
        let head: String = value.chars().take(CELL_WIDTH).collect();
        format!("{}...", head)
    } else {
        value.to_string()
    }
}

/// Render rows under a header, columns padded to their widest cell.
pub fn render(headers: &[&str], rows: &[Vec<String>]) -> String {
    let cells: Vec<Vec<String>> = rows
        .iter()
        .map(|row| row.iter().map(|cell| truncate(cell)).collect())
        .collect();

    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in &cells {
        for (i, cell) in row.iter().enumerate() {
            if let Some(width) = widths.get_mut(i) {
                *width = (*width).max(cell.chars().count());
            }
        }
    }

    let line = |values: Vec<&str>| -> String {
        values
            .iter()
            .zip(&widths)
            .map(|(value, width)| format!("{:<width$}", value, width = width))
            .collect::<Vec<_>>()
            .join(" | ")
            .trim_end()
            .to_string()
    };

    let mut out = Vec::with_capacity(cells.len() + 2);
    out.push(line(headers.to_vec()));
    out.push(
        widths
            .iter()
            .map(|w| "-".repeat(*w))
            .collect::<Vec<_>>()
            .join("-+-"),
    );
    for row in &cells {
        out.push(line(row.iter().map(String::as_str).collect()));
    }
    out.join("\n")
}

pub fn contacts(contacts: &[Contact]) -> String {
    let rows: Vec<Vec<String>> = contacts
        .iter()
        .map(|c| {
            vec![
                c.id.clone(),
                c.alias.clone().unwrap_or_default(),
                c.name.clone(),
            ]
        })
        .collect();
    render(&["id", "alias", "name"], &rows)
}

pub fn rooms(rooms: &[Room]) -> String {
    let rows: Vec<Vec<String>> = rooms
        .iter()
        .map(|r| vec![r.id.clone(), r.topic.clone()])
        .collect();
    render(&["id", "topic"], &rows)
}
