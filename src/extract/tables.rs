//! Table extraction

use crate::extract::text::normalize_whitespace;
use scraper::{ElementRef, Html, Selector};
use serde::Serialize;

/// A table with at least one non-empty data row
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// Extracts every `<table>` in the document that has data
///
/// Headers come from the first row made of `<th>` cells. A data row is any
/// row with at least one `<td>` and one non-empty cell; tables without data
/// rows are dropped.
pub fn extract_tables(document: &Html) -> Vec<Table> {
    let (Ok(table_sel), Ok(tr_sel), Ok(th_sel), Ok(td_sel), Ok(cell_sel)) = (
        Selector::parse("table"),
        Selector::parse("tr"),
        Selector::parse("th"),
        Selector::parse("td"),
        Selector::parse("td, th"),
    ) else {
        return Vec::new();
    };

    let mut tables = Vec::new();

    for table in document.select(&table_sel) {
        let mut headers = Vec::new();
        let mut rows = Vec::new();

        for row in table.select(&tr_sel) {
            let has_data_cell = row.select(&td_sel).next().is_some();

            if !has_data_cell {
                if headers.is_empty() {
                    headers = row.select(&th_sel).map(cell_text).collect();
                }
                continue;
            }

            let cells: Vec<String> = row.select(&cell_sel).map(cell_text).collect();
            if cells.iter().any(|c| !c.is_empty()) {
                rows.push(cells);
            }
        }

        if !rows.is_empty() {
            tables.push(Table { headers, rows });
        }
    }

    tables
}

fn cell_text(cell: ElementRef<'_>) -> String {
    normalize_whitespace(&cell.text().collect::<Vec<_>>().join(" "))
}
