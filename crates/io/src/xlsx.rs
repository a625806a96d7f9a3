// Roster workbook import

use std::path::Path;

use calamine::{open_workbook_auto, Data, Reader};
use conseil_core::SourceRow;
use conseil_recon::config::RosterColumns;

use crate::error::SourceError;

/// Read the first worksheet of a roster workbook as header-keyed rows.
///
/// The first row is the header and must carry the student column. Fully
/// empty rows are dropped.
pub fn read_roster(path: &Path, columns: &RosterColumns) -> Result<Vec<SourceRow>, SourceError> {
    let mut workbook = open_workbook_auto(path).map_err(|e| SourceError::Workbook {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    let sheet_name = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| SourceError::EmptyWorkbook {
            path: path.to_path_buf(),
        })?;

    let range = workbook
        .worksheet_range(&sheet_name)
        .map_err(|e| SourceError::Workbook {
            path: path.to_path_buf(),
            message: format!("cannot read sheet '{sheet_name}': {e}"),
        })?;

    let mut rows_iter = range.rows();
    let headers: Vec<String> = rows_iter
        .next()
        .map(|row| row.iter().map(|c| cell_to_string(c).trim().to_string()).collect())
        .unwrap_or_default();

    if !headers.iter().any(|h| h == &columns.student) {
        return Err(SourceError::MissingColumn {
            path: path.to_path_buf(),
            column: columns.student.clone(),
        });
    }

    // Range start offset (data may not begin at A1)
    let first_line = range.start().map(|(r, _)| r as usize + 1).unwrap_or(1);

    let mut rows = Vec::new();
    for (i, cells) in rows_iter.enumerate() {
        let mut row = SourceRow::new(first_line + i + 1);
        for (header, cell) in headers.iter().zip(cells.iter()) {
            if header.is_empty() {
                continue;
            }
            let value = cell_to_string(cell);
            if !value.is_empty() {
                row.insert(header.as_str(), value);
            }
        }
        if !row.fields.is_empty() {
            rows.push(row);
        }
    }

    log::info!("{}: {} roster row(s) from sheet '{sheet_name}'", path.display(), rows.len());
    Ok(rows)
}

fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::Float(n) => {
            // Format nicely: integers without decimals
            if n.fract() == 0.0 && n.abs() < 1e15 {
                format!("{}", *n as i64)
            } else {
                format!("{}", n)
            }
        }
        Data::Int(n) => n.to_string(),
        Data::Bool(b) => String::from(if *b { "TRUE" } else { "FALSE" }),
        Data::Error(e) => format!("#{:?}", e),
        Data::DateTime(dt) => format!("{}", dt.as_f64()),
        Data::DateTimeIso(s) | Data::DurationIso(s) => s.clone(),
    }
}
