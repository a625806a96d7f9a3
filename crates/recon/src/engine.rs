use conseil_core::SourceRow;

use crate::aggregate::{build_roster, merge_subject};
use crate::config::{SourceLayout, SubjectColumns};
use crate::error::ReconError;
use crate::model::{CohortInput, CohortResult};
use crate::stats::{compute_minmax, summarize};
use crate::validate::validate;

/// Build, merge, compute statistics, validate. Returns bulletins + warnings.
pub fn run(layout: &SourceLayout, input: &CohortInput) -> CohortResult {
    let mut bulletins = build_roster(&input.roster, &layout.roster);
    log::info!(
        "roster: {} bulletin(s) from {} row(s)",
        bulletins.len(),
        input.roster.len()
    );

    let mut merges = Vec::with_capacity(input.subjects.len());
    for table in &input.subjects {
        let stats = merge_subject(&mut bulletins, table, &layout.subject);
        if stats.unmatched > 0 {
            log::warn!(
                "{}: {} row(s) did not match any roster student",
                stats.subject,
                stats.unmatched
            );
        }
        merges.push(stats);
    }

    compute_minmax(&mut bulletins);
    let warnings = validate(&bulletins);
    let summary = summarize(&bulletins);

    CohortResult {
        bulletins,
        merges,
        warnings,
        summary,
    }
}

/// Parse one delimited subject export into header-keyed rows.
///
/// The header row is required and must carry the student column. Cells are
/// trimmed; rows may have fewer fields than the header.
pub fn load_subject_rows(
    source_name: &str,
    csv_data: &str,
    columns: &SubjectColumns,
) -> Result<Vec<SourceRow>, ReconError> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(columns.delimiter as u8)
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(csv_data.as_bytes());

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| csv_error(source_name, e))?
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}').to_string())
        .collect();

    if !headers.iter().any(|h| h == &columns.student) {
        return Err(ReconError::MissingColumn {
            source_name: source_name.into(),
            column: columns.student.clone(),
        });
    }

    let mut rows = Vec::new();
    for (i, record) in reader.records().enumerate() {
        let record = record.map_err(|e| csv_error(source_name, e))?;
        // line 1 is the header
        let mut row = SourceRow::new(i + 2);
        for (header, value) in headers.iter().zip(record.iter()) {
            row.insert(header.as_str(), value);
        }
        rows.push(row);
    }

    log::debug!("{source_name}: {} row(s) loaded", rows.len());
    Ok(rows)
}

fn csv_error(source_name: &str, e: csv::Error) -> ReconError {
    ReconError::Csv {
        source_name: source_name.into(),
        message: e.to_string(),
    }
}
