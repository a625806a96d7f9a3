// Directory-level processing: inspect, read, aggregate, validate, save

use std::path::{Path, PathBuf};

use conseil_core::Bulletin;
use conseil_recon::stats::CohortSummary;
use conseil_recon::{CohortInput, SourceLayout};

use crate::csv::{read_subject_file, subject_name};
use crate::directory::inspect_directory;
use crate::error::PipelineError;
use crate::json;
use crate::xlsx::read_roster;

#[derive(Debug, Clone)]
pub struct ProcessingReport {
    pub bulletins: Vec<Bulletin>,
    /// Subjects whose file was read and merged.
    pub subjects_merged: Vec<String>,
    /// Unreadable subject files plus data-quality findings.
    pub warnings: Vec<String>,
    pub summary: CohortSummary,
    pub output_file: Option<PathBuf>,
}

/// Build every bulletin from a source directory.
///
/// A subject file that cannot be read becomes a warning; the roster is
/// required.
pub fn process_directory(dir: &Path, layout: &SourceLayout) -> Result<ProcessingReport, PipelineError> {
    let inspection = inspect_directory(dir);
    if !inspection.is_valid() {
        return Err(PipelineError::InvalidDirectory(inspection.errors));
    }
    let Some(roster_path) = inspection.roster else {
        return Err(PipelineError::EmptyRoster);
    };

    let roster = read_roster(&roster_path, &layout.roster)?;
    if roster.is_empty() {
        return Err(PipelineError::EmptyRoster);
    }

    let mut warnings = Vec::new();
    let mut subjects = Vec::with_capacity(inspection.subject_files.len());
    for path in &inspection.subject_files {
        match read_subject_file(path, &layout.subject) {
            Ok(table) => subjects.push(table),
            Err(e) => {
                let name = subject_name(path);
                log::warn!("subject '{name}' skipped: {e}");
                warnings.push(format!("Erreur matière {name}: {e}"));
            }
        }
    }
    let subjects_merged = subjects.iter().map(|t| t.subject.clone()).collect();

    let result = conseil_recon::run(layout, &CohortInput { roster, subjects });
    warnings.extend(result.warnings.iter().map(ToString::to_string));

    log::info!(
        "{}: {} bulletin(s), {} warning(s)",
        dir.display(),
        result.bulletins.len(),
        warnings.len()
    );

    Ok(ProcessingReport {
        bulletins: result.bulletins,
        subjects_merged,
        warnings,
        summary: result.summary,
        output_file: None,
    })
}

/// [`process_directory`], then save the bulletins to `output`.
pub fn process_directory_to_json(
    dir: &Path,
    output: &Path,
    layout: &SourceLayout,
) -> Result<ProcessingReport, PipelineError> {
    let mut report = process_directory(dir, layout)?;
    json::save(&report.bulletins, output)?;
    report.output_file = Some(output.to_path_buf());
    Ok(report)
}

/// The bulletin of one student, by "LAST First" name.
pub fn process_single_bulletin(
    dir: &Path,
    full_name: &str,
    layout: &SourceLayout,
) -> Result<Bulletin, PipelineError> {
    let report = process_directory(dir, layout)?;
    report
        .bulletins
        .into_iter()
        .find(|b| b.student.full_name() == full_name.trim())
        .ok_or_else(|| PipelineError::StudentNotFound(full_name.to_string()))
}

// ---------------------------------------------------------------------------
// Preview
// ---------------------------------------------------------------------------

/// What a run would process, without merging anything.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DirectoryPreview {
    pub valid: bool,
    pub roster_found: bool,
    pub subjects: Vec<String>,
    pub estimated_bulletins: usize,
    pub errors: Vec<String>,
}

pub fn preview_directory(dir: &Path, layout: &SourceLayout) -> DirectoryPreview {
    let inspection = inspect_directory(dir);
    let mut preview = DirectoryPreview {
        valid: inspection.is_valid(),
        roster_found: inspection.roster.is_some(),
        subjects: inspection.subject_files.iter().map(|p| subject_name(p)).collect(),
        estimated_bulletins: 0,
        errors: inspection.errors,
    };

    if let Some(roster) = &inspection.roster {
        match read_roster(roster, &layout.roster) {
            Ok(rows) => preview.estimated_bulletins = rows.len(),
            Err(e) => preview.errors.push(format!("Erreur lecture roster: {e}")),
        }
    }
    preview.valid = preview.errors.is_empty();

    preview
}
