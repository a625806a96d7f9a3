// Source directory layout: one roster workbook plus one CSV per subject

use std::path::{Path, PathBuf};

use crate::ROSTER_FILE_NAME;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DirectoryInspection {
    pub roster: Option<PathBuf>,
    /// Subject exports, sorted by path.
    pub subject_files: Vec<PathBuf>,
    pub errors: Vec<String>,
}

impl DirectoryInspection {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Locate the roster and the subject exports in `dir`.
///
/// Problems are collected, not returned as errors, so a caller can show all
/// of them at once.
pub fn inspect_directory(dir: &Path) -> DirectoryInspection {
    let mut inspection = DirectoryInspection::default();

    if !dir.is_dir() {
        inspection
            .errors
            .push(format!("Répertoire non trouvé: {}", dir.display()));
        return inspection;
    }

    let roster = dir.join(ROSTER_FILE_NAME);
    if roster.is_file() {
        inspection.roster = Some(roster);
    } else {
        inspection
            .errors
            .push(format!("Fichier {ROSTER_FILE_NAME} manquant"));
    }

    match list_subject_files(dir) {
        Ok(files) if files.is_empty() => {
            inspection
                .errors
                .push("Aucun fichier CSV de matière trouvé".into());
        }
        Ok(files) => inspection.subject_files = files,
        Err(e) => inspection
            .errors
            .push(format!("Lecture de {} impossible: {e}", dir.display())),
    }

    inspection
}

fn list_subject_files(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        let is_csv = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));
        if is_csv && path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}
