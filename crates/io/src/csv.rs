// Subject table import

use std::io::Read;
use std::path::Path;

use conseil_recon::config::SubjectColumns;
use conseil_recon::engine::load_subject_rows;
use conseil_recon::SubjectTable;

use crate::error::SourceError;

/// Read one subject export. The subject is named after the file stem.
pub fn read_subject_file(path: &Path, columns: &SubjectColumns) -> Result<SubjectTable, SourceError> {
    let subject = subject_name(path);
    let content = read_file_as_utf8(path)?;
    let rows = load_subject_rows(&subject, &content, columns)?;
    Ok(SubjectTable::new(subject, rows))
}

/// "Mathématiques.csv" -> "Mathématiques"
pub fn subject_name(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Read file and convert to UTF-8 if needed (handles Windows-1252, Latin-1, etc.)
pub fn read_file_as_utf8(path: &Path) -> Result<String, SourceError> {
    let io_err = |source| SourceError::Io {
        path: path.to_path_buf(),
        source,
    };

    let mut file = std::fs::File::open(path).map_err(io_err)?;
    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes).map_err(io_err)?;

    // Try UTF-8 first; on failure, recover the buffer from the error
    match String::from_utf8(bytes) {
        Ok(s) => Ok(s),
        Err(e) => {
            let bytes = e.into_bytes();
            // Fall back to Windows-1252 (common for Excel-exported CSVs)
            log::debug!("{}: not UTF-8, decoding as Windows-1252", path.display());
            let (decoded, _, _) = encoding_rs::WINDOWS_1252.decode(&bytes);
            Ok(decoded.into_owned())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    const HEADER: &str =
        "Élève;H.Abs.;Moy. S2;App. A : Appréciations;Rappel de la période précédente : S1\n";

    #[test]
    fn test_read_subject_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("Physique-Chimie.csv");
        fs::write(&path, format!("{HEADER}\"DUPONT Alice\";1h00;13,25;Sérieuse;\n")).unwrap();

        let table = read_subject_file(&path, &SubjectColumns::default()).unwrap();
        assert_eq!(table.subject, "Physique-Chimie");
        assert_eq!(table.rows.len(), 1);
        assert_eq!(table.rows[0].get("Moy. S2"), Some("13,25"));
    }

    #[test]
    fn test_windows_1252_fallback() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("latin.csv");
        let (encoded, _, _) = encoding_rs::WINDOWS_1252.encode("Élève;Moy. S2\nDURAND Loïc;12\n");
        fs::write(&path, &encoded).unwrap();

        let content = read_file_as_utf8(&path).unwrap();
        assert!(content.starts_with("Élève"));
        assert!(content.contains("Loïc"));
    }

    #[test]
    fn test_missing_file() {
        let err = read_file_as_utf8(Path::new("/nonexistent/Maths.csv")).unwrap_err();
        assert!(matches!(err, SourceError::Io { .. }));
    }

    #[test]
    fn test_missing_student_column() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("SVT.csv");
        fs::write(&path, "Nom;Moy. S2\nX;10\n").unwrap();

        let err = read_subject_file(&path, &SubjectColumns::default()).unwrap_err();
        assert!(matches!(err, SourceError::Table(_)));
        assert!(err.to_string().contains("Élève"));
    }
}
