use serde::{Deserialize, Serialize};

use crate::error::ReconError;

// ---------------------------------------------------------------------------
// Top-level layout
// ---------------------------------------------------------------------------

/// Where columns live in the roster and subject exports.
///
/// Every field has a default matching the school-management export, so an
/// empty TOML document yields a usable layout.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SourceLayout {
    #[serde(default)]
    pub roster: RosterColumns,
    #[serde(default)]
    pub subject: SubjectColumns,
}

impl SourceLayout {
    pub fn from_toml(input: &str) -> Result<Self, ReconError> {
        let layout: SourceLayout =
            toml::from_str(input).map_err(|e| ReconError::ConfigParse(e.to_string()))?;
        layout.validate()?;
        Ok(layout)
    }

    pub fn validate(&self) -> Result<(), ReconError> {
        let required = [
            ("roster.student", &self.roster.student),
            ("subject.student", &self.subject.student),
            ("subject.absence_hours", &self.subject.absence_hours),
            ("subject.average_second", &self.subject.average_second),
            ("subject.comment_second", &self.subject.comment_second),
            ("subject.recap_first", &self.subject.recap_first),
        ];
        for (key, value) in required {
            if value.trim().is_empty() {
                return Err(ReconError::ConfigValidation(format!("{key} must not be blank")));
            }
        }

        if self.roster.general_first.is_empty() || self.roster.general_second.is_empty() {
            return Err(ReconError::ConfigValidation(
                "general comment aliases must list at least one column".into(),
            ));
        }

        if !self.subject.delimiter.is_ascii() {
            return Err(ReconError::ConfigValidation(format!(
                "delimiter must be a single ASCII character, got '{}'",
                self.subject.delimiter
            )));
        }

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Roster
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RosterColumns {
    #[serde(default = "default_student_column")]
    pub student: String,
    /// Candidate columns for the half-1 general comment, first non-blank wins.
    #[serde(default = "default_general_first")]
    pub general_first: Vec<String>,
    #[serde(default = "default_general_second")]
    pub general_second: Vec<String>,
}

impl Default for RosterColumns {
    fn default() -> Self {
        Self {
            student: default_student_column(),
            general_first: default_general_first(),
            general_second: default_general_second(),
        }
    }
}

// ---------------------------------------------------------------------------
// Subject tables
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SubjectColumns {
    #[serde(default = "default_student_column")]
    pub student: String,
    #[serde(default = "default_absence")]
    pub absence_hours: String,
    #[serde(default = "default_average_second")]
    pub average_second: String,
    #[serde(default = "default_comment_second")]
    pub comment_second: String,
    #[serde(default = "default_recap_first")]
    pub recap_first: String,
    #[serde(default = "default_delimiter")]
    pub delimiter: char,
}

impl Default for SubjectColumns {
    fn default() -> Self {
        Self {
            student: default_student_column(),
            absence_hours: default_absence(),
            average_second: default_average_second(),
            comment_second: default_comment_second(),
            recap_first: default_recap_first(),
            delimiter: default_delimiter(),
        }
    }
}

fn default_student_column() -> String {
    "Élève".into()
}

fn default_general_first() -> Vec<String> {
    vec![
        "AppreciationGeneraleS1".into(),
        "Appreciation S1".into(),
        "AppreciationS1".into(),
    ]
}

fn default_general_second() -> Vec<String> {
    vec![
        "AppreciationGeneraleS2".into(),
        "Appreciation S2".into(),
        "AppreciationS2".into(),
    ]
}

fn default_absence() -> String {
    "H.Abs.".into()
}

fn default_average_second() -> String {
    "Moy. S2".into()
}

fn default_comment_second() -> String {
    "App. A : Appréciations".into()
}

fn default_recap_first() -> String {
    "Rappel de la période précédente : S1".into()
}

fn default_delimiter() -> char {
    ';'
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
