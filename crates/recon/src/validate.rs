use std::collections::HashSet;
use std::fmt;

use conseil_core::{Bulletin, Half};

pub const MAX_AVERAGE: f64 = 20.0;
pub const MAX_ABSENCE_HOURS: u32 = 100;

/// Advisory data-quality finding. Never blocks output.
#[derive(Debug, Clone, PartialEq)]
pub enum ConsistencyWarning {
    NoBulletins,
    DuplicateStudent { student: String },
    AverageOutOfRange { student: String, subject: String, half: Half, value: f64 },
    ExcessiveAbsence { student: String, subject: String, half: Half, hours: u32 },
}

impl fmt::Display for ConsistencyWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoBulletins => write!(f, "Aucun bulletin à valider"),
            Self::DuplicateStudent { student } => write!(f, "Élève en doublon: {student}"),
            Self::AverageOutOfRange { student, subject, half, value } => {
                write!(f, "{student} - {subject} {half}: Moyenne suspecte ({value})")
            }
            Self::ExcessiveAbsence { student, subject, half, hours } => {
                write!(f, "{student} - {subject} {half}: Heures d'absence élevées ({hours}h)")
            }
        }
    }
}

/// Check duplicates, averages outside 0-20 and absences over 100 hours.
pub fn validate(bulletins: &[Bulletin]) -> Vec<ConsistencyWarning> {
    if bulletins.is_empty() {
        return vec![ConsistencyWarning::NoBulletins];
    }

    let mut warnings = Vec::new();

    let mut seen = HashSet::new();
    for bulletin in bulletins {
        let name = bulletin.student.full_name();
        if !seen.insert(name.clone()) {
            warnings.push(ConsistencyWarning::DuplicateStudent { student: name });
        }
    }

    for bulletin in bulletins {
        let student = bulletin.student.full_name();
        for (subject, appreciation) in &bulletin.subjects {
            for half in Half::ALL {
                let record = appreciation.half(half);
                if let Some(value) = record.average {
                    if !(0.0..=MAX_AVERAGE).contains(&value) {
                        warnings.push(ConsistencyWarning::AverageOutOfRange {
                            student: student.clone(),
                            subject: subject.clone(),
                            half,
                            value,
                        });
                    }
                }
            }
            for half in Half::ALL {
                if let Some(hours) = appreciation.half(half).absence_hours {
                    if hours > MAX_ABSENCE_HOURS {
                        warnings.push(ConsistencyWarning::ExcessiveAbsence {
                            student: student.clone(),
                            subject: subject.clone(),
                            half,
                            hours,
                        });
                    }
                }
            }
        }
    }

    warnings
}
