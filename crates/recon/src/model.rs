use conseil_core::{Bulletin, SourceRow};

use crate::stats::CohortSummary;
use crate::validate::ConsistencyWarning;

/// Rows of one subject export, named after the subject.
#[derive(Debug, Clone, Default)]
pub struct SubjectTable {
    pub subject: String,
    pub rows: Vec<SourceRow>,
}

impl SubjectTable {
    pub fn new(subject: impl Into<String>, rows: Vec<SourceRow>) -> Self {
        Self {
            subject: subject.into(),
            rows,
        }
    }
}

/// Everything the engine needs: the roster plus each subject table.
#[derive(Debug, Clone, Default)]
pub struct CohortInput {
    pub roster: Vec<SourceRow>,
    pub subjects: Vec<SubjectTable>,
}

/// Outcome of merging one subject table into the roster.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeStats {
    pub subject: String,
    pub matched: usize,
    pub unmatched: usize,
}

#[derive(Debug, Clone)]
pub struct CohortResult {
    pub bulletins: Vec<Bulletin>,
    pub merges: Vec<MergeStats>,
    pub warnings: Vec<ConsistencyWarning>,
    pub summary: CohortSummary,
}
