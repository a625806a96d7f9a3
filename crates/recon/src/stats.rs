use std::collections::{BTreeMap, BTreeSet};

use conseil_core::{Bulletin, Half};
use serde::Serialize;

/// Sorted, de-duplicated subject names across the cohort.
pub fn subjects(bulletins: &[Bulletin]) -> Vec<String> {
    bulletins
        .iter()
        .flat_map(|b| b.subjects.keys().cloned())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Write per-subject, per-half cohort min/max onto every bulletin holding the
/// subject. Must run after every subject table has been merged.
pub fn compute_minmax(bulletins: &mut [Bulletin]) {
    // (min, max) per subject and half
    let mut ranges: BTreeMap<(String, Half), (f64, f64)> = BTreeMap::new();

    for bulletin in bulletins.iter() {
        for (name, appreciation) in &bulletin.subjects {
            for half in Half::ALL {
                let Some(avg) = appreciation.half(half).average else {
                    continue;
                };
                ranges
                    .entry((name.clone(), half))
                    .and_modify(|(lo, hi)| {
                        *lo = lo.min(avg);
                        *hi = hi.max(avg);
                    })
                    .or_insert((avg, avg));
            }
        }
    }

    for bulletin in bulletins.iter_mut() {
        for (name, appreciation) in bulletin.subjects.iter_mut() {
            for half in Half::ALL {
                let range = ranges.get(&(name.clone(), half)).copied();
                let record = appreciation.half_mut(half);
                record.cohort_min = range.map(|(lo, _)| lo);
                record.cohort_max = range.map(|(_, hi)| hi);
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Summary
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CohortSummary {
    pub total_bulletins: usize,
    pub subjects: Vec<String>,
    pub general_comment_first_count: usize,
    pub general_comment_second_count: usize,
    pub per_subject: BTreeMap<String, SubjectSummary>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SubjectSummary {
    pub bulletin_count: usize,
    pub average_first_count: usize,
    pub average_second_count: usize,
    pub mean_first: Option<f64>,
    pub mean_second: Option<f64>,
}

pub fn summarize(bulletins: &[Bulletin]) -> CohortSummary {
    let subjects = subjects(bulletins);

    let mut per_subject = BTreeMap::new();
    for name in &subjects {
        let mut summary = SubjectSummary::default();
        let mut sums = [0.0_f64; 2];

        for appreciation in bulletins.iter().filter_map(|b| b.subjects.get(name)) {
            summary.bulletin_count += 1;
            if let Some(avg) = appreciation.first.average {
                summary.average_first_count += 1;
                sums[0] += avg;
            }
            if let Some(avg) = appreciation.second.average {
                summary.average_second_count += 1;
                sums[1] += avg;
            }
        }

        summary.mean_first = mean(sums[0], summary.average_first_count);
        summary.mean_second = mean(sums[1], summary.average_second_count);
        per_subject.insert(name.clone(), summary);
    }

    CohortSummary {
        total_bulletins: bulletins.len(),
        general_comment_first_count: count_general(bulletins, Half::First),
        general_comment_second_count: count_general(bulletins, Half::Second),
        subjects,
        per_subject,
    }
}

fn count_general(bulletins: &[Bulletin], half: Half) -> usize {
    bulletins
        .iter()
        .filter(|b| b.general_comment(half).is_some_and(|c| !c.trim().is_empty()))
        .count()
}

fn mean(sum: f64, count: usize) -> Option<f64> {
    if count == 0 {
        None
    } else {
        Some(sum / count as f64)
    }
}
