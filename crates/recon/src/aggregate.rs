use std::collections::HashMap;

use conseil_core::{
    parse_decimal, parse_duration, split_recap_field, Bulletin, Half, SourceRow, Student,
    SubjectAppreciation,
};

use crate::config::{RosterColumns, SubjectColumns};
use crate::model::{MergeStats, SubjectTable};

/// One bulletin per roster row with a resolvable student name.
///
/// Rows without a name, or whose name has a single word, are skipped.
pub fn build_roster(rows: &[SourceRow], columns: &RosterColumns) -> Vec<Bulletin> {
    let mut bulletins = Vec::with_capacity(rows.len());

    for row in rows {
        let Some(full_name) = row.get(&columns.student) else {
            continue;
        };
        let Some(student) = Student::from_full_name(full_name) else {
            log::debug!("roster line {}: cannot split name '{full_name}'", row.line);
            continue;
        };

        let mut bulletin = Bulletin::new(student);
        bulletin.general_comment_first = row.first_of(&columns.general_first).map(str::to_string);
        bulletin.general_comment_second = row.first_of(&columns.general_second).map(str::to_string);
        bulletins.push(bulletin);
    }

    bulletins
}

/// Attach one subject table to the matching bulletins.
///
/// Rows are matched on the exact "LAST First" string; rows naming a student
/// absent from the roster are skipped. A matched row replaces any earlier
/// entry for the same subject.
pub fn merge_subject(
    bulletins: &mut [Bulletin],
    table: &SubjectTable,
    columns: &SubjectColumns,
) -> MergeStats {
    let index: HashMap<String, usize> = bulletins
        .iter()
        .enumerate()
        .map(|(i, b)| (b.student.full_name(), i))
        .collect();

    let mut stats = MergeStats {
        subject: table.subject.clone(),
        ..Default::default()
    };

    for row in &table.rows {
        let Some(raw_name) = row.get(&columns.student) else {
            continue;
        };
        let name = clean_student_cell(raw_name);

        let Some(&idx) = index.get(name) else {
            log::debug!("{}: line {}: no roster entry for '{name}'", table.subject, row.line);
            stats.unmatched += 1;
            continue;
        };

        bulletins[idx].put_subject(appreciation_from_row(&table.subject, row, columns));
        stats.matched += 1;
    }

    stats
}

fn clean_student_cell(raw: &str) -> &str {
    raw.trim().trim_matches('"').trim()
}

fn appreciation_from_row(subject: &str, row: &SourceRow, columns: &SubjectColumns) -> SubjectAppreciation {
    let mut appreciation = SubjectAppreciation::new(subject);

    let second = appreciation.half_mut(Half::Second);
    second.absence_hours = row.get(&columns.absence_hours).and_then(parse_duration);
    second.average = row.get(&columns.average_second).and_then(parse_decimal);
    second.comment = row.get(&columns.comment_second).map(str::to_string);

    if let Some(recap) = row.get(&columns.recap_first) {
        let fields = split_recap_field(recap);
        let first = appreciation.half_mut(Half::First);
        first.average = fields.average;
        first.absence_hours = fields.absence_hours;
        first.comment = fields.comment;
    }

    appreciation
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roster_row(line: usize, name: &str) -> SourceRow {
        let mut row = SourceRow::new(line);
        row.insert("Élève", name);
        row
    }

    fn subject_row(name: &str, abs: &str, avg: &str, comment: &str, recap: &str) -> SourceRow {
        [
            ("Élève", name),
            ("H.Abs.", abs),
            ("Moy. S2", avg),
            ("App. A : Appréciations", comment),
            ("Rappel de la période précédente : S1", recap),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn roster_skips_unresolvable_names() {
        let rows = vec![roster_row(2, "DUPONT Alice"), roster_row(3, "Cher"), roster_row(4, "")];
        let bulletins = build_roster(&rows, &RosterColumns::default());
        assert_eq!(bulletins.len(), 1);
        assert_eq!(bulletins[0].student, Student::new("DUPONT", "Alice"));
    }

    #[test]
    fn roster_general_comment_aliases() {
        let mut row = roster_row(2, "MARTIN Paul");
        row.insert("Appreciation S1", "Trimestre sérieux");
        row.insert("AppreciationGeneraleS2", "   ");
        row.insert("AppreciationS2", "Doit persévérer");

        let bulletins = build_roster(&[row], &RosterColumns::default());
        assert_eq!(bulletins[0].general_comment_first.as_deref(), Some("Trimestre sérieux"));
        assert_eq!(bulletins[0].general_comment_second.as_deref(), Some("Doit persévérer"));
    }

    #[test]
    fn merge_parses_every_column() {
        let mut bulletins = build_roster(&[roster_row(2, "DUPONT Alice")], &RosterColumns::default());
        let table = SubjectTable::new(
            "Mathématiques",
            vec![subject_row(
                "\"DUPONT Alice\"",
                "3h00",
                "14,50",
                "Bon travail",
                "Moy. : 12,00 - H.Abs : 1h30 - Peut mieux faire",
            )],
        );

        let stats = merge_subject(&mut bulletins, &table, &SubjectColumns::default());
        assert_eq!(stats.matched, 1);
        assert_eq!(stats.unmatched, 0);

        let maths = &bulletins[0].subjects["Mathématiques"];
        assert_eq!(maths.second.absence_hours, Some(3));
        assert_eq!(maths.second.average, Some(14.5));
        assert_eq!(maths.second.comment.as_deref(), Some("Bon travail"));
        assert_eq!(maths.first.average, Some(12.0));
        assert_eq!(maths.first.absence_hours, Some(1));
        assert_eq!(maths.first.comment.as_deref(), Some("Peut mieux faire"));
    }

    #[test]
    fn merge_skips_unknown_students() {
        let mut bulletins = build_roster(&[roster_row(2, "DUPONT Alice")], &RosterColumns::default());
        let table = SubjectTable::new("SVT", vec![subject_row("INCONNU Bob", "", "10", "", "")]);

        let stats = merge_subject(&mut bulletins, &table, &SubjectColumns::default());
        assert_eq!(stats.matched, 0);
        assert_eq!(stats.unmatched, 1);
        assert!(bulletins[0].subjects.is_empty());
    }

    #[test]
    fn merge_overwrites_previous_subject_entry() {
        let mut bulletins = build_roster(&[roster_row(2, "DUPONT Alice")], &RosterColumns::default());
        let columns = SubjectColumns::default();

        let first = SubjectTable::new("SVT", vec![subject_row("DUPONT Alice", "", "10", "Moyen", "")]);
        merge_subject(&mut bulletins, &first, &columns);
        let second = SubjectTable::new("SVT", vec![subject_row("DUPONT Alice", "", "16", "", "")]);
        merge_subject(&mut bulletins, &second, &columns);

        let svt = &bulletins[0].subjects["SVT"];
        assert_eq!(svt.second.average, Some(16.0));
        assert_eq!(svt.second.comment, None);
    }

    #[test]
    fn not_graded_average_is_none() {
        let mut bulletins = build_roster(&[roster_row(2, "DUPONT Alice")], &RosterColumns::default());
        let table = SubjectTable::new("EPS", vec![subject_row("DUPONT Alice", "", "N.Not", "", "")]);
        merge_subject(&mut bulletins, &table, &SubjectColumns::default());
        assert_eq!(bulletins[0].subjects["EPS"].second.average, None);
    }
}
