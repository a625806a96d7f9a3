use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Student
// ---------------------------------------------------------------------------

/// A student identified by the exact (last name, first name) pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Student {
    pub last_name: String,
    pub first_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class_label: Option<String>,
}

impl Student {
    pub fn new(last_name: impl Into<String>, first_name: impl Into<String>) -> Self {
        Self {
            last_name: last_name.into(),
            first_name: first_name.into(),
            class_label: None,
        }
    }

    /// Split a "LASTNAME Firstname" token.
    ///
    /// Words whose cased characters are all uppercase form the last name, the
    /// remaining words the first name. When no word is uppercase, the first
    /// word is taken as the last name. Fewer than two words is unresolvable.
    pub fn from_full_name(full_name: &str) -> Option<Self> {
        let parts: Vec<&str> = full_name.split_whitespace().collect();
        if parts.len() < 2 {
            return None;
        }

        let (mut last, mut first): (Vec<&str>, Vec<&str>) =
            parts.iter().copied().partition(|part| is_upper_word(part));

        if last.is_empty() {
            last = vec![parts[0]];
            first = parts[1..].to_vec();
        }

        Some(Self::new(last.join(" "), first.join(" ")))
    }

    /// "LAST First", the key subject tables are matched against.
    pub fn full_name(&self) -> String {
        format!("{} {}", self.last_name, self.first_name)
    }

    pub fn with_class_label(mut self, label: impl Into<String>) -> Self {
        self.class_label = Some(label.into());
        self
    }
}

impl fmt::Display for Student {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.last_name, self.first_name)
    }
}

/// At least one cased character, and every cased character uppercase.
fn is_upper_word(word: &str) -> bool {
    let mut has_cased = false;
    for c in word.chars() {
        if c.is_lowercase() {
            return false;
        }
        if c.is_uppercase() {
            has_cased = true;
        }
    }
    has_cased
}

// ---------------------------------------------------------------------------
// Half-year
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Half {
    First,
    Second,
}

impl Half {
    pub const ALL: [Half; 2] = [Half::First, Half::Second];

    /// Suffix used by exported column and field names ("S1" / "S2").
    pub fn suffix(&self) -> &'static str {
        match self {
            Self::First => "S1",
            Self::Second => "S2",
        }
    }
}

impl fmt::Display for Half {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.suffix())
    }
}

// ---------------------------------------------------------------------------
// Subject appreciation
// ---------------------------------------------------------------------------

/// Per-half figures for one subject.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HalfRecord {
    pub average: Option<f64>,
    pub absence_hours: Option<u32>,
    pub comment: Option<String>,
    /// Written only by cohort statistics.
    pub cohort_min: Option<f64>,
    pub cohort_max: Option<f64>,
}

impl HalfRecord {
    pub fn is_empty(&self) -> bool {
        self.average.is_none()
            && self.absence_hours.is_none()
            && self.comment.is_none()
            && self.cohort_min.is_none()
            && self.cohort_max.is_none()
    }

    /// The comment, if present and not blank.
    pub fn comment_text(&self) -> Option<&str> {
        self.comment.as_deref().filter(|c| !c.trim().is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubjectAppreciation {
    pub subject: String,
    pub first: HalfRecord,
    pub second: HalfRecord,
}

impl SubjectAppreciation {
    pub fn new(subject: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            first: HalfRecord::default(),
            second: HalfRecord::default(),
        }
    }

    pub fn half(&self, half: Half) -> &HalfRecord {
        match half {
            Half::First => &self.first,
            Half::Second => &self.second,
        }
    }

    pub fn half_mut(&mut self, half: Half) -> &mut HalfRecord {
        match half {
            Half::First => &mut self.first,
            Half::Second => &mut self.second,
        }
    }

    /// Copy with one half's comment replaced.
    pub fn with_comment(&self, half: Half, comment: Option<String>) -> Self {
        let mut updated = self.clone();
        updated.half_mut(half).comment = comment;
        updated
    }
}

// ---------------------------------------------------------------------------
// Bulletin
// ---------------------------------------------------------------------------

/// One student's consolidated record. Subjects are keyed by name, in order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bulletin {
    pub student: Student,
    pub subjects: BTreeMap<String, SubjectAppreciation>,
    pub general_comment_first: Option<String>,
    pub general_comment_second: Option<String>,
}

impl Bulletin {
    pub fn new(student: Student) -> Self {
        Self {
            student,
            subjects: BTreeMap::new(),
            general_comment_first: None,
            general_comment_second: None,
        }
    }

    pub fn general_comment(&self, half: Half) -> Option<&str> {
        match half {
            Half::First => self.general_comment_first.as_deref(),
            Half::Second => self.general_comment_second.as_deref(),
        }
    }

    pub fn set_general_comment(&mut self, half: Half, comment: Option<String>) {
        match half {
            Half::First => self.general_comment_first = comment,
            Half::Second => self.general_comment_second = comment,
        }
    }

    /// Insert or replace the entry for `appreciation.subject`.
    pub fn put_subject(&mut self, appreciation: SubjectAppreciation) {
        self.subjects.insert(appreciation.subject.clone(), appreciation);
    }

    /// Non-blank subject comments for one half, in subject order.
    pub fn subject_comments(&self, half: Half) -> Vec<(&str, &str)> {
        self.subjects
            .values()
            .filter_map(|s| s.half(half).comment_text().map(|c| (s.subject.as_str(), c)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_last_then_first() {
        let s = Student::from_full_name("DUPONT Alice").unwrap();
        assert_eq!(s.last_name, "DUPONT");
        assert_eq!(s.first_name, "Alice");
        assert_eq!(s.full_name(), "DUPONT Alice");
    }

    #[test]
    fn split_compound_names() {
        let s = Student::from_full_name("  DE LA FONTAINE Jean-Marc Louis ").unwrap();
        assert_eq!(s.last_name, "DE LA FONTAINE");
        assert_eq!(s.first_name, "Jean-Marc Louis");
    }

    #[test]
    fn split_accented_and_apostrophe() {
        let s = Student::from_full_name("D'ARC Éloïse").unwrap();
        assert_eq!(s.last_name, "D'ARC");
        assert_eq!(s.first_name, "Éloïse");
    }

    #[test]
    fn split_without_uppercase_word_uses_first_token() {
        let s = Student::from_full_name("Dupont Alice Marie").unwrap();
        assert_eq!(s.last_name, "Dupont");
        assert_eq!(s.first_name, "Alice Marie");
    }

    #[test]
    fn single_token_is_unresolvable() {
        assert!(Student::from_full_name("DUPONT").is_none());
        assert!(Student::from_full_name("   ").is_none());
        assert!(Student::from_full_name("").is_none());
    }

    #[test]
    fn digits_are_not_uppercase() {
        assert!(!is_upper_word("123"));
        assert!(is_upper_word("A1"));
        assert!(!is_upper_word("Alice"));
    }

    #[test]
    fn put_subject_replaces_existing() {
        let mut b = Bulletin::new(Student::new("DUPONT", "Alice"));
        let mut first = SubjectAppreciation::new("Maths");
        first.second.average = Some(12.0);
        b.put_subject(first);

        let mut second = SubjectAppreciation::new("Maths");
        second.second.average = Some(15.0);
        b.put_subject(second);

        assert_eq!(b.subjects.len(), 1);
        assert_eq!(b.subjects["Maths"].second.average, Some(15.0));
    }

    #[test]
    fn subject_comments_skip_blank() {
        let mut b = Bulletin::new(Student::new("DUPONT", "Alice"));
        b.put_subject(SubjectAppreciation::new("Anglais").with_comment(Half::Second, Some("Bien".into())));
        b.put_subject(SubjectAppreciation::new("Maths").with_comment(Half::Second, Some("   ".into())));
        b.put_subject(SubjectAppreciation::new("SVT"));

        assert_eq!(b.subject_comments(Half::Second), vec![("Anglais", "Bien")]);
        assert!(b.subject_comments(Half::First).is_empty());
    }
}
