// Bulletin JSON export/import
//
// Field names follow the school-side consumer: French keys, one object per
// student, absent values omitted rather than written as null.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use conseil_core::{parse_decimal, parse_duration, Bulletin, HalfRecord, Student, SubjectAppreciation};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::error::SerializeError;

/// Marker key of an optional leading metadata element.
pub const METADATA_KEY: &str = "_metadata";

// ---------------------------------------------------------------------------
// Wire records
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, Deserialize)]
struct BulletinRecord {
    #[serde(rename = "Nom")]
    last_name: String,
    #[serde(rename = "Prenom")]
    first_name: String,
    #[serde(
        rename = "AppreciationGeneraleS1",
        default,
        deserialize_with = "lenient_text",
        skip_serializing_if = "Option::is_none"
    )]
    general_first: Option<String>,
    #[serde(
        rename = "AppreciationGeneraleS2",
        default,
        deserialize_with = "lenient_text",
        skip_serializing_if = "Option::is_none"
    )]
    general_second: Option<String>,
    #[serde(rename = "Matieres", default, skip_serializing_if = "BTreeMap::is_empty")]
    subjects: BTreeMap<String, SubjectRecord>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct SubjectRecord {
    #[serde(default, deserialize_with = "lenient_hours", skip_serializing_if = "Option::is_none")]
    heures_absence_s1: Option<u32>,
    #[serde(default, deserialize_with = "lenient_hours", skip_serializing_if = "Option::is_none")]
    heures_absence_s2: Option<u32>,
    #[serde(default, deserialize_with = "lenient_decimal", skip_serializing_if = "Option::is_none")]
    moyenne_s1: Option<f64>,
    #[serde(default, deserialize_with = "lenient_decimal", skip_serializing_if = "Option::is_none")]
    moyenne_s2: Option<f64>,
    #[serde(default, deserialize_with = "lenient_decimal", skip_serializing_if = "Option::is_none")]
    moyenne_s1_max: Option<f64>,
    #[serde(default, deserialize_with = "lenient_decimal", skip_serializing_if = "Option::is_none")]
    moyenne_s1_min: Option<f64>,
    #[serde(default, deserialize_with = "lenient_decimal", skip_serializing_if = "Option::is_none")]
    moyenne_s2_max: Option<f64>,
    #[serde(default, deserialize_with = "lenient_decimal", skip_serializing_if = "Option::is_none")]
    moyenne_s2_min: Option<f64>,
    #[serde(default, deserialize_with = "lenient_text", skip_serializing_if = "Option::is_none")]
    appreciation_s1: Option<String>,
    #[serde(default, deserialize_with = "lenient_text", skip_serializing_if = "Option::is_none")]
    appreciation_s2: Option<String>,
}

// Hand-edited files carry "3.0" hours, numbers as strings and the like.
// Such scalars are read through the same parsers as the CSV cells; anything
// still unreadable becomes None instead of dropping the student.

const HOURS_FIELDS: [&str; 2] = ["HeuresAbsenceS1", "HeuresAbsenceS2"];
const DECIMAL_FIELDS: [&str; 6] = [
    "MoyenneS1",
    "MoyenneS2",
    "MoyenneS1Max",
    "MoyenneS1Min",
    "MoyenneS2Max",
    "MoyenneS2Min",
];
const TEXT_FIELDS: [&str; 2] = ["AppreciationS1", "AppreciationS2"];

fn hours_from(value: &Value) -> Option<u32> {
    match value {
        Value::Number(n) => parse_duration(&n.to_string()),
        Value::String(s) => parse_duration(s),
        _ => None,
    }
}

fn decimal_from(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => parse_decimal(s),
        _ => None,
    }
}

fn text_from(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn lenient_hours<'de, D: Deserializer<'de>>(d: D) -> Result<Option<u32>, D::Error> {
    Ok(Option::<Value>::deserialize(d)?.as_ref().and_then(hours_from))
}

fn lenient_decimal<'de, D: Deserializer<'de>>(d: D) -> Result<Option<f64>, D::Error> {
    Ok(Option::<Value>::deserialize(d)?.as_ref().and_then(decimal_from))
}

fn lenient_text<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    Ok(Option::<Value>::deserialize(d)?.as_ref().and_then(text_from))
}

/// How a subject scalar will be read, when it is not already canonical.
fn scalar_note(field: &str, value: &Value) -> Option<&'static str> {
    if value.is_null() {
        return None;
    }
    let (canonical, readable) = if HOURS_FIELDS.contains(&field) {
        (
            value.as_u64().is_some_and(|v| u32::try_from(v).is_ok()),
            hours_from(value).is_some(),
        )
    } else if DECIMAL_FIELDS.contains(&field) {
        (value.is_number(), decimal_from(value).is_some())
    } else if TEXT_FIELDS.contains(&field) {
        (value.is_string(), text_from(value).is_some())
    } else {
        return None;
    };

    match (canonical, readable) {
        (true, _) => None,
        (false, true) => Some("converti"),
        (false, false) => Some("illisible, ignoré"),
    }
}

impl From<&Bulletin> for BulletinRecord {
    fn from(b: &Bulletin) -> Self {
        Self {
            last_name: b.student.last_name.clone(),
            first_name: b.student.first_name.clone(),
            general_first: b.general_comment_first.clone(),
            general_second: b.general_comment_second.clone(),
            subjects: b
                .subjects
                .iter()
                .map(|(name, a)| (name.clone(), SubjectRecord::from(a)))
                .collect(),
        }
    }
}

impl From<&SubjectAppreciation> for SubjectRecord {
    fn from(a: &SubjectAppreciation) -> Self {
        Self {
            heures_absence_s1: a.first.absence_hours,
            heures_absence_s2: a.second.absence_hours,
            moyenne_s1: a.first.average,
            moyenne_s2: a.second.average,
            moyenne_s1_max: a.first.cohort_max,
            moyenne_s1_min: a.first.cohort_min,
            moyenne_s2_max: a.second.cohort_max,
            moyenne_s2_min: a.second.cohort_min,
            appreciation_s1: a.first.comment.clone(),
            appreciation_s2: a.second.comment.clone(),
        }
    }
}

impl BulletinRecord {
    fn into_bulletin(self) -> Bulletin {
        let mut bulletin = Bulletin::new(Student::new(self.last_name, self.first_name));
        bulletin.general_comment_first = self.general_first;
        bulletin.general_comment_second = self.general_second;
        for (name, record) in self.subjects {
            bulletin.put_subject(record.into_appreciation(name));
        }
        bulletin
    }
}

impl SubjectRecord {
    fn into_appreciation(self, subject: String) -> SubjectAppreciation {
        SubjectAppreciation {
            subject,
            first: HalfRecord {
                average: self.moyenne_s1,
                absence_hours: self.heures_absence_s1,
                comment: self.appreciation_s1,
                cohort_min: self.moyenne_s1_min,
                cohort_max: self.moyenne_s1_max,
            },
            second: HalfRecord {
                average: self.moyenne_s2,
                absence_hours: self.heures_absence_s2,
                comment: self.appreciation_s2,
                cohort_min: self.moyenne_s2_min,
                cohort_max: self.moyenne_s2_max,
            },
        }
    }
}

// ---------------------------------------------------------------------------
// Serialization
// ---------------------------------------------------------------------------

/// Pretty-printed JSON array, non-ASCII kept verbatim.
pub fn to_json(bulletins: &[Bulletin]) -> Result<String, SerializeError> {
    let records: Vec<BulletinRecord> = bulletins.iter().map(BulletinRecord::from).collect();
    Ok(serde_json::to_string_pretty(&records)?)
}

/// Parse a bulletin array. Elements that are not objects carrying both
/// `Nom` and `Prenom` are skipped.
pub fn from_json(text: &str) -> Result<Vec<Bulletin>, SerializeError> {
    let value: Value = serde_json::from_str(text)?;
    let Value::Array(items) = value else {
        return Err(SerializeError::NotAnArray);
    };

    let mut bulletins = Vec::with_capacity(items.len());
    for (i, item) in items.into_iter().enumerate() {
        if !has_identity(&item) {
            log::debug!("bulletin {}: no Nom/Prenom, skipped", i + 1);
            continue;
        }
        match serde_json::from_value::<BulletinRecord>(item) {
            Ok(record) => bulletins.push(record.into_bulletin()),
            Err(e) => log::warn!("bulletin {}: {e}, skipped", i + 1),
        }
    }
    Ok(bulletins)
}

fn has_identity(item: &Value) -> bool {
    item.as_object()
        .is_some_and(|o| o.contains_key("Nom") && o.contains_key("Prenom"))
}

/// Write bulletins to `path`, creating the parent directory.
pub fn save(bulletins: &[Bulletin], path: &Path) -> Result<(), SerializeError> {
    if bulletins.is_empty() {
        return Err(SerializeError::Empty);
    }

    let io_err = |source| SerializeError::Io {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(io_err)?;
    }
    fs::write(path, to_json(bulletins)?).map_err(io_err)?;

    log::info!("{} bulletin(s) written to {}", bulletins.len(), path.display());
    Ok(())
}

pub fn load(path: &Path) -> Result<Vec<Bulletin>, SerializeError> {
    let text = fs::read_to_string(path).map_err(|source| SerializeError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    from_json(&text)
}

// ---------------------------------------------------------------------------
// Format check
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct JsonValidation {
    pub valid: bool,
    pub bulletin_count: usize,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

/// Structural check of a bulletin document, without building bulletins.
pub fn validate_json(text: &str) -> Result<JsonValidation, SerializeError> {
    let value: Value = serde_json::from_str(text)?;
    let mut report = JsonValidation::default();

    let Value::Array(items) = value else {
        report.errors.push("Le fichier JSON doit contenir une liste".into());
        return Ok(report);
    };

    let mut items = items.as_slice();
    if items
        .first()
        .and_then(Value::as_object)
        .is_some_and(|o| o.contains_key(METADATA_KEY))
    {
        items = &items[1..];
        report.warnings.push("Métadonnées détectées et ignorées".into());
    }

    report.bulletin_count = items.len();

    for (i, item) in items.iter().enumerate() {
        let n = i + 1;
        let Some(object) = item.as_object() else {
            report.errors.push(format!("Bulletin {n}: doit être un objet JSON"));
            continue;
        };
        for field in ["Nom", "Prenom"] {
            match object.get(field) {
                None => report.errors.push(format!("Bulletin {n}: champ '{field}' manquant")),
                Some(v) if !v.is_string() => report
                    .errors
                    .push(format!("Bulletin {n}: '{field}' doit être une chaîne")),
                Some(_) => {}
            }
        }
        let Some(subjects) = object.get("Matieres") else {
            continue;
        };
        let Some(subjects) = subjects.as_object() else {
            report.errors.push(format!("Bulletin {n}: 'Matieres' doit être un objet"));
            continue;
        };
        for (subject, entry) in subjects {
            let Some(entry) = entry.as_object() else {
                report
                    .errors
                    .push(format!("Bulletin {n}: matière '{subject}' doit être un objet"));
                continue;
            };
            for (field, value) in entry {
                if let Some(note) = scalar_note(field, value) {
                    report
                        .warnings
                        .push(format!("Bulletin {n}: {subject}.{field} {note}"));
                }
            }
        }
    }

    report.valid = report.errors.is_empty();
    Ok(report)
}

pub fn validate_json_file(path: &Path) -> Result<JsonValidation, SerializeError> {
    let text = fs::read_to_string(path).map_err(|source| SerializeError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    validate_json(&text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use tempfile::tempdir;

    fn sample() -> Vec<Bulletin> {
        let mut alice = Bulletin::new(Student::new("DUPONT", "Alice"));
        alice.general_comment_first = Some("Très bon semestre.".into());
        let mut maths = SubjectAppreciation::new("Mathématiques");
        maths.first.average = Some(16.5);
        maths.first.absence_hours = Some(1);
        maths.first.comment = Some("Solide".into());
        maths.first.cohort_min = Some(8.0);
        maths.first.cohort_max = Some(16.5);
        maths.second.average = Some(14.25);
        alice.put_subject(maths);

        let paul = Bulletin::new(Student::new("MARTIN", "Paul"));
        vec![alice, paul]
    }

    #[test]
    fn test_field_names_and_omission() {
        let json = to_json(&sample()).unwrap();
        let value: Value = serde_json::from_str(&json).unwrap();

        let alice = &value[0];
        assert_eq!(alice["Nom"], "DUPONT");
        assert_eq!(alice["Prenom"], "Alice");
        assert_eq!(alice["AppreciationGeneraleS1"], "Très bon semestre.");
        assert!(alice.get("AppreciationGeneraleS2").is_none());

        let maths = &alice["Matieres"]["Mathématiques"];
        assert_eq!(maths["MoyenneS1"], 16.5);
        assert_eq!(maths["HeuresAbsenceS1"], 1);
        assert_eq!(maths["MoyenneS1Min"], 8.0);
        assert_eq!(maths["MoyenneS1Max"], 16.5);
        assert_eq!(maths["AppreciationS1"], "Solide");
        assert!(maths.get("MoyenneS2Max").is_none());
        assert!(maths.get("AppreciationS2").is_none());

        // empty subject map omitted
        assert!(value[1].get("Matieres").is_none());
        // non-ASCII kept verbatim
        assert!(json.contains("Mathématiques"));
    }

    #[test]
    fn test_from_json_skips_anonymous_items() {
        let text = r#"[
            {"_metadata": {"version": 1}},
            {"Nom": "DUPONT", "Prenom": "Alice"},
            {"Nom": "SANSPRENOM"},
            42
        ]"#;
        let bulletins = from_json(text).unwrap();
        assert_eq!(bulletins.len(), 1);
        assert_eq!(bulletins[0].student, Student::new("DUPONT", "Alice"));
        assert!(bulletins[0].subjects.is_empty());
    }

    #[test]
    fn test_from_json_rejects_bad_syntax() {
        assert!(matches!(from_json("[{"), Err(SerializeError::Json(_))));
        assert!(matches!(from_json("{}"), Err(SerializeError::NotAnArray)));
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out/nested/bulletins.json");

        save(&sample(), &path).unwrap();
        let loaded = load(&path).unwrap();
        assert_eq!(loaded, sample());
    }

    #[test]
    fn test_save_refuses_empty() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("empty.json");
        assert!(matches!(save(&[], &path), Err(SerializeError::Empty)));
        assert!(!path.exists());
    }

    #[test]
    fn test_load_missing_file() {
        let err = load(Path::new("/nonexistent/bulletins.json")).unwrap_err();
        assert!(matches!(err, SerializeError::Io { .. }));
    }

    #[test]
    fn test_validate_ok_with_metadata() {
        let text = r#"[{"_metadata": {}}, {"Nom": "A", "Prenom": "B", "Matieres": {}}]"#;
        let report = validate_json(text).unwrap();
        assert!(report.valid);
        assert_eq!(report.bulletin_count, 1);
        assert_eq!(report.warnings.len(), 1);
    }

    #[test]
    fn test_validate_reports_each_problem() {
        let text = r#"[{"Nom": "A"}, "x", {"Nom": "C", "Prenom": "D", "Matieres": []}]"#;
        let report = validate_json(text).unwrap();
        assert!(!report.valid);
        assert_eq!(report.bulletin_count, 3);
        assert_eq!(
            report.errors,
            vec![
                "Bulletin 1: champ 'Prenom' manquant",
                "Bulletin 2: doit être un objet JSON",
                "Bulletin 3: 'Matieres' doit être un objet",
            ]
        );
    }

    #[test]
    fn test_loose_scalars_keep_the_student() {
        let text = r#"[
            {"Nom": "DUPONT", "Prenom": "Alice", "Matieres": {"Maths": {
                "HeuresAbsenceS1": 3.0,
                "HeuresAbsenceS2": "2h30",
                "MoyenneS1": "14,5",
                "MoyenneS2": "N.Not",
                "AppreciationS1": 12,
                "MoyenneS1Max": null
            }}},
            {"Nom": "MARTIN", "Prenom": "Paul"}
        ]"#;

        let bulletins = from_json(text).unwrap();
        assert_eq!(bulletins.len(), 2);
        let maths = &bulletins[0].subjects["Maths"];
        assert_eq!(maths.first.absence_hours, Some(3));
        assert_eq!(maths.second.absence_hours, Some(2));
        assert_eq!(maths.first.average, Some(14.5));
        assert_eq!(maths.second.average, None);
        assert_eq!(maths.first.comment.as_deref(), Some("12"));
        assert_eq!(maths.first.cohort_max, None);

        let report = validate_json(text).unwrap();
        assert!(report.valid);
        assert_eq!(report.bulletin_count, 2);
        assert_eq!(
            report.warnings,
            vec![
                "Bulletin 1: Maths.AppreciationS1 converti",
                "Bulletin 1: Maths.HeuresAbsenceS1 converti",
                "Bulletin 1: Maths.HeuresAbsenceS2 converti",
                "Bulletin 1: Maths.MoyenneS1 converti",
                "Bulletin 1: Maths.MoyenneS2 illisible, ignoré",
            ]
        );
    }

    #[test]
    fn test_validate_flags_what_load_drops() {
        let text = r#"[
            {"Nom": 7, "Prenom": "Alice"},
            {"Nom": "MARTIN", "Prenom": "Paul", "Matieres": {"Maths": "16"}},
            {"Nom": "BERT", "Prenom": "Zoé"}
        ]"#;

        assert_eq!(from_json(text).unwrap().len(), 1);

        let report = validate_json(text).unwrap();
        assert!(!report.valid);
        assert_eq!(
            report.errors,
            vec![
                "Bulletin 1: 'Nom' doit être une chaîne",
                "Bulletin 2: matière 'Maths' doit être un objet",
            ]
        );
    }

    #[test]
    fn test_validate_not_a_list() {
        let report = validate_json(r#"{"Nom": "A"}"#).unwrap();
        assert!(!report.valid);
        assert_eq!(report.bulletin_count, 0);
    }

    fn arb_half() -> impl Strategy<Value = HalfRecord> {
        (
            prop::option::of(0.0f64..20.0),
            prop::option::of(0u32..200),
            prop::option::of("[a-zA-Zéè ,.]{1,40}"),
            prop::option::of(0.0f64..20.0),
            prop::option::of(0.0f64..20.0),
        )
            .prop_map(|(average, absence_hours, comment, cohort_min, cohort_max)| HalfRecord {
                average,
                absence_hours,
                comment,
                cohort_min,
                cohort_max,
            })
    }

    fn arb_bulletin() -> impl Strategy<Value = Bulletin> {
        (
            "[A-Z]{2,10}",
            "[A-Z][a-z]{1,10}",
            prop::option::of("[a-z ]{1,30}"),
            prop::collection::btree_map("[A-Z][a-z]{2,12}", (arb_half(), arb_half()), 0..4),
        )
            .prop_map(|(last, first, general, subjects)| {
                let mut b = Bulletin::new(Student::new(last, first));
                b.general_comment_second = general;
                for (name, (h1, h2)) in subjects {
                    b.put_subject(SubjectAppreciation {
                        subject: name,
                        first: h1,
                        second: h2,
                    });
                }
                b
            })
    }

    proptest! {
        #[test]
        fn populated_fields_survive_round_trip(bulletins in prop::collection::vec(arb_bulletin(), 0..5)) {
            let text = to_json(&bulletins).unwrap();
            prop_assert_eq!(from_json(&text).unwrap(), bulletins);
        }
    }
}
