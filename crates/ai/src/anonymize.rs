// Reversible student-name substitution for text sent to a provider.
//
// Outbound: case-insensitive substring replacement of the real names.
// Inbound: whole-word replacement of the placeholder tokens only.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::{NoExpand, Regex, RegexBuilder};

pub const PLACEHOLDER_FIRST_NAME: &str = "John";
pub const PLACEHOLDER_LAST_NAME: &str = "DOE";

static PLACEHOLDER_FIRST: Lazy<Regex> = Lazy::new(|| whole_word(PLACEHOLDER_FIRST_NAME));
static PLACEHOLDER_LAST: Lazy<Regex> = Lazy::new(|| whole_word(PLACEHOLDER_LAST_NAME));

fn whole_word(token: &str) -> Regex {
    RegexBuilder::new(&format!(r"\b{}\b", regex::escape(token)))
        .case_insensitive(true)
        .build()
        .unwrap()
}

/// Normalized identity of a registered student.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AnonymizedName {
    pub last_name: String,
    pub first_name: String,
}

fn normalize_last(last: &str) -> String {
    last.trim().to_uppercase()
}

fn normalize_first(first: &str) -> String {
    let mut chars = first.trim().chars();
    match chars.next() {
        Some(head) => head.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

/// Replace every case-insensitive occurrence of `needle`. A blank needle
/// leaves the text alone.
fn replace_substring(text: &str, needle: &str, replacement: &str) -> String {
    let needle = needle.trim();
    if needle.is_empty() {
        return text.to_string();
    }
    match RegexBuilder::new(&regex::escape(needle)).case_insensitive(true).build() {
        Ok(re) => re.replace_all(text, NoExpand(replacement)).into_owned(),
        Err(_) => text.to_string(),
    }
}

#[derive(Debug, Default)]
pub struct Anonymizer {
    by_key: HashMap<String, AnonymizedName>,
    by_name: HashMap<AnonymizedName, String>,
}

impl Anonymizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Key for the student, minting `John_NNN` on first sight.
    pub fn register(&mut self, last: &str, first: &str) -> String {
        let name = AnonymizedName {
            last_name: normalize_last(last),
            first_name: normalize_first(first),
        };
        if let Some(key) = self.by_name.get(&name) {
            return key.clone();
        }

        let key = format!("{}_{:03}", PLACEHOLDER_FIRST_NAME, self.by_key.len() + 1);
        log::debug!("registered {} {} as {key}", name.last_name, name.first_name);
        self.by_key.insert(key.clone(), name.clone());
        self.by_name.insert(name, key.clone());
        key
    }

    pub fn anonymize(&mut self, text: &str, last: &str, first: &str) -> String {
        if text.trim().is_empty() {
            return text.to_string();
        }
        self.register(last, first);

        let text = replace_substring(text, first, PLACEHOLDER_FIRST_NAME);
        replace_substring(&text, last, PLACEHOLDER_LAST_NAME)
    }

    pub fn deanonymize(&self, text: &str, last: &str, first: &str) -> String {
        if text.trim().is_empty() {
            return text.to_string();
        }
        let text = PLACEHOLDER_FIRST.replace_all(text, NoExpand(first.trim()));
        PLACEHOLDER_LAST
            .replace_all(&text, NoExpand(last.trim()))
            .into_owned()
    }

    pub fn lookup(&self, key: &str) -> Option<&AnonymizedName> {
        self.by_key.get(key)
    }

    pub fn len(&self) -> usize {
        self.by_key.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_key.is_empty()
    }

    pub fn clear(&mut self) {
        self.by_key.clear();
        self.by_name.clear();
    }
}
