use std::collections::HashMap;

/// One data row of a tabular source, keyed by header name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SourceRow {
    pub line: usize,
    pub fields: HashMap<String, String>,
}

impl SourceRow {
    pub fn new(line: usize) -> Self {
        Self {
            line,
            fields: HashMap::new(),
        }
    }

    pub fn insert(&mut self, header: impl Into<String>, value: impl Into<String>) {
        self.fields.insert(header.into(), value.into());
    }

    /// Trimmed value of `header`, `None` when absent or blank.
    pub fn get(&self, header: &str) -> Option<&str> {
        self.fields
            .get(header)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    /// First non-blank value among `headers`.
    pub fn first_of<S: AsRef<str>>(&self, headers: &[S]) -> Option<&str> {
        headers.iter().find_map(|h| self.get(h.as_ref()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for SourceRow {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut row = SourceRow::default();
        for (k, v) in iter {
            row.insert(k, v);
        }
        row
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_trims_and_hides_blank() {
        let row: SourceRow = [("Élève", "  DUPONT Alice "), ("H.Abs.", "   ")].into_iter().collect();
        assert_eq!(row.get("Élève"), Some("DUPONT Alice"));
        assert_eq!(row.get("H.Abs."), None);
        assert_eq!(row.get("missing"), None);
    }

    #[test]
    fn first_of_skips_blank_aliases() {
        let row: SourceRow = [("Appreciation S1", ""), ("AppreciationS1", "Bon travail")]
            .into_iter()
            .collect();
        let aliases = ["AppreciationGeneraleS1", "Appreciation S1", "AppreciationS1"];
        assert_eq!(row.first_of(&aliases), Some("Bon travail"));
    }
}
