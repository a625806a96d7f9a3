//! Locale-aware scalar parsers for exported grade tables.
//!
//! Every parser is total: malformed input yields `None`, never an error.

use once_cell::sync::Lazy;
use regex::Regex;

/// Marker exported for a subject that was not graded.
pub const NOT_GRADED: &str = "N.Not";

const RECAP_SEPARATOR: &str = " - ";

static DURATION_HOURS: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d+)h").unwrap());

// "Moy. : 16,50" as exported, "Avg.: 16.50" in translated exports. The value
// may be "N.Not" or missing; the label alone still marks the segment.
static RECAP_AVERAGE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:Moy|Avg)\.\s*:\s*([0-9]+(?:[,.][0-9]+)?|N\.Not)?").unwrap()
});

// "H.Abs : 1h00" as exported, "Abs.: 1h" in translated exports.
static RECAP_ABSENCE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:H\.)?Abs\.?\s*:\s*([0-9]+h[0-9]*|[0-9]+(?:[,.][0-9]+)?|N\.Not)?").unwrap()
});

/// Whole hours from a duration such as "3h00" or "1h30" (minutes truncated).
///
/// Falls back to reading the whole string as a number, truncated toward zero.
pub fn parse_duration(text: &str) -> Option<u32> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    if let Some(caps) = DURATION_HOURS.captures(text) {
        return caps[1].parse().ok();
    }

    let value: f64 = text.replace(',', ".").parse().ok()?;
    if !value.is_finite() || value < 0.0 || value > u32::MAX as f64 {
        return None;
    }
    Some(value.trunc() as u32)
}

/// Decimal with either a comma or a point as separator.
pub fn parse_decimal(text: &str) -> Option<f64> {
    let text = text.trim();
    if text.is_empty() || text == NOT_GRADED {
        return None;
    }
    text.replace(',', ".").parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Fields packed into the previous-period recap column.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecapFields {
    pub average: Option<f64>,
    pub absence_hours: Option<u32>,
    pub comment: Option<String>,
}

/// Split "Moy. : 16,50 - H.Abs : 1h00 - comment" into its parts.
///
/// The average and absence labels are searched independently and in any order. The
/// segments holding a match are dropped, and what is left, re-joined with
/// " - ", is the comment. With no match at all the whole text is the comment.
pub fn split_recap_field(text: &str) -> RecapFields {
    let text = text.trim();
    if text.is_empty() {
        return RecapFields::default();
    }

    let average_match = RECAP_AVERAGE.captures(text);
    let absence_match = RECAP_ABSENCE.captures(text);

    if average_match.is_none() && absence_match.is_none() {
        return RecapFields {
            comment: Some(text.to_string()),
            ..Default::default()
        };
    }

    let average = average_match
        .as_ref()
        .and_then(|c| c.get(1))
        .and_then(|m| parse_decimal(m.as_str()));
    let absence_hours = absence_match
        .as_ref()
        .and_then(|c| c.get(1))
        .and_then(|m| parse_duration(m.as_str()));

    let matched_at: Vec<usize> = [average_match, absence_match]
        .iter()
        .flatten()
        .filter_map(|c| c.get(0).map(|m| m.start()))
        .collect();

    let mut remaining = Vec::new();
    let mut offset = 0;
    for segment in text.split(RECAP_SEPARATOR) {
        let end = offset + segment.len();
        let holds_match = matched_at.iter().any(|&pos| pos >= offset && pos < end);
        if !holds_match {
            remaining.push(segment);
        }
        offset = end + RECAP_SEPARATOR.len();
    }

    let comment = remaining.join(RECAP_SEPARATOR).trim().to_string();

    RecapFields {
        average,
        absence_hours,
        comment: if comment.is_empty() { None } else { Some(comment) },
    }
}
