//! Filter, keyword search and sort over monitoring history.

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::record::{parse_instant, HistoryRecord};
use crate::search::contains_ci;

/// Keyword categories for the history "semantic" box, checked in order.
pub const SEMANTIC_KEYWORDS: &[(&str, &[&str])] = &[
    ("positive", &["positive", "great", "amazing", "excellent", "good", "love", "best"]),
    ("negative", &["negative", "terrible", "bad", "awful", "hate", "worst", "poor"]),
    ("neutral", &["neutral", "okay", "average", "normal", "fine", "decent"]),
    ("error", &["error", "failed", "exception", "invalid", "malformed", "timeout"]),
    ("success", &["success", "completed", "working", "valid", "correct", "accurate"]),
    ("sentiment", &["sentiment", "emotion", "feeling", "mood", "tone", "attitude"]),
    ("confidence", &["confidence", "score", "probability", "certainty", "reliability"]),
];

pub const ALL_STATUSES: &str = "all";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortField {
    #[serde(rename = "timestamp")]
    Timestamp,
    #[serde(rename = "requestId", alias = "identifier")]
    Identifier,
    #[serde(rename = "status")]
    Status,
    #[serde(rename = "responseTime", alias = "duration")]
    Duration,
    #[serde(rename = "confidence", alias = "derivedConfidence")]
    DerivedConfidence,
}

impl SortField {
    /// Accepts wire names and generic names; `None` for anything else.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "timestamp" => Some(Self::Timestamp),
            "requestId" | "identifier" => Some(Self::Identifier),
            "status" => Some(Self::Status),
            "responseTime" | "duration" => Some(Self::Duration),
            "confidence" | "derivedConfidence" => Some(Self::DerivedConfidence),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

impl SortDirection {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "asc" => Some(Self::Asc),
            "desc" => Some(Self::Desc),
            _ => None,
        }
    }

    pub fn reversed(self) -> Self {
        match self {
            Self::Asc => Self::Desc,
            Self::Desc => Self::Asc,
        }
    }

    fn apply(self, ord: Ordering) -> Ordering {
        match self {
            Self::Asc => ord,
            Self::Desc => ord.reverse(),
        }
    }
}

/// Inputs of the history table: filters plus the active sort.
///
/// Every filter is vacuous at its default. Deserializes from a saved
/// query file; unknown sort names are dropped to `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RecordQuery {
    pub free_text: String,
    pub status: String,
    pub semantic: String,
    pub date_from: Option<String>,
    pub date_to: Option<String>,
    #[serde(deserialize_with = "lenient_sort_field")]
    pub sort_field: Option<SortField>,
    pub sort_direction: SortDirection,
}

impl Default for RecordQuery {
    fn default() -> Self {
        Self {
            free_text: String::new(),
            status: ALL_STATUSES.to_string(),
            semantic: String::new(),
            date_from: None,
            date_to: None,
            sort_field: Some(SortField::Timestamp),
            sort_direction: SortDirection::Desc,
        }
    }
}

fn lenient_sort_field<'de, D>(d: D) -> Result<Option<SortField>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(d)?;
    Ok(raw.as_deref().and_then(SortField::parse))
}

impl RecordQuery {
    /// A query that filters nothing and keeps input order.
    pub fn identity() -> Self {
        Self {
            sort_field: None,
            ..Self::default()
        }
    }

    /// Clicking a column header: same field flips direction, a new field
    /// starts ascending.
    pub fn toggle_sort(&mut self, field: SortField) {
        if self.sort_field == Some(field) {
            self.sort_direction = self.sort_direction.reversed();
        } else {
            self.sort_field = Some(field);
            self.sort_direction = SortDirection::Asc;
        }
    }

    fn filter(&self) -> Filter<'_> {
        Filter {
            free_text: self.free_text.to_lowercase(),
            status: &self.status,
            semantic: self.semantic.to_lowercase(),
            from: parse_bound(self.date_from.as_deref()),
            to: parse_bound(self.date_to.as_deref()),
        }
    }
}

/// A supplied date bound; `Invalid` rejects every record.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Bound {
    None,
    At(DateTime<Utc>),
    Invalid,
}

fn parse_bound(raw: Option<&str>) -> Bound {
    match raw.map(str::trim) {
        None | Some("") => Bound::None,
        Some(s) => match parse_instant(s) {
            Some(t) => Bound::At(t),
            None => {
                warn!(bound = s, "unparseable date bound");
                Bound::Invalid
            }
        },
    }
}

struct Filter<'q> {
    free_text: String,
    status: &'q str,
    semantic: String,
    from: Bound,
    to: Bound,
}

impl Filter<'_> {
    fn matches(&self, rec: &HistoryRecord) -> bool {
        self.matches_text(rec)
            && self.matches_status(rec)
            && self.matches_semantic(rec)
            && self.matches_dates(rec)
    }

    fn matches_text(&self, rec: &HistoryRecord) -> bool {
        self.free_text.is_empty()
            || rec
                .searchable_fields()
                .iter()
                .any(|f| contains_ci(f, &self.free_text))
    }

    fn matches_status(&self, rec: &HistoryRecord) -> bool {
        self.status.is_empty() || self.status == ALL_STATUSES || self.status == rec.status
    }

    fn matches_semantic(&self, rec: &HistoryRecord) -> bool {
        if self.semantic.is_empty() {
            return true;
        }
        semantic_match(&self.semantic, &rec.semantic_text())
    }

    fn matches_dates(&self, rec: &HistoryRecord) -> bool {
        if self.from == Bound::None && self.to == Bound::None {
            return true;
        }
        let Some(at) = rec.parsed_timestamp() else {
            return false;
        };
        let after_from = match self.from {
            Bound::None => true,
            Bound::At(from) => at >= from,
            Bound::Invalid => false,
        };
        let before_to = match self.to {
            Bound::None => true,
            Bound::At(to) => at <= to,
            Bound::Invalid => false,
        };
        after_from && before_to
    }
}

/// Keyword-bucket match of a lowercased query against lowercased text.
///
/// The first category named in the query decides; with none named the
/// query is a plain substring test.
pub fn semantic_match(query: &str, text: &str) -> bool {
    match SEMANTIC_KEYWORDS.iter().find(|(cat, _)| query.contains(cat)) {
        Some((_, synonyms)) => synonyms.iter().any(|w| text.contains(w)),
        None => text.contains(query),
    }
}

/// Absent values order after present ones whatever the direction.
fn cmp_present_first<T>(
    a: Option<T>,
    b: Option<T>,
    dir: SortDirection,
    cmp: impl FnOnce(&T, &T) -> Ordering,
) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => dir.apply(cmp(&a, &b)),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

pub fn compare(a: &HistoryRecord, b: &HistoryRecord, field: SortField, dir: SortDirection) -> Ordering {
    match field {
        SortField::Timestamp => cmp_present_first(
            a.parsed_timestamp(),
            b.parsed_timestamp(),
            dir,
            Ord::cmp,
        ),
        SortField::Identifier => dir.apply(a.request_id.cmp(&b.request_id)),
        SortField::Status => dir.apply(a.status.cmp(&b.status)),
        SortField::Duration => cmp_present_first(a.response_time, b.response_time, dir, Ord::cmp),
        SortField::DerivedConfidence => {
            cmp_present_first(a.confidence(), b.confidence(), dir, |x, y| x.total_cmp(y))
        }
    }
}

/// Stable sort of `records` in place; `None` keeps the order.
pub fn sort_records(records: &mut [&HistoryRecord], field: Option<SortField>, dir: SortDirection) {
    if let Some(field) = field {
        records.sort_by(|a, b| compare(a, b, field, dir));
    }
}

/// Run the filters and sort of `q` over `records`.
///
/// Returns borrowed views; `records` itself is left untouched.
pub fn query<'a>(records: &'a [HistoryRecord], q: &RecordQuery) -> Vec<&'a HistoryRecord> {
    let filter = q.filter();
    let mut out: Vec<&HistoryRecord> = records.iter().filter(|r| filter.matches(r)).collect();
    sort_records(&mut out, q.sort_field, q.sort_direction);
    debug!(
        total = records.len(),
        matched = out.len(),
        sort = ?q.sort_field,
        direction = ?q.sort_direction,
        "history query"
    );
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(id: &str, status: &str, ts: &str) -> HistoryRecord {
        HistoryRecord::new(id, status, ts)
    }

    fn ids<'a>(rs: &[&'a HistoryRecord]) -> Vec<&'a str> {
        rs.iter().map(|r| r.request_id.as_str()).collect()
    }

    #[test]
    fn semantic_category_uses_synonyms() {
        assert!(semantic_match("show negative ones", "the service was terrible"));
        assert!(!semantic_match("negative", "great product"));
        // "positive" is declared first and wins.
        assert!(semantic_match("positive or negative", "i love it"));
        assert!(!semantic_match("positive or negative", "awful"));
    }

    #[test]
    fn semantic_falls_back_to_substring() {
        assert!(semantic_match("req_12", "req_12345 hello"));
        assert!(!semantic_match("banana", "req_12345 hello"));
    }

    #[test]
    fn parse_instant_formats() {
        let midnight = parse_instant("2023-02-25").unwrap();
        assert_eq!(midnight.to_rfc3339(), "2023-02-25T00:00:00+00:00");
        assert_eq!(parse_instant("2023-02-25T16:00"), parse_instant("2023-02-25T16:00:00Z"));
        assert!(parse_instant("2023-02-25T16:00:00+02:00").is_some());
        assert!(parse_instant("last tuesday").is_none());
    }

    #[test]
    fn invalid_bound_matches_nothing() {
        let records = vec![rec("a", "success", "2023-02-25T16:00:00Z")];
        let q = RecordQuery {
            date_from: Some("nope".into()),
            ..RecordQuery::identity()
        };
        assert!(query(&records, &q).is_empty());
    }

    #[test]
    fn date_bounds_are_inclusive() {
        let records = vec![
            rec("a", "success", "2023-02-25T16:00:00Z"),
            rec("b", "success", "2023-02-26T00:00:00Z"),
            rec("c", "success", "garbage"),
        ];
        let q = RecordQuery {
            date_from: Some("2023-02-25T16:00:00Z".into()),
            date_to: Some("2023-02-26".into()),
            ..RecordQuery::identity()
        };
        assert_eq!(ids(&query(&records, &q)), ["a", "b"]);

        // No bounds: unparseable timestamps still pass.
        assert_eq!(query(&records, &RecordQuery::identity()).len(), 3);
    }

    #[test]
    fn toggle_sort_flips_then_resets() {
        let mut q = RecordQuery::default();
        q.toggle_sort(SortField::Timestamp);
        assert_eq!(q.sort_direction, SortDirection::Asc);
        q.toggle_sort(SortField::Timestamp);
        assert_eq!(q.sort_direction, SortDirection::Desc);
        q.toggle_sort(SortField::Status);
        assert_eq!(q.sort_field, Some(SortField::Status));
        assert_eq!(q.sort_direction, SortDirection::Asc);
    }

    #[test]
    fn query_file_with_unknown_sort_keeps_order() {
        let q: RecordQuery =
            serde_json::from_str(r#"{"sortField": "colour", "status": "error"}"#).unwrap();
        assert_eq!(q.sort_field, None);
        assert_eq!(q.status, "error");
        assert_eq!(q.sort_direction, SortDirection::Desc);

        let q: RecordQuery = serde_json::from_str(r#"{"sortField": "duration"}"#).unwrap();
        assert_eq!(q.sort_field, Some(SortField::Duration));
    }

    #[test]
    fn sort_field_names() {
        assert_eq!(SortField::parse("requestId"), Some(SortField::Identifier));
        assert_eq!(SortField::parse("derivedConfidence"), Some(SortField::DerivedConfidence));
        assert_eq!(SortField::parse("Timestamp"), None);
        assert_eq!(SortDirection::parse("ASC"), Some(SortDirection::Asc));
        assert_eq!(SortDirection::parse("up"), None);
    }
}
