//! The stored shape of a patient record.
//!
//! A [`Document`] is an insertion-ordered map of [`DocValue`]s. Unlike JSON it has native
//! calendar-date and timestamp values, which is what the store keeps for `birth_date`,
//! `created_at` and `updated_at`.
//!
//! Strings coming off the wire are promoted to native dates only when they are in canonical
//! form, i.e. when re-rendering the parsed value reproduces the input exactly. Anything else
//! stays a string. This keeps every wire → document → wire trip lossless.

use chrono::{DateTime, FixedOffset, NaiveDate, SecondsFormat, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// A patient record (or a change set) as held by the document store.
pub type Document = IndexMap<String, DocValue>;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// A single value inside a [`Document`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum DocValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Date(NaiveDate),
    DateTime(DateTime<FixedOffset>),
    List(Vec<DocValue>),
    Map(Document),
}

impl DocValue {
    /// Builds a value from wire text, promoting canonical ISO-8601 dates and timestamps.
    pub fn from_text(text: &str) -> Self {
        if let Some(date) = parse_canonical_date(text) {
            return Self::Date(date);
        }
        if let Some(ts) = parse_canonical_datetime(text) {
            return Self::DateTime(ts);
        }
        Self::String(text.to_owned())
    }

    /// Wraps a service timestamp.
    pub fn timestamp(ts: DateTime<Utc>) -> Self {
        Self::DateTime(ts.fixed_offset())
    }

    /// Short name of the value's kind, for error messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "integer",
            Self::Float(_) => "number",
            Self::String(_) => "string",
            Self::Date(_) => "date",
            Self::DateTime(_) => "datetime",
            Self::List(_) => "list",
            Self::Map(_) => "map",
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&Document> {
        match self {
            Self::Map(m) => Some(m),
            _ => None,
        }
    }

    /// Returns the timestamp in UTC if this is a datetime value.
    pub fn as_utc(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::DateTime(ts) => Some(ts.with_timezone(&Utc)),
            _ => None,
        }
    }

    /// Renders dates and timestamps back to their wire text; other kinds yield `None`.
    pub fn render_temporal(&self) -> Option<String> {
        match self {
            Self::Date(d) => Some(render_date(d)),
            Self::DateTime(ts) => Some(render_datetime(ts)),
            _ => None,
        }
    }

    /// True if this is a list whose every element is a map.
    pub fn is_list_of_maps(&self) -> bool {
        match self {
            Self::List(items) => items.iter().all(|v| matches!(v, Self::Map(_))),
            _ => false,
        }
    }
}

pub fn render_date(date: &NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

pub fn render_datetime(ts: &DateTime<FixedOffset>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

/// Parses `YYYY-MM-DD`, accepting only text that renders back identically.
pub fn parse_canonical_date(text: &str) -> Option<NaiveDate> {
    let date = NaiveDate::parse_from_str(text, DATE_FORMAT).ok()?;
    (render_date(&date) == text).then_some(date)
}

/// Parses an RFC 3339 timestamp, accepting only text that renders back identically.
pub fn parse_canonical_datetime(text: &str) -> Option<DateTime<FixedOffset>> {
    let ts = DateTime::parse_from_rfc3339(text).ok()?;
    (render_datetime(&ts) == text).then_some(ts)
}
