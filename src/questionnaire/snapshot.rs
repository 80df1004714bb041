//! Persisted form of a questionnaire's answers.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime};
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};

/// Question id → trimmed answer text. Ordered so that serialized output is
/// stable.
pub type ResponseMap = BTreeMap<String, String>;

/// Slug used when a title is missing or has no alphanumeric characters.
pub const UNTITLED_SLUG: &str = "untitled_project";

static NON_ALPHANUMERIC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\p{Alphabetic}\pN]+").expect("valid slug pattern"));

/// The wrapped on-disk format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseSnapshot {
    #[serde(default)]
    pub student_id: String,
    #[serde(default)]
    pub project_title: Option<String>,
    /// Local time of the save. Any ISO-8601 form is accepted on read; an
    /// unrecognised value reads as `None` instead of failing the file.
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub timestamp: Option<NaiveDateTime>,
    pub responses: ResponseMap,
}

impl ResponseSnapshot {
    /// Snapshot stamped with the current local time.
    pub fn now(student_id: &str, project_title: Option<String>, responses: ResponseMap) -> Self {
        Self {
            student_id: student_id.to_string(),
            project_title,
            timestamp: Some(chrono::Local::now().naive_local()),
            responses,
        }
    }
}

fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<NaiveDateTime>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(|v| v.as_str()).and_then(parse_timestamp))
}

/// Parse an ISO-8601 timestamp into local naive time. Offsets are converted
/// to local time; a bare date reads as midnight.
pub fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Local).naive_local());
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(value, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

/// Either on-disk format. Files written by this crate are always `Wrapped`;
/// `Legacy` is a bare map with no metadata.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum StoredResponses {
    Wrapped(ResponseSnapshot),
    Legacy(ResponseMap),
}

impl StoredResponses {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn responses(&self) -> &ResponseMap {
        match self {
            Self::Wrapped(snapshot) => &snapshot.responses,
            Self::Legacy(map) => map,
        }
    }

    pub fn into_responses(self) -> ResponseMap {
        match self {
            Self::Wrapped(snapshot) => snapshot.responses,
            Self::Legacy(map) => map,
        }
    }

    /// Student id recorded in the file, if it is a wrapped snapshot with one.
    pub fn student_id(&self) -> Option<&str> {
        match self {
            Self::Wrapped(snapshot) if !snapshot.student_id.is_empty() => {
                Some(&snapshot.student_id)
            }
            _ => None,
        }
    }

    pub fn project_title(&self) -> Option<&str> {
        match self {
            Self::Wrapped(snapshot) => snapshot.project_title.as_deref(),
            Self::Legacy(_) => None,
        }
    }

    pub fn timestamp(&self) -> Option<NaiveDateTime> {
        match self {
            Self::Wrapped(snapshot) => snapshot.timestamp,
            Self::Legacy(_) => None,
        }
    }
}

/// Filesystem-safe form of a title: lowercase, runs of non-alphanumeric
/// characters collapsed to one `_`, no leading or trailing `_`.
pub fn slugify(title: Option<&str>) -> String {
    let lowered = title.unwrap_or_default().to_lowercase();
    let slug = NON_ALPHANUMERIC.replace_all(&lowered, "_");
    let slug = slug.trim_matches('_');
    if slug.is_empty() {
        UNTITLED_SLUG.to_string()
    } else {
        slug.to_string()
    }
}
