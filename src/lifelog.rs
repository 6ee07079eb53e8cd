//! Typed view of a lifelog entry as returned by the Limitless API.
//!
//! Only the two fields the exporter relies on are modelled explicitly. Everything
//! else (`id`, `title`, `endTime`, `contents`, ...) is kept verbatim in `extra` so
//! the record can be dumped back out in full for diagnostics.
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Accept any JSON value for a text field. Strings pass through, `null` becomes
/// `None`, anything else is kept as its JSON text so one odd record cannot fail
/// the whole page.
fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Null => None,
        Value::String(s) => Some(s),
        other => Some(other.to_string()),
    })
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Lifelog {
    #[serde(
        rename = "startTime",
        default,
        deserialize_with = "lenient_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub start_time: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub markdown: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Lifelog {
    pub fn new(start_time: Option<&str>, markdown: Option<&str>) -> Self {
        Self {
            start_time: start_time.map(str::to_string),
            markdown: markdown.map(str::to_string),
            extra: Map::new(),
        }
    }

    /// The start time, treating an empty string the same as a missing field.
    pub fn start_time(&self) -> Option<&str> {
        self.start_time.as_deref().filter(|s| !s.is_empty())
    }

    pub fn markdown(&self) -> &str {
        self.markdown.as_deref().unwrap_or("")
    }

    /// Field names in the order they appear when serialized.
    pub fn keys(&self) -> Vec<String> {
        let mut keys = Vec::with_capacity(self.extra.len() + 2);
        if self.start_time.is_some() {
            keys.push("startTime".to_string());
        }
        if self.markdown.is_some() {
            keys.push("markdown".to_string());
        }
        keys.extend(self.extra.keys().cloned());
        keys
    }
}
