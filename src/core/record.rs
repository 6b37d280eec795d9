//! # Scan Records
//!
//! One `ScanRecord` is created per successful decode. Records are immutable
//! once built and are owned by a `HistoryStore` after insertion.
//!
//! The serialized shape matches what the history keys have always held:
//!
//! ```text
//! { "data": "https://example.com", "type": "link", "timestamp": 1718000000000 }
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::classify::{Classification, classify};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanKind {
    Text,
    Link,
}

impl ScanKind {
    pub fn label(&self) -> &'static str {
        match self {
            ScanKind::Text => "text",
            ScanKind::Link => "link",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanRecord {
    #[serde(rename = "data")]
    pub payload: String,
    #[serde(rename = "type")]
    pub kind: ScanKind,
    #[serde(rename = "timestamp", with = "chrono::serde::ts_milliseconds")]
    pub captured_at: DateTime<Utc>,
}

impl ScanRecord {
    /// Classifies `payload` and stamps it with `captured_at`.
    pub fn new(payload: impl Into<String>, captured_at: DateTime<Utc>) -> Self {
        let payload = payload.into();
        let kind = match classify(&payload) {
            Classification::Link(_) => ScanKind::Link,
            Classification::Text(_) => ScanKind::Text,
        };
        Self {
            payload,
            kind,
            captured_at,
        }
    }

    pub fn now(payload: impl Into<String>) -> Self {
        Self::new(payload, Utc::now())
    }

    pub fn is_link(&self) -> bool {
        self.kind == ScanKind::Link
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_new_classifies_payload() {
        let at = Utc.timestamp_millis_opt(1_700_000_000_000).unwrap();
        assert_eq!(ScanRecord::new("https://a.com", at).kind, ScanKind::Link);
        assert_eq!(ScanRecord::new("hello", at).kind, ScanKind::Text);
    }

    #[test]
    fn test_serialized_shape() {
        let at = Utc.timestamp_millis_opt(1_700_000_000_123).unwrap();
        let record = ScanRecord::new("https://a.com", at);
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["data"], "https://a.com");
        assert_eq!(json["type"], "link");
        assert_eq!(json["timestamp"], 1_700_000_000_123i64);
    }

    #[test]
    fn test_deserializes_legacy_entry_with_extra_fields() {
        // Older entries also carry a preformatted "time" string; it is ignored.
        let json = r#"{"data":"hi","time":"10:00:00","type":"text","timestamp":1700000000000}"#;
        let record: ScanRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.payload, "hi");
        assert_eq!(record.kind, ScanKind::Text);
    }
}
