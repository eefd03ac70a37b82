//! Exported Firestore pin documents.
//!
//! Documents use the snapshot field names but older ones omit `tombstone`,
//! and some carry null progress counters. Timestamps come either as text or
//! as `{seconds, nanoseconds}` objects.

use chrono::{DateTime, SubsecRound, Utc};
use serde_json::{Map, Value};

use super::decode_batch;
use crate::error::{Error, Result};
use crate::models::timestamp::parse_timestamp;
use crate::models::{Pin, Tags};

pub const SOURCE_NAME: &str = "firestore";

const PROGRESS_FIELDS: [&str; 4] = [
    "progress_page_scroll",
    "progress_page_scroll_max",
    "progress_pdf_page",
    "progress_pdf_page_max",
];

/// Decode an exported array of documents, skipping malformed ones
pub fn decode_documents(json: &str) -> Result<Vec<Pin>> {
    let docs: Vec<Value> = serde_json::from_str(json)
        .map_err(|e| Error::ParseFailure(format!("firestore documents: {e}")))?;
    Ok(decode_batch(SOURCE_NAME, &docs, document_to_pin))
}

/// Map one document to a pin; a null document has no pin
pub fn document_to_pin(doc: &Value) -> Result<Option<Pin>> {
    let doc = match doc {
        Value::Null => return Ok(None),
        Value::Object(doc) => doc,
        other => {
            return Err(Error::ParseFailure(format!(
                "firestore document is not an object: {other}"
            )))
        }
    };

    Ok(Some(Pin {
        url: text(doc, "url")?.to_string(),
        tombstone: match doc.get("tombstone") {
            None | Some(Value::Null) => false,
            Some(value) => value
                .as_bool()
                .ok_or_else(|| Error::ParseFailure(format!("tombstone: {value}")))?,
        },
        title: text(doc, "title")?.to_string(),
        tags: tags(doc)?,
        notes: text(doc, "notes")?.to_string(),
        created_at: timestamp(doc, "created_at")?,
        modified_at: timestamp(doc, "modified_at")?,
        accessed_at: timestamp(doc, "accessed_at")?,
        is_read: required(doc, "is_read")?
            .as_bool()
            .ok_or_else(|| Error::ParseFailure("is_read is not a bool".into()))?,
        progress_page_scroll: counter(doc, PROGRESS_FIELDS[0])?,
        progress_page_scroll_max: counter(doc, PROGRESS_FIELDS[1])?,
        progress_pdf_page: counter(doc, PROGRESS_FIELDS[2])?,
        progress_pdf_page_max: counter(doc, PROGRESS_FIELDS[3])?,
    }))
}

fn required<'a>(doc: &'a Map<String, Value>, key: &str) -> Result<&'a Value> {
    doc.get(key)
        .filter(|value| !value.is_null())
        .ok_or_else(|| Error::NotFound(format!("firestore field {key}")))
}

fn text<'a>(doc: &'a Map<String, Value>, key: &str) -> Result<&'a str> {
    required(doc, key)?
        .as_str()
        .ok_or_else(|| Error::ParseFailure(format!("{key} is not a string")))
}

fn tags(doc: &Map<String, Value>) -> Result<Tags> {
    let Value::Array(values) = required(doc, "tags")? else {
        return Err(Error::ParseFailure("tags is not an array".into()));
    };
    values
        .iter()
        .map(|value| {
            value
                .as_str()
                .ok_or_else(|| Error::ParseFailure(format!("tag is not a string: {value}")))
        })
        .collect()
}

fn counter(doc: &Map<String, Value>, key: &str) -> Result<u32> {
    match doc.get(key) {
        None | Some(Value::Null) => Ok(0),
        Some(value) => value
            .as_u64()
            .and_then(|v| u32::try_from(v).ok())
            .ok_or_else(|| Error::ParseFailure(format!("{key} is not a counter: {value}"))),
    }
}

fn timestamp(doc: &Map<String, Value>, key: &str) -> Result<DateTime<Utc>> {
    match required(doc, key)? {
        Value::String(raw) => parse_timestamp(raw),
        Value::Object(fields) => {
            let seconds = fields
                .get("seconds")
                .or_else(|| fields.get("_seconds"))
                .and_then(Value::as_i64)
                .ok_or_else(|| Error::ParseFailure(format!("{key} has no seconds")))?;
            let nanos = fields
                .get("nanoseconds")
                .or_else(|| fields.get("_nanoseconds"))
                .and_then(Value::as_u64)
                .unwrap_or(0);
            let nanos = u32::try_from(nanos)
                .map_err(|_| Error::ParseFailure(format!("{key} nanoseconds out of range")))?;
            DateTime::from_timestamp(seconds, nanos)
                .map(|at| at.trunc_subsecs(3))
                .ok_or_else(|| Error::ParseFailure(format!("{key} out of range")))
        }
        other => Err(Error::ParseFailure(format!("{key} is not a timestamp: {other}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn doc() -> Value {
        json!({
            "schema_version": "v1",
            "url": "https://a.com",
            "title": "A",
            "tags": ["x", "y"],
            "notes": "n",
            "created_at": {"seconds": 1_657_343_563, "nanoseconds": 123_456_789},
            "modified_at": "2022-07-09T05:12:43.123+0000",
            "accessed_at": {"_seconds": 1_657_343_563, "_nanoseconds": 0},
            "is_read": true,
            "progress_page_scroll": null,
            "progress_pdf_page": 4
        })
    }

    #[test]
    fn test_document_defaults() {
        let pin = document_to_pin(&doc()).unwrap().unwrap();
        let at = Utc.timestamp_millis_opt(1_657_343_563_123).unwrap();

        assert_eq!(pin.url, "https://a.com");
        assert!(!pin.tombstone);
        assert_eq!(pin.tags.as_slice(), ["x", "y"]);
        assert_eq!(pin.created_at, at);
        assert_eq!(pin.modified_at, at);
        assert_eq!(pin.accessed_at, Utc.timestamp_opt(1_657_343_563, 0).unwrap());
        assert!(pin.is_read);
        assert_eq!(pin.progress_page_scroll, 0);
        assert_eq!(pin.progress_page_scroll_max, 0);
        assert_eq!(pin.progress_pdf_page, 4);
    }

    #[test]
    fn test_null_document() {
        assert!(document_to_pin(&Value::Null).unwrap().is_none());
    }

    #[test]
    fn test_missing_url() {
        let mut doc = doc();
        doc.as_object_mut().unwrap().remove("url");
        assert!(matches!(document_to_pin(&doc), Err(Error::NotFound(_))));
    }

    #[test]
    fn test_decode_documents_skips_bad_records() {
        let json = serde_json::to_string(&json!([doc(), null, {"url": "https://b.com"}, 7])).unwrap();
        let pins = decode_documents(&json).unwrap();
        assert_eq!(pins.len(), 1);
        assert_eq!(pins[0].url, "https://a.com");
    }
}
