//! Pinboard `posts/all` records.
//!
//! Pinboard keeps a single timestamp per post, so it stands in for creation,
//! modification and access time alike.

use serde_json::{Map, Value};

use super::decode_batch;
use crate::error::{Error, Result};
use crate::models::timestamp::parse_timestamp;
use crate::models::{Pin, Tags};

pub const SOURCE_NAME: &str = "pinboard";

/// Decode a `posts/all` response body, skipping malformed posts
pub fn decode_posts(json: &str) -> Result<Vec<Pin>> {
    let posts: Vec<Map<String, Value>> = serde_json::from_str(json)
        .map_err(|e| Error::ParseFailure(format!("pinboard posts: {e}")))?;
    Ok(decode_batch(SOURCE_NAME, &posts, |post| post_to_pin(post).map(Some)))
}

/// Map one Pinboard post to a pin
pub fn post_to_pin(post: &Map<String, Value>) -> Result<Pin> {
    let time = parse_timestamp(field(post, "time")?)?;
    Ok(Pin {
        url: field(post, "href")?.to_string(),
        tombstone: false,
        title: field(post, "description")?.to_string(),
        tags: field(post, "tags")?.split(' ').collect::<Tags>(),
        notes: field(post, "extended")?.to_string(),
        created_at: time,
        modified_at: time,
        accessed_at: time,
        is_read: field(post, "toread")? == "no",
        progress_page_scroll: 0,
        progress_page_scroll_max: 0,
        progress_pdf_page: 0,
        progress_pdf_page_max: 0,
    })
}

fn field<'a>(post: &'a Map<String, Value>, key: &str) -> Result<&'a str> {
    post.get(key)
        .and_then(Value::as_str)
        .ok_or_else(|| Error::NotFound(format!("pinboard post field {key}")))
}
