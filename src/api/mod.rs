//! Remote content API: the operations the uploader needs and their HTTP binding.

mod http;

use anyhow::{Result, bail};
use serde_json::Value;

use crate::links::LinkRecord;
use crate::model::{CategoryPayload, IndexPayload, TermPayload, TextVersion};

pub use http::HttpPechaApi;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ApiOutcome {
    Created,
    AlreadyExists,
}

/// Entity-level operations against the content API.
///
/// Posting an entity that already exists is not a failure.
pub trait PechaApi {
    fn post_term(&self, term: &TermPayload) -> Result<ApiOutcome>;
    fn post_category(&self, category: &CategoryPayload) -> Result<ApiOutcome>;
    fn post_index(&self, index: &IndexPayload) -> Result<ApiOutcome>;
    fn post_text(&self, text_ref: &str, version: &TextVersion) -> Result<ApiOutcome>;
    fn post_links(&self, links: &[LinkRecord]) -> Result<ApiOutcome>;

    fn remove_term(&self, name: &str) -> Result<()>;
    fn remove_category(&self, path: &[String]) -> Result<()>;
    fn remove_index(&self, title: &str) -> Result<()>;
    fn remove_text(&self, title: &str) -> Result<()>;
    fn remove_links(&self, title: &str) -> Result<()>;

    fn get_text(&self, text_ref: &str) -> Result<Value>;
    fn get_index(&self, title: &str) -> Result<Value>;
    fn get_links(&self, reference: &str, with_text: bool) -> Result<Value>;
}

/// Number of versions in a `get_text` reply; an error reply has none.
pub fn version_count(text: &Value) -> usize {
    if text.get("error").is_some() {
        return 0;
    }
    text.get("versions")
        .and_then(Value::as_array)
        .map_or(0, Vec::len)
}

/// Reads the API's JSON reply; an `error` field marks a rejected request.
pub fn classify_response(body: &str) -> Result<ApiOutcome> {
    let message = match serde_json::from_str::<Value>(body) {
        Ok(Value::Object(map)) => match map.get("error") {
            Some(Value::String(message)) => Some(message.clone()),
            Some(other) => Some(other.to_string()),
            None => None,
        },
        Ok(_) => None,
        Err(_) if body.contains("error") => Some(body.trim().to_string()),
        Err(_) => None,
    };

    match message {
        None => Ok(ApiOutcome::Created),
        Some(message) if message.contains("already exists") => Ok(ApiOutcome::AlreadyExists),
        Some(message) => bail!("{message}"),
    }
}
