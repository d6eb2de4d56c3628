//! Plain-text previews of upstream bodies.

use linktrack_core::update::{PREVIEW_LIMIT, truncate_bytes};
use once_cell::sync::Lazy;
use regex::Regex;

static TAG: Lazy<Regex> =
  Lazy::new(|| Regex::new(r"(?s)<[^>]*>").expect("static regex is valid"));
static SPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("static regex is valid"));

/// Strip HTML tags, decode the handful of entities Stack Overflow emits,
/// collapse whitespace and cut to [`PREVIEW_LIMIT`] bytes.
pub fn html_preview(html: &str) -> String {
  let text = TAG.replace_all(html, " ");
  plain_preview(&decode_entities(&text))
}

/// Decode the HTML entities the Stack Exchange API leaves in titles and
/// bodies. `&amp;` goes last so `&amp;lt;` stays literal.
pub fn decode_entities(text: &str) -> String {
  text
    .replace("&lt;", "<")
    .replace("&gt;", ">")
    .replace("&quot;", "\"")
    .replace("&#39;", "'")
    .replace("&amp;", "&")
}

/// Collapse whitespace and cut to [`PREVIEW_LIMIT`] bytes.
pub fn plain_preview(text: &str) -> String {
  let collapsed = SPACE.replace_all(text.trim(), " ");
  truncate_bytes(&collapsed, PREVIEW_LIMIT).trim_end().to_owned()
}
