//! Output ordering and rendering of final result sets.

use anyhow::{Context, Result};
use serde::Serialize;

/// Records that carry a unique URL-like key.
pub trait UrlKeyed {
    fn url_key(&self) -> &str;
}

/// Sort descending by URL. Stable, so equal keys keep input order.
pub fn sort_by_url_desc<T: UrlKeyed>(mut items: Vec<T>) -> Vec<T> {
    items.sort_by(|a, b| b.url_key().cmp(a.url_key()));
    items
}

/// Render as JSON indented with a single space per level.
pub fn render_json<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    let mut buf = Vec::new();
    let fmt = serde_json::ser::PrettyFormatter::with_indent(b" ");
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, fmt);
    value.serialize(&mut ser).context("serialize output json")?;
    String::from_utf8(buf).context("output json is not utf-8")
}
