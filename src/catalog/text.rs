// src/catalog/text.rs
use once_cell::sync::OnceCell;
use regex::Regex;

/// Scrub upstream text for storage: decode HTML entities, drop markup,
/// collapse whitespace. Output keeps its full length; display truncation
/// belongs to the view layer.
pub fn clean_text(s: &str) -> String {
    // 1) HTML entity decode
    let mut out = html_escape::decode_html_entities(s).to_string();

    // 2) Strip HTML tags
    static RE_TAGS: OnceCell<Regex> = OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| Regex::new(r"(?is)</?[^>]+>").unwrap());
    out = re_tags.replace_all(&out, "").to_string();

    // 3) Collapse whitespace
    static RE_WS: OnceCell<Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| Regex::new(r"\s+").unwrap());
    out = re_ws.replace_all(&out, " ").to_string();

    out.trim().to_string()
}

/// `clean_text`, then fall back to `default` when nothing is left.
pub fn clean_or(s: Option<&str>, default: &str) -> String {
    let cleaned = s.map(clean_text).unwrap_or_default();
    if cleaned.is_empty() {
        default.to_string()
    } else {
        cleaned
    }
}
