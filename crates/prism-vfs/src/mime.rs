//! Content sniffing. The mimetype never depends on the file name.

use crate::node::Content;

const PNG: &[u8] = &[0x89, 0x50, 0x4E, 0x47];
const JPEG: &[u8] = &[0xFF, 0xD8, 0xFF];
const GIF: &[u8] = &[0x47, 0x49, 0x46, 0x38];
const RIFF: &[u8] = b"RIFF";
const WEBP: &[u8] = b"WEBP";

/// Mimetype for a payload.
#[must_use]
pub fn sniff(content: &Content) -> &'static str {
    match content {
        Content::Text(text) => sniff_text(text),
        Content::Json(_) => "application/json",
        Content::Binary(bytes) => sniff_bytes(bytes),
    }
}

/// Classify text by its leading characters.
#[must_use]
pub fn sniff_text(text: &str) -> &'static str {
    let trimmed = text.trim_start();
    if trimmed.starts_with('{') || trimmed.starts_with('[') {
        "application/json"
    } else if trimmed.starts_with("<!DOCTYPE html") || trimmed.starts_with("<html") {
        "text/html"
    } else if trimmed.starts_with("<svg") {
        "image/svg+xml"
    } else {
        "text/plain"
    }
}

/// Classify bytes by magic prefix.
#[must_use]
pub fn sniff_bytes(bytes: &[u8]) -> &'static str {
    if bytes.starts_with(PNG) {
        "image/png"
    } else if bytes.starts_with(JPEG) {
        "image/jpeg"
    } else if bytes.starts_with(GIF) {
        "image/gif"
    } else if bytes.starts_with(RIFF) && bytes.get(8..12) == Some(WEBP) {
        "image/webp"
    } else {
        "application/octet-stream"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_heuristics() {
        assert_eq!(sniff(&Content::from(r#"{"a":1}"#)), "application/json");
        assert_eq!(sniff(&Content::from("  [1, 2]")), "application/json");
        assert_eq!(sniff(&Content::from("<!DOCTYPE html><p>")), "text/html");
        assert_eq!(sniff(&Content::from("\n<html>")), "text/html");
        assert_eq!(sniff(&Content::from("<svg xmlns=''/>")), "image/svg+xml");
        assert_eq!(sniff(&Content::from("hello")), "text/plain");
        assert_eq!(sniff(&Content::from("")), "text/plain");
    }

    #[test]
    fn test_structured_content_is_json() {
        assert_eq!(
            sniff(&Content::from(serde_json::json!({"a": 1}))),
            "application/json"
        );
    }

    #[test]
    fn test_magic_bytes() {
        assert_eq!(sniff_bytes(&[0x89, 0x50, 0x4E, 0x47, 0x0D]), "image/png");
        assert_eq!(sniff_bytes(&[0xFF, 0xD8, 0xFF, 0xE0]), "image/jpeg");
        assert_eq!(sniff_bytes(b"GIF89a"), "image/gif");
        assert_eq!(sniff_bytes(b"RIFF\0\0\0\0WEBPVP8 "), "image/webp");
        assert_eq!(sniff_bytes(b"RIFF\0\0\0\0WAVE"), "application/octet-stream");
        assert_eq!(sniff_bytes(&[0x89, 0x50]), "application/octet-stream");
        assert_eq!(sniff_bytes(&[]), "application/octet-stream");
    }
}
