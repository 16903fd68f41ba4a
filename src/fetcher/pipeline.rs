use crate::fetcher::types::{Charset, PageResponse};
use bytes::Bytes;
use chrono::Utc;
use encoding_rs::Encoding;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::{StatusCode, header::HeaderMap};
use tracing::warn;
use url::Url;

static CHARSET_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)charset\s*=\s*["']?([^"'\s;]+)"#).unwrap());

static META_CHARSET_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)<meta\s+[^>]*?charset\s*=\s*["']?([^"'\s/>]+)"#).unwrap());

/// Bytes scanned for a `<meta>` charset declaration.
const META_SCAN_BYTES: usize = 4096;

/// Decode a successful response body into a [`PageResponse`].
pub fn process_response(
    url_final: Url,
    status: StatusCode,
    headers: HeaderMap,
    body_bytes: Bytes,
    content_type: &str,
) -> PageResponse {
    let charset = detect_charset(content_type, &body_bytes);
    let body_utf8 = decode_to_utf8(&body_bytes, &charset, &url_final);

    PageResponse {
        url_final,
        status,
        headers,
        body_raw: body_bytes,
        body_utf8,
        charset,
        fetched_at: Utc::now(),
    }
}

/// Header charset, then `<meta>` declaration, then chardetng's guess.
pub fn detect_charset(content_type: &str, body_bytes: &[u8]) -> Charset {
    if let Some(charset) = label_from(&CHARSET_REGEX, content_type) {
        return charset;
    }

    let search_bytes = &body_bytes[..body_bytes.len().min(META_SCAN_BYTES)];
    let search_str = String::from_utf8_lossy(search_bytes);

    // Covers both <meta charset> and the http-equiv content="...; charset=" form.
    if let Some(charset) = label_from(&META_CHARSET_REGEX, &search_str) {
        return charset;
    }

    let mut detector = chardetng::EncodingDetector::new();
    detector.feed(search_bytes, body_bytes.len() <= META_SCAN_BYTES);
    Charset::from_encoding(detector.guess(Some(b"kr"), true))
}

fn label_from(regex: &Regex, haystack: &str) -> Option<Charset> {
    let label = regex.captures(haystack)?.get(1)?.as_str().to_lowercase();
    Encoding::for_label(label.as_bytes()).map(Charset::from_encoding)
}

fn decode_to_utf8(body_bytes: &[u8], charset: &Charset, url: &Url) -> String {
    let encoding = charset.encoding();
    let (decoded, _encoding, had_errors) = encoding.decode(body_bytes);

    // Government pages routinely carry a few malformed bytes; keep the
    // replacement characters rather than losing the page.
    if had_errors {
        warn!(url = %url, encoding = encoding.name(), "body contained malformed sequences");
    }

    decoded.into_owned()
}
