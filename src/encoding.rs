//! URL and form encoding helpers.
//!
//! These are the low-level decoding routines shared by [`crate::request`]:
//! percent-encoding round trips, query-string parsing with last-wins
//! duplicate handling, and Cookie header splitting.

use std::collections::HashMap;

/// Percent-encode a string for use in a URL.
///
/// Every byte outside the unreserved set is encoded as `%XX`; UTF-8
/// input is encoded byte-by-byte. The output round-trips through
/// [`url_decode`].
#[must_use]
pub fn url_encode(s: &str) -> String {
    urlencoding::encode(s).into_owned()
}

/// Decode a percent-encoded string.
///
/// `+` is treated as a space (form encoding convention) before percent
/// sequences are decoded. Invalid percent sequences or non-UTF-8 bytes
/// are decoded lossily rather than rejected, since gateway input is not
/// trusted to be well formed.
#[must_use]
pub fn url_decode(s: &str) -> String {
    let plus_decoded = s.replace('+', " ");
    let bytes = urlencoding::decode_binary(plus_decoded.as_bytes());
    String::from_utf8_lossy(&bytes).into_owned()
}

/// Parse a query string (or form-urlencoded body) into a map.
///
/// Duplicate keys are last-wins: `?a=1&a=2` yields `a=2`.
#[must_use]
pub fn parse_query_string(query: &str) -> HashMap<String, String> {
    url::form_urlencoded::parse(query.as_bytes())
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect()
}

/// Parse a `Cookie` header value into name/value pairs.
///
/// Pairs are `;`-separated and whitespace-trimmed. Quoted cookie values
/// are not unescaped: a value of `"a;b"` is split at the `;` like any
/// other. Applications that need quoted values must encode them first.
#[must_use]
pub fn parse_cookie_header(raw: &str) -> HashMap<String, String> {
    raw.split(';')
        .filter_map(|pair| {
            let mut parts = pair.trim().splitn(2, '=');
            let name = parts.next()?.trim();
            if name.is_empty() {
                return None;
            }
            let value = parts.next().unwrap_or("").trim();
            Some((name.to_string(), value.to_string()))
        })
        .collect()
}
