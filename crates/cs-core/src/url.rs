//! Fast URL slicing utilities for the interception hot path
//!
//! These functions work directly on string slices. Page code hands us both
//! absolute URLs and bare pathnames (`/graphql/`), so every helper accepts
//! either form.

use std::collections::BTreeMap;

// =============================================================================
// Path / Query
// =============================================================================

/// Offset just past `scheme://`, when the URL is absolute.
#[inline]
fn authority_start(url: &str) -> Option<usize> {
    let colon = url.find(|c: char| matches!(c, ':' | '/' | '?' | '#'))?;
    url[colon..].starts_with("://").then_some(colon + 3)
}

/// Path portion of a URL or pathname, without query or fragment. Never empty.
#[inline]
pub fn extract_path(url: &str) -> &str {
    let rest = match authority_start(url) {
        Some(start) => {
            let after_authority = &url[start..];
            match after_authority.find(|c: char| matches!(c, '/' | '?' | '#')) {
                Some(i) if after_authority.as_bytes()[i] == b'/' => &after_authority[i..],
                _ => return "/",
            }
        }
        None => url,
    };
    let path = rest.find(['?', '#']).map_or(rest, |end| &rest[..end]);
    if path.is_empty() {
        "/"
    } else {
        path
    }
}

/// Raw query string without the leading '?', fragment stripped.
#[inline]
pub fn extract_query(url: &str) -> Option<&str> {
    let q_pos = url.find('?')?;
    let rest = &url[q_pos + 1..];
    let query = match rest.find('#') {
        Some(hash_pos) => &rest[..hash_pos],
        None => rest,
    };
    if query.is_empty() {
        None
    } else {
        Some(query)
    }
}

/// Parse the query string into a map. Later duplicates win.
pub fn parse_query_params(url: &str) -> BTreeMap<String, String> {
    let mut params = BTreeMap::new();
    let query = match extract_query(url) {
        Some(q) => q,
        None => return params,
    };

    for pair in query.split('&') {
        if pair.is_empty() {
            continue;
        }
        let (key, value) = match pair.find('=') {
            Some(eq_pos) => (&pair[..eq_pos], &pair[eq_pos + 1..]),
            None => (pair, ""),
        };
        params.insert(percent_decode(key), percent_decode(value));
    }

    params
}

/// Path segment that follows `marker`, e.g. the slug after `problems`.
pub fn segment_after<'a>(url: &'a str, marker: &str) -> Option<&'a str> {
    let mut segments = extract_path(url).split('/').filter(|s| !s.is_empty());
    segments.find(|s| *s == marker)?;
    segments.next()
}

// =============================================================================
// Decoding
// =============================================================================

#[inline]
fn hex_value(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}

/// Decode `%XX` escapes and `+` (form encoding). Invalid escapes pass through.
pub fn percent_decode(s: &str) -> String {
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'+' => out.push(b' '),
            b'%' if i + 2 < bytes.len() => {
                match (hex_value(bytes[i + 1]), hex_value(bytes[i + 2])) {
                    (Some(hi), Some(lo)) => {
                        out.push(hi << 4 | lo);
                        i += 3;
                        continue;
                    }
                    _ => out.push(b'%'),
                }
            }
            b => out.push(b),
        }
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}
