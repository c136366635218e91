//! Header Sanitizing
//!
//! Strips connection-scoped (hop-by-hop) headers before a response is stored.

use axum::http::{header, HeaderMap, HeaderName};

/// Headers that only make sense for a single transport connection.
const HOP_BY_HOP: [HeaderName; 9] = [
    header::CONNECTION,
    HeaderName::from_static("proxy-connection"),
    HeaderName::from_static("keep-alive"),
    header::PROXY_AUTHENTICATE,
    header::PROXY_AUTHORIZATION,
    header::TE,
    header::TRAILER,
    header::TRANSFER_ENCODING,
    header::UPGRADE,
];

/// Returns a copy of `headers` without hop-by-hop headers.
///
/// Besides the fixed list, every header named as a token in a `Connection`
/// value is removed too. The input is left untouched.
pub fn strip_hop_by_hop(headers: &HeaderMap) -> HeaderMap {
    let mut cleaned = headers.clone();

    for name in &HOP_BY_HOP {
        cleaned.remove(name);
    }

    for value in headers.get_all(header::CONNECTION) {
        let Ok(value) = value.to_str() else {
            continue;
        };
        for token in value.split(',').map(str::trim).filter(|t| !t.is_empty()) {
            if let Ok(name) = HeaderName::from_bytes(token.as_bytes()) {
                cleaned.remove(name);
            }
        }
    }

    cleaned
}
