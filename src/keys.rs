//! Cache Key Functions
//!
//! Deterministic mappings from a request to a cache key. An empty key means
//! "do not cache this request".

use std::sync::Arc;

use axum::http::{HeaderName, Method, Request};
use bytes::Bytes;
use sha2::{Digest, Sha256};

/// A key function as stored in [`crate::CacheConfig`].
pub type KeyFn = Arc<dyn Fn(&Request<Bytes>) -> String + Send + Sync>;

/// `cache:{METHOD}:{path}`. The query string is not part of the key.
pub fn default_key(req: &Request<Bytes>) -> String {
    format!("cache:{}:{}", req.method(), req.uri().path())
}

/// Method and path, plus the listed request headers and a body hash.
///
/// Each header in `include` that carries a non-empty value is appended as
/// `:{name}={value}`, values that are not visible ASCII as `:{name}=0x{hex}`. `POST` and `PUT` requests with a non-empty body get a
/// trailing `:body_hash={sha256}`. The body itself is only borrowed.
pub fn advanced_key(req: &Request<Bytes>, include: &[HeaderName]) -> String {
    let mut key = format!("{}:{}", req.method(), req.uri().path());

    for name in include {
        let Some(value) = req.headers().get(name) else {
            continue;
        };
        if value.is_empty() {
            continue;
        }
        match value.to_str() {
            Ok(text) => key.push_str(&format!(":{}={}", name, text)),
            // Opaque bytes are keyed by their hex form
            Err(_) => {
                key.push_str(&format!(":{}=0x{}", name, hex::encode(value.as_bytes())))
            }
        }
    }

    let hashes_body = req.method() == Method::POST || req.method() == Method::PUT;
    if hashes_body && !req.body().is_empty() {
        key.push_str(":body_hash=");
        key.push_str(&sha256_hex(req.body()));
    }

    key
}

/// Builds a [`KeyFn`] around [`advanced_key`].
pub fn with_headers<I>(include: I) -> KeyFn
where
    I: IntoIterator<Item = HeaderName>,
{
    let include: Vec<HeaderName> = include.into_iter().collect();
    Arc::new(move |req: &Request<Bytes>| advanced_key(req, &include))
}

fn sha256_hex(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}
