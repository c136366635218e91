//! Response Capture Module
//!
//! The response sink abstraction handlers write into, the sinks that deliver
//! to a client or nowhere, and the bounded recorder that sits in between.

mod recorder;
mod sink;

pub use recorder::ResponseRecorder;
pub use sink::{ClientSink, DiscardSink};

use axum::http::{HeaderMap, HeaderName, HeaderValue, StatusCode};

// == Response Sink ==
/// Destination of a handler's response.
///
/// Follows HTTP framing: headers are set first, `write_status` fixes the head,
/// then body bytes follow. Writing body bytes before any status implies `200`.
/// Methods take `&self`; implementations synchronize internally so a sink can
/// be shared between the handler and the code that owns the request.
pub trait ResponseSink: Send + Sync {
    /// Sets a header, replacing previous values of the same name.
    fn insert_header(&self, name: HeaderName, value: HeaderValue);

    /// Adds a header value, keeping previous values of the same name.
    fn append_header(&self, name: HeaderName, value: HeaderValue);

    /// Fixes the response status.
    fn write_status(&self, status: StatusCode);

    /// Writes body bytes and returns how many were consumed.
    fn write(&self, chunk: &[u8]) -> usize;

    /// Appends every value of `headers`, in order.
    fn append_headers(&self, headers: &HeaderMap) {
        for (name, value) in headers {
            self.append_header(name.clone(), value.clone());
        }
    }
}
