//! Response Recorder
//!
//! Captures status, headers and body written by a handler, with a byte cap on
//! what is kept for caching.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use axum::http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use bytes::{Bytes, BytesMut};

use super::ResponseSink;

// == Response Recorder ==
/// Stands in for the real sink while a handler runs.
///
/// Body bytes are buffered until the cap is reached. At that point the
/// capture is marked over capacity, the head and the buffered prefix are
/// flushed to the real sink, and every later byte is forwarded straight
/// through. The client therefore always receives the full body while the
/// recorded body never exceeds the cap.
pub struct ResponseRecorder {
    state: Mutex<RecorderState>,
    sink: Arc<dyn ResponseSink>,
    cap: Option<usize>,
}

#[derive(Debug, Default)]
struct RecorderState {
    status: Option<StatusCode>,
    headers: HeaderMap,
    body: BytesMut,
    over_capacity: bool,
    flushed: bool,
}

impl ResponseRecorder {
    // == Constructor ==
    /// Creates a recorder delivering to `sink`. `cap` of `None` buffers everything.
    pub fn new(sink: Arc<dyn ResponseSink>, cap: Option<usize>) -> Self {
        Self {
            state: Mutex::new(RecorderState::default()),
            sink,
            cap,
        }
    }

    fn state(&self) -> MutexGuard<'_, RecorderState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // == Accessors ==
    /// Recorded status, `200` if the handler never set one.
    pub fn status(&self) -> StatusCode {
        self.state().status.unwrap_or(StatusCode::OK)
    }

    pub fn headers(&self) -> HeaderMap {
        self.state().headers.clone()
    }

    /// Copy of the buffered body (at most `cap` bytes).
    pub fn body(&self) -> Bytes {
        Bytes::copy_from_slice(&self.state().body)
    }

    /// True once the handler wrote more than the cap. Such a capture must not be cached.
    pub fn is_over_capacity(&self) -> bool {
        self.state().over_capacity
    }

    /// True once anything has been delivered to the real sink.
    pub fn is_flushed(&self) -> bool {
        self.state().flushed
    }

    // == Flush ==
    /// Delivers headers, then status, then body to the real sink.
    ///
    /// Only the first call delivers; later calls do nothing.
    pub fn flush(&self) {
        let mut state = self.state();
        self.deliver(&mut state);
    }

    fn deliver(&self, state: &mut RecorderState) {
        if state.flushed {
            return;
        }
        state.flushed = true;

        self.sink.append_headers(&state.headers);
        self.sink
            .write_status(state.status.unwrap_or(StatusCode::OK));
        if !state.body.is_empty() {
            self.sink.write(&state.body);
        }
    }
}

impl ResponseSink for ResponseRecorder {
    fn insert_header(&self, name: HeaderName, value: HeaderValue) {
        self.state().headers.insert(name, value);
    }

    fn append_header(&self, name: HeaderName, value: HeaderValue) {
        self.state().headers.append(name, value);
    }

    fn write_status(&self, status: StatusCode) {
        self.state().status = Some(status);
    }

    fn write(&self, chunk: &[u8]) -> usize {
        let mut state = self.state();

        if state.flushed {
            self.sink.write(chunk);
            return chunk.len();
        }

        let Some(cap) = self.cap else {
            state.body.extend_from_slice(chunk);
            return chunk.len();
        };

        let remaining = cap.saturating_sub(state.body.len());
        if chunk.len() <= remaining {
            state.body.extend_from_slice(chunk);
        } else {
            let (kept, rest) = chunk.split_at(remaining);
            state.body.extend_from_slice(kept);
            state.over_capacity = true;
            self.deliver(&mut state);
            self.sink.write(rest);
        }
        chunk.len()
    }
}
