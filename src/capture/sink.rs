//! Client and discard sinks.

use std::sync::{Mutex, MutexGuard, PoisonError};

use axum::{
    body::Body,
    http::{HeaderMap, HeaderName, HeaderValue, StatusCode},
    response::Response,
};
use bytes::{Bytes, BytesMut};

use super::ResponseSink;

// == Client Sink ==
/// Sink that assembles the response delivered to a real client.
///
/// The head is committed by the first status write (or the first body write,
/// which implies `200`). Header edits and status writes after that are ignored,
/// as they would be on a live connection.
#[derive(Debug, Default)]
pub struct ClientSink {
    state: Mutex<ClientState>,
}

#[derive(Debug, Default)]
struct ClientState {
    headers: HeaderMap,
    status: Option<StatusCode>,
    body: BytesMut,
}

impl ClientSink {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, ClientState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// True once a status has been written, i.e. something reached the client.
    #[cfg(test)]
    pub(crate) fn is_committed(&self) -> bool {
        self.state().status.is_some()
    }

    /// Current header set as the client would see it.
    pub fn headers(&self) -> HeaderMap {
        self.state().headers.clone()
    }

    /// Moves the accumulated response out, leaving the sink empty.
    pub fn take_response(&self) -> Response {
        let state = std::mem::take(&mut *self.state());

        let mut response = Response::new(Body::from(state.body.freeze()));
        *response.status_mut() = state.status.unwrap_or(StatusCode::OK);
        *response.headers_mut() = state.headers;
        response
    }

    /// Body bytes written so far.
    pub fn body(&self) -> Bytes {
        Bytes::copy_from_slice(&self.state().body)
    }
}

impl ResponseSink for ClientSink {
    fn insert_header(&self, name: HeaderName, value: HeaderValue) {
        let mut state = self.state();
        if state.status.is_none() {
            state.headers.insert(name, value);
        }
    }

    fn append_header(&self, name: HeaderName, value: HeaderValue) {
        let mut state = self.state();
        if state.status.is_none() {
            state.headers.append(name, value);
        }
    }

    fn write_status(&self, status: StatusCode) {
        let mut state = self.state();
        if state.status.is_none() {
            state.status = Some(status);
        }
    }

    fn write(&self, chunk: &[u8]) -> usize {
        let mut state = self.state();
        if state.status.is_none() {
            state.status = Some(StatusCode::OK);
        }
        state.body.extend_from_slice(chunk);
        chunk.len()
    }
}

// == Discard Sink ==
/// Null sink used for background refresh: everything is accepted and dropped.
#[derive(Debug, Default, Clone, Copy)]
pub struct DiscardSink;

impl ResponseSink for DiscardSink {
    fn insert_header(&self, _name: HeaderName, _value: HeaderValue) {}

    fn append_header(&self, _name: HeaderName, _value: HeaderValue) {}

    fn write_status(&self, _status: StatusCode) {}

    fn write(&self, chunk: &[u8]) -> usize {
        chunk.len()
    }
}
