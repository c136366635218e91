//! Caching Middleware
//!
//! The per-request orchestrator sitting between a server and its handler.
//!
//! For `GET`/`HEAD` requests with a non-empty key:
//! - **Fresh** entry: served from the store, `x-cache-stale: NO`.
//! - **Stale** entry: served from the store, `x-cache-stale: YES`, and one
//!   deduplicated background refresh is started.
//! - **Missing or rotten** entry: the handler runs behind a bounded
//!   recorder, an admissible response is persisted in the background, and
//!   the capture is flushed to the client.
//!
//! Every other request passes straight through to the handler.

mod layer;
mod refresh;

pub use layer::{CacheLayer, CacheService, ServiceHandler};
pub use refresh::{RefreshGroup, RefreshPermit};

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use std::sync::Arc;

use axum::http::{header, HeaderName, HeaderValue, Method, Request, StatusCode};
use bytes::Bytes;
use futures_util::FutureExt;
use tracing::{debug, warn};

use crate::cache::{Freshness, ResponseEntry, Store};
use crate::capture::{DiscardSink, ResponseRecorder, ResponseSink};
use crate::config::CacheConfig;
use crate::error::Result;
use crate::tasks::{panic_message, spawn_detached};

// == Diagnostic Headers ==
/// `HIT` or `MISS`
pub const X_CACHE_STATUS: HeaderName = HeaderName::from_static("x-cache-status");
/// `YES` or `NO`, present on hits only
pub const X_CACHE_STALE: HeaderName = HeaderName::from_static("x-cache-stale");

const HIT: HeaderValue = HeaderValue::from_static("HIT");
const MISS: HeaderValue = HeaderValue::from_static("MISS");
const YES: HeaderValue = HeaderValue::from_static("YES");
const NO: HeaderValue = HeaderValue::from_static("NO");

// == Handler Contract ==
/// Future returned by [`Handler::serve`].
pub type HandlerFuture = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

/// Downstream request handler: writes its response into a sink.
///
/// Implemented for every `Fn(Arc<dyn ResponseSink>, Request<Bytes>) -> impl Future<Output = ()>`.
pub trait Handler: Send + Sync + 'static {
    fn serve(&self, sink: Arc<dyn ResponseSink>, req: Request<Bytes>) -> HandlerFuture;
}

impl<F, Fut> Handler for F
where
    F: Fn(Arc<dyn ResponseSink>, Request<Bytes>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    fn serve(&self, sink: Arc<dyn ResponseSink>, req: Request<Bytes>) -> HandlerFuture {
        Box::pin(self(sink, req))
    }
}

/// Only read-style requests are cached.
pub fn is_cacheable_method(method: &Method) -> bool {
    method == Method::GET || method == Method::HEAD
}

// == Cache Middleware ==
/// Caching orchestrator around a [`Handler`]. Cheap to clone.
pub struct CacheMiddleware<S, H> {
    shared: Arc<Shared<S, H>>,
}

struct Shared<S, H> {
    store: Arc<S>,
    handler: H,
    config: CacheConfig,
    refreshes: Arc<RefreshGroup>,
}

impl<S, H> Clone for CacheMiddleware<S, H> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<S: Store, H: Handler> CacheMiddleware<S, H> {
    // == Constructor ==
    /// Wraps `handler` with its own refresh group.
    pub fn new(store: Arc<S>, handler: H, config: CacheConfig) -> Self {
        Self::with_refresh_group(store, handler, config, Arc::new(RefreshGroup::new()))
    }

    /// Wraps `handler`, deduplicating refreshes through a shared group.
    pub fn with_refresh_group(
        store: Arc<S>,
        handler: H,
        config: CacheConfig,
        refreshes: Arc<RefreshGroup>,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                store,
                handler,
                config,
                refreshes,
            }),
        }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.shared.store
    }

    pub fn config(&self) -> &CacheConfig {
        &self.shared.config
    }

    /// Number of background refreshes currently running.
    pub fn refreshes_in_flight(&self) -> usize {
        self.shared.refreshes.in_flight()
    }

    /// Removes the entry stored under `key`.
    pub async fn invalidate(&self, key: &str) -> Result<()> {
        self.shared.store.delete(key).await
    }

    // == Handle ==
    /// Serves one request into `sink`.
    pub async fn handle(&self, sink: Arc<dyn ResponseSink>, req: Request<Bytes>) {
        if !is_cacheable_method(req.method()) {
            return self.shared.handler.serve(sink, req).await;
        }

        let key = (self.shared.config.key_fn)(&req);
        if key.is_empty() {
            debug!(path = %req.uri().path(), "empty cache key, bypassing cache");
            return self.shared.handler.serve(sink, req).await;
        }

        match self.shared.lookup(&key).await {
            Some((entry, freshness)) => self.serve_hit(sink, &key, &entry, freshness, &req),
            None => self.serve_miss(sink, key, req).await,
        }
    }

    fn serve_hit(
        &self,
        sink: Arc<dyn ResponseSink>,
        key: &str,
        entry: &ResponseEntry,
        freshness: Freshness,
        req: &Request<Bytes>,
    ) {
        debug!(cache_key = %key, ?freshness, "cache hit");

        sink.append_headers(&entry.headers);
        sink.insert_header(X_CACHE_STATUS, HIT);
        if freshness == Freshness::Stale {
            sink.insert_header(X_CACHE_STALE, YES);
            self.trigger_refresh(key, req);
        } else {
            sink.insert_header(X_CACHE_STALE, NO);
        }

        sink.write_status(entry.status);
        if !entry.body.is_empty() {
            sink.write(&entry.body);
        }
    }

    async fn serve_miss(&self, sink: Arc<dyn ResponseSink>, key: String, req: Request<Bytes>) {
        debug!(cache_key = %key, "cache miss");
        sink.insert_header(X_CACHE_STATUS, MISS);

        let recorder = Arc::new(ResponseRecorder::new(
            Arc::clone(&sink),
            self.shared.config.body_cap(),
        ));
        let run = self.shared.handler.serve(recorder.clone(), req);

        if let Err(panic) = AssertUnwindSafe(run).catch_unwind().await {
            warn!(
                cache_key = %key,
                panic = %panic_message(panic.as_ref()),
                "handler panicked"
            );
            if !recorder.is_flushed() {
                write_server_error(sink.as_ref());
            }
            return;
        }

        if let Some(entry) = self.shared.admit(&key, &recorder) {
            let shared = Arc::clone(&self.shared);
            spawn_detached("cache-persist", async move {
                shared.persist(&key, entry).await;
            });
        }

        recorder.flush();
    }

    /// Starts a background refresh for `key` unless one is already running.
    fn trigger_refresh(&self, key: &str, req: &Request<Bytes>) {
        let Some(permit) = self.shared.refreshes.try_begin(key) else {
            debug!(cache_key = %key, "refresh already in flight");
            return;
        };

        let shared = Arc::clone(&self.shared);
        let req = detach_request(req);
        spawn_detached("swr-refresh", async move {
            shared.refresh(permit.key(), req).await;
            drop(permit);
        });
    }
}

impl<S: Store, H: Handler> Shared<S, H> {
    async fn lookup(&self, key: &str) -> Option<(Arc<ResponseEntry>, Freshness)> {
        match self.store.get(key).await {
            Ok(Some(entry)) => match entry.freshness() {
                Freshness::Rotten => {
                    debug!(cache_key = %key, "entry is past its stale window");
                    None
                }
                freshness => Some((entry, freshness)),
            },
            Ok(None) => None,
            Err(err) => {
                warn!(cache_key = %key, error = %err, "store lookup failed");
                None
            }
        }
    }

    /// Builds an entry from a finished capture if it may be cached.
    fn admit(&self, key: &str, recorder: &ResponseRecorder) -> Option<Arc<ResponseEntry>> {
        let status = recorder.status();
        if !(self.config.should_cache)(status) {
            debug!(cache_key = %key, %status, "status not admitted");
            return None;
        }
        if recorder.is_over_capacity() {
            debug!(cache_key = %key, "body exceeds cacheable size");
            return None;
        }

        Some(Arc::new(ResponseEntry::new(
            status,
            (self.config.strip_headers)(&recorder.headers()),
            recorder.body(),
            self.config.default_ttl,
            self.config.default_swr,
        )))
    }

    async fn persist(&self, key: &str, entry: Arc<ResponseEntry>) {
        if let Err(err) = self.store.set(key, entry).await {
            warn!(cache_key = %key, error = %err, "failed to store response");
        }
    }

    /// Re-runs the handler into a discard sink and stores the result.
    async fn refresh(&self, key: &str, req: Request<Bytes>) {
        let recorder = Arc::new(ResponseRecorder::new(
            Arc::new(DiscardSink),
            self.config.body_cap(),
        ));
        let run = self.handler.serve(recorder.clone(), req);

        if AssertUnwindSafe(run).catch_unwind().await.is_err() {
            debug!(cache_key = %key, "refresh handler panicked, refresh abandoned");
            return;
        }

        if let Some(entry) = self.admit(key, &recorder) {
            self.persist(key, entry).await;
            debug!(cache_key = %key, "entry refreshed");
        }
    }
}

impl<S: Store, H: Handler> Handler for CacheMiddleware<S, H> {
    fn serve(&self, sink: Arc<dyn ResponseSink>, req: Request<Bytes>) -> HandlerFuture {
        let this = self.clone();
        Box::pin(async move { this.handle(sink, req).await })
    }
}

/// Owned copy of `req` for a background refresh.
///
/// Extensions are carried over: routers store matched path parameters and
/// state there, and the handler needs them to answer the refresh.
fn detach_request(req: &Request<Bytes>) -> Request<Bytes> {
    let mut detached = Request::new(req.body().clone());
    *detached.method_mut() = req.method().clone();
    *detached.uri_mut() = req.uri().clone();
    *detached.version_mut() = req.version();
    *detached.headers_mut() = req.headers().clone();
    *detached.extensions_mut() = req.extensions().clone();
    detached
}

fn write_server_error(sink: &dyn ResponseSink) {
    sink.insert_header(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/plain; charset=utf-8"),
    );
    sink.write_status(StatusCode::INTERNAL_SERVER_ERROR);
    sink.write(b"internal server error");
}
