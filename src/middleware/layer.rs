//! Tower Integration
//!
//! Runs the caching middleware in front of any axum/tower service.

use std::convert::Infallible;
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    response::{IntoResponse, Response},
};
use bytes::{Bytes, BytesMut};
use futures_util::future::BoxFuture;
use futures_util::StreamExt;
use tower::{Layer, Service, ServiceExt};
use tracing::{debug, warn};

use super::{is_cacheable_method, CacheMiddleware, Handler, HandlerFuture, RefreshGroup};
use crate::cache::Store;
use crate::capture::{ClientSink, ResponseSink};
use crate::config::CacheConfig;

// == Service Handler ==
/// Adapts a tower service into a [`Handler`].
///
/// The response head is copied into the sink, then body frames are streamed
/// into it as they arrive.
#[derive(Clone)]
pub struct ServiceHandler<Svc> {
    inner: Svc,
}

impl<Svc> ServiceHandler<Svc> {
    pub fn new(inner: Svc) -> Self {
        Self { inner }
    }
}

impl<Svc> Handler for ServiceHandler<Svc>
where
    Svc: Service<Request<Body>, Response = Response, Error = Infallible>
        + Clone
        + Send
        + Sync
        + 'static,
    Svc::Future: Send + 'static,
{
    fn serve(&self, sink: Arc<dyn ResponseSink>, req: Request<Bytes>) -> HandlerFuture {
        let svc = self.inner.clone();
        Box::pin(async move {
            let response = match svc.oneshot(req.map(Body::from)).await {
                Ok(response) => response,
                Err(never) => match never {},
            };

            let (parts, body) = response.into_parts();
            sink.append_headers(&parts.headers);
            sink.write_status(parts.status);

            let mut frames = body.into_data_stream();
            while let Some(frame) = frames.next().await {
                match frame {
                    Ok(chunk) => {
                        sink.write(&chunk);
                    }
                    Err(err) => {
                        warn!(error = %err, "response body stream failed");
                        break;
                    }
                }
            }
        })
    }
}

// == Cache Layer ==
/// Tower layer putting the cache in front of a service.
///
/// All services produced by one layer share its store and its refresh group.
///
/// # Example
/// ```ignore
/// let store = Arc::new(QuotaLru::with_megabytes(64));
/// let app = Router::new()
///     .route("/clock", get(clock_handler))
///     .layer(CacheLayer::new(store, CacheConfig::default()));
/// ```
pub struct CacheLayer<S> {
    store: Arc<S>,
    config: CacheConfig,
    refreshes: Arc<RefreshGroup>,
}

impl<S> Clone for CacheLayer<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            config: self.config.clone(),
            refreshes: Arc::clone(&self.refreshes),
        }
    }
}

impl<S: Store> CacheLayer<S> {
    pub fn new(store: Arc<S>, config: CacheConfig) -> Self {
        Self {
            store,
            config,
            refreshes: Arc::new(RefreshGroup::new()),
        }
    }
}

impl<S, Svc> Layer<Svc> for CacheLayer<S>
where
    S: Store,
    Svc: Service<Request<Body>, Response = Response, Error = Infallible>
        + Clone
        + Send
        + Sync
        + 'static,
    Svc::Future: Send + 'static,
{
    type Service = CacheService<S, Svc>;

    fn layer(&self, inner: Svc) -> Self::Service {
        let middleware = CacheMiddleware::with_refresh_group(
            Arc::clone(&self.store),
            ServiceHandler::new(inner.clone()),
            self.config.clone(),
            Arc::clone(&self.refreshes),
        );
        CacheService { inner, middleware }
    }
}

// == Cache Service ==
/// Service produced by [`CacheLayer`].
///
/// Every request runs on its own clone of the inner service through
/// `oneshot`, which drives that clone's readiness right before the call. The
/// service itself therefore reports ready without reserving inner capacity.
///
/// Cacheable requests have their body buffered first, up to
/// [`CacheConfig::max_request_body_bytes`]. A request declaring a larger
/// `content-length` bypasses the cache untouched; one streaming past the
/// limit is answered with `413 Payload Too Large`.
pub struct CacheService<S, Svc> {
    inner: Svc,
    middleware: CacheMiddleware<S, ServiceHandler<Svc>>,
}

impl<S, Svc: Clone> Clone for CacheService<S, Svc> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            middleware: self.middleware.clone(),
        }
    }
}

impl<S, Svc> Service<Request<Body>> for CacheService<S, Svc>
where
    S: Store,
    Svc: Service<Request<Body>, Response = Response, Error = Infallible>
        + Clone
        + Send
        + Sync
        + 'static,
    Svc::Future: Send + 'static,
{
    type Response = Response;
    type Error = Infallible;
    type Future = BoxFuture<'static, Result<Response, Infallible>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let limit = self.middleware.config().max_request_body_bytes;

        // Non-cacheable methods stream straight through, body untouched
        if !is_cacheable_method(req.method()) {
            return Box::pin(self.inner.clone().oneshot(req));
        }
        if declared_length(&req).is_some_and(|len| len > limit) {
            debug!(path = %req.uri().path(), limit, "request body over limit, bypassing cache");
            return Box::pin(self.inner.clone().oneshot(req));
        }

        let middleware = self.middleware.clone();
        Box::pin(async move {
            let (parts, body) = req.into_parts();
            let body = match read_body(body, limit).await {
                Ok(body) => body,
                Err(rejection) => return Ok(rejection),
            };

            let sink = Arc::new(ClientSink::new());
            middleware
                .handle(sink.clone(), Request::from_parts(parts, body))
                .await;
            Ok(sink.take_response())
        })
    }
}

fn declared_length(req: &Request<Body>) -> Option<usize> {
    req.headers()
        .get(header::CONTENT_LENGTH)?
        .to_str()
        .ok()?
        .parse()
        .ok()
}

/// Buffers `body`, refusing to hold more than `limit` bytes.
async fn read_body(body: Body, limit: usize) -> Result<Bytes, Response> {
    let mut frames = body.into_data_stream();
    let mut buffered = BytesMut::new();

    while let Some(frame) = frames.next().await {
        let chunk = match frame {
            Ok(chunk) => chunk,
            Err(err) => {
                warn!(error = %err, "failed to read request body");
                return Err(
                    (StatusCode::BAD_REQUEST, "failed to read request body").into_response()
                );
            }
        };
        if buffered.len() + chunk.len() > limit {
            debug!(limit, "request body over limit");
            return Err(
                (StatusCode::PAYLOAD_TOO_LARGE, "request body too large").into_response(),
            );
        }
        buffered.extend_from_slice(&chunk);
    }

    Ok(buffered.freeze())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::QuotaLru;
    use std::future::{ready, Ready};
    use std::sync::atomic::{AtomicIsize, Ordering};

    /// Inner service holding one unit of shared capacity from a successful
    /// `poll_ready` until the matching `call` (or until it is dropped).
    struct Reserving {
        reserved: Arc<AtomicIsize>,
        holding: bool,
    }

    impl Reserving {
        fn new(reserved: Arc<AtomicIsize>) -> Self {
            Self {
                reserved,
                holding: false,
            }
        }
    }

    impl Clone for Reserving {
        fn clone(&self) -> Self {
            Self::new(self.reserved.clone())
        }
    }

    impl Drop for Reserving {
        fn drop(&mut self) {
            if self.holding {
                self.reserved.fetch_sub(1, Ordering::SeqCst);
            }
        }
    }

    impl Service<Request<Body>> for Reserving {
        type Response = Response;
        type Error = Infallible;
        type Future = Ready<Result<Response, Infallible>>;

        fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Infallible>> {
            if !self.holding {
                self.holding = true;
                self.reserved.fetch_add(1, Ordering::SeqCst);
            }
            Poll::Ready(Ok(()))
        }

        fn call(&mut self, _req: Request<Body>) -> Self::Future {
            if self.holding {
                self.holding = false;
                self.reserved.fetch_sub(1, Ordering::SeqCst);
            }
            ready(Ok("reserved".into_response()))
        }
    }

    #[tokio::test]
    async fn test_service_does_not_hold_inner_capacity() {
        let reserved = Arc::new(AtomicIsize::new(0));
        let layer = CacheLayer::new(Arc::new(QuotaLru::new(64 * 1024)), CacheConfig::default());
        let mut svc = layer.layer(Reserving::new(reserved.clone()));

        for method in ["GET", "POST", "GET"] {
            let req = Request::builder()
                .method(method)
                .uri("/r")
                .body(Body::empty())
                .unwrap();
            let response = svc.ready().await.unwrap().call(req).await.unwrap();
            assert_eq!(response.status(), StatusCode::OK);
            assert_eq!(reserved.load(Ordering::SeqCst), 0);
        }
    }

    #[tokio::test]
    async fn test_declared_oversized_body_bypasses_cache() {
        let store = Arc::new(QuotaLru::new(64 * 1024));
        let config = CacheConfig::default().with_max_request_body_bytes(8);
        let reserved = Arc::new(AtomicIsize::new(0));
        let mut svc = CacheLayer::new(store.clone(), config).layer(Reserving::new(reserved));

        let req = Request::get("/r")
            .header(header::CONTENT_LENGTH, "32")
            .body(Body::from(vec![b'a'; 32]))
            .unwrap();
        let response = svc.ready().await.unwrap().call(req).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().get("x-cache-status").is_none());
        tokio::task::yield_now().await;
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_read_body_enforces_limit() {
        let within = read_body(Body::from("12345678"), 8).await.unwrap();
        assert_eq!(within.as_ref(), b"12345678");

        let rejected = read_body(Body::from("123456789"), 8).await.unwrap_err();
        assert_eq!(rejected.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }
}
