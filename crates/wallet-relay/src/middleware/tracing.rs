//! Request tracing middleware.
//!
//! Wraps every HTTP request in a `relay_request` span and logs its outcome.
//! The `/events` span closes when the response head is sent, not when the
//! stream ends.

use axum::{body::Body, http::Request, response::Response};
use std::task::{Context, Poll};
use std::time::Instant;
use tower::{Layer, Service};
use tracing::{debug, info_span, Instrument, Span};

/// Tracing layer that creates spans for each request
#[derive(Clone, Default)]
pub struct TracingLayer;

impl TracingLayer {
    pub fn new() -> Self {
        Self
    }
}

impl<S> Layer<S> for TracingLayer {
    type Service = TracingService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        TracingService { inner }
    }
}

/// Tracing service
#[derive(Clone)]
pub struct TracingService<S> {
    inner: S,
}

impl<S> Service<Request<Body>> for TracingService<S>
where
    S: Service<Request<Body>, Response = Response> + Clone + Send + 'static,
    S::Future: Send,
{
    type Response = Response;
    type Error = S::Error;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        // Take the service that was driven to readiness, leave a clone behind
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);

        let span = info_span!(
            "relay_request",
            http.method = %req.method(),
            http.target = %req.uri().path(),
            otel.kind = "server",
            otel.status_code = tracing::field::Empty,
        );
        let started = Instant::now();

        Box::pin(
            async move {
                let result = inner.call(req).await;

                let outcome = match &result {
                    Ok(response) if !response.status().is_client_error()
                        && !response.status().is_server_error() =>
                    {
                        "OK"
                    }
                    _ => "ERROR",
                };
                Span::current().record("otel.status_code", outcome);
                if let Ok(response) = &result {
                    debug!(
                        status = response.status().as_u16(),
                        elapsed_ms = started.elapsed().as_millis(),
                        "Request handled"
                    );
                }

                result
            }
            .instrument(span),
        )
    }
}
