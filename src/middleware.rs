//! Request logging middleware.
//!
//! Logs every HTTP request once it completes with method, path, query,
//! status, duration and a generated request id. The level follows the status
//! class: 5xx at `error`, 4xx at `warn`, everything else at `info`. Requests
//! slower than [`SLOW_REQUEST_MS`] get an extra warning.

use actix_web::{
    Error,
    dev::{Service, ServiceRequest, ServiceResponse, Transform},
};
use futures::future::{Ready, ok};
use std::{
    future::Future,
    pin::Pin,
    task::{Context, Poll},
    time::Instant,
};
use uuid::Uuid;

/// Threshold above which a request is reported as slow.
pub const SLOW_REQUEST_MS: u128 = 2000;

#[derive(Clone, Default)]
pub struct RequestLoggingMiddleware;

impl RequestLoggingMiddleware {
    pub fn new() -> Self {
        Self
    }
}

impl<S, B> Transform<S, ServiceRequest> for RequestLoggingMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = RequestLoggingService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ok(RequestLoggingService { service })
    }
}

pub struct RequestLoggingService<S> {
    service: S,
}

impl<S, B> Service<ServiceRequest> for RequestLoggingService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>>>>;

    fn poll_ready(&self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.service.poll_ready(cx)
    }

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let start_time = Instant::now();
        let request_id = Uuid::new_v4();
        let method = req.method().to_string();
        let path = req.path().to_string();
        let query_string = req.query_string().to_string();

        tracing::debug!(
            %request_id,
            method = %method,
            path = %path,
            query = %query_string,
            "Incoming request"
        );

        let fut = self.service.call(req);

        Box::pin(async move {
            let response = fut.await?;
            let duration_ms = start_time.elapsed().as_millis();
            let status_code = response.status().as_u16();

            match status_code {
                500..=599 => tracing::error!(
                    %request_id, method = %method, path = %path, query = %query_string,
                    status_code, duration_ms = duration_ms as u64, "Request completed"
                ),
                400..=499 => tracing::warn!(
                    %request_id, method = %method, path = %path, query = %query_string,
                    status_code, duration_ms = duration_ms as u64, "Request completed"
                ),
                _ => tracing::info!(
                    %request_id, method = %method, path = %path, query = %query_string,
                    status_code, duration_ms = duration_ms as u64, "Request completed"
                ),
            }

            if duration_ms > SLOW_REQUEST_MS {
                tracing::warn!(
                    %request_id,
                    method = %method,
                    path = %path,
                    duration_ms = duration_ms as u64,
                    threshold_ms = SLOW_REQUEST_MS as u64,
                    "Slow request detected"
                );
            }

            Ok(response)
        })
    }
}
