use std::time::Duration;

use tracing::info;

use super::Middleware;
use crate::dispatcher::RequestContext;

/// Logs every request that reaches it and, once handled, its latency and status.
pub struct TracingMiddleware;

impl Middleware for TracingMiddleware {
    fn handle(&self, ctx: &mut RequestContext) -> bool {
        info!(
            request_id = %ctx.request_id(),
            method = %ctx.method(),
            path = %ctx.path(),
            route = ?ctx.route().map(|r| r.path()),
            "Request entering handler chain"
        );
        true
    }

    fn after(&self, ctx: &RequestContext, latency: Duration) {
        info!(
            request_id = %ctx.request_id(),
            status = ctx.response().status().as_u16(),
            latency_us = latency.as_micros() as u64,
            "Request handled"
        );
    }
}
