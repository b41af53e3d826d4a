//! HTTP middleware for catalog API requests.

use crate::utils::fmt_duration;
use http::Extensions;
use reqwest::{Request, Response};
use reqwest_middleware::{Middleware, Next};
use std::time::{Duration, Instant};
use tracing::{debug, trace, warn};

/// Requests slower than this are logged at `warn`.
const SLOW_REQUEST: Duration = Duration::from_secs(2);

/// Tags each request with a request id and logs its outcome and latency.
pub struct RequestLogMiddleware;

#[async_trait::async_trait]
impl Middleware for RequestLogMiddleware {
    async fn handle(
        &self,
        req: Request,
        extensions: &mut Extensions,
        next: Next<'_>,
    ) -> reqwest_middleware::Result<Response> {
        let request_id = ulid::Ulid::new().to_string();
        let method = req.method().clone();
        let path = req.url().path().to_owned();
        let query = req.url().query().map(str::to_owned);

        trace!(request_id, %method, path, ?query, "catalog request");

        let start = Instant::now();
        let result = next.run(req, extensions).await;
        let elapsed = start.elapsed();

        match &result {
            Ok(resp) if elapsed > SLOW_REQUEST => warn!(
                request_id,
                %method,
                path,
                status = resp.status().as_u16(),
                duration = fmt_duration(elapsed),
                "slow catalog request"
            ),
            Ok(resp) => debug!(
                request_id,
                %method,
                path,
                status = resp.status().as_u16(),
                duration = fmt_duration(elapsed),
                "catalog response"
            ),
            Err(e) => warn!(
                request_id,
                %method,
                path,
                error = %e,
                duration = fmt_duration(elapsed),
                "catalog request failed"
            ),
        }

        result
    }
}
