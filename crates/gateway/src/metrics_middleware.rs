//! HTTP request metrics middleware.
//!
//! Records, per matched route:
//! - `chatnest_http_requests_total`: requests by endpoint, method and status
//! - `chatnest_http_request_duration_seconds`: request durations
//! - `chatnest_http_requests_in_flight`: requests currently being handled

use std::time::Instant;

use {
    axum::{
        body::Body,
        extract::MatchedPath,
        http::Request,
        middleware::Next,
        response::Response,
    },
    metrics::{counter, gauge, histogram},
};

pub const REQUESTS_TOTAL: &str = "chatnest_http_requests_total";
pub const REQUEST_DURATION_SECONDS: &str = "chatnest_http_request_duration_seconds";
pub const REQUESTS_IN_FLIGHT: &str = "chatnest_http_requests_in_flight";

pub async fn http_metrics_middleware(request: Request<Body>, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().to_string();
    let endpoint = request
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| "unmatched".to_string(), |p| p.as_str().to_string());

    let in_flight = gauge!(REQUESTS_IN_FLIGHT, "endpoint" => endpoint.clone(), "method" => method.clone());
    in_flight.increment(1.0);
    let response = next.run(request).await;
    in_flight.decrement(1.0);

    let status = response.status().as_u16().to_string();
    counter!(
        REQUESTS_TOTAL,
        "endpoint" => endpoint.clone(),
        "method" => method.clone(),
        "status" => status.clone()
    )
    .increment(1);
    histogram!(
        REQUEST_DURATION_SECONDS,
        "endpoint" => endpoint,
        "method" => method,
        "status" => status
    )
    .record(start.elapsed().as_secs_f64());

    response
}
