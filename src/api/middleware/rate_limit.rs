//! Rate limiting middleware using token bucket algorithm.

use axum::http::Request;
use governor::clock::QuantaInstant;
use governor::middleware::NoOpMiddleware;
use std::net::IpAddr;
use std::sync::Arc;
use tower_governor::{
    GovernorError, GovernorLayer,
    governor::GovernorConfigBuilder,
    key_extractor::{KeyExtractor, PeerIpKeyExtractor, SmartIpKeyExtractor},
};

/// Per-client key: the socket peer, or the forwarded client address when the
/// service runs behind a trusted reverse proxy.
#[derive(Debug, Clone, Copy)]
pub struct ClientIpKeyExtractor {
    behind_proxy: bool,
}

impl ClientIpKeyExtractor {
    pub fn new(behind_proxy: bool) -> Self {
        Self { behind_proxy }
    }
}

impl KeyExtractor for ClientIpKeyExtractor {
    type Key = IpAddr;

    fn extract<T>(&self, req: &Request<T>) -> Result<Self::Key, GovernorError> {
        if self.behind_proxy {
            SmartIpKeyExtractor.extract(req)
        } else {
            PeerIpKeyExtractor.extract(req)
        }
    }
}

pub type RateLimitLayer =
    GovernorLayer<ClientIpKeyExtractor, NoOpMiddleware<QuantaInstant>, axum::body::Body>;

fn build(behind_proxy: bool, replenish_seconds: u64, burst: u32) -> RateLimitLayer {
    let governor_conf = Arc::new(
        GovernorConfigBuilder::default()
            .key_extractor(ClientIpKeyExtractor::new(behind_proxy))
            .per_second(replenish_seconds)
            .burst_size(burst)
            .finish()
            .expect("rate limit quota is non-zero"),
    );

    GovernorLayer::new(governor_conf)
}

/// Creates a rate limiter for page and API routes.
///
/// # Limits
///
/// - **Burst**: 120 requests
/// - **Replenish**: one request per second
///
/// Requests exceeding the limit receive `429 Too Many Requests`.
///
/// # Example
///
/// ```rust,ignore
/// let app = Router::new()
///     .route("/programs/{slug}", get(program_page))
///     .layer(rate_limit::layer(false));
/// ```
pub fn layer(behind_proxy: bool) -> RateLimitLayer {
    build(behind_proxy, 1, 120)
}

/// Creates a stricter rate limiter for credential and payment endpoints.
///
/// # Limits
///
/// - **Burst**: 10 requests
/// - **Replenish**: one request every 6 seconds
///
/// Used for sign-in, sign-up, checkout and the payment webhook.
pub fn secure_layer(behind_proxy: bool) -> RateLimitLayer {
    build(behind_proxy, 6, 10)
}
