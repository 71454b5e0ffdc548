//! Transport primitives for authenticated backend calls.
//!
//! The module exposes [`BackendTransport`] alongside [`TransportRequest`] and
//! [`TransportResponse`] so downstream crates can integrate custom HTTP clients
//! without losing the client's header contract. Implementations attach the bearer
//! credential and identity/quota headers from the request, and surface the response
//! status, raw body, parsed [`QuotaSnapshot`] headers, and any `Retry-After` hint.

// std
use std::ops::Deref;
// crates.io
#[cfg(feature = "reqwest")]
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, RETRY_AFTER};
#[cfg(feature = "reqwest")] use time::format_description::well_known::Rfc2822;
// self
use crate::{_prelude::*, error::TransportError, telemetry::QuotaSnapshot};

/// Header naming the client application to the backend.
pub const HEADER_CLIENT_IDENTITY: &str = "x-api-client";
/// Header reporting the caller's locally tracked remaining quota.
///
/// Advisory only; the backend must never treat the value as authoritative.
pub const HEADER_CLIENT_QUOTA: &str = "x-client-quota-remaining";
/// Server quota telemetry: maximum requests per server window.
pub const HEADER_RATE_LIMIT: &str = "x-ratelimit-limit";
/// Server quota telemetry: requests left in the current server window.
pub const HEADER_RATE_REMAINING: &str = "x-ratelimit-remaining";
/// Server quota telemetry: opaque marker for when the server window resets.
pub const HEADER_RATE_RESET: &str = "x-ratelimit-reset";

/// Boxed future returned by [`BackendTransport::dispatch`].
pub type TransportFuture<'a> =
	Pin<Box<dyn Future<Output = Result<TransportResponse, TransportError>> + 'a + Send>>;

/// Abstraction over HTTP stacks capable of executing one backend call.
///
/// The trait is the client's only dependency on an HTTP stack. Implementations must be
/// `Send + Sync + 'static` so a single transport can be shared across client instances,
/// and the returned future must be `Send` so callers can box it freely. A transport
/// performs exactly one POST per [`dispatch`](Self::dispatch) call and never retries on
/// its own; retry policy belongs to the client.
pub trait BackendTransport
where
	Self: 'static + Send + Sync,
{
	/// Executes one POST against the request's URL and captures the response.
	fn dispatch(&self, request: TransportRequest) -> TransportFuture<'_>;
}

/// One outbound backend call, fully resolved before dispatch.
#[derive(Clone, Debug)]
pub struct TransportRequest {
	/// Absolute URL for the call.
	pub url: Url,
	/// JSON-encoded request body.
	pub body: String,
	/// Bearer credential attached via the `Authorization` header.
	pub bearer: String,
	/// Value for [`HEADER_CLIENT_IDENTITY`].
	pub client_identity: String,
	/// Value for [`HEADER_CLIENT_QUOTA`].
	pub quota_remaining: u32,
}

/// Raw outcome of one dispatched call, prior to status classification.
#[derive(Clone, Debug)]
pub struct TransportResponse {
	/// HTTP status code.
	pub status: u16,
	/// Raw response body bytes.
	pub body: Vec<u8>,
	/// Server quota telemetry, when the response carried the headers.
	pub quota: Option<QuotaSnapshot>,
	/// Retry-After hint expressed as a relative duration.
	pub retry_after: Option<Duration>,
}
impl TransportResponse {
	/// Whether the status is in the 2xx success range.
	pub fn is_success(&self) -> bool {
		(200..300).contains(&self.status)
	}
}

/// Thin wrapper around [`ReqwestClient`] so shared HTTP behavior lives in one place.
/// Backend calls do not follow redirects implicitly beyond reqwest's defaults; callers
/// needing custom TLS or proxy behavior configure their own [`ReqwestClient`] and pass
/// it through [`with_client`](Self::with_client).
#[cfg(feature = "reqwest")]
#[derive(Clone, Default)]
pub struct ReqwestTransport(pub ReqwestClient);
#[cfg(feature = "reqwest")]
impl ReqwestTransport {
	/// Wraps an existing reqwest [`ReqwestClient`].
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}
}
#[cfg(feature = "reqwest")]
impl AsRef<ReqwestClient> for ReqwestTransport {
	fn as_ref(&self) -> &ReqwestClient {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl Deref for ReqwestTransport {
	type Target = ReqwestClient;

	fn deref(&self) -> &Self::Target {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl BackendTransport for ReqwestTransport {
	fn dispatch(&self, request: TransportRequest) -> TransportFuture<'_> {
		let client = self.0.clone();

		Box::pin(async move {
			let response = client
				.post(request.url)
				.header(AUTHORIZATION, format!("Bearer {}", request.bearer))
				.header(CONTENT_TYPE, "application/json")
				.header(HEADER_CLIENT_IDENTITY, request.client_identity)
				.header(HEADER_CLIENT_QUOTA, request.quota_remaining)
				.body(request.body)
				.send()
				.await
				.map_err(TransportError::from)?;
			let status = response.status().as_u16();
			let headers = response.headers().to_owned();
			let quota = parse_quota_headers(&headers);
			let retry_after = parse_retry_after(&headers);
			let body = response.bytes().await.map_err(TransportError::from)?.to_vec();

			Ok(TransportResponse { status, body, quota, retry_after })
		})
	}
}

#[cfg(feature = "reqwest")]
fn parse_quota_headers(headers: &HeaderMap) -> Option<QuotaSnapshot> {
	let limit = header_u64(headers, HEADER_RATE_LIMIT)?;
	let remaining = header_u64(headers, HEADER_RATE_REMAINING)?;
	let reset_at = headers
		.get(HEADER_RATE_RESET)
		.and_then(|value| value.to_str().ok())
		.map(|raw| raw.trim().to_owned());

	Some(QuotaSnapshot { limit, remaining, reset_at })
}

#[cfg(feature = "reqwest")]
fn header_u64(headers: &HeaderMap, name: &str) -> Option<u64> {
	headers.get(name)?.to_str().ok()?.trim().parse().ok()
}

#[cfg(feature = "reqwest")]
fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
	let value = headers.get(RETRY_AFTER)?;
	let raw = value.to_str().ok()?.trim();

	if let Ok(secs) = raw.parse::<u64>() {
		return Some(Duration::seconds(secs as i64));
	}
	if let Ok(moment) = OffsetDateTime::parse(raw, &Rfc2822) {
		let delta = moment - OffsetDateTime::now_utc();

		if delta.is_positive() {
			return Some(delta);
		}
	}

	None
}
