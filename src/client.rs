//! High-level authenticated request client tying the quota, session, transport, and
//! telemetry layers together.
//!
//! One [`RequestClient::send`] call walks a fixed pipeline: consume a local quota slot,
//! resolve the session credential, dispatch the transport call racing the timeout and
//! cancel handle, publish any server quota telemetry, classify the status, and parse
//! the body. Retries re-enter the pipeline from the top, so the local quota is
//! re-checked on every attempt.

// std
use std::time::Duration as StdDuration;
// crates.io
use serde::de::DeserializeOwned;
use tokio::sync::watch;
// self
use crate::{
	_prelude::*,
	error::ConfigError,
	http::{BackendTransport, TransportRequest},
	obs::{CallOutcome, RequestSpan, RequestStage, record_call_outcome},
	quota::{QuotaConfig, RequestQuota},
	session::CredentialProvider,
	telemetry::QuotaBus,
};
#[cfg(feature = "reqwest")] use crate::http::ReqwestTransport;

/// Wait hint applied when a 429 response omits `Retry-After`.
const DEFAULT_RETRY_AFTER_SECS: u64 = 60;
/// Identity reported to the backend when the caller does not override it.
const DEFAULT_CLIENT_IDENTITY: &str = "ratelane";

/// How a successful response body is parsed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ResponseKind {
	/// Parse the body as a JSON value.
	#[default]
	Json,
	/// Return the body as plain text.
	Text,
}

/// Parsed body of a successful call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Payload {
	/// JSON body, parsed per [`ResponseKind::Json`].
	Json(serde_json::Value),
	/// Text body, returned per [`ResponseKind::Text`].
	Text(String),
}

/// Caller-initiated cancellation handle for in-flight requests.
///
/// Cloning shares the same signal, so a UI that navigates away can cancel every call
/// it handed the handle to. Cancelling before the call starts makes the next dispatch
/// abort immediately; a handle that is never cancelled stays inert.
#[derive(Clone, Debug)]
pub struct CancelHandle(watch::Sender<bool>);
impl CancelHandle {
	/// Creates an inert handle.
	pub fn new() -> Self {
		Self::default()
	}

	/// Signals every call holding this handle to abort.
	pub fn cancel(&self) {
		self.0.send_replace(true);
	}

	/// Whether [`cancel`](Self::cancel) has been called.
	pub fn is_cancelled(&self) -> bool {
		*self.0.borrow()
	}

	pub(crate) async fn cancelled(&self) {
		let mut receiver = self.0.subscribe();
		// The sender lives in `self`, so this only resolves once the flag flips.
		let _ = receiver.wait_for(|cancelled| *cancelled).await;
	}
}
impl Default for CancelHandle {
	fn default() -> Self {
		Self(watch::channel(false).0)
	}
}

/// Per-call configuration for [`RequestClient::send`].
#[derive(Clone, Debug)]
pub struct SendOptions {
	/// Abort the in-flight call if it has not completed within this duration.
	pub timeout: StdDuration,
	/// Additional attempts after the first failure, applied to retryable failures only.
	pub max_retries: u32,
	/// Fixed delay awaited before each retry. No backoff multiplier is applied.
	pub retry_delay: StdDuration,
	/// How a successful body is parsed.
	pub response_kind: ResponseKind,
	/// Treat timeout aborts as retryable.
	pub retry_on_timeout: bool,
	/// Optional caller-initiated cancellation handle.
	pub cancel: Option<CancelHandle>,
}
impl SendOptions {
	/// Overrides the timeout (defaults to 30 seconds).
	pub fn with_timeout(mut self, timeout: StdDuration) -> Self {
		self.timeout = timeout;

		self
	}

	/// Overrides the retry budget (defaults to 0).
	pub fn with_max_retries(mut self, max_retries: u32) -> Self {
		self.max_retries = max_retries;

		self
	}

	/// Overrides the fixed retry delay (defaults to 1 second).
	pub fn with_retry_delay(mut self, retry_delay: StdDuration) -> Self {
		self.retry_delay = retry_delay;

		self
	}

	/// Overrides the response parsing mode (defaults to JSON).
	pub fn with_response_kind(mut self, response_kind: ResponseKind) -> Self {
		self.response_kind = response_kind;

		self
	}

	/// Opts timeout aborts into the retry allow-list.
	pub fn with_retry_on_timeout(mut self, retry_on_timeout: bool) -> Self {
		self.retry_on_timeout = retry_on_timeout;

		self
	}

	/// Attaches a caller-initiated cancellation handle.
	pub fn with_cancel(mut self, cancel: CancelHandle) -> Self {
		self.cancel = Some(cancel);

		self
	}
}
impl Default for SendOptions {
	fn default() -> Self {
		Self {
			timeout: StdDuration::from_secs(30),
			max_retries: 0,
			retry_delay: StdDuration::from_secs(1),
			response_kind: ResponseKind::default(),
			retry_on_timeout: false,
			cancel: None,
		}
	}
}

/// Coordinates authenticated calls against a single backend base URL.
///
/// The client owns the transport, credential provider, local quota tracker, and
/// telemetry bus so callers only deal in logical endpoint names and JSON bodies.
pub struct RequestClient<T>
where
	T: ?Sized + BackendTransport,
{
	/// Transport used for every outbound call.
	pub transport: Arc<T>,
	/// Credential provider consulted before each dispatch.
	pub session: Arc<dyn CredentialProvider>,
	/// Local per-endpoint quota guard.
	pub quota: Arc<RequestQuota>,
	/// Broadcast bus for server quota telemetry.
	pub quota_bus: QuotaBus,
	/// Base URL that logical endpoint names are joined onto.
	pub base_url: Url,
	/// Value reported through the client identity header.
	pub client_identity: String,
}
impl<T> RequestClient<T>
where
	T: ?Sized + BackendTransport,
{
	/// Creates a client that reuses the caller-provided transport.
	pub fn with_transport(
		base_url: Url,
		session: Arc<dyn CredentialProvider>,
		transport: impl Into<Arc<T>>,
	) -> Self {
		Self {
			transport: transport.into(),
			session,
			quota: Arc::new(RequestQuota::default()),
			quota_bus: QuotaBus::default(),
			base_url,
			client_identity: DEFAULT_CLIENT_IDENTITY.into(),
		}
	}

	/// Replaces the local quota tracker with one built from `config`.
	pub fn with_quota_config(mut self, config: QuotaConfig) -> Self {
		self.quota = Arc::new(RequestQuota::new(config));

		self
	}

	/// Shares an existing quota tracker, e.g. across clients targeting one backend.
	pub fn with_quota(mut self, quota: Arc<RequestQuota>) -> Self {
		self.quota = quota;

		self
	}

	/// Overrides the identity reported to the backend.
	pub fn with_client_identity(mut self, identity: impl Into<String>) -> Self {
		self.client_identity = identity.into();

		self
	}

	/// Performs one authenticated call to `endpoint` with a JSON-encoded `body`.
	///
	/// The local quota is consulted before the credential is resolved, so an exhausted
	/// window never triggers a session lookup or a network call. Retry attempts
	/// re-enter from the quota check, which means a long retry loop can itself exhaust
	/// the local budget.
	pub async fn send<B>(&self, endpoint: &str, body: &B, options: SendOptions) -> Result<Payload>
	where
		B: ?Sized + Serialize,
	{
		let encoded = serde_json::to_string(body).map_err(ConfigError::EncodeBody)?;
		let cancel = options.cancel.clone().unwrap_or_default();
		let mut retries_left = options.max_retries;

		loop {
			record_call_outcome(endpoint, CallOutcome::Attempt);

			match self.attempt(endpoint, &encoded, &options, &cancel).await {
				Ok(payload) => {
					record_call_outcome(endpoint, CallOutcome::Success);

					return Ok(payload);
				},
				Err(error) if retries_left > 0 && error.is_retryable(options.retry_on_timeout) => {
					retries_left -= 1;

					let span = RequestSpan::new(endpoint, RequestStage::RetryWait);

					span.instrument(tokio::time::sleep(options.retry_delay)).await;
				},
				Err(error) => {
					record_call_outcome(endpoint, CallOutcome::Failure);

					return Err(error);
				},
			}
		}
	}

	/// Performs a JSON call and decodes the result into `R`.
	pub async fn send_json<B, R>(&self, endpoint: &str, body: &B, options: SendOptions) -> Result<R>
	where
		B: ?Sized + Serialize,
		R: DeserializeOwned,
	{
		let options = options.with_response_kind(ResponseKind::Json);
		let value = match self.send(endpoint, body, options).await? {
			Payload::Json(value) => value,
			Payload::Text(text) => serde_json::Value::String(text),
		};

		serde_path_to_error::deserialize(value)
			.map_err(|source| Error::Decode { source, status: None })
	}

	async fn attempt(
		&self,
		endpoint: &str,
		encoded_body: &str,
		options: &SendOptions,
		cancel: &CancelHandle,
	) -> Result<Payload> {
		{
			let _guard = RequestSpan::new(endpoint, RequestStage::QuotaCheck).entered();

			if !self.quota.can_make_request(endpoint) {
				return Err(Error::ClientRateLimited { endpoint: endpoint.to_owned() });
			}
		}

		let credential_span = RequestSpan::new(endpoint, RequestStage::Credential);
		let Some(token) = credential_span.instrument(self.session.current_credential()).await
		else {
			return Err(Error::NoSession);
		};
		let url = self.base_url.join(endpoint).map_err(|source| ConfigError::InvalidEndpoint {
			endpoint: endpoint.to_owned(),
			source,
		})?;
		let request = TransportRequest {
			url,
			body: encoded_body.to_owned(),
			bearer: token.expose().to_owned(),
			client_identity: self.client_identity.clone(),
			quota_remaining: self.quota.remaining_requests(endpoint),
		};
		let dispatch_span = RequestSpan::new(endpoint, RequestStage::Dispatch);
		let response = tokio::select! {
			response = dispatch_span.instrument(self.transport.dispatch(request)) => response?,
			() = tokio::time::sleep(options.timeout) => return Err(Error::Aborted),
			() = cancel.cancelled() => return Err(Error::Aborted),
		};

		// Telemetry goes out for every response that carries the headers, error
		// statuses included, before any classification happens.
		if let Some(snapshot) = &response.quota {
			self.quota_bus.publish(snapshot);
		}
		if response.status == 429 {
			let retry_after_secs = response
				.retry_after
				.map(|hint| hint.whole_seconds().max(0) as u64)
				.unwrap_or(DEFAULT_RETRY_AFTER_SECS);

			return Err(Error::ServerRateLimited { retry_after_secs });
		}
		if !response.is_success() {
			return Err(Error::Http {
				status: response.status,
				message: error_message(&response.body),
			});
		}

		match options.response_kind {
			ResponseKind::Json => {
				let mut deserializer = serde_json::Deserializer::from_slice(&response.body);
				let value = serde_path_to_error::deserialize(&mut deserializer)
					.map_err(|source| Error::Decode { source, status: Some(response.status) })?;

				Ok(Payload::Json(value))
			},
			ResponseKind::Text =>
				Ok(Payload::Text(String::from_utf8_lossy(&response.body).into_owned())),
		}
	}
}
#[cfg(feature = "reqwest")]
impl RequestClient<ReqwestTransport> {
	/// Creates a new client for the provided base URL and credential provider.
	///
	/// The client provisions its own reqwest-backed transport so callers do not need
	/// to pass HTTP handles explicitly.
	pub fn new(base_url: Url, session: Arc<dyn CredentialProvider>) -> Self {
		Self::with_transport(base_url, session, ReqwestTransport::default())
	}
}
impl<T> Clone for RequestClient<T>
where
	T: ?Sized + BackendTransport,
{
	fn clone(&self) -> Self {
		Self {
			transport: self.transport.clone(),
			session: self.session.clone(),
			quota: self.quota.clone(),
			quota_bus: self.quota_bus.clone(),
			base_url: self.base_url.clone(),
			client_identity: self.client_identity.clone(),
		}
	}
}
impl<T> Debug for RequestClient<T>
where
	T: ?Sized + BackendTransport,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("RequestClient")
			.field("base_url", &self.base_url.as_str())
			.field("client_identity", &self.client_identity)
			.field("quota", &self.quota)
			.field("quota_bus", &self.quota_bus)
			.finish_non_exhaustive()
	}
}

/// Best-effort extraction of a human-readable message from an error payload.
fn error_message(body: &[u8]) -> String {
	#[derive(Deserialize)]
	struct ErrorBody {
		error: Option<String>,
		message: Option<String>,
	}

	if let Ok(parsed) = serde_json::from_slice::<ErrorBody>(body)
		&& let Some(message) = parsed.error.or(parsed.message)
	{
		return message;
	}

	let text = String::from_utf8_lossy(body);
	let trimmed = text.trim();

	if trimmed.is_empty() {
		"backend request failed".into()
	} else {
		trimmed.chars().take(200).collect()
	}
}
