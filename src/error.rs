//! Client-level error taxonomy shared across the quota, session, and transport layers.
//!
//! Every failure keeps a discriminable kind so presentation layers can pattern-match
//! (session-expired banner, rate-limit countdown, generic retry prompt) without
//! inspecting free-text content.

// self
use crate::_prelude::*;

/// Crate-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical client error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Transport failure (DNS, TCP, TLS) before any response arrived.
	#[error(transparent)]
	Transport(#[from] TransportError),

	/// Local per-endpoint quota is exhausted; no network call was attempted.
	#[error("Local request budget for `{endpoint}` is exhausted.")]
	ClientRateLimited {
		/// Logical endpoint whose window is full.
		endpoint: String,
	},
	/// No active session credential is available.
	#[error("No active session is available.")]
	NoSession,
	/// The in-flight call was aborted by the timeout or a cancel handle.
	#[error("Request was aborted before the backend responded.")]
	Aborted,
	/// Backend responded with HTTP 429.
	#[error("Backend throttled the request; retry after {retry_after_secs} seconds.")]
	ServerRateLimited {
		/// Wait hint in seconds, from `Retry-After` or the 60-second default.
		retry_after_secs: u64,
	},
	/// Backend responded with a non-2xx status other than 429.
	#[error("Backend returned HTTP {status}: {message}.")]
	Http {
		/// HTTP status code.
		status: u16,
		/// Best-effort human-readable message extracted from the error payload.
		message: String,
	},
	/// Backend returned a 2xx response whose body could not be decoded.
	#[error("Backend returned a response body that could not be decoded.")]
	Decode {
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
		/// HTTP status code of the undecodable response, when available.
		status: Option<u16>,
	},
}
impl Error {
	/// Whether a retry attempt is allowed to follow this failure.
	///
	/// Retry eligibility is an explicit allow-list: transport failures and HTTP 5xx are
	/// transient; everything else surfaces immediately. Timeout aborts join the list
	/// only when the caller opted in via `retry_on_timeout`.
	pub fn is_retryable(&self, retry_on_timeout: bool) -> bool {
		match self {
			Self::Transport(_) => true,
			Self::Http { status, .. } => (500..600).contains(status),
			Self::Aborted => retry_on_timeout,
			_ => false,
		}
	}
}

/// Configuration and validation failures raised before a request is dispatched.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// Endpoint name could not be joined onto the base URL.
	#[error("Endpoint `{endpoint}` does not form a valid URL.")]
	InvalidEndpoint {
		/// Logical endpoint name that failed to join.
		endpoint: String,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Request body could not be JSON-encoded.
	#[error("Request body could not be encoded as JSON.")]
	EncodeBody(#[from] serde_json::Error),
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<reqwest::Error> for ConfigError {
	fn from(e: reqwest::Error) -> Self {
		Self::http_client_build(e)
	}
}

/// Transport-level failures (network, IO) raised while a request is in flight.
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling the backend endpoint.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred while calling the backend endpoint.")]
	Io(#[from] std::io::Error),
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for TransportError {
	fn from(e: ReqwestError) -> Self {
		Self::network(e)
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn network_error() -> Error {
		TransportError::Io(std::io::Error::other("connection reset")).into()
	}

	#[test]
	fn retry_allow_list_admits_transport_and_5xx_only() {
		assert!(network_error().is_retryable(false));
		assert!(Error::Http { status: 500, message: "boom".into() }.is_retryable(false));
		assert!(Error::Http { status: 503, message: "busy".into() }.is_retryable(false));

		assert!(!Error::Http { status: 404, message: "missing".into() }.is_retryable(false));
		assert!(!Error::Http { status: 422, message: "invalid".into() }.is_retryable(false));
		assert!(!Error::ServerRateLimited { retry_after_secs: 60 }.is_retryable(false));
		assert!(!Error::NoSession.is_retryable(false));
		assert!(!Error::ClientRateLimited { endpoint: "dashboard".into() }.is_retryable(false));
	}

	#[test]
	fn aborted_retries_only_on_opt_in() {
		assert!(!Error::Aborted.is_retryable(false));
		assert!(Error::Aborted.is_retryable(true));
	}
}
