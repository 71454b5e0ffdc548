//! Client-side per-endpoint request quota tracking.
//!
//! [`RequestQuota`] is a soft local guard, not a security control: it keeps the client
//! from firing more than a fixed number of requests at a logical endpoint within a
//! rolling window, before any network call is attempted and independently of whatever
//! the backend enforces on its side. State lives only in process memory.

// self
use crate::_prelude::*;

/// Quota configuration applied to every tracked endpoint.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct QuotaConfig {
	/// Maximum requests recorded per window.
	pub requests_per_window: u32,
	/// Window length before the per-endpoint counter resets.
	pub window: Duration,
}
impl QuotaConfig {
	/// Creates a config with the provided budget and window.
	pub fn new(requests_per_window: u32, window: Duration) -> Self {
		Self { requests_per_window, window }
	}
}
impl Default for QuotaConfig {
	fn default() -> Self {
		Self { requests_per_window: 50, window: Duration::minutes(5) }
	}
}

/// Per-endpoint counter state for the current window.
#[derive(Clone, Copy, Debug)]
struct WindowEntry {
	count: u32,
	window_reset_at: OffsetDateTime,
}

/// In-memory sliding-window request counter keyed by logical endpoint.
///
/// Entries are created lazily on first observation of an endpoint and reset in place
/// once their window expires; endpoints never share a counter. The check-and-increment
/// runs under one mutex acquisition so concurrent callers cannot both observe a free
/// slot and overshoot the budget.
#[derive(Debug, Default)]
pub struct RequestQuota {
	config: QuotaConfig,
	entries: Mutex<HashMap<String, WindowEntry>>,
}
impl RequestQuota {
	/// Creates a quota tracker with the provided configuration.
	pub fn new(config: QuotaConfig) -> Self {
		Self { config, entries: Mutex::new(HashMap::new()) }
	}

	/// Returns the configuration this tracker was built with.
	pub fn config(&self) -> QuotaConfig {
		self.config
	}

	/// Checks whether a request to `endpoint` may proceed and consumes a slot if so.
	///
	/// This is a check-and-consume, not a pure query: a `true` return has already
	/// recorded the request against the window. Call it at most once per attempt.
	pub fn can_make_request(&self, endpoint: &str) -> bool {
		self.can_make_request_at(endpoint, OffsetDateTime::now_utc())
	}

	/// Clock-explicit form of [`can_make_request`](Self::can_make_request).
	pub fn can_make_request_at(&self, endpoint: &str, now: OffsetDateTime) -> bool {
		let mut entries = self.entries.lock();

		if let Some(entry) = entries.get_mut(endpoint)
			&& now < entry.window_reset_at
		{
			if entry.count >= self.config.requests_per_window {
				return false;
			}

			entry.count += 1;

			return true;
		}

		entries.insert(endpoint.to_owned(), WindowEntry {
			count: 1,
			window_reset_at: now + self.config.window,
		});

		true
	}

	/// Returns how many requests remain in the current window for `endpoint`.
	///
	/// Pure query with no side effect; an unknown or expired endpoint reports the full
	/// budget.
	pub fn remaining_requests(&self, endpoint: &str) -> u32 {
		self.remaining_requests_at(endpoint, OffsetDateTime::now_utc())
	}

	/// Clock-explicit form of [`remaining_requests`](Self::remaining_requests).
	pub fn remaining_requests_at(&self, endpoint: &str, now: OffsetDateTime) -> u32 {
		let entries = self.entries.lock();

		match entries.get(endpoint) {
			Some(entry) if now < entry.window_reset_at =>
				self.config.requests_per_window.saturating_sub(entry.count),
			_ => self.config.requests_per_window,
		}
	}
}
