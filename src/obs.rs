//! Optional observability helpers for request dispatch.
//!
//! # Feature Flags
//!
//! - Enable `tracing` to emit structured spans named `ratelane.request` with the
//!   `endpoint` and `stage` (call site) fields.
//! - Enable `metrics` to increment the `ratelane_request_total` counter for every
//!   attempt/success/failure, labeled by `endpoint` + `outcome`.

mod metrics;
mod tracing;

pub use metrics::*;
pub use tracing::*;

// self
use crate::_prelude::*;

/// Dispatch stages observed by the client.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RequestStage {
	/// Local quota check before any network activity.
	QuotaCheck,
	/// Session credential resolution.
	Credential,
	/// In-flight network call racing the timeout.
	Dispatch,
	/// Fixed delay between retry attempts.
	RetryWait,
}
impl RequestStage {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			RequestStage::QuotaCheck => "quota_check",
			RequestStage::Credential => "credential",
			RequestStage::Dispatch => "dispatch",
			RequestStage::RetryWait => "retry_wait",
		}
	}
}
impl Display for RequestStage {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded for each attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CallOutcome {
	/// Entry to one dispatch attempt.
	Attempt,
	/// Successful completion.
	Success,
	/// Failure propagated back to the caller.
	Failure,
}
impl CallOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			CallOutcome::Attempt => "attempt",
			CallOutcome::Success => "success",
			CallOutcome::Failure => "failure",
		}
	}
}
impl Display for CallOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
