// self
use crate::obs::CallOutcome;

/// Records a dispatch outcome via the global metrics recorder (when enabled).
pub fn record_call_outcome(endpoint: &str, outcome: CallOutcome) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!(
			"ratelane_request_total",
			"endpoint" => endpoint.to_owned(),
			"outcome" => outcome.as_str()
		)
		.increment(1);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = (endpoint, outcome);
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn record_call_outcome_noop_without_metrics() {
		record_call_outcome("dashboard", CallOutcome::Failure);
	}
}
