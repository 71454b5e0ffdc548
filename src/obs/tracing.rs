// self
use crate::{_prelude::*, obs::RequestStage};

/// Type alias that resolves to an instrumented future when tracing is enabled.
#[cfg(feature = "tracing")]
pub type InstrumentedCall<F> = tracing::instrument::Instrumented<F>;
/// Passthrough future type when tracing is disabled.
#[cfg(not(feature = "tracing"))]
pub type InstrumentedCall<F> = F;

/// A span builder used around dispatch attempts.
#[derive(Clone, Debug)]
pub struct RequestSpan {
	#[cfg(feature = "tracing")]
	span: tracing::Span,
}
impl RequestSpan {
	/// Creates a new span tagged with the provided endpoint + stage.
	pub fn new(endpoint: &str, stage: RequestStage) -> Self {
		#[cfg(feature = "tracing")]
		{
			let span =
				tracing::info_span!("ratelane.request", endpoint, stage = stage.as_str());

			Self { span }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = (endpoint, stage);

			Self {}
		}
	}

	/// Enters the span for synchronous sections.
	pub fn entered(self) -> RequestSpanGuard {
		#[cfg(feature = "tracing")]
		{
			RequestSpanGuard { guard: self.span.entered() }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = self;

			RequestSpanGuard {}
		}
	}

	/// Instruments an async block without holding a guard across `.await` points.
	pub fn instrument<Fut>(&self, fut: Fut) -> InstrumentedCall<Fut>
	where
		Fut: Future,
	{
		#[cfg(feature = "tracing")]
		{
			use tracing::Instrument;

			fut.instrument(self.span.clone())
		}
		#[cfg(not(feature = "tracing"))]
		{
			fut
		}
	}
}

/// RAII guard returned by [`RequestSpan::entered`].
pub struct RequestSpanGuard {
	#[cfg(feature = "tracing")]
	#[allow(dead_code)]
	guard: tracing::span::EnteredSpan,
}
impl Debug for RequestSpanGuard {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("RequestSpanGuard(..)")
	}
}
