// self
use crate::{_prelude::*, auth::ClientId, credential::CredentialKind, obs::AcquireOutcome};

/// Type alias that resolves to an instrumented future when tracing is enabled.
#[cfg(feature = "tracing")]
pub type InstrumentedAcquire<F> = tracing::instrument::Instrumented<F>;
/// Passthrough future type when tracing is disabled.
#[cfg(not(feature = "tracing"))]
pub type InstrumentedAcquire<F> = F;

/// Stage recorded before the cache has been consulted.
pub const INITIAL_STAGE: &str = "cache_check";

/// A span builder used by token acquisition calls.
#[derive(Clone, Debug)]
pub struct AcquireSpan {
	#[cfg(feature = "tracing")]
	span: tracing::Span,
}
impl AcquireSpan {
	/// Creates a new span tagged with the client and credential variant.
	///
	/// `stage` starts at [`INITIAL_STAGE`] and follows the outcomes passed to
	/// [`trace_acquire_outcome`] while the span is current.
	pub fn new(client_id: &ClientId, credential: CredentialKind) -> Self {
		#[cfg(feature = "tracing")]
		{
			let span = tracing::info_span!(
				"oauth2_confidential.acquire",
				client_id = client_id.as_str(),
				credential = credential.as_str(),
				stage = INITIAL_STAGE
			);

			Self { span }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = (client_id, credential);

			Self {}
		}
	}

	/// Enters the span for synchronous sections.
	pub fn entered(self) -> AcquireSpanGuard {
		#[cfg(feature = "tracing")]
		{
			AcquireSpanGuard { guard: self.span.entered() }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = self;

			AcquireSpanGuard {}
		}
	}

	/// Instruments an async block without holding a guard across `.await` points.
	pub fn instrument<Fut>(&self, fut: Fut) -> InstrumentedAcquire<Fut>
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

/// RAII guard returned by [`AcquireSpan::entered`].
pub struct AcquireSpanGuard {
	#[cfg(feature = "tracing")]
	#[allow(dead_code)]
	guard: tracing::span::EnteredSpan,
}
impl Debug for AcquireSpanGuard {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("AcquireSpanGuard(..)")
	}
}

/// Emits a debug event for a cache, coalescing, or network outcome and records it as the
/// `stage` of the current acquisition span.
pub fn trace_acquire_outcome(outcome: AcquireOutcome) {
	#[cfg(feature = "tracing")]
	{
		tracing::Span::current().record("stage", outcome.as_str());
		tracing::debug!(outcome = outcome.as_str(), "token acquisition progressed");
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = outcome;
	}
}

/// Emits a warning describing how a failure was classified.
pub fn trace_acquire_failure(error: &Error) {
	#[cfg(feature = "tracing")]
	{
		tracing::warn!(
			error = %error,
			transient = error.is_transient(),
			retry_after_secs = error.retry_after().map(|hint| hint.whole_seconds()),
			"token acquisition failed"
		);
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = error;
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn client_id() -> ClientId {
		ClientId::new("span-client").expect("Client id fixture should be valid.")
	}

	#[test]
	fn acquire_span_enters_without_subscriber() {
		let _guard = AcquireSpan::new(&client_id(), CredentialKind::Secret).entered();

		trace_acquire_outcome(AcquireOutcome::CacheHit);
		trace_acquire_failure(&Error::Cancelled);
	}

	#[tokio::test]
	async fn instrument_wraps_future() {
		let span = AcquireSpan::new(&client_id(), CredentialKind::Certificate);
		let value = span.instrument(async { 42 }).await;

		assert_eq!(value, 42);
	}
}
