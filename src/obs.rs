//! Optional observability helpers for token acquisition.
//!
//! # Feature Flags
//!
//! - Enable `tracing` to emit structured spans named `oauth2_confidential.acquire` with the
//!   `client_id`, `credential` (variant label), and `stage` fields. `stage` opens as
//!   `cache_check` and is then recorded as `cache_hit`, `coalesced`, or `network`. Debug
//!   events cover cache and network outcomes, and every failure emits a warning.
//! - Enable `metrics` to increment the `oauth2_confidential_acquire_total` counter for every
//!   outcome, labeled by `credential` + `outcome`.
//!
//! Secrets, assertions, and access tokens are never recorded.

mod metrics;
mod tracing;

pub use metrics::*;
pub use tracing::*;

// self
use crate::_prelude::*;

/// Outcome labels recorded while acquiring a token.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AcquireOutcome {
	/// Entry to an acquisition call.
	Attempt,
	/// Served from the token cache.
	CacheHit,
	/// Joined a request already in flight for the same key.
	Coalesced,
	/// Started a token endpoint request.
	Network,
	/// Successful completion.
	Success,
	/// Failure propagated back to the caller.
	Failure,
}
impl AcquireOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			AcquireOutcome::Attempt => "attempt",
			AcquireOutcome::CacheHit => "cache_hit",
			AcquireOutcome::Coalesced => "coalesced",
			AcquireOutcome::Network => "network",
			AcquireOutcome::Success => "success",
			AcquireOutcome::Failure => "failure",
		}
	}
}
impl Display for AcquireOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
