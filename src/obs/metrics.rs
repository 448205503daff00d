// self
use crate::{credential::CredentialKind, obs::AcquireOutcome};

/// Records an acquisition outcome via the global metrics recorder (when enabled).
pub fn record_acquire_outcome(credential: CredentialKind, outcome: AcquireOutcome) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!(
			"oauth2_confidential_acquire_total",
			"credential" => credential.as_str(),
			"outcome" => outcome.as_str()
		)
		.increment(1);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = (credential, outcome);
	}
}
