// self
use crate::{flows::GrantType, obs::GrantOutcome};

/// Records a grant outcome via the global metrics recorder (when enabled).
pub fn record_grant_outcome(grant: GrantType, outcome: GrantOutcome) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!(
			"identity_broker_grant_total",
			"grant" => grant.as_str(),
			"outcome" => outcome.as_str()
		)
		.increment(1);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = (grant, outcome);
	}
}

/// Counts an account blocked by the attempt tracker.
pub fn record_lockout() {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!("identity_broker_lockout_total").increment(1);
	}
}
