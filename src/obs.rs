//! Optional observability helpers for broker grants.
//!
//! # Feature Flags
//!
//! - Enable `tracing` to emit structured spans named `identity_broker.grant` with the `grant`
//!   and `stage` fields, and `warn` events for side effects that fail after a token is issued.
//! - Enable `metrics` to increment the `identity_broker_grant_total` counter for every
//!   attempt/outcome labeled by `grant` + `outcome`, and `identity_broker_lockout_total` for
//!   every account blocked by the attempt tracker.

mod metrics;
mod tracing;

pub use metrics::*;
pub use tracing::*;

// self
use crate::_prelude::*;

/// Outcome labels recorded for each grant.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum GrantOutcome {
	/// Entry to the dispatcher.
	Attempt,
	/// Token issued.
	Success,
	/// MFA challenge returned instead of a token.
	Challenge,
	/// Profile returned for an unregistered member.
	ProfileOnly,
	/// Failure propagated back to the caller.
	Failure,
}
impl GrantOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			GrantOutcome::Attempt => "attempt",
			GrantOutcome::Success => "success",
			GrantOutcome::Challenge => "challenge",
			GrantOutcome::ProfileOnly => "profile_only",
			GrantOutcome::Failure => "failure",
		}
	}
}
impl Display for GrantOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
