// self
use crate::{_prelude::*, flows::GrantType};

/// Type alias that resolves to an instrumented future when tracing is enabled.
#[cfg(feature = "tracing")]
pub type InstrumentedGrant<F> = tracing::instrument::Instrumented<F>;
/// Passthrough future type when tracing is disabled.
#[cfg(not(feature = "tracing"))]
pub type InstrumentedGrant<F> = F;

/// A span wrapping one grant dispatch.
#[derive(Clone, Debug)]
pub struct GrantSpan {
	#[cfg(feature = "tracing")]
	span: tracing::Span,
}
impl GrantSpan {
	/// Creates a new span tagged with the grant + stage.
	pub fn new(grant: GrantType, stage: &'static str) -> Self {
		#[cfg(feature = "tracing")]
		{
			let span = tracing::info_span!("identity_broker.grant", grant = grant.as_str(), stage);

			Self { span }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = (grant, stage);

			Self {}
		}
	}

	/// Instruments an async block without holding a guard across `.await` points.
	pub fn instrument<Fut>(&self, fut: Fut) -> InstrumentedGrant<Fut>
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

/// Logs a detached side effect that failed after the response was committed.
pub fn warn_detached_failure(label: &'static str, error: &dyn Display) {
	#[cfg(feature = "tracing")]
	{
		tracing::warn!(side_effect = label, error = %error, "detached side effect failed");
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = (label, error);
	}
}

/// Logs an identity-provider failure before it is mapped onto the broker taxonomy.
pub fn log_upstream_failure(provider: &'static str, error: &dyn Display) {
	#[cfg(feature = "tracing")]
	{
		tracing::info!(provider, error = %error, "identity provider call failed");
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = (provider, error);
	}
}

/// Logs a member lockout.
pub fn log_lockout(member: &dyn Display) {
	#[cfg(feature = "tracing")]
	{
		tracing::warn!(member = %member, "member blocked after repeated password failures");
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = member;
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn helpers_accept_any_display() {
		warn_detached_failure("member_event", &"queue unavailable");
		log_upstream_failure("azure", &"AADSTS70008");
		log_lockout(&"member-1");
	}

	#[cfg(feature = "tracing")]
	#[tokio::test]
	async fn instrument_wraps_future() {
		let span = GrantSpan::new(GrantType::Password, "instrument_wraps_future");
		let value = span.instrument(async { 42 }).await;

		assert_eq!(value, 42);
	}
}
