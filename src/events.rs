//! Fire-and-forget event publication for member changes, sessions, and audits.
//!
//! Publication runs on detached tasks: the grant response never waits for it, and a failed
//! publication is logged without affecting the issued token.

// self
use crate::{
	_prelude::*,
	auth::{DeviceBinding, MemberId},
	member::Member,
	obs,
};

/// Future returned by [`EventPublisher`] operations.
pub type PublishFuture<'a> = Pin<Box<dyn Future<Output = Result<(), PublishError>> + 'a + Send>>;

/// Member lifecycle event.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "member", rename_all = "kebab-case")]
pub enum MemberEvent {
	/// A member was created from a provider profile.
	Created(Box<Member>),
	/// A provider identity was linked to an existing member for the first time.
	Updated(Box<Member>),
}
impl MemberEvent {
	/// Member carried by the event.
	pub fn member(&self) -> &Member {
		match self {
			Self::Created(m) | Self::Updated(m) => m,
		}
	}
}

/// Session record forwarded to the session-listing service.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionInfo {
	/// Session subject.
	pub member_id: MemberId,
	/// Device binding.
	pub binding: DeviceBinding,
	/// Grant that opened the session.
	pub grant: String,
	/// Keyed-hash token identifier.
	pub jti: String,
	/// Login instant.
	#[serde(with = "time::serde::rfc3339")]
	pub logged_in_at: OffsetDateTime,
	/// Token expiry.
	#[serde(with = "time::serde::rfc3339")]
	pub expires_at: OffsetDateTime,
}

/// Generic audit record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEvent {
	/// Action label, for example `logout` or `lockout`.
	pub action: String,
	/// Member concerned, when known.
	pub member_id: Option<MemberId>,
	/// Free-form detail.
	pub detail: String,
	/// Event instant.
	#[serde(with = "time::serde::rfc3339")]
	pub at: OffsetDateTime,
}
impl AuditEvent {
	/// Creates an audit event stamped now.
	pub fn new(action: impl Into<String>, member_id: Option<MemberId>, detail: impl Into<String>) -> Self {
		Self {
			action: action.into(),
			member_id,
			detail: detail.into(),
			at: OffsetDateTime::now_utc(),
		}
	}
}

/// Error type produced by [`EventPublisher`] implementations.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
#[error("Event publication failed: {message}.")]
pub struct PublishError {
	/// Human-readable error payload.
	pub message: String,
}

/// Outbound event sink.
pub trait EventPublisher
where
	Self: Send + Sync,
{
	/// Publishes a member lifecycle event.
	fn publish_member(&self, event: MemberEvent) -> PublishFuture<'_>;

	/// Records a newly opened session.
	fn record_session(&self, session: SessionInfo) -> PublishFuture<'_>;

	/// Publishes an audit event.
	fn publish_audit(&self, event: AuditEvent) -> PublishFuture<'_>;
}

/// Publisher that drops every event.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopPublisher;
impl EventPublisher for NoopPublisher {
	fn publish_member(&self, _: MemberEvent) -> PublishFuture<'_> {
		Box::pin(async { Ok(()) })
	}

	fn record_session(&self, _: SessionInfo) -> PublishFuture<'_> {
		Box::pin(async { Ok(()) })
	}

	fn publish_audit(&self, _: AuditEvent) -> PublishFuture<'_> {
		Box::pin(async { Ok(()) })
	}
}

/// Publisher that keeps events in-process for development and tests.
#[derive(Clone, Debug, Default)]
pub struct MemoryPublisher {
	members: Arc<RwLock<Vec<MemberEvent>>>,
	sessions: Arc<RwLock<Vec<SessionInfo>>>,
	audits: Arc<RwLock<Vec<AuditEvent>>>,
}
impl MemoryPublisher {
	/// Member events published so far.
	pub fn member_events(&self) -> Vec<MemberEvent> {
		self.members.read().clone()
	}

	/// Sessions recorded so far.
	pub fn sessions(&self) -> Vec<SessionInfo> {
		self.sessions.read().clone()
	}

	/// Audit events published so far.
	pub fn audits(&self) -> Vec<AuditEvent> {
		self.audits.read().clone()
	}
}
impl EventPublisher for MemoryPublisher {
	fn publish_member(&self, event: MemberEvent) -> PublishFuture<'_> {
		self.members.write().push(event);

		Box::pin(async { Ok(()) })
	}

	fn record_session(&self, session: SessionInfo) -> PublishFuture<'_> {
		self.sessions.write().push(session);

		Box::pin(async { Ok(()) })
	}

	fn publish_audit(&self, event: AuditEvent) -> PublishFuture<'_> {
		self.audits.write().push(event);

		Box::pin(async { Ok(()) })
	}
}

/// Runs `fut` on a detached task, logging its failure under `label`.
///
/// Without an ambient tokio runtime the side effect is dropped and logged.
pub fn spawn_detached<F, E>(label: &'static str, fut: F)
where
	F: 'static + Send + Future<Output = Result<(), E>>,
	E: 'static + Display,
{
	match tokio::runtime::Handle::try_current() {
		Ok(handle) => {
			handle.spawn(async move {
				if let Err(e) = fut.await {
					obs::warn_detached_failure(label, &e);
				}
			});
		},
		Err(e) => obs::warn_detached_failure(label, &e),
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[tokio::test]
	async fn memory_publisher_records_in_order() {
		let publisher = MemoryPublisher::default();
		let member = Member::new("a@example.com", "member");

		publisher
			.publish_member(MemberEvent::Created(Box::new(member.clone())))
			.await
			.expect("Publish should succeed.");
		publisher
			.publish_member(MemberEvent::Updated(Box::new(member.clone())))
			.await
			.expect("Publish should succeed.");

		let events = publisher.member_events();

		assert!(matches!(events[0], MemberEvent::Created(_)));
		assert_eq!(events[1].member(), &member);
	}

	#[tokio::test]
	async fn detached_failures_do_not_propagate() {
		let publisher = MemoryPublisher::default();
		let sink = publisher.clone();

		spawn_detached("failing", async { Err::<(), _>(PublishError { message: "down".into() }) });
		spawn_detached("audit", async move {
			sink.publish_audit(AuditEvent::new("logout", None, "test")).await
		});

		for _ in 0..50 {
			if !publisher.audits().is_empty() {
				break;
			}

			tokio::time::sleep(std::time::Duration::from_millis(10)).await;
		}

		assert_eq!(publisher.audits().len(), 1);
	}

	#[test]
	fn no_runtime_drops_the_side_effect() {
		spawn_detached("orphan", async { Ok::<(), PublishError>(()) });
	}
}
