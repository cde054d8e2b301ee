//! Reconciles provider profiles with local member records.

pub mod parser;

pub use parser::*;

// self
use crate::{
	_prelude::*,
	config::BrokerConfig,
	events::{self, EventPublisher, MemberEvent},
	flows::ApiVersion,
	member::{Member, MemberStore},
	provider::{Provider, ProviderProfile},
};

/// Result of reconciling a provider login.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Reconciliation {
	/// Profile mapped onto a local member.
	Linked {
		/// Member after the merge was persisted.
		member: Box<Member>,
		/// Whether the member was created by this login.
		is_new: bool,
	},
	/// No member exists and the caller must register first.
	NotRegistered,
}

/// Maps provider profiles onto members, creating them on first sight.
#[derive(Clone)]
pub struct IdentityReconciler {
	members: Arc<dyn MemberStore>,
	publisher: Arc<dyn EventPublisher>,
	config: Arc<BrokerConfig>,
}
impl IdentityReconciler {
	/// Creates a reconciler over the member store and event sink.
	pub fn new(
		members: Arc<dyn MemberStore>,
		publisher: Arc<dyn EventPublisher>,
		config: Arc<BrokerConfig>,
	) -> Self {
		Self { members, publisher, config }
	}

	/// Looks the member up by `email` and merges the profile into it.
	///
	/// Version 3 callers must register before a provider login, except through Apple. Member
	/// events are published on detached tasks: `Created` for new members, `Updated` only when
	/// the provider identity is linked for the first time.
	pub async fn check_member_socmed_type(
		&self,
		version: ApiVersion,
		provider: Provider,
		profile: &ProviderProfile,
		email: &str,
		member_type: &str,
	) -> Result<Reconciliation> {
		let now = OffsetDateTime::now_utc();

		match self.members.find_by_email(email).await? {
			Some(mut member) => {
				let first_link = apply_profile(&mut member, provider, profile, &self.config, now)?;
				let member = self.members.save(member).await?;

				if first_link {
					self.publish(MemberEvent::Updated(Box::new(member.clone())));
				}

				Ok(Reconciliation::Linked { member: Box::new(member), is_new: false })
			},
			None if version == ApiVersion::V3 && provider != Provider::Apple =>
				Ok(Reconciliation::NotRegistered),
			None => {
				let mut member = Member::new(email, member_type);

				apply_profile(&mut member, provider, profile, &self.config, now)?;

				let member = self.members.save(member).await?;

				self.publish(MemberEvent::Created(Box::new(member.clone())));

				Ok(Reconciliation::Linked { member: Box::new(member), is_new: true })
			},
		}
	}

	fn publish(&self, event: MemberEvent) {
		let publisher = self.publisher.clone();

		events::spawn_detached("member_event", async move { publisher.publish_member(event).await });
	}
}
impl Debug for IdentityReconciler {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("IdentityReconciler(..)")
	}
}
