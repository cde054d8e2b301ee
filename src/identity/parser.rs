//! Pure mapping from provider profiles onto member records.

// self
use crate::{
	_prelude::*,
	config::BrokerConfig,
	member::{Member, MemberStatus},
	provider::{Provider, ProviderProfile},
};

/// Merges `profile` into `member` without overwriting populated fields.
///
/// Returns `true` when the provider identity is linked for the first time.
pub fn apply_profile(
	member: &mut Member,
	provider: Provider,
	profile: &ProviderProfile,
	config: &BrokerConfig,
	now: OffsetDateTime,
) -> Result<bool> {
	if !profile.serves(provider) {
		return Err(Error::UnsupportedGrant { grant: provider.to_string() });
	}

	let (first_name, last_name) = profile.names();

	fill(&mut member.first_name, first_name);
	fill(&mut member.last_name, last_name);

	if member.mobile.as_deref().is_none_or(str::is_empty) {
		member.mobile = profile.mobile().map(str::to_owned);
	}
	if member.email.trim().is_empty() {
		member.email = profile.email().unwrap_or_default().to_owned();
	}
	if member.status == MemberStatus::New {
		member.status = MemberStatus::Active;
	}
	if config.is_internal_email(&member.email) {
		member.staff = true;

		if provider == Provider::Ldap {
			member.admin = true;
		}
	}

	Ok(member.social.link(provider, profile.subject(), now))
}

fn fill(slot: &mut String, value: String) {
	if slot.trim().is_empty() && !value.is_empty() {
		*slot = value;
	}
}
