//! Member records and the narrow persistence contract the broker consumes.

pub mod memory;

pub use memory::MemoryMemberStore;

// self
use crate::{
	_prelude::*,
	auth::{MemberId, TokenSecret, verify_password},
	provider::Provider,
};

/// Future returned by [`MemberStore`] operations.
pub type MemberFuture<'a, T> =
	Pin<Box<dyn Future<Output = Result<T, MemberStoreError>> + 'a + Send>>;

/// Account lifecycle state.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemberStatus {
	/// Registered but not yet activated.
	#[default]
	New,
	/// Allowed to log in.
	Active,
	/// Locked out after repeated failures.
	Blocked,
	/// Deactivated.
	Inactive,
}

/// Gender recorded on the profile.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
	/// Not provided.
	#[default]
	Unspecified,
	/// Male.
	Male,
	/// Female.
	Female,
}

/// Link to an identity-provider account.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SocialLink {
	/// Provider-side subject identifier.
	pub subject: String,
	/// First time the link was established; never overwritten.
	#[serde(with = "time::serde::rfc3339")]
	pub connected_at: OffsetDateTime,
}

/// Provider accounts linked to a member.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SocialIdentities {
	/// Azure AD object id.
	pub azure: Option<SocialLink>,
	/// Google subject (shared by code and one-tap logins).
	pub google: Option<SocialLink>,
	/// Facebook user id.
	pub facebook: Option<SocialLink>,
	/// Apple subject.
	pub apple: Option<SocialLink>,
	/// Directory account name.
	pub ldap: Option<SocialLink>,
}
impl SocialIdentities {
	/// Link slot for the provider.
	pub fn get(&self, provider: Provider) -> Option<&SocialLink> {
		match provider {
			Provider::Azure => self.azure.as_ref(),
			Provider::Google | Provider::GoogleOneTap => self.google.as_ref(),
			Provider::Facebook => self.facebook.as_ref(),
			Provider::Apple => self.apple.as_ref(),
			Provider::Ldap => self.ldap.as_ref(),
		}
	}

	/// Links `subject` for the provider, keeping an existing connection timestamp.
	///
	/// Returns `true` when the provider had no link before.
	pub fn link(&mut self, provider: Provider, subject: &str, now: OffsetDateTime) -> bool {
		let slot = match provider {
			Provider::Azure => &mut self.azure,
			Provider::Google | Provider::GoogleOneTap => &mut self.google,
			Provider::Facebook => &mut self.facebook,
			Provider::Apple => &mut self.apple,
			Provider::Ldap => &mut self.ldap,
		};

		match slot {
			Some(link) => {
				if link.subject.is_empty() {
					link.subject = subject.to_owned();
				}

				false
			},
			None => {
				*slot = Some(SocialLink { subject: subject.to_owned(), connected_at: now });

				true
			},
		}
	}
}

/// Local member record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Member {
	/// Member identifier.
	pub id: MemberId,
	/// Login email.
	pub email: String,
	/// Given name.
	pub first_name: String,
	/// Family name.
	pub last_name: String,
	/// Mobile number.
	pub mobile: Option<String>,
	/// Gender.
	pub gender: Gender,
	/// Lifecycle state.
	pub status: MemberStatus,
	/// Member type the account was registered for.
	pub member_type: String,
	/// Hex SHA-256 of salt ‖ password.
	pub password_hash: Option<String>,
	/// Salt for the password hash.
	pub password_salt: Option<String>,
	/// Whether logins require a TOTP challenge.
	pub mfa_enabled: bool,
	/// Base32 TOTP secret.
	pub mfa_secret: Option<TokenSecret>,
	/// Administrator flag.
	pub admin: bool,
	/// Internal staff flag.
	pub staff: bool,
	/// Linked provider accounts.
	pub social: SocialIdentities,
	/// Creation instant.
	#[serde(with = "time::serde::rfc3339")]
	pub created_at: OffsetDateTime,
	/// Last update instant.
	#[serde(with = "time::serde::rfc3339")]
	pub updated_at: OffsetDateTime,
	/// Last successful login.
	#[serde(default, with = "time::serde::rfc3339::option")]
	pub last_login_at: Option<OffsetDateTime>,
}
impl Member {
	/// Blank active member with a generated identifier.
	pub fn new(email: impl Into<String>, member_type: impl Into<String>) -> Self {
		let now = OffsetDateTime::now_utc();

		Self {
			id: MemberId::generate(),
			email: email.into(),
			first_name: String::new(),
			last_name: String::new(),
			mobile: None,
			gender: Gender::default(),
			status: MemberStatus::Active,
			member_type: member_type.into(),
			password_hash: None,
			password_salt: None,
			mfa_enabled: false,
			mfa_secret: None,
			admin: false,
			staff: false,
			social: SocialIdentities::default(),
			created_at: now,
			updated_at: now,
			last_login_at: None,
		}
	}

	/// Display name assembled from the name parts.
	pub fn full_name(&self) -> String {
		format!("{} {}", self.first_name, self.last_name).trim().to_owned()
	}

	/// Whether a local password is set.
	pub fn has_password(&self) -> bool {
		self.password_hash.as_deref().is_some_and(|h| !h.is_empty())
	}

	/// Checks a presented password against the stored salted hash.
	pub fn verify_password(&self, password: &str) -> bool {
		match (self.password_salt.as_deref(), self.password_hash.as_deref()) {
			(Some(salt), Some(hash)) if !hash.is_empty() => verify_password(salt, password, hash),
			_ => false,
		}
	}
}

/// Persistence contract for member records.
pub trait MemberStore
where
	Self: Send + Sync,
{
	/// Looks a member up by email (case-insensitive).
	fn find_by_email<'a>(&'a self, email: &'a str) -> MemberFuture<'a, Option<Member>>;

	/// Looks a member up by identifier.
	fn find_by_id<'a>(&'a self, id: &'a MemberId) -> MemberFuture<'a, Option<Member>>;

	/// Loads a member that must exist.
	fn load<'a>(&'a self, id: &'a MemberId) -> MemberFuture<'a, Member> {
		Box::pin(async move {
			self.find_by_id(id).await?.ok_or_else(|| MemberStoreError::NotFound { id: id.to_string() })
		})
	}

	/// Inserts or replaces a member.
	fn save(&self, member: Member) -> MemberFuture<'_, Member>;

	/// Marks the member blocked after the lockout threshold is reached.
	fn update_blocked_member<'a>(&'a self, id: &'a MemberId) -> MemberFuture<'a, ()>;

	/// Stamps the last successful login.
	fn update_last_login<'a>(
		&'a self,
		id: &'a MemberId,
		at: OffsetDateTime,
	) -> MemberFuture<'a, ()>;
}

/// Error type produced by [`MemberStore`] implementations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum MemberStoreError {
	/// Member does not exist.
	#[error("Member {id} does not exist.")]
	NotFound {
		/// Requested identifier.
		id: String,
	},
	/// Stored record could not be decoded.
	#[error("Serialization error: {message}.")]
	Serialization {
		/// Human-readable error payload.
		message: String,
	},
	/// Backend-level failure.
	#[error("Backend failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::auth::hash_password;

	#[test]
	fn link_reports_first_connection_only() {
		let mut social = SocialIdentities::default();
		let first = OffsetDateTime::now_utc() - Duration::days(3);

		assert!(social.link(Provider::GoogleOneTap, "g-1", first));
		assert!(!social.link(Provider::Google, "g-2", OffsetDateTime::now_utc()));

		let link = social.get(Provider::Google).expect("Google link should exist.");

		assert_eq!(link.subject, "g-1");
		assert_eq!(link.connected_at, first);
	}

	#[test]
	fn password_verification_requires_salt_and_hash() {
		let mut member = Member::new("a@example.com", "member");

		assert!(!member.has_password());
		assert!(!member.verify_password("secret"));

		member.password_salt = Some("salt".into());
		member.password_hash = Some(hash_password("salt", "secret"));

		assert!(member.has_password());
		assert!(member.verify_password("secret"));
		assert!(!member.verify_password("Secret"));
	}

	#[test]
	fn member_serializes_camel_case_with_rfc3339_times() {
		let member = Member::new("a@example.com", "member");
		let payload = serde_json::to_value(&member).expect("Member should serialize.");

		assert_eq!(payload["status"], "active");
		assert!(payload["createdAt"].as_str().is_some_and(|s| s.contains('T')));
		assert!(payload["lastLoginAt"].is_null());
	}
}
