//! Typed cache keys for every namespace the broker writes.
//!
//! Layout: `STG-<subject>-<deviceId>-<deviceLogin>`, `RT-<subject>-<deviceId>-<deviceLogin>`,
//! `ATTEMPT:<email>`, and `mfa-otp[-admin]-<subject>-<deviceId>-<deviceLogin>`.

// self
use crate::{
	_prelude::*,
	auth::{DeviceBinding, MemberId},
	mfa::ChallengeScope,
};

/// Namespaces sharing the cache.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum KeyNamespace {
	/// Live access token per device.
	Session,
	/// Refresh token per device.
	RefreshToken,
	/// Consecutive password failures per email.
	LoginAttempt,
	/// Pending member MFA challenge.
	MfaChallenge,
	/// Pending admin MFA challenge.
	AdminMfaChallenge,
}
impl KeyNamespace {
	/// Literal prefix of keys in the namespace.
	pub const fn prefix(self) -> &'static str {
		match self {
			Self::Session => "STG-",
			Self::RefreshToken => "RT-",
			Self::LoginAttempt => "ATTEMPT:",
			Self::MfaChallenge => "mfa-otp-",
			Self::AdminMfaChallenge => "mfa-otp-admin-",
		}
	}
}

/// Errors raised when a key component cannot be embedded safely.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum KeyError {
	/// Component is empty after trimming.
	#[error("Cache key component `{component}` cannot be empty.")]
	Empty {
		/// Component name.
		component: &'static str,
	},
	/// Component contains whitespace or a pattern metacharacter.
	#[error("Cache key component `{component}` contains the reserved character {found:?}.")]
	ReservedCharacter {
		/// Component name.
		component: &'static str,
		/// Offending character.
		found: char,
	},
}

/// Fully qualified cache key.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CacheKey {
	namespace: KeyNamespace,
	value: String,
}
impl CacheKey {
	/// Key of the live session for a device.
	pub fn session(subject: &MemberId, binding: &DeviceBinding) -> Self {
		Self::device_scoped(KeyNamespace::Session, subject, binding)
	}

	/// Key of the refresh token for a device.
	pub fn refresh_token(subject: &MemberId, binding: &DeviceBinding) -> Self {
		Self::device_scoped(KeyNamespace::RefreshToken, subject, binding)
	}

	/// Key of the pending MFA challenge for a device.
	pub fn mfa_challenge(scope: ChallengeScope, subject: &MemberId, binding: &DeviceBinding) -> Self {
		let namespace = match scope {
			ChallengeScope::Member => KeyNamespace::MfaChallenge,
			ChallengeScope::Admin => KeyNamespace::AdminMfaChallenge,
		};

		Self::device_scoped(namespace, subject, binding)
	}

	/// Key of the attempt counter for an email; the email is trimmed and lowercased.
	pub fn login_attempt(email: &str) -> Result<Self, KeyError> {
		let email = email.trim().to_lowercase();

		if email.is_empty() {
			return Err(KeyError::Empty { component: "email" });
		}
		if let Some(found) =
			email.chars().find(|c| c.is_whitespace() || matches!(c, '*' | '?' | '[' | ']'))
		{
			return Err(KeyError::ReservedCharacter { component: "email", found });
		}

		Ok(Self {
			namespace: KeyNamespace::LoginAttempt,
			value: format!("{}{email}", KeyNamespace::LoginAttempt.prefix()),
		})
	}

	/// Namespace the key belongs to.
	pub fn namespace(&self) -> KeyNamespace {
		self.namespace
	}

	/// Full key string.
	pub fn as_str(&self) -> &str {
		&self.value
	}

	fn device_scoped(namespace: KeyNamespace, subject: &MemberId, binding: &DeviceBinding) -> Self {
		Self {
			namespace,
			value: format!(
				"{}{subject}-{}-{}",
				namespace.prefix(),
				binding.device_id,
				binding.device_login
			),
		}
	}
}
impl Display for CacheKey {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(&self.value)
	}
}

/// Prefix used to scan a namespace for one subject.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct KeyPrefix(String);
impl KeyPrefix {
	/// Prefix covering every live session of `subject`.
	pub fn sessions(subject: &MemberId) -> Self {
		Self(format!("{}{subject}-", KeyNamespace::Session.prefix()))
	}

	/// Prefix string.
	pub fn as_str(&self) -> &str {
		&self.0
	}

	/// Remainder of `key` after the prefix, if `key` starts with it.
	pub fn strip<'k>(&self, key: &'k str) -> Option<&'k str> {
		key.strip_prefix(self.0.as_str())
	}
}
impl Display for KeyPrefix {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(&self.0)
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::auth::{DeviceId, DeviceLogin};

	fn member() -> MemberId {
		MemberId::new("m1").expect("Member fixture should be valid.")
	}

	fn binding() -> DeviceBinding {
		DeviceBinding::new(
			DeviceId::new("dev-1").expect("Device fixture should be valid."),
			DeviceLogin::Web,
		)
	}

	#[test]
	fn device_scoped_keys_follow_layout() {
		assert_eq!(CacheKey::session(&member(), &binding()).as_str(), "STG-m1-dev-1-WEB");
		assert_eq!(CacheKey::refresh_token(&member(), &binding()).as_str(), "RT-m1-dev-1-WEB");
		assert_eq!(
			CacheKey::mfa_challenge(ChallengeScope::Member, &member(), &binding()).as_str(),
			"mfa-otp-m1-dev-1-WEB"
		);
		assert_eq!(
			CacheKey::mfa_challenge(ChallengeScope::Admin, &member(), &binding()).as_str(),
			"mfa-otp-admin-m1-dev-1-WEB"
		);
	}

	#[test]
	fn attempt_keys_normalize_email() {
		let key = CacheKey::login_attempt(" User@Example.COM ").expect("Email should be accepted.");

		assert_eq!(key.as_str(), "ATTEMPT:user@example.com");
		assert_eq!(key.namespace(), KeyNamespace::LoginAttempt);
		assert_eq!(CacheKey::login_attempt("  "), Err(KeyError::Empty { component: "email" }));
		assert_eq!(
			CacheKey::login_attempt("a*@example.com"),
			Err(KeyError::ReservedCharacter { component: "email", found: '*' })
		);
	}

	#[test]
	fn session_prefix_strips_to_device_and_login() {
		let prefix = KeyPrefix::sessions(&member());
		let key = CacheKey::session(&member(), &binding());

		assert_eq!(prefix.as_str(), "STG-m1-");
		assert_eq!(prefix.strip(key.as_str()), Some("dev-1-WEB"));
		assert_eq!(prefix.strip("RT-m1-dev-1-WEB"), None);
	}
}
