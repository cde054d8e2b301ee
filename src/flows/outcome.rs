//! Closed result types returned by the broker's public operations.

// self
use crate::{
	_prelude::*,
	auth::{DeviceBinding, MemberId},
	flows::TokenRequest,
	messages::{Language, Message},
	mfa::MfaChallenge,
	provider::{Provider, ProviderProfile},
};

/// Outcome of [`crate::flows::TokenBroker::generate_token`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TokenResult {
	/// Credentials issued; the request record carries them.
	Issued(Box<TokenRequest>),
	/// A one-time code is required before credentials are issued.
	Challenge(MfaChallenge),
	/// The provider identity is unknown and must register first.
	ProfileOnly(ProfileOnly),
}
impl TokenResult {
	/// HTTP status the outcome maps to.
	pub fn status_code(&self) -> u16 {
		match self {
			Self::Issued(_) => 200,
			Self::Challenge(_) | Self::ProfileOnly(_) => 403,
		}
	}

	/// Issued request record, if any.
	pub fn issued(&self) -> Option<&TokenRequest> {
		match self {
			Self::Issued(request) => Some(request),
			_ => None,
		}
	}
}

/// Provider profile echoed back so the caller can pre-fill a registration form.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileOnly {
	/// Provider that authenticated the user.
	pub provider: Provider,
	/// Provider-side subject.
	pub subject: String,
	/// Email reported by the provider.
	pub email: String,
	/// Given name.
	pub first_name: String,
	/// Family name.
	pub last_name: String,
	/// Mobile number.
	pub mobile: Option<String>,
	/// Localized "needs registration" message.
	pub message: String,
}
impl ProfileOnly {
	/// Builds the response from a provider profile.
	pub fn from_profile(
		provider: Provider,
		profile: &ProviderProfile,
		email: &str,
		language: Language,
	) -> Self {
		let (first_name, last_name) = profile.names();

		Self {
			provider,
			subject: profile.subject().to_owned(),
			email: email.to_owned(),
			first_name,
			last_name,
			mobile: profile.mobile().map(str::to_owned),
			message: Message::NeedsRegistration.text(language).to_owned(),
		}
	}
}

/// Identity behind a verified access token.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyResponse {
	/// Token subject.
	pub member_id: MemberId,
	/// Member email (empty for anonymous tokens).
	pub email: String,
	/// Member type the session was opened for.
	pub member_type: String,
	/// Whether the subject is an authenticated member.
	pub authorised: bool,
	/// Administrator flag.
	pub admin: bool,
	/// Internal staff flag.
	pub staff: bool,
	/// Device the token is bound to.
	pub binding: DeviceBinding,
	/// Token expiry.
	#[serde(with = "time::serde::rfc3339")]
	pub expires_at: OffsetDateTime,
}
