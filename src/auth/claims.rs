//! Claim sets signed into access tokens and the issued token artifact.

// self
use crate::{
	_prelude::*,
	auth::{DeviceBinding, DeviceId, DeviceLogin, MemberId, TokenSecret},
};

/// Unsigned claim set assembled by the grant handlers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Claim {
	/// Token subject (member id, or the anonymous subject).
	pub subject: MemberId,
	/// Device the token is bound to.
	pub binding: DeviceBinding,
	/// Whether the subject is an authenticated member.
	pub authorised: bool,
	/// Administrator flag.
	pub admin: bool,
	/// Internal staff flag.
	pub staff: bool,
	/// Member email (empty for anonymous tokens).
	pub email: String,
	/// Member type the session was opened for.
	pub member_type: String,
	/// Opaque pass-through token supplied by the caller.
	pub custom_token: Option<String>,
}

/// JWT payload as signed and verified on the wire.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenClaims {
	/// Issuer.
	pub iss: String,
	/// Audience.
	pub aud: String,
	/// Subject.
	pub sub: String,
	/// Issued-at (unix seconds).
	pub iat: i64,
	/// Not-before (unix seconds).
	pub nbf: i64,
	/// Expiry (unix seconds).
	pub exp: i64,
	/// Random token identifier.
	pub jti: String,
	/// Device identifier.
	pub device_id: String,
	/// Login surface.
	pub device_login: DeviceLogin,
	/// Whether the subject is an authenticated member.
	pub authorised: bool,
	/// Administrator flag.
	pub admin: bool,
	/// Internal staff flag.
	pub staff: bool,
	/// Member email.
	pub email: String,
	/// Member type.
	pub member_type: String,
	/// Opaque pass-through token.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub custom_token: Option<String>,
}
impl TokenClaims {
	/// Subject as a validated member identifier.
	pub fn subject(&self) -> Result<MemberId> {
		MemberId::new(&self.sub)
			.map_err(|e| Error::InvalidToken { reason: format!("subject is malformed: {e}") })
	}

	/// Device binding recorded in the token.
	pub fn binding(&self) -> Result<DeviceBinding> {
		let device_id = DeviceId::new(&self.device_id)
			.map_err(|e| Error::InvalidToken { reason: format!("device is malformed: {e}") })?;

		Ok(DeviceBinding::new(device_id, self.device_login))
	}

	/// Expiry instant.
	pub fn expires_at(&self) -> Result<OffsetDateTime> {
		OffsetDateTime::from_unix_timestamp(self.exp)
			.map_err(|_| Error::InvalidToken { reason: "expiry is out of range".into() })
	}
}

/// Signed access token handed back to the caller.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AccessToken {
	/// Compact JWS.
	pub token: TokenSecret,
	/// Keyed-hash token identifier returned alongside the token.
	pub jti: String,
	/// Expiry instant.
	pub expires_at: OffsetDateTime,
}
impl AccessToken {
	/// Remaining lifetime relative to `now`, never negative.
	pub fn expires_in(&self, now: OffsetDateTime) -> Duration {
		(self.expires_at - now).max(Duration::ZERO)
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn claims() -> TokenClaims {
		TokenClaims {
			iss: "iss".into(),
			aud: "aud".into(),
			sub: "member-1".into(),
			iat: 1_700_000_000,
			nbf: 1_700_000_000,
			exp: 1_700_003_600,
			jti: "jti".into(),
			device_id: "device-1".into(),
			device_login: DeviceLogin::Mobile,
			authorised: true,
			admin: false,
			staff: false,
			email: "a@example.com".into(),
			member_type: "member".into(),
			custom_token: None,
		}
	}

	#[test]
	fn payload_uses_camel_case_and_skips_empty_custom_token() {
		let payload = serde_json::to_value(claims()).expect("Claims should serialize.");

		assert_eq!(payload["deviceId"], "device-1");
		assert_eq!(payload["deviceLogin"], "MOBILE");
		assert_eq!(payload["memberType"], "member");
		assert!(payload.get("customToken").is_none());
	}

	#[test]
	fn claims_expose_key_components() {
		let claims = claims();
		let binding = claims.binding().expect("Binding should be derivable.");

		assert_eq!(claims.subject().expect("Subject should be valid.").as_ref(), "member-1");
		assert_eq!(binding.device_login, DeviceLogin::Mobile);

		let mut broken = claims;

		broken.device_id = "bad device".into();

		assert!(matches!(broken.binding(), Err(Error::InvalidToken { .. })));
	}

	#[test]
	fn expires_in_saturates_at_zero() {
		let now = OffsetDateTime::now_utc();
		let token = AccessToken {
			token: TokenSecret::new("t"),
			jti: "j".into(),
			expires_at: now - Duration::minutes(1),
		};

		assert_eq!(token.expires_in(now), Duration::ZERO);
	}
}
