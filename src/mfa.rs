//! Multi-factor challenge gate: decides on, mints, and verifies TOTP challenges.
//!
//! A challenge is a keyed digest of `email-memberId-deviceId-deviceLogin` combined with the
//! base64 member id into one credential, `challenge-base64(memberId)`. The credential is stored
//! under a role-scoped key for a short TTL and consumed by the first successful verification.
//! Every failure surfaces as [`Error::InvalidOtp`] so callers cannot tell which check failed.

// crates.io
use base64::{Engine, engine::general_purpose::STANDARD};
use totp_rs::{Algorithm, Secret, TOTP};
// self
use crate::{
	_prelude::*,
	auth::{DeviceBinding, KeyedDigest, MemberId, TokenSecret, constant_time_eq},
	config::BrokerConfig,
	member::Member,
	store::{CacheKey, CacheStore},
};

const TOTP_DIGITS: usize = 6;
const TOTP_SKEW: u8 = 1;
const TOTP_STEP: u64 = 30;
const TOTP_LABEL: &str = "member";

/// Which challenge namespace a login falls into.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChallengeScope {
	/// Member enabled MFA on their account.
	Member,
	/// Directory login with the admin MFA policy on.
	Admin,
}

/// Challenge handed back instead of a token.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MfaChallenge {
	/// Credential to present with the one-time code.
	pub mfa_token: String,
	/// Seconds until the challenge expires.
	pub expires_in: i64,
	/// Whether this is an admin challenge.
	pub admin: bool,
}

/// Fresh TOTP enrollment material.
#[derive(Clone, Debug)]
pub struct MfaEnrollment {
	/// Base32 secret to persist on the member record.
	pub secret: TokenSecret,
	/// `otpauth://` provisioning URL for authenticator apps.
	pub provisioning_url: String,
}

/// Issues and verifies MFA challenges.
#[derive(Clone)]
pub struct MfaGate {
	cache: Arc<dyn CacheStore>,
	config: Arc<BrokerConfig>,
	digest: KeyedDigest,
}
impl MfaGate {
	/// Creates a gate over the shared cache.
	pub fn new(cache: Arc<dyn CacheStore>, config: Arc<BrokerConfig>) -> Self {
		let digest = KeyedDigest::new(config.hash_key.expose());

		Self { cache, config, digest }
	}

	/// Challenge scope required for the login, if any.
	///
	/// Directory logins under the admin policy always need an admin challenge; otherwise the
	/// member's own MFA flag decides.
	pub fn requires_challenge(&self, member: &Member, directory_login: bool) -> Option<ChallengeScope> {
		if directory_login && self.config.narwhal_admin_mfa {
			Some(ChallengeScope::Admin)
		} else if member.mfa_enabled {
			Some(ChallengeScope::Member)
		} else {
			None
		}
	}

	/// Mints and stores a challenge, replacing any pending one for the device.
	pub async fn issue(
		&self,
		scope: ChallengeScope,
		member: &Member,
		binding: &DeviceBinding,
	) -> Result<MfaChallenge> {
		let challenge = self.digest.hex(&format!(
			"{}-{}-{}-{}",
			member.email, member.id, binding.device_id, binding.device_login
		));
		let credential = format!("{challenge}-{}", STANDARD.encode(member.id.as_bytes()));
		let key = CacheKey::mfa_challenge(scope, &member.id, binding);
		let ttl = self.config.mfa_challenge_ttl;

		self.cache.set(&key, credential.clone(), ttl).await?;

		Ok(MfaChallenge {
			mfa_token: credential,
			expires_in: ttl.whole_seconds(),
			admin: scope == ChallengeScope::Admin,
		})
	}

	/// Extracts the member id from a presented credential.
	pub fn parse_credential(credential: &str) -> Result<MemberId> {
		let (_, encoded) = credential.split_once('-').ok_or(Error::InvalidOtp)?;
		let raw = STANDARD.decode(encoded).map_err(|_| Error::InvalidOtp)?;
		let id = String::from_utf8(raw).map_err(|_| Error::InvalidOtp)?;

		MemberId::new(id).map_err(|_| Error::InvalidOtp)
	}

	/// Verifies the credential and one-time code, consuming the challenge on success.
	pub async fn verify(
		&self,
		scope: ChallengeScope,
		member: &Member,
		binding: &DeviceBinding,
		credential: &str,
		otp: &str,
	) -> Result<()> {
		let key = CacheKey::mfa_challenge(scope, &member.id, binding);
		let stored = self.cache.get(&key).await?.ok_or(Error::InvalidOtp)?;

		if !constant_time_eq(stored.as_bytes(), credential.as_bytes()) {
			return Err(Error::InvalidOtp);
		}

		let secret = member.mfa_secret.as_ref().ok_or(Error::InvalidOtp)?;

		if !check_code(secret.expose(), otp.trim()) {
			return Err(Error::InvalidOtp);
		}

		self.cache.delete(&key).await?;

		Ok(())
	}

	/// Generates a new TOTP secret and provisioning URL for `account`.
	pub fn enroll(&self, account: &str) -> Result<MfaEnrollment> {
		let secret = Secret::generate_secret();
		let bytes = secret.to_bytes().map_err(|e| Error::invalid_request(format!("{e:?}")))?;
		let totp = TOTP::new(
			Algorithm::SHA1,
			TOTP_DIGITS,
			TOTP_SKEW,
			TOTP_STEP,
			bytes,
			self.config.totp_issuer.clone(),
			account.to_owned(),
		)
		.map_err(|e| Error::invalid_request(format!("TOTP cannot be provisioned: {e}")))?;

		Ok(MfaEnrollment {
			secret: TokenSecret::new(totp.get_secret_base32()),
			provisioning_url: totp.get_url(),
		})
	}
}
impl Debug for MfaGate {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("MfaGate")
			.field("ttl", &self.config.mfa_challenge_ttl)
			.finish_non_exhaustive()
	}
}

fn check_code(secret_base32: &str, otp: &str) -> bool {
	let Ok(bytes) = Secret::Encoded(secret_base32.to_owned()).to_bytes() else { return false };
	let Ok(totp) = TOTP::new(
		Algorithm::SHA1,
		TOTP_DIGITS,
		TOTP_SKEW,
		TOTP_STEP,
		bytes,
		None,
		TOTP_LABEL.to_owned(),
	) else {
		return false;
	};

	totp.check_current(otp).unwrap_or(false)
}
