//! RS256 signer and verifier for broker access tokens.

// crates.io
use jsonwebtoken::{Algorithm, Header, Validation, errors::ErrorKind};
use uuid::Uuid;
// self
use crate::{
	_prelude::*,
	auth::{AccessToken, Claim, KeyProvider, KeyedDigest, TokenClaims, TokenSecret},
	config::BrokerConfig,
};

/// Whether verification enforces the `exp` claim.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Expiry {
	Enforce,
	Ignore,
}

/// Signs claim sets into access tokens and verifies presented tokens.
#[derive(Clone, Debug)]
pub struct TokenSigner {
	config: Arc<BrokerConfig>,
	keys: Arc<KeyProvider>,
	digest: KeyedDigest,
}
impl TokenSigner {
	/// Creates a signer over shared configuration and key material.
	pub fn new(config: Arc<BrokerConfig>, keys: Arc<KeyProvider>) -> Self {
		let digest = KeyedDigest::new(config.hash_key.expose());

		Self { config, keys, digest }
	}

	/// Signs the claim set.
	///
	/// Expiry is backdated by the configured clock skew; the returned `jti` is a keyed hash
	/// distinct from the random identifier signed into the payload.
	pub fn generate_access_token(&self, claim: &Claim) -> Result<AccessToken> {
		let now = OffsetDateTime::now_utc();
		let expires_at = now - self.config.clock_skew + self.config.token_age_for(&claim.email);
		let payload = TokenClaims {
			iss: self.config.issuer.clone(),
			aud: self.config.audience.clone(),
			sub: claim.subject.to_string(),
			iat: now.unix_timestamp(),
			nbf: now.unix_timestamp(),
			exp: expires_at.unix_timestamp(),
			jti: Uuid::new_v4().to_string(),
			device_id: claim.binding.device_id.to_string(),
			device_login: claim.binding.device_login,
			authorised: claim.authorised,
			admin: claim.admin,
			staff: claim.staff,
			email: claim.email.clone(),
			member_type: claim.member_type.clone(),
			custom_token: claim.custom_token.clone(),
		};
		let mut header = Header::new(Algorithm::RS256);

		header.kid = Some(self.keys.active_kid().to_owned());

		let token = jsonwebtoken::encode(&header, &payload, self.keys.encoding_key())
			.map_err(|source| Error::Signing { source })?;
		let jti = self.digest.hex(&format!("{}----{}", claim.email, Uuid::new_v4()));

		Ok(AccessToken { token: TokenSecret::new(token), jti, expires_at })
	}

	/// Verifies signature, algorithm, issuer, audience, and expiry.
	pub fn verify(&self, token: &str) -> Result<TokenClaims> {
		self.decode(token, Expiry::Enforce)
	}

	/// Verifies signature, algorithm, issuer, and audience while accepting expired tokens.
	///
	/// Reserved for refresh-token redemption and logout.
	pub fn verify_ignoring_expiration(&self, token: &str) -> Result<TokenClaims> {
		self.decode(token, Expiry::Ignore)
	}

	fn decode(&self, token: &str, expiry: Expiry) -> Result<TokenClaims> {
		let header = jsonwebtoken::decode_header(token).map_err(invalid_token)?;

		if header.alg != Algorithm::RS256 {
			return Err(Error::InvalidToken { reason: format!("unexpected algorithm {:?}", header.alg) });
		}

		let kid = header.kid.as_deref().unwrap_or(self.keys.active_kid());
		let key = self
			.keys
			.decoding_key(kid)
			.ok_or_else(|| Error::InvalidToken { reason: format!("unknown signing key `{kid}`") })?;
		let mut validation = Validation::new(Algorithm::RS256);

		validation.leeway = 0;
		validation.validate_exp = expiry == Expiry::Enforce;
		validation.set_issuer(&[self.config.issuer.as_str()]);
		validation.set_audience(&[self.config.audience.as_str()]);

		jsonwebtoken::decode::<TokenClaims>(token, key, &validation)
			.map(|data| data.claims)
			.map_err(invalid_token)
	}
}

fn invalid_token(e: jsonwebtoken::errors::Error) -> Error {
	let reason = match e.kind() {
		ErrorKind::ExpiredSignature => "token has expired".to_owned(),
		ErrorKind::InvalidSignature => "signature does not verify".to_owned(),
		ErrorKind::InvalidIssuer => "issuer mismatch".to_owned(),
		ErrorKind::InvalidAudience => "audience mismatch".to_owned(),
		_ => e.to_string(),
	};

	Error::InvalidToken { reason }
}
