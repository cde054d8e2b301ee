//! Opaque refresh tokens, one per subject and device.

// crates.io
use rand::{Rng, distr::Alphanumeric};
// self
use crate::{
	_prelude::*,
	auth::{DeviceBinding, MemberId, TokenSecret},
	config::BrokerConfig,
	store::{CacheKey, CacheStore},
};

const REFRESH_TOKEN_LEN: usize = 64;

/// Issues, redeems, and revokes refresh tokens.
#[derive(Clone)]
pub struct RefreshTokenStore {
	cache: Arc<dyn CacheStore>,
	config: Arc<BrokerConfig>,
}
impl RefreshTokenStore {
	/// Creates a refresh-token store over the shared cache.
	pub fn new(cache: Arc<dyn CacheStore>, config: Arc<BrokerConfig>) -> Self {
		Self { cache, config }
	}

	/// Generates and stores a fresh token, replacing any previous one for the device.
	pub async fn issue(
		&self,
		subject: &MemberId,
		binding: &DeviceBinding,
		email: &str,
	) -> Result<TokenSecret> {
		let token = rand::rng()
			.sample_iter(Alphanumeric)
			.take(REFRESH_TOKEN_LEN)
			.map(char::from)
			.collect::<String>();
		let key = CacheKey::refresh_token(subject, binding);

		self.cache.set(&key, token.clone(), self.config.refresh_age_for(email)).await?;

		Ok(TokenSecret::new(token))
	}

	/// Requires `presented` to equal the stored token for the device.
	pub async fn redeem(
		&self,
		subject: &MemberId,
		binding: &DeviceBinding,
		presented: &str,
	) -> Result<()> {
		let key = CacheKey::refresh_token(subject, binding);
		let stored = self.cache.get(&key).await?.ok_or(Error::InvalidRefreshToken)?;

		if TokenSecret::new(stored).matches(presented) { Ok(()) } else { Err(Error::InvalidRefreshToken) }
	}

	/// Deletes the token for the device.
	pub async fn revoke(&self, subject: &MemberId, binding: &DeviceBinding) -> Result<bool> {
		let key = CacheKey::refresh_token(subject, binding);

		Ok(self.cache.delete(&key).await?)
	}
}
impl Debug for RefreshTokenStore {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("RefreshTokenStore(..)")
	}
}
