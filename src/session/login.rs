//! Live-session records keyed by subject and device.

// self
use crate::{
	_prelude::*,
	auth::{AccessToken, DeviceBinding, DeviceId, MemberId, constant_time_eq},
	store::{CacheKey, CacheStore, KeyPrefix},
};

/// Tracks the single live access token per `(subject, device, login surface)`.
///
/// A newer login for the same device overwrites the record, which retires the older token for
/// every check that consults [`SessionStore::is_current`].
#[derive(Clone)]
pub struct SessionStore {
	cache: Arc<dyn CacheStore>,
}
impl SessionStore {
	/// Creates a session store over the shared cache.
	pub fn new(cache: Arc<dyn CacheStore>) -> Self {
		Self { cache }
	}

	/// Records `token` as the live session; the TTL equals its remaining lifetime.
	pub async fn record(
		&self,
		subject: &MemberId,
		binding: &DeviceBinding,
		token: &AccessToken,
	) -> Result<()> {
		let key = CacheKey::session(subject, binding);
		let ttl = token.expires_in(OffsetDateTime::now_utc());

		self.cache.set(&key, token.token.expose().to_owned(), ttl).await?;

		Ok(())
	}

	/// Live token for the device, if any.
	pub async fn current(&self, subject: &MemberId, binding: &DeviceBinding) -> Result<Option<String>> {
		let key = CacheKey::session(subject, binding);

		Ok(self.cache.get(&key).await?)
	}

	/// Whether `token` is the live session for the device.
	pub async fn is_current(
		&self,
		subject: &MemberId,
		binding: &DeviceBinding,
		token: &str,
	) -> Result<bool> {
		let current = self.current(subject, binding).await?;

		Ok(current.is_some_and(|c| constant_time_eq(c.as_bytes(), token.as_bytes())))
	}

	/// Drops the live session for the device.
	pub async fn remove(&self, subject: &MemberId, binding: &DeviceBinding) -> Result<bool> {
		let key = CacheKey::session(subject, binding);

		Ok(self.cache.delete(&key).await?)
	}

	/// Devices holding a live session for `subject`.
	pub async fn list(&self, subject: &MemberId) -> Result<Vec<DeviceBinding>> {
		let prefix = KeyPrefix::sessions(subject);
		let keys = self.cache.keys(&prefix).await?;
		let bindings = keys.iter().filter_map(|key| parse_binding(&prefix, key)).collect();

		Ok(bindings)
	}
}
impl Debug for SessionStore {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("SessionStore(..)")
	}
}

fn parse_binding(prefix: &KeyPrefix, key: &str) -> Option<DeviceBinding> {
	let (device_id, device_login) = prefix.strip(key)?.rsplit_once('-')?;

	Some(DeviceBinding::new(DeviceId::new(device_id).ok()?, device_login.parse().ok()?))
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::{
		auth::{DeviceLogin, TokenSecret},
		store::MemoryCache,
	};

	fn binding(device: &str, login: DeviceLogin) -> DeviceBinding {
		DeviceBinding::new(DeviceId::new(device).expect("Device fixture should be valid."), login)
	}

	fn token(value: &str, lifetime: Duration) -> AccessToken {
		AccessToken {
			token: TokenSecret::new(value),
			jti: "jti".into(),
			expires_at: OffsetDateTime::now_utc() + lifetime,
		}
	}

	#[tokio::test]
	async fn newer_login_supersedes_older_token() {
		let cache = MemoryCache::default();
		let sessions = SessionStore::new(Arc::new(cache.clone()));
		let member = MemberId::new("m1").expect("Member fixture should be valid.");
		let web = binding("dev-1", DeviceLogin::Web);

		sessions.record(&member, &web, &token("first", Duration::hours(1))).await.expect("Record should succeed.");
		sessions.record(&member, &web, &token("second", Duration::hours(1))).await.expect("Record should succeed.");

		assert!(!sessions.is_current(&member, &web, "first").await.expect("Lookup should succeed."));
		assert!(sessions.is_current(&member, &web, "second").await.expect("Lookup should succeed."));
		assert!(cache.ttl("STG-m1-dev-1-WEB").is_some_and(|ttl| ttl <= Duration::hours(1)));
	}

	#[tokio::test]
	async fn lists_devices_with_dashes() {
		let sessions = SessionStore::new(Arc::new(MemoryCache::default()));
		let member = MemberId::new("m1").expect("Member fixture should be valid.");

		for b in [binding("dev-1", DeviceLogin::Web), binding("phone", DeviceLogin::Mobile)] {
			sessions.record(&member, &b, &token("t", Duration::hours(1))).await.expect("Record should succeed.");
		}

		let listed = sessions.list(&member).await.expect("List should succeed.");

		assert_eq!(
			listed,
			vec![binding("dev-1", DeviceLogin::Web), binding("phone", DeviceLogin::Mobile)]
		);
		assert!(sessions.remove(&member, &listed[0]).await.expect("Remove should succeed."));
		assert_eq!(sessions.list(&member).await.expect("List should succeed.").len(), 1);
	}

	#[tokio::test]
	async fn expired_tokens_still_get_a_minimal_ttl() {
		let cache = MemoryCache::default();
		let sessions = SessionStore::new(Arc::new(cache.clone()));
		let member = MemberId::new("m1").expect("Member fixture should be valid.");
		let web = binding("dev-1", DeviceLogin::Web);

		sessions
			.record(&member, &web, &token("late", Duration::seconds(-5)))
			.await
			.expect("Record should succeed.");

		assert!(cache.ttl("STG-m1-dev-1-WEB").is_some());
	}
}
