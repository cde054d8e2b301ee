//! Thread-safe in-memory [`CacheStore`] implementation for local development and tests.

// self
use crate::{
	_prelude::*,
	store::{CacheKey, CacheStore, KeyPrefix, StoreFuture, ttl_seconds},
};

type CacheMap = Arc<RwLock<HashMap<String, Entry>>>;

#[derive(Clone, Debug)]
struct Entry {
	value: String,
	expires_at: OffsetDateTime,
}
impl Entry {
	fn is_live(&self, now: OffsetDateTime) -> bool {
		self.expires_at > now
	}
}

/// Cache backend that keeps expiring entries in-process.
#[derive(Clone, Debug, Default)]
pub struct MemoryCache(CacheMap);
impl MemoryCache {
	/// Remaining TTL of a live key.
	pub fn ttl(&self, key: &str) -> Option<Duration> {
		let now = OffsetDateTime::now_utc();

		self.0.read().get(key).filter(|e| e.is_live(now)).map(|e| e.expires_at - now)
	}

	/// Number of live entries.
	pub fn len(&self) -> usize {
		let now = OffsetDateTime::now_utc();

		self.0.read().values().filter(|e| e.is_live(now)).count()
	}

	/// Whether the cache holds no live entries.
	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	/// Every write also drops expired entries.
	fn set_now(map: CacheMap, key: String, value: String, ttl: Duration) {
		let now = OffsetDateTime::now_utc();
		let expires_at = now + Duration::seconds(ttl_seconds(ttl) as i64);
		let mut guard = map.write();

		guard.retain(|_, e| e.is_live(now));
		guard.insert(key, Entry { value, expires_at });
	}

	fn get_now(map: CacheMap, key: &str) -> Option<String> {
		let now = OffsetDateTime::now_utc();
		let mut guard = map.write();

		match guard.get(key) {
			Some(entry) if entry.is_live(now) => Some(entry.value.clone()),
			Some(_) => {
				guard.remove(key);

				None
			},
			None => None,
		}
	}

	fn delete_now(map: CacheMap, key: &str) -> bool {
		let now = OffsetDateTime::now_utc();

		map.write().remove(key).is_some_and(|e| e.is_live(now))
	}

	fn keys_now(map: CacheMap, prefix: &str) -> Vec<String> {
		let now = OffsetDateTime::now_utc();
		let mut keys = map
			.read()
			.iter()
			.filter(|(k, e)| k.starts_with(prefix) && e.is_live(now))
			.map(|(k, _)| k.clone())
			.collect::<Vec<_>>();

		keys.sort();

		keys
	}
}
impl CacheStore for MemoryCache {
	fn set<'a>(&'a self, key: &'a CacheKey, value: String, ttl: Duration) -> StoreFuture<'a, ()> {
		let map = self.0.clone();
		let key = key.as_str().to_owned();

		Box::pin(async move {
			Self::set_now(map, key, value, ttl);

			Ok(())
		})
	}

	fn get<'a>(&'a self, key: &'a CacheKey) -> StoreFuture<'a, Option<String>> {
		let map = self.0.clone();

		Box::pin(async move { Ok(Self::get_now(map, key.as_str())) })
	}

	fn delete<'a>(&'a self, key: &'a CacheKey) -> StoreFuture<'a, bool> {
		let map = self.0.clone();

		Box::pin(async move { Ok(Self::delete_now(map, key.as_str())) })
	}

	fn keys<'a>(&'a self, prefix: &'a KeyPrefix) -> StoreFuture<'a, Vec<String>> {
		let map = self.0.clone();

		Box::pin(async move { Ok(Self::keys_now(map, prefix.as_str())) })
	}
}
