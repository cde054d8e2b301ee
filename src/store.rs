//! Key-value cache contract and built-in cache backends.
//!
//! The cache is the single source of truth for sessions, refresh tokens, attempt counters, and
//! MFA challenges. Values are plain strings with a per-entry TTL.

pub mod key;
pub mod memory;
#[cfg(feature = "redis")] pub mod redis;

pub use key::*;
pub use memory::MemoryCache;
#[cfg(feature = "redis")] pub use self::redis::RedisCache;

// self
use crate::_prelude::*;

/// Future returned by [`CacheStore`] operations.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + 'a + Send>>;

/// Cache backend contract.
pub trait CacheStore
where
	Self: Send + Sync,
{
	/// Stores `value` under `key`, replacing any previous value and TTL.
	fn set<'a>(&'a self, key: &'a CacheKey, value: String, ttl: Duration) -> StoreFuture<'a, ()>;

	/// Fetches the live value under `key`, if any.
	fn get<'a>(&'a self, key: &'a CacheKey) -> StoreFuture<'a, Option<String>>;

	/// Deletes `key`, reporting whether a live value was removed.
	fn delete<'a>(&'a self, key: &'a CacheKey) -> StoreFuture<'a, bool>;

	/// Lists live keys starting with `prefix`.
	fn keys<'a>(&'a self, prefix: &'a KeyPrefix) -> StoreFuture<'a, Vec<String>>;
}

/// Error type produced by [`CacheStore`] implementations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum StoreError {
	/// A stored value could not be decoded.
	#[error("Serialization error: {message}.")]
	Serialization {
		/// Human-readable error payload.
		message: String,
	},
	/// Backend-level failure for the cache engine.
	#[error("Backend failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
}

/// Whole-second TTL accepted by cache engines; never below one second.
pub fn ttl_seconds(ttl: Duration) -> u64 {
	ttl.whole_seconds().max(1) as u64
}
