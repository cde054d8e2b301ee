//! Redis-backed [`CacheStore`] built on a multiplexed connection manager.

// crates.io
use redis::{AsyncCommands, RedisError, aio::ConnectionManager};
// self
use crate::{
	_prelude::*,
	store::{CacheKey, CacheStore, KeyPrefix, StoreError, StoreFuture, ttl_seconds},
};

/// Cache backend over a shared Redis connection.
#[derive(Clone)]
pub struct RedisCache {
	conn: ConnectionManager,
}
impl RedisCache {
	/// Wraps an existing connection manager.
	pub fn new(conn: ConnectionManager) -> Self {
		Self { conn }
	}

	/// Opens a connection manager for `url` (for example `redis://127.0.0.1/`).
	pub async fn connect(url: &str) -> Result<Self, StoreError> {
		let client = redis::Client::open(url).map_err(backend)?;
		let conn = ConnectionManager::new(client).await.map_err(backend)?;

		Ok(Self { conn })
	}
}
impl Debug for RedisCache {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("RedisCache(..)")
	}
}
impl CacheStore for RedisCache {
	fn set<'a>(&'a self, key: &'a CacheKey, value: String, ttl: Duration) -> StoreFuture<'a, ()> {
		let mut conn = self.conn.clone();

		Box::pin(async move {
			conn.set_ex::<_, _, ()>(key.as_str(), value, ttl_seconds(ttl)).await.map_err(backend)
		})
	}

	fn get<'a>(&'a self, key: &'a CacheKey) -> StoreFuture<'a, Option<String>> {
		let mut conn = self.conn.clone();

		Box::pin(async move { conn.get::<_, Option<String>>(key.as_str()).await.map_err(backend) })
	}

	fn delete<'a>(&'a self, key: &'a CacheKey) -> StoreFuture<'a, bool> {
		let mut conn = self.conn.clone();

		Box::pin(async move {
			let removed = conn.del::<_, i64>(key.as_str()).await.map_err(backend)?;

			Ok(removed > 0)
		})
	}

	fn keys<'a>(&'a self, prefix: &'a KeyPrefix) -> StoreFuture<'a, Vec<String>> {
		let mut conn = self.conn.clone();

		Box::pin(async move {
			let mut keys = conn
				.keys::<_, Vec<String>>(format!("{}*", prefix.as_str()))
				.await
				.map_err(backend)?;

			keys.sort();

			Ok(keys)
		})
	}
}

fn backend(e: RedisError) -> StoreError {
	StoreError::Backend { message: e.to_string() }
}
