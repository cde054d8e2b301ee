//! Consecutive password-failure counter behind the account lockout.

// self
use crate::{
	_prelude::*,
	store::{CacheKey, CacheStore, StoreError},
};

/// Result of recording a failed attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AttemptOutcome {
	/// Failures within the current window, including this one.
	pub count: u32,
	/// Whether the count reached the lockout threshold.
	pub locked: bool,
}

/// Counts failures per email inside a sliding TTL window.
///
/// The read-then-write is not atomic: concurrent failures for one email may under-count by
/// the number of racing requests.
#[derive(Clone)]
pub struct LoginAttemptTracker {
	cache: Arc<dyn CacheStore>,
	threshold: u32,
	window: Duration,
}
impl LoginAttemptTracker {
	/// Creates a tracker with the lockout threshold and window.
	pub fn new(cache: Arc<dyn CacheStore>, threshold: u32, window: Duration) -> Self {
		Self { cache, threshold, window }
	}

	/// Current failure count for the email.
	pub async fn count(&self, email: &str) -> Result<u32> {
		let key = CacheKey::login_attempt(email)?;

		Ok(self.cache.get(&key).await?.map(|raw| parse_count(&raw)).transpose()?.unwrap_or(0))
	}

	/// Records a failure and refreshes the window.
	pub async fn record_failure(&self, email: &str) -> Result<AttemptOutcome> {
		let key = CacheKey::login_attempt(email)?;
		let count = match self.cache.get(&key).await? {
			Some(raw) => parse_count(&raw)?.saturating_add(1),
			None => 1,
		};

		self.cache.set(&key, count.to_string(), self.window).await?;

		Ok(AttemptOutcome { count, locked: count >= self.threshold })
	}

	/// Clears the counter after a successful login.
	pub async fn reset(&self, email: &str) -> Result<()> {
		let key = CacheKey::login_attempt(email)?;

		self.cache.delete(&key).await?;

		Ok(())
	}
}
impl Debug for LoginAttemptTracker {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("LoginAttemptTracker")
			.field("threshold", &self.threshold)
			.field("window", &self.window)
			.finish_non_exhaustive()
	}
}

fn parse_count(raw: &str) -> Result<u32, StoreError> {
	raw.trim().parse().map_err(|_| StoreError::Serialization {
		message: format!("attempt counter `{raw}` is not a number"),
	})
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::store::MemoryCache;

	#[tokio::test]
	async fn locks_on_threshold_and_resets() {
		let cache = MemoryCache::default();
		let tracker = LoginAttemptTracker::new(Arc::new(cache.clone()), 3, Duration::minutes(30));

		for expected in 1..=2 {
			let outcome = tracker.record_failure("A@example.com").await.expect("Record should succeed.");

			assert_eq!(outcome, AttemptOutcome { count: expected, locked: false });
		}

		let outcome = tracker.record_failure("a@example.com").await.expect("Record should succeed.");

		assert!(outcome.locked);
		assert_eq!(tracker.count("a@EXAMPLE.com").await.expect("Count should succeed."), 3);
		assert!(cache.ttl("ATTEMPT:a@example.com").is_some());

		tracker.reset("a@example.com").await.expect("Reset should succeed.");

		assert_eq!(tracker.count("a@example.com").await.expect("Count should succeed."), 0);
	}

	#[tokio::test]
	async fn corrupt_counters_surface_as_storage_errors() {
		let cache = MemoryCache::default();
		let key = CacheKey::login_attempt("a@example.com").expect("Key fixture should be valid.");

		cache.set(&key, "many".into(), Duration::minutes(1)).await.expect("Set should succeed.");

		let tracker = LoginAttemptTracker::new(Arc::new(cache), 9, Duration::minutes(30));

		assert!(matches!(tracker.record_failure("a@example.com").await, Err(Error::Storage(_))));
	}
}
