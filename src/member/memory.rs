//! Thread-safe in-memory [`MemberStore`] implementation for local development and tests.

// self
use crate::{
	_prelude::*,
	auth::MemberId,
	member::{Member, MemberFuture, MemberStatus, MemberStore, MemberStoreError},
};

type MemberMap = Arc<RwLock<HashMap<MemberId, Member>>>;

/// Member store that keeps records in-process.
#[derive(Clone, Debug, Default)]
pub struct MemoryMemberStore(MemberMap);
impl MemoryMemberStore {
	/// Inserts a record synchronously; convenient for seeding fixtures.
	pub fn insert(&self, member: Member) {
		self.0.write().insert(member.id.clone(), member);
	}

	/// Snapshot of a record.
	pub fn snapshot(&self, id: &MemberId) -> Option<Member> {
		self.0.read().get(id).cloned()
	}

	/// Snapshot of a record by email.
	pub fn snapshot_by_email(&self, email: &str) -> Option<Member> {
		Self::find_email_now(&self.0, email)
	}

	/// Number of stored records.
	pub fn len(&self) -> usize {
		self.0.read().len()
	}

	/// Whether the store is empty.
	pub fn is_empty(&self) -> bool {
		self.0.read().is_empty()
	}

	fn find_email_now(map: &MemberMap, email: &str) -> Option<Member> {
		map.read().values().find(|m| m.email.eq_ignore_ascii_case(email.trim())).cloned()
	}

	fn update_now(
		map: &MemberMap,
		id: &MemberId,
		f: impl FnOnce(&mut Member),
	) -> Result<(), MemberStoreError> {
		let mut guard = map.write();
		let member =
			guard.get_mut(id).ok_or_else(|| MemberStoreError::NotFound { id: id.to_string() })?;

		f(member);

		Ok(())
	}
}
impl MemberStore for MemoryMemberStore {
	fn find_by_email<'a>(&'a self, email: &'a str) -> MemberFuture<'a, Option<Member>> {
		Box::pin(async move { Ok(Self::find_email_now(&self.0, email)) })
	}

	fn find_by_id<'a>(&'a self, id: &'a MemberId) -> MemberFuture<'a, Option<Member>> {
		Box::pin(async move { Ok(self.snapshot(id)) })
	}

	fn save(&self, mut member: Member) -> MemberFuture<'_, Member> {
		Box::pin(async move {
			member.updated_at = OffsetDateTime::now_utc();

			self.insert(member.clone());

			Ok(member)
		})
	}

	fn update_blocked_member<'a>(&'a self, id: &'a MemberId) -> MemberFuture<'a, ()> {
		Box::pin(async move {
			Self::update_now(&self.0, id, |m| {
				m.status = MemberStatus::Blocked;
				m.updated_at = OffsetDateTime::now_utc();
			})
		})
	}

	fn update_last_login<'a>(
		&'a self,
		id: &'a MemberId,
		at: OffsetDateTime,
	) -> MemberFuture<'a, ()> {
		Box::pin(async move { Self::update_now(&self.0, id, |m| m.last_login_at = Some(at)) })
	}
}
