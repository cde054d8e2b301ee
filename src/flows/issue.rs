//! Commit path shared by every grant: sign, rotate, record, then spawn side effects.

// self
use crate::{
	_prelude::*,
	auth::{Claim, DeviceBinding, MemberId},
	events::{self, SessionInfo},
	flows::{GrantContext, GrantType, TokenBroker, TokenRequest, TokenResult},
	member::{Member, MemberStatus, MemberStoreError},
};

/// What a commit does besides signing and recording the session.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(super) struct CommitPlan {
	label: &'static str,
	rotate_refresh: bool,
	record_session_info: bool,
}
impl CommitPlan {
	const DIRECT: Self = Self { label: "user-id", rotate_refresh: true, record_session_info: true };

	pub(super) const fn for_grant(grant: GrantType) -> Self {
		Self {
			label: grant.as_str(),
			rotate_refresh: !matches!(grant, GrantType::Anonymous),
			record_session_info: !matches!(grant, GrantType::Anonymous | GrantType::RefreshToken),
		}
	}
}

impl TokenBroker {
	/// Issues credentials for an existing member without a login grant.
	///
	/// Used after registration or by trusted back-office callers; account state is still
	/// enforced and MFA is not requested.
	pub async fn generate_token_from_user_id(
		&self,
		member_id: &MemberId,
		binding: DeviceBinding,
		member_type: Option<&str>,
	) -> Result<TokenRequest> {
		let member = self.load_member(member_id).await?;
		let member_type = member_type
			.map(str::to_owned)
			.unwrap_or_else(|| self.config.default_member_type.clone());

		if !self.config.is_allowed_member_type(&member_type) {
			return Err(Error::invalid_request(format!("member type `{member_type}` is not allowed")));
		}

		ensure_can_login(&member)?;

		let mut request =
			TokenRequest { grant_type: CommitPlan::DIRECT.label.into(), ..Default::default() }
				.with_device(binding.device_id.to_string(), binding.device_login);

		request.member_type = Some(member_type.clone());
		describe_member(&mut request, &member, false);

		self.commit(CommitPlan::DIRECT, member_claim(&member, binding, member_type, None), &mut request)
			.await?;

		Ok(request)
	}

	pub(super) async fn load_member(&self, id: &MemberId) -> Result<Member> {
		match self.members.load(id).await {
			Ok(member) => Ok(member),
			Err(MemberStoreError::NotFound { .. }) => Err(Error::MemberNotFound),
			Err(e) => Err(e.into()),
		}
	}

	/// Final step of every member login: account state, MFA decision, then commit.
	pub(super) async fn complete_login(
		&self,
		ctx: &GrantContext,
		mut request: TokenRequest,
		member: Member,
		is_new: bool,
		directory_login: bool,
	) -> Result<TokenResult> {
		ensure_can_login(&member)?;
		describe_member(&mut request, &member, is_new);

		let binding = ctx.device()?.clone();

		if let Some(scope) = self.mfa.requires_challenge(&member, directory_login) {
			let challenge = self.mfa.issue(scope, &member, &binding).await?;

			return Ok(TokenResult::Challenge(challenge));
		}

		let claim =
			member_claim(&member, binding, ctx.member_type.clone(), request.custom_token.clone());

		self.commit(CommitPlan::for_grant(ctx.grant), claim, &mut request).await?;

		Ok(TokenResult::Issued(Box::new(request)))
	}

	/// Signs the claim and persists the session; later failures only log.
	pub(super) async fn commit(
		&self,
		plan: CommitPlan,
		claim: Claim,
		request: &mut TokenRequest,
	) -> Result<()> {
		let token = self.signer.generate_access_token(&claim)?;
		let now = OffsetDateTime::now_utc();

		request.refresh_token = if plan.rotate_refresh {
			Some(self.refresh_tokens.issue(&claim.subject, &claim.binding, &claim.email).await?)
		} else {
			None
		};

		self.sessions.record(&claim.subject, &claim.binding, &token).await?;

		if plan.record_session_info {
			let publisher = self.publisher.clone();
			let session = SessionInfo {
				member_id: claim.subject.clone(),
				binding: claim.binding.clone(),
				grant: plan.label.into(),
				jti: token.jti.clone(),
				logged_in_at: now,
				expires_at: token.expires_at,
			};

			events::spawn_detached("session_info", async move {
				publisher.record_session(session).await
			});
		}
		if !claim.subject.is_anonymous() {
			let members = self.members.clone();
			let subject = claim.subject.clone();

			events::spawn_detached("last_login", async move {
				members.update_last_login(&subject, now).await
			});
		}

		request.expires_in = Some(token.expires_in(now).whole_seconds());
		request.jti = Some(token.jti);
		request.access_token = Some(token.token);

		Ok(())
	}
}

pub(super) fn ensure_can_login(member: &Member) -> Result<()> {
	match member.status {
		MemberStatus::Active => Ok(()),
		MemberStatus::Blocked => Err(Error::AccountBlocked),
		MemberStatus::Inactive => Err(Error::AccountInactive),
		MemberStatus::New => Err(Error::AccountNotActivated),
	}
}

pub(super) fn describe_member(request: &mut TokenRequest, member: &Member, is_new: bool) {
	let name = member.full_name();

	request.user_id = Some(member.id.clone());
	request.email = Some(member.email.clone());
	request.name = (!name.is_empty()).then_some(name);
	request.mobile = member.mobile.clone();
	request.new_member = is_new;
	request.has_password = member.has_password();
	request.mfa_enabled = member.mfa_enabled;
}

pub(super) fn member_claim(
	member: &Member,
	binding: DeviceBinding,
	member_type: String,
	custom_token: Option<String>,
) -> Claim {
	Claim {
		subject: member.id.clone(),
		binding,
		authorised: true,
		admin: member.admin,
		staff: member.staff,
		email: member.email.clone(),
		member_type,
		custom_token,
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn plans_skip_side_effects_per_grant() {
		let anonymous = CommitPlan::for_grant(GrantType::Anonymous);
		let refresh = CommitPlan::for_grant(GrantType::RefreshToken);
		let password = CommitPlan::for_grant(GrantType::Password);

		assert!(!anonymous.rotate_refresh && !anonymous.record_session_info);
		assert!(refresh.rotate_refresh && !refresh.record_session_info);
		assert!(password.rotate_refresh && password.record_session_info);
		assert_eq!(password.label, "password");
	}

	#[test]
	fn account_state_maps_to_errors() {
		let mut member = Member::new("a@example.com", "member");

		assert!(ensure_can_login(&member).is_ok());

		for (status, expected) in [
			(MemberStatus::Blocked, 401),
			(MemberStatus::Inactive, 400),
			(MemberStatus::New, 400),
		] {
			member.status = status;

			assert_eq!(
				ensure_can_login(&member).expect_err("Non-active members cannot log in.").status_code(),
				expected
			);
		}
	}
}
