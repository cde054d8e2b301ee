//! Completion of a pending MFA challenge.

// self
use crate::{
	_prelude::*,
	auth::TokenSecret,
	flows::{
		GrantContext, GrantType, TokenBroker, TokenRequest, TokenResult,
		issue::{self, CommitPlan},
	},
	mfa::{ChallengeScope, MfaGate},
};

impl TokenBroker {
	/// Any failure before the code is accepted reports [`Error::InvalidOtp`]; account state is
	/// re-checked afterwards since the member may have changed while the challenge was pending.
	pub(super) async fn verify_mfa_grant(
		&self,
		ctx: &GrantContext,
		mut request: TokenRequest,
	) -> Result<TokenResult> {
		let scope = if ctx.grant == GrantType::VerifyMfaNarwhal {
			ChallengeScope::Admin
		} else {
			ChallengeScope::Member
		};
		let credential = request.mfa_token.clone().unwrap_or_default();
		let otp = request.otp.as_ref().map(TokenSecret::expose).unwrap_or_default().to_owned();
		let member_id = MfaGate::parse_credential(&credential)?;
		let member = match self.load_member(&member_id).await {
			Ok(member) => member,
			Err(Error::MemberNotFound) => return Err(Error::InvalidOtp),
			Err(e) => return Err(e),
		};
		let binding = ctx.device()?.clone();

		self.mfa.verify(scope, &member, &binding, &credential, &otp).await?;

		issue::ensure_can_login(&member)?;
		issue::describe_member(&mut request, &member, false);

		let claim = issue::member_claim(
			&member,
			binding,
			ctx.member_type.clone(),
			request.custom_token.clone(),
		);

		self.commit(CommitPlan::for_grant(ctx.grant), claim, &mut request).await?;

		Ok(TokenResult::Issued(Box::new(request)))
	}
}
