//! Refresh grant: redeem the device's refresh token and rotate both credentials.

// self
use crate::{
	_prelude::*,
	auth::TokenSecret,
	flows::{
		GrantContext, TokenBroker, TokenRequest, TokenResult,
		issue::{self, CommitPlan},
	},
};

impl TokenBroker {
	/// The presented access token may be expired; its signature, issuer, and audience still
	/// must verify, and it names the device whose refresh token is redeemed.
	pub(super) async fn refresh_grant(
		&self,
		ctx: &GrantContext,
		mut request: TokenRequest,
	) -> Result<TokenResult> {
		let access_token = request.access_token.as_ref().map(TokenSecret::expose).unwrap_or_default();
		let presented = request.refresh_token.as_ref().map(TokenSecret::expose).unwrap_or_default();
		let claims = self.signer.verify_ignoring_expiration(access_token)?;
		let subject = claims.subject()?;
		let binding = claims.binding()?;

		if subject.is_anonymous() {
			return Err(Error::InvalidRefreshToken);
		}

		self.refresh_tokens.redeem(&subject, &binding, presented).await?;

		let member = self.load_member(&subject).await?;

		issue::ensure_can_login(&member)?;
		issue::describe_member(&mut request, &member, false);

		request.device_id = Some(binding.device_id.to_string());
		request.device_login = Some(binding.device_login.as_str().into());
		request.member_type = Some(claims.member_type.clone());

		let claim = issue::member_claim(
			&member,
			binding,
			claims.member_type,
			claims.custom_token.or_else(|| request.custom_token.clone()),
		);

		self.commit(CommitPlan::for_grant(ctx.grant), claim, &mut request).await?;

		Ok(TokenResult::Issued(Box::new(request)))
	}
}
