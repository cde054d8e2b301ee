//! Anonymous grant: one device-bound visitor token, reused while it is live.

// self
use crate::{
	_prelude::*,
	auth::{Claim, DeviceBinding, MemberId, TokenSecret},
	flows::{GrantContext, GrantType, TokenBroker, TokenRequest, TokenResult, issue::CommitPlan},
};

impl TokenBroker {
	/// Issues an anonymous token for the device.
	///
	/// A live anonymous session for the same device is returned as-is instead of minting a new
	/// token. Anonymous tokens never carry a refresh token.
	pub async fn generate_anonymous(
		&self,
		binding: DeviceBinding,
		member_type: &str,
	) -> Result<TokenRequest> {
		let subject = MemberId::anonymous();
		let mut request = TokenRequest::new(GrantType::Anonymous)
			.with_device(binding.device_id.to_string(), binding.device_login);

		request.member_type = Some(member_type.to_owned());

		let live = self
			.sessions
			.current(&subject, &binding)
			.await?
			.and_then(|current| self.signer.verify(&current).ok().map(|claims| (current, claims)));

		if let Some((current, claims)) = live {
			let remaining = claims.expires_at()? - OffsetDateTime::now_utc();

			request.expires_in = Some(remaining.whole_seconds().max(0));
			request.access_token = Some(TokenSecret::new(current));

			return Ok(request);
		}

		let claim = Claim {
			subject,
			binding,
			authorised: false,
			admin: false,
			staff: false,
			email: String::new(),
			member_type: member_type.to_owned(),
			custom_token: None,
		};

		self.commit(CommitPlan::for_grant(GrantType::Anonymous), claim, &mut request).await?;

		Ok(request)
	}

	pub(super) async fn anonymous_grant(
		&self,
		ctx: &GrantContext,
		request: TokenRequest,
	) -> Result<TokenResult> {
		let mut issued = self.generate_anonymous(ctx.device()?.clone(), &ctx.member_type).await?;

		issued.language = request.language;

		Ok(TokenResult::Issued(Box::new(issued)))
	}
}
