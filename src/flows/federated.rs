//! Provider grants: fetch the profile, reconcile it, then log the member in.

// self
use crate::{
	_prelude::*,
	error::{ConfigError, UpstreamError},
	flows::{GrantContext, ProfileOnly, TokenBroker, TokenRequest, TokenResult},
	identity::{IdentityReconciler, Reconciliation},
	obs,
	provider::{Provider, ProviderProfile},
};

impl TokenBroker {
	pub(super) async fn federated_grant(
		&self,
		ctx: &GrantContext,
		request: TokenRequest,
	) -> Result<TokenResult> {
		let provider = ctx.grant.provider().ok_or_else(|| Error::UnsupportedGrant {
			grant: ctx.grant.as_str().into(),
		})?;
		let gateway =
			self.gateways.get(&provider).ok_or(ConfigError::MissingGateway { provider })?;
		let artifact = request.artifact(provider)?;
		let timeout = self.config.federation_timeout;
		let mut profile =
			match tokio::time::timeout(timeout.unsigned_abs(), gateway.fetch_profile(&artifact)).await
			{
				Ok(Ok(profile)) => profile,
				Ok(Err(e)) => {
					obs::log_upstream_failure(provider.as_str(), &e);

					return Err(e);
				},
				Err(_) => {
					let e = UpstreamError::Timeout { provider, after: timeout };

					obs::log_upstream_failure(provider.as_str(), &e);

					return Err(e.into());
				},
			};

		if let ProviderProfile::Apple(apple) = &mut profile {
			apple.first_name = apple.first_name.take().or_else(|| request.first_name.clone());
			apple.last_name = apple.last_name.take().or_else(|| request.last_name.clone());
		}

		let email = profile
			.email()
			.map(str::to_owned)
			.ok_or(UpstreamError::MissingEmail { provider })?;
		let reconciler = IdentityReconciler::new(
			self.members.clone(),
			self.publisher.clone(),
			self.config.clone(),
		);

		match reconciler
			.check_member_socmed_type(ctx.version, provider, &profile, &email, &ctx.member_type)
			.await?
		{
			Reconciliation::NotRegistered => Ok(TokenResult::ProfileOnly(ProfileOnly::from_profile(
				provider,
				&profile,
				&email,
				ctx.language,
			))),
			Reconciliation::Linked { member, is_new } =>
				self.complete_login(ctx, request, *member, is_new, provider == Provider::Ldap).await,
		}
	}
}
