//! Facebook gateway: accepts an authorization code or a user access token.

// self
use crate::{
	_prelude::*,
	auth::TokenSecret,
	error::{ConfigError, UpstreamError},
	http::FederationHttpClient,
	provider::{
		DefaultProviderStrategy, FacebookProfile, FederationArtifact, FederationGateway,
		GatewayFuture, Provider, ProviderProfile, TokenEndpointResponse, parse_endpoint,
		validate_endpoint,
	},
};

const DEFAULT_TOKEN_ENDPOINT: &str = "https://graph.facebook.com/v19.0/oauth/access_token";
const DEFAULT_PROFILE_ENDPOINT: &str = "https://graph.facebook.com/v19.0/me";
const PROFILE_FIELDS: &str = "id,name,email,first_name,last_name";

/// Facebook app registration.
#[derive(Clone, Debug)]
pub struct FacebookSettings {
	/// App id.
	pub app_id: String,
	/// App secret.
	pub app_secret: TokenSecret,
	/// Code exchange endpoint.
	pub token_endpoint: Url,
	/// Graph `/me` endpoint.
	pub profile_endpoint: Url,
}
impl FacebookSettings {
	/// Settings pointing at the public Graph API.
	pub fn new(app_id: impl Into<String>, app_secret: impl Into<String>) -> Result<Self, ConfigError> {
		Ok(Self {
			app_id: app_id.into(),
			app_secret: TokenSecret::new(app_secret),
			token_endpoint: parse_endpoint("facebook token", DEFAULT_TOKEN_ENDPOINT)?,
			profile_endpoint: parse_endpoint("facebook profile", DEFAULT_PROFILE_ENDPOINT)?,
		})
	}

	/// Overrides both endpoints.
	pub fn with_endpoints(mut self, token_endpoint: Url, profile_endpoint: Url) -> Self {
		self.token_endpoint = token_endpoint;
		self.profile_endpoint = profile_endpoint;

		self
	}
}

/// Gateway for Facebook sign-ins.
#[derive(Clone, Debug)]
pub struct FacebookGateway {
	http: FederationHttpClient,
	settings: FacebookSettings,
}
impl FacebookGateway {
	/// Creates the gateway after validating the settings.
	pub fn new(http: FederationHttpClient, settings: FacebookSettings) -> Result<Self, ConfigError> {
		if settings.app_id.trim().is_empty() {
			return Err(ConfigError::MissingSetting { field: "facebook.appId" });
		}

		validate_endpoint("facebook token", &settings.token_endpoint)?;
		validate_endpoint("facebook profile", &settings.profile_endpoint)?;

		Ok(Self { http, settings })
	}

	/// Redeems an authorization code for a user access token.
	pub async fn exchange_code(&self, code: &str, redirect_uri: Option<&str>) -> Result<TokenSecret> {
		let mut query = vec![
			("client_id", self.settings.app_id.as_str()),
			("client_secret", self.settings.app_secret.expose()),
			("code", code),
		];

		if let Some(redirect_uri) = redirect_uri {
			query.push(("redirect_uri", redirect_uri));
		}

		let request = self.http.get(self.settings.token_endpoint.clone()).query(&query);
		let response: TokenEndpointResponse =
			self.http.send_json(Provider::Facebook, &DefaultProviderStrategy, request).await?;

		response.access_token.ok_or_else(|| {
			UpstreamError::IncompleteResponse { provider: Provider::Facebook, field: "access_token" }
				.into()
		})
	}

	/// Fetches the Graph `/me` profile.
	pub async fn profile(&self, access_token: &str) -> Result<FacebookProfile> {
		let request = self
			.http
			.get(self.settings.profile_endpoint.clone())
			.query(&[("fields", PROFILE_FIELDS), ("access_token", access_token)]);

		self.http.send_json(Provider::Facebook, &DefaultProviderStrategy, request).await
	}
}
impl FederationGateway for FacebookGateway {
	fn provider(&self) -> Provider {
		Provider::Facebook
	}

	fn fetch_profile<'a>(
		&'a self,
		artifact: &'a FederationArtifact,
	) -> GatewayFuture<'a, ProviderProfile> {
		Box::pin(async move {
			let token = match artifact {
				FederationArtifact::Code { code, redirect_uri } =>
					self.exchange_code(code.expose(), redirect_uri.as_deref()).await?,
				FederationArtifact::Token(token) => token.clone(),
				FederationArtifact::Credentials { .. } =>
					return Err(artifact.unsupported(Provider::Facebook)),
			};

			Ok(ProviderProfile::Facebook(self.profile(token.expose()).await?))
		})
	}
}
