//! Google gateways: authorization-code sign-in and one-tap ID tokens.

// self
use crate::{
	_prelude::*,
	auth::TokenSecret,
	error::{ConfigError, UpstreamError},
	http::FederationHttpClient,
	provider::{
		DefaultProviderStrategy, FederationArtifact, FederationGateway, GatewayFuture, GoogleProfile,
		Provider, ProviderProfile, TokenEndpointResponse, parse_endpoint, validate_endpoint,
	},
};

const DEFAULT_TOKEN_ENDPOINT: &str = "https://oauth2.googleapis.com/token";
const DEFAULT_USERINFO_ENDPOINT: &str = "https://openidconnect.googleapis.com/v1/userinfo";
const DEFAULT_TOKENINFO_ENDPOINT: &str = "https://oauth2.googleapis.com/tokeninfo";

/// Google OAuth client registration.
#[derive(Clone, Debug)]
pub struct GoogleSettings {
	/// OAuth client id (also the expected one-tap audience).
	pub client_id: String,
	/// OAuth client secret.
	pub client_secret: TokenSecret,
	/// Token endpoint.
	pub token_endpoint: Url,
	/// OpenID userinfo endpoint.
	pub userinfo_endpoint: Url,
	/// Tokeninfo endpoint used for one-tap ID tokens.
	pub tokeninfo_endpoint: Url,
}
impl GoogleSettings {
	/// Settings pointing at Google's public endpoints.
	pub fn new(
		client_id: impl Into<String>,
		client_secret: impl Into<String>,
	) -> Result<Self, ConfigError> {
		Ok(Self {
			client_id: client_id.into(),
			client_secret: TokenSecret::new(client_secret),
			token_endpoint: parse_endpoint("google token", DEFAULT_TOKEN_ENDPOINT)?,
			userinfo_endpoint: parse_endpoint("google userinfo", DEFAULT_USERINFO_ENDPOINT)?,
			tokeninfo_endpoint: parse_endpoint("google tokeninfo", DEFAULT_TOKENINFO_ENDPOINT)?,
		})
	}

	/// Overrides every endpoint (tests, proxies).
	pub fn with_endpoints(mut self, token: Url, userinfo: Url, tokeninfo: Url) -> Self {
		self.token_endpoint = token;
		self.userinfo_endpoint = userinfo;
		self.tokeninfo_endpoint = tokeninfo;

		self
	}

	fn validate(&self) -> Result<(), ConfigError> {
		if self.client_id.trim().is_empty() {
			return Err(ConfigError::MissingSetting { field: "google.clientId" });
		}

		validate_endpoint("google token", &self.token_endpoint)?;
		validate_endpoint("google userinfo", &self.userinfo_endpoint)?;
		validate_endpoint("google tokeninfo", &self.tokeninfo_endpoint)
	}
}

/// Gateway for Google authorization-code sign-ins.
#[derive(Clone, Debug)]
pub struct GoogleGateway {
	http: FederationHttpClient,
	settings: GoogleSettings,
}
impl GoogleGateway {
	/// Creates the gateway after validating the settings.
	pub fn new(http: FederationHttpClient, settings: GoogleSettings) -> Result<Self, ConfigError> {
		settings.validate()?;

		Ok(Self { http, settings })
	}

	/// Redeems an authorization code for an access token.
	pub async fn exchange_code(&self, code: &str, redirect_uri: Option<&str>) -> Result<TokenSecret> {
		// Codes minted by the JS popup flow carry the `postmessage` redirect.
		let form = [
			("client_id", self.settings.client_id.as_str()),
			("client_secret", self.settings.client_secret.expose()),
			("grant_type", "authorization_code"),
			("code", code),
			("redirect_uri", redirect_uri.unwrap_or("postmessage")),
		];
		let request = self.http.post(self.settings.token_endpoint.clone()).form(&form);
		let response: TokenEndpointResponse =
			self.http.send_json(Provider::Google, &DefaultProviderStrategy, request).await?;

		response.access_token.ok_or_else(|| {
			UpstreamError::IncompleteResponse { provider: Provider::Google, field: "access_token" }
				.into()
		})
	}

	/// Fetches the userinfo profile.
	pub async fn profile(&self, access_token: &str) -> Result<GoogleProfile> {
		let request =
			self.http.get(self.settings.userinfo_endpoint.clone()).bearer_auth(access_token);

		self.http.send_json(Provider::Google, &DefaultProviderStrategy, request).await
	}
}
impl FederationGateway for GoogleGateway {
	fn provider(&self) -> Provider {
		Provider::Google
	}

	fn fetch_profile<'a>(
		&'a self,
		artifact: &'a FederationArtifact,
	) -> GatewayFuture<'a, ProviderProfile> {
		Box::pin(async move {
			let FederationArtifact::Code { code, redirect_uri } = artifact else {
				return Err(artifact.unsupported(Provider::Google));
			};
			let token = self.exchange_code(code.expose(), redirect_uri.as_deref()).await?;

			Ok(ProviderProfile::Google(self.profile(token.expose()).await?))
		})
	}
}

/// Gateway for Google one-tap ID tokens, validated through tokeninfo.
#[derive(Clone, Debug)]
pub struct GoogleOneTapGateway {
	http: FederationHttpClient,
	settings: GoogleSettings,
}
impl GoogleOneTapGateway {
	/// Creates the gateway after validating the settings.
	pub fn new(http: FederationHttpClient, settings: GoogleSettings) -> Result<Self, ConfigError> {
		settings.validate()?;

		Ok(Self { http, settings })
	}

	/// Resolves an ID token into its profile, requiring the audience to be this client.
	pub async fn profile(&self, id_token: &str) -> Result<GoogleProfile> {
		let request = self
			.http
			.get(self.settings.tokeninfo_endpoint.clone())
			.query(&[("id_token", id_token)]);
		let profile: GoogleProfile =
			self.http.send_json(Provider::GoogleOneTap, &DefaultProviderStrategy, request).await?;

		if profile.aud.as_deref() != Some(self.settings.client_id.as_str()) {
			return Err(UpstreamError::Rejected {
				provider: Provider::GoogleOneTap,
				reason: "ID token was issued for another client".into(),
			}
			.into());
		}

		Ok(profile)
	}
}
impl FederationGateway for GoogleOneTapGateway {
	fn provider(&self) -> Provider {
		Provider::GoogleOneTap
	}

	fn fetch_profile<'a>(
		&'a self,
		artifact: &'a FederationArtifact,
	) -> GatewayFuture<'a, ProviderProfile> {
		Box::pin(async move {
			let FederationArtifact::Token(id_token) = artifact else {
				return Err(artifact.unsupported(Provider::GoogleOneTap));
			};

			Ok(ProviderProfile::Google(self.profile(id_token.expose()).await?))
		})
	}
}
