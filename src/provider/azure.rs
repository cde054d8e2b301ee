//! Azure AD gateway: authorization-code exchange plus Microsoft Graph profile lookup.

// self
use crate::{
	_prelude::*,
	auth::TokenSecret,
	error::{ConfigError, UpstreamError},
	http::FederationHttpClient,
	provider::{
		AzureProfile, AzureStrategy, FederationArtifact, FederationGateway, GatewayFuture, Provider,
		ProviderProfile, TokenEndpointResponse, parse_endpoint, validate_endpoint,
	},
};

const DEFAULT_AUTHORITY: &str = "https://login.microsoftonline.com/";
const DEFAULT_GRAPH_ME: &str = "https://graph.microsoft.com/v1.0/me";
const DEFAULT_SCOPE: &str = "openid profile email User.Read";

/// Azure AD application registration.
#[derive(Clone, Debug)]
pub struct AzureSettings {
	/// Application (client) id.
	pub client_id: String,
	/// Client secret.
	pub client_secret: TokenSecret,
	/// Token endpoint, derived from the tenant unless overridden.
	pub token_endpoint: Url,
	/// Graph `/me` endpoint.
	pub graph_endpoint: Url,
	/// Scopes requested during the exchange.
	pub scope: String,
}
impl AzureSettings {
	/// Settings for the public cloud authority of `tenant`.
	pub fn new(
		tenant: &str,
		client_id: impl Into<String>,
		client_secret: impl Into<String>,
	) -> Result<Self, ConfigError> {
		let token_endpoint =
			parse_endpoint("azure token", &format!("{DEFAULT_AUTHORITY}{tenant}/oauth2/v2.0/token"))?;

		Ok(Self {
			client_id: client_id.into(),
			client_secret: TokenSecret::new(client_secret),
			token_endpoint,
			graph_endpoint: parse_endpoint("azure graph", DEFAULT_GRAPH_ME)?,
			scope: DEFAULT_SCOPE.into(),
		})
	}

	/// Overrides both endpoints (sovereign clouds, tests).
	pub fn with_endpoints(mut self, token_endpoint: Url, graph_endpoint: Url) -> Self {
		self.token_endpoint = token_endpoint;
		self.graph_endpoint = graph_endpoint;

		self
	}

	fn validate(&self) -> Result<(), ConfigError> {
		if self.client_id.trim().is_empty() {
			return Err(ConfigError::MissingSetting { field: "azure.clientId" });
		}

		validate_endpoint("azure token", &self.token_endpoint)?;
		validate_endpoint("azure graph", &self.graph_endpoint)
	}
}

/// Gateway for Azure AD sign-ins.
#[derive(Clone, Debug)]
pub struct AzureGateway {
	http: FederationHttpClient,
	settings: AzureSettings,
}
impl AzureGateway {
	/// Creates the gateway after validating the settings.
	pub fn new(http: FederationHttpClient, settings: AzureSettings) -> Result<Self, ConfigError> {
		settings.validate()?;

		Ok(Self { http, settings })
	}

	/// Redeems an authorization code for a Graph access token.
	///
	/// `AADSTS70008` and `AADSTS54005` surface as [`UpstreamError::AuthorizationCodeExpired`].
	pub async fn exchange_code(&self, code: &str, redirect_uri: &str) -> Result<TokenSecret> {
		let form = [
			("client_id", self.settings.client_id.as_str()),
			("client_secret", self.settings.client_secret.expose()),
			("grant_type", "authorization_code"),
			("code", code),
			("redirect_uri", redirect_uri),
			("scope", self.settings.scope.as_str()),
		];
		let request = self.http.post(self.settings.token_endpoint.clone()).form(&form);
		let response: TokenEndpointResponse =
			self.http.send_json(Provider::Azure, &AzureStrategy, request).await?;

		response.access_token.ok_or_else(|| {
			UpstreamError::IncompleteResponse { provider: Provider::Azure, field: "access_token" }.into()
		})
	}

	/// Fetches the Graph `/me` profile.
	pub async fn profile(&self, access_token: &str) -> Result<AzureProfile> {
		let request = self.http.get(self.settings.graph_endpoint.clone()).bearer_auth(access_token);

		self.http.send_json(Provider::Azure, &AzureStrategy, request).await
	}
}
impl FederationGateway for AzureGateway {
	fn provider(&self) -> Provider {
		Provider::Azure
	}

	fn fetch_profile<'a>(
		&'a self,
		artifact: &'a FederationArtifact,
	) -> GatewayFuture<'a, ProviderProfile> {
		Box::pin(async move {
			let FederationArtifact::Code { code, redirect_uri } = artifact else {
				return Err(artifact.unsupported(Provider::Azure));
			};
			let redirect_uri = redirect_uri
				.as_deref()
				.ok_or_else(|| Error::invalid_request("redirectUri is required for azure"))?;
			let token = self.exchange_code(code.expose(), redirect_uri).await?;

			Ok(ProviderProfile::Azure(self.profile(token.expose()).await?))
		})
	}
}
