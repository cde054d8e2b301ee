//! Directory gateway speaking to an HTTP bind bridge in front of LDAP.

// self
use crate::{
	_prelude::*,
	error::ConfigError,
	http::FederationHttpClient,
	provider::{
		DirectoryStrategy, FederationArtifact, FederationGateway, GatewayFuture, LdapProfile,
		Provider, ProviderProfile, parse_endpoint, validate_endpoint,
	},
};

/// Bind bridge settings.
#[derive(Clone, Debug)]
pub struct LdapSettings {
	/// Endpoint accepting `{"username", "password"}` and answering with the directory profile.
	pub bind_endpoint: Url,
}
impl LdapSettings {
	/// Settings for the bridge at `bind_endpoint`.
	pub fn new(bind_endpoint: &str) -> Result<Self, ConfigError> {
		Ok(Self { bind_endpoint: parse_endpoint("ldap bind", bind_endpoint)? })
	}
}

#[derive(Serialize)]
struct BindRequest<'a> {
	username: &'a str,
	password: &'a str,
}

/// Gateway for directory logins.
#[derive(Clone, Debug)]
pub struct LdapGateway {
	http: FederationHttpClient,
	settings: LdapSettings,
}
impl LdapGateway {
	/// Creates the gateway after validating the settings.
	pub fn new(http: FederationHttpClient, settings: LdapSettings) -> Result<Self, ConfigError> {
		validate_endpoint("ldap bind", &settings.bind_endpoint)?;

		Ok(Self { http, settings })
	}

	/// Binds with the directory credentials and returns the account profile.
	pub async fn bind(&self, username: &str, password: &str) -> Result<LdapProfile> {
		let request = self
			.http
			.post(self.settings.bind_endpoint.clone())
			.json(&BindRequest { username, password });

		self.http.send_json(Provider::Ldap, &DirectoryStrategy, request).await
	}
}
impl FederationGateway for LdapGateway {
	fn provider(&self) -> Provider {
		Provider::Ldap
	}

	fn fetch_profile<'a>(
		&'a self,
		artifact: &'a FederationArtifact,
	) -> GatewayFuture<'a, ProviderProfile> {
		Box::pin(async move {
			let FederationArtifact::Credentials { username, password } = artifact else {
				return Err(artifact.unsupported(Provider::Ldap));
			};

			Ok(ProviderProfile::Ldap(self.bind(username, password.expose()).await?))
		})
	}
}
