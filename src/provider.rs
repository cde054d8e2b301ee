//! Identity-provider federation: profiles, error strategies, and per-provider gateways.
//!
//! `profile` holds the tagged union of provider profiles the reconciler consumes.
//! `strategy` maps provider error payloads into the broker taxonomy without tying gateways to
//! an HTTP client. The gateways (`azure`, `google`, `facebook`, `apple`, `ldap`) turn a
//! [`FederationArtifact`] into a [`ProviderProfile`] over HTTPS.

pub mod profile;
pub mod strategy;

#[cfg(feature = "reqwest")] pub mod apple;
#[cfg(feature = "reqwest")] pub mod azure;
#[cfg(feature = "reqwest")] pub mod facebook;
#[cfg(feature = "reqwest")] pub mod google;
#[cfg(feature = "reqwest")] pub mod ldap;

#[cfg(feature = "reqwest")] pub use apple::*;
#[cfg(feature = "reqwest")] pub use azure::*;
#[cfg(feature = "reqwest")] pub use facebook::*;
#[cfg(feature = "reqwest")] pub use google::*;
#[cfg(feature = "reqwest")] pub use ldap::*;
pub use profile::*;
pub use strategy::*;

// std
use std::net::IpAddr;
// self
use crate::{_prelude::*, auth::TokenSecret, error::ConfigError};

/// Future returned by [`FederationGateway::fetch_profile`].
pub type GatewayFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + 'a + Send>>;

/// External identity providers the broker federates with.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Provider {
	/// Azure AD (authorization code + Microsoft Graph).
	#[serde(rename = "azure")]
	Azure,
	/// Google (authorization code + userinfo).
	#[serde(rename = "google")]
	Google,
	/// Google one-tap (ID token + tokeninfo).
	#[serde(rename = "google-oauth-one-tap")]
	GoogleOneTap,
	/// Facebook (authorization code or user access token + Graph).
	#[serde(rename = "facebook")]
	Facebook,
	/// Sign in with Apple (authorization code + ID token).
	#[serde(rename = "apple")]
	Apple,
	/// Corporate directory bind bridge.
	#[serde(rename = "ldap")]
	Ldap,
}
impl Provider {
	/// Stable label matching the grant type that selects the provider.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Azure => "azure",
			Self::Google => "google",
			Self::GoogleOneTap => "google-oauth-one-tap",
			Self::Facebook => "facebook",
			Self::Apple => "apple",
			Self::Ldap => "ldap",
		}
	}
}
impl Display for Provider {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Credential material presented to a gateway.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FederationArtifact {
	/// Authorization code obtained by the front end.
	Code {
		/// Authorization code.
		code: TokenSecret,
		/// Redirect URI the code was issued for.
		redirect_uri: Option<String>,
	},
	/// Provider-issued token (Facebook user token, Google one-tap ID token).
	Token(TokenSecret),
	/// Directory credentials.
	Credentials {
		/// Directory account name.
		username: String,
		/// Directory password.
		password: TokenSecret,
	},
}
impl FederationArtifact {
	/// Short label used in mismatch errors.
	pub fn kind(&self) -> &'static str {
		match self {
			Self::Code { .. } => "authorization code",
			Self::Token(_) => "provider token",
			Self::Credentials { .. } => "directory credentials",
		}
	}

	pub(crate) fn unsupported(&self, provider: Provider) -> Error {
		Error::invalid_request(format!("{provider} does not accept a {}", self.kind()))
	}
}

/// Uniform contract every gateway fulfils.
pub trait FederationGateway
where
	Self: Send + Sync,
{
	/// Provider served by the gateway.
	fn provider(&self) -> Provider;

	/// Exchanges the artifact and returns the provider profile.
	fn fetch_profile<'a>(
		&'a self,
		artifact: &'a FederationArtifact,
	) -> GatewayFuture<'a, ProviderProfile>;
}

/// Token endpoint payload shared by the code-exchange providers.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct TokenEndpointResponse {
	/// Provider access token.
	pub access_token: Option<TokenSecret>,
	/// OpenID Connect ID token.
	pub id_token: Option<TokenSecret>,
}

/// Requires HTTPS, allowing plain HTTP only for loopback hosts.
pub fn validate_endpoint(name: &'static str, url: &Url) -> Result<(), ConfigError> {
	match url.scheme() {
		"https" => Ok(()),
		"http" if is_loopback(url) => Ok(()),
		_ => Err(ConfigError::InsecureEndpoint { endpoint: name, url: url.to_string() }),
	}
}

/// Parses and validates an endpoint literal.
pub fn parse_endpoint(name: &'static str, raw: &str) -> Result<Url, ConfigError> {
	let url = Url::parse(raw).map_err(|source| ConfigError::InvalidEndpoint { endpoint: name, source })?;

	validate_endpoint(name, &url)?;

	Ok(url)
}

fn is_loopback(url: &Url) -> bool {
	match url.host_str() {
		Some("localhost") => true,
		Some(host) => host
			.trim_start_matches('[')
			.trim_end_matches(']')
			.parse::<IpAddr>()
			.is_ok_and(|ip| ip.is_loopback()),
		None => false,
	}
}
