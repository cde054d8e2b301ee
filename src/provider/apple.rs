//! Sign in with Apple: ES256 client secret, code exchange, and ID-token claims.

// crates.io
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
// self
use crate::{
	_prelude::*,
	auth::TokenSecret,
	error::{ConfigError, UpstreamError},
	http::FederationHttpClient,
	provider::{
		AppleProfile, DefaultProviderStrategy, FederationArtifact, FederationGateway, GatewayFuture,
		Provider, ProviderProfile, TokenEndpointResponse, parse_endpoint, validate_endpoint,
	},
};

const APPLE_ISSUER: &str = "https://appleid.apple.com";
const DEFAULT_TOKEN_ENDPOINT: &str = "https://appleid.apple.com/auth/token";
const CLIENT_SECRET_TTL: Duration = Duration::minutes(5);

/// Apple service registration.
#[derive(Clone)]
pub struct AppleSettings {
	/// Services id (the `aud` of Apple ID tokens).
	pub client_id: String,
	/// Developer team id.
	pub team_id: String,
	/// Key id of the `.p8` signing key.
	pub key_id: String,
	/// Token endpoint.
	pub token_endpoint: Url,
	private_key: EncodingKey,
}
impl AppleSettings {
	/// Settings with the PEM-encoded P-256 private key downloaded from the developer portal.
	pub fn new(
		client_id: impl Into<String>,
		team_id: impl Into<String>,
		key_id: impl Into<String>,
		private_key_pem: &[u8],
	) -> Result<Self, ConfigError> {
		let private_key = EncodingKey::from_ec_pem(private_key_pem)
			.map_err(|source| ConfigError::InvalidKey { which: "apple", source })?;

		Ok(Self {
			client_id: client_id.into(),
			team_id: team_id.into(),
			key_id: key_id.into(),
			token_endpoint: parse_endpoint("apple token", DEFAULT_TOKEN_ENDPOINT)?,
			private_key,
		})
	}

	/// Overrides the token endpoint.
	pub fn with_token_endpoint(mut self, token_endpoint: Url) -> Self {
		self.token_endpoint = token_endpoint;

		self
	}
}
impl Debug for AppleSettings {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("AppleSettings")
			.field("client_id", &self.client_id)
			.field("team_id", &self.team_id)
			.field("key_id", &self.key_id)
			.field("token_endpoint", &self.token_endpoint.as_str())
			.finish_non_exhaustive()
	}
}

#[derive(Debug, Serialize)]
struct ClientSecretClaims<'a> {
	iss: &'a str,
	sub: &'a str,
	aud: &'a str,
	iat: i64,
	exp: i64,
}

/// Gateway for Apple sign-ins.
#[derive(Clone, Debug)]
pub struct AppleGateway {
	http: FederationHttpClient,
	settings: AppleSettings,
}
impl AppleGateway {
	/// Creates the gateway after validating the settings.
	pub fn new(http: FederationHttpClient, settings: AppleSettings) -> Result<Self, ConfigError> {
		for (field, value) in [
			("apple.clientId", &settings.client_id),
			("apple.teamId", &settings.team_id),
			("apple.keyId", &settings.key_id),
		] {
			if value.trim().is_empty() {
				return Err(ConfigError::MissingSetting { field });
			}
		}

		validate_endpoint("apple token", &settings.token_endpoint)?;

		Ok(Self { http, settings })
	}

	/// Mints the short-lived ES256 client secret Apple requires on every exchange.
	pub fn client_secret(&self) -> Result<TokenSecret> {
		let now = OffsetDateTime::now_utc().unix_timestamp();
		let claims = ClientSecretClaims {
			iss: &self.settings.team_id,
			sub: &self.settings.client_id,
			aud: APPLE_ISSUER,
			iat: now,
			exp: now + CLIENT_SECRET_TTL.whole_seconds(),
		};
		let mut header = Header::new(Algorithm::ES256);

		header.kid = Some(self.settings.key_id.clone());

		jsonwebtoken::encode(&header, &claims, &self.settings.private_key)
			.map(TokenSecret::new)
			.map_err(|source| Error::Signing { source })
	}

	/// Redeems an authorization code for an ID token.
	pub async fn exchange_code(&self, code: &str, redirect_uri: Option<&str>) -> Result<TokenSecret> {
		let client_secret = self.client_secret()?;
		let mut form = vec![
			("client_id", self.settings.client_id.as_str()),
			("client_secret", client_secret.expose()),
			("grant_type", "authorization_code"),
			("code", code),
		];

		if let Some(redirect_uri) = redirect_uri {
			form.push(("redirect_uri", redirect_uri));
		}

		let request = self.http.post(self.settings.token_endpoint.clone()).form(&form);
		let response: TokenEndpointResponse =
			self.http.send_json(Provider::Apple, &DefaultProviderStrategy, request).await?;

		response.id_token.ok_or_else(|| {
			UpstreamError::IncompleteResponse { provider: Provider::Apple, field: "id_token" }.into()
		})
	}

	/// Reads the ID token claims, checking issuer, audience, and expiry.
	///
	/// The token arrives straight from Apple's token endpoint over TLS, so its signature is not
	/// re-verified here.
	pub fn profile(&self, id_token: &str) -> Result<AppleProfile> {
		let mut validation = Validation::new(Algorithm::RS256);

		validation.insecure_disable_signature_validation();
		validation.set_issuer(&[APPLE_ISSUER]);
		validation.set_audience(&[self.settings.client_id.as_str()]);

		jsonwebtoken::decode::<AppleProfile>(id_token, &DecodingKey::from_secret(&[]), &validation)
			.map(|data| data.claims)
			.map_err(|e| {
				UpstreamError::Rejected { provider: Provider::Apple, reason: e.to_string() }.into()
			})
	}
}
impl FederationGateway for AppleGateway {
	fn provider(&self) -> Provider {
		Provider::Apple
	}

	fn fetch_profile<'a>(
		&'a self,
		artifact: &'a FederationArtifact,
	) -> GatewayFuture<'a, ProviderProfile> {
		Box::pin(async move {
			let FederationArtifact::Code { code, redirect_uri } = artifact else {
				return Err(artifact.unsupported(Provider::Apple));
			};
			let id_token = self.exchange_code(code.expose(), redirect_uri.as_deref()).await?;

			Ok(ProviderProfile::Apple(self.profile(id_token.expose())?))
		})
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	const APPLE_KEY: &[u8] = include_bytes!("../../tests/fixtures/apple_key.p8");

	fn gateway() -> AppleGateway {
		let settings = AppleSettings::new("com.example.web", "TEAM123", "KEY123", APPLE_KEY)
			.expect("Apple fixture key should load.");
		let http = FederationHttpClient::with_timeout(Duration::seconds(5))
			.expect("Client should build.");

		AppleGateway::new(http, settings).expect("Gateway should build.")
	}

	fn id_token(aud: &str, exp_offset: i64) -> String {
		let now = OffsetDateTime::now_utc().unix_timestamp();

		jsonwebtoken::encode(
			&Header::new(Algorithm::HS256),
			&serde_json::json!({
				"iss": APPLE_ISSUER,
				"aud": aud,
				"sub": "001234.apple",
				"email": "relay@privaterelay.appleid.com",
				"email_verified": "true",
				"iat": now,
				"exp": now + exp_offset,
			}),
			&EncodingKey::from_secret(b"irrelevant"),
		)
		.expect("ID token fixture should encode.")
	}

	#[test]
	fn client_secret_is_es256_with_key_id() {
		let secret = gateway().client_secret().expect("Client secret should sign.");
		let header =
			jsonwebtoken::decode_header(secret.expose()).expect("Client secret header should parse.");

		assert_eq!(header.alg, Algorithm::ES256);
		assert_eq!(header.kid.as_deref(), Some("KEY123"));
	}

	#[test]
	fn profile_checks_audience_and_expiry() {
		let gateway = gateway();
		let profile =
			gateway.profile(&id_token("com.example.web", 600)).expect("ID token should decode.");

		assert_eq!(profile.sub, "001234.apple");
		assert!(profile.email_verified);
		assert!(gateway.profile(&id_token("com.other.app", 600)).is_err());
		assert!(gateway.profile(&id_token("com.example.web", -600)).is_err());
	}

	#[test]
	fn rejects_non_ec_keys() {
		let err = AppleSettings::new("id", "team", "key", b"garbage").expect_err("Garbage key should fail.");

		assert!(matches!(err, ConfigError::InvalidKey { which: "apple", .. }));
	}
}
