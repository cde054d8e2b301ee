//! Grant vocabulary and the request record threaded through every grant handler.

// self
use crate::{
	_prelude::*,
	auth::{DeviceBinding, DeviceId, DeviceLogin, MemberId, TokenSecret},
	config::BrokerConfig,
	messages::Language,
	provider::{FederationArtifact, Provider},
};

/// Grant types accepted by [`crate::flows::TokenBroker::generate_token`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GrantType {
	/// Device-bound token for an unauthenticated visitor.
	#[serde(rename = "anonymous")]
	Anonymous,
	/// Local email + password.
	#[serde(rename = "password")]
	Password,
	/// Azure AD authorization code.
	#[serde(rename = "azure")]
	Azure,
	/// Facebook authorization code or user token.
	#[serde(rename = "facebook")]
	Facebook,
	/// Google authorization code.
	#[serde(rename = "google")]
	Google,
	/// Google one-tap ID token.
	#[serde(rename = "google-oauth-one-tap")]
	GoogleOneTap,
	/// Sign in with Apple authorization code.
	#[serde(rename = "apple")]
	Apple,
	/// Directory credentials.
	#[serde(rename = "ldap")]
	Ldap,
	/// Refresh-token rotation.
	#[serde(rename = "refresh-token")]
	RefreshToken,
	/// Member MFA challenge completion.
	#[serde(rename = "verify-mfa")]
	VerifyMfa,
	/// Admin (directory) MFA challenge completion.
	#[serde(rename = "verify-mfa-narwhal")]
	VerifyMfaNarwhal,
}
impl GrantType {
	/// Every grant type, in dispatch order.
	pub const ALL: [Self; 11] = [
		Self::Anonymous,
		Self::Password,
		Self::Azure,
		Self::Facebook,
		Self::Google,
		Self::GoogleOneTap,
		Self::Apple,
		Self::Ldap,
		Self::RefreshToken,
		Self::VerifyMfa,
		Self::VerifyMfaNarwhal,
	];

	/// Wire label of the grant.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Anonymous => "anonymous",
			Self::Password => "password",
			Self::Azure => "azure",
			Self::Facebook => "facebook",
			Self::Google => "google",
			Self::GoogleOneTap => "google-oauth-one-tap",
			Self::Apple => "apple",
			Self::Ldap => "ldap",
			Self::RefreshToken => "refresh-token",
			Self::VerifyMfa => "verify-mfa",
			Self::VerifyMfaNarwhal => "verify-mfa-narwhal",
		}
	}

	/// Identity provider behind a federated grant.
	pub const fn provider(self) -> Option<Provider> {
		match self {
			Self::Azure => Some(Provider::Azure),
			Self::Facebook => Some(Provider::Facebook),
			Self::Google => Some(Provider::Google),
			Self::GoogleOneTap => Some(Provider::GoogleOneTap),
			Self::Apple => Some(Provider::Apple),
			Self::Ldap => Some(Provider::Ldap),
			_ => None,
		}
	}
}
impl Display for GrantType {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
impl FromStr for GrantType {
	type Err = Error;

	fn from_str(s: &str) -> Result<Self> {
		Self::ALL
			.into_iter()
			.find(|grant| grant.as_str() == s)
			.ok_or_else(|| Error::UnsupportedGrant { grant: s.to_owned() })
	}
}

/// API version selected by the caller.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ApiVersion {
	/// Version 1.
	#[default]
	V1,
	/// Version 2.
	V2,
	/// Version 3: provider logins never register members implicitly (Apple excepted).
	V3,
}
impl FromStr for ApiVersion {
	type Err = Error;

	fn from_str(s: &str) -> Result<Self> {
		match s.trim().trim_start_matches(['v', 'V']) {
			"1" => Ok(Self::V1),
			"2" => Ok(Self::V2),
			"3" => Ok(Self::V3),
			other => Err(Error::invalid_request(format!("API version `{other}` is not supported"))),
		}
	}
}

/// Request and response record for one grant.
///
/// Handlers fill the identity fields as they resolve the member, then the issued credentials.
/// A refresh grant presents the previous pair in `accessToken` and `refreshToken` and gets the
/// rotated pair back in the same fields.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TokenRequest {
	/// Grant label.
	pub grant_type: String,
	/// Device identifier.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub device_id: Option<String>,
	/// Login surface (`WEB`, `MOBILE`, `APPS`).
	#[serde(skip_serializing_if = "Option::is_none")]
	pub device_login: Option<String>,
	/// Member type the session is opened for.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub member_type: Option<String>,
	/// Preferred message language tag.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub language: Option<String>,
	/// Provider authorization code.
	#[serde(skip_serializing)]
	pub code: Option<TokenSecret>,
	/// Provider-issued token (one-tap ID token, Facebook user token).
	#[serde(skip_serializing)]
	pub token: Option<TokenSecret>,
	/// Redirect URI the authorization code was issued for.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub redirect_uri: Option<String>,
	/// Email or directory account name.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub username: Option<String>,
	/// Password.
	#[serde(skip_serializing)]
	pub password: Option<TokenSecret>,
	/// MFA challenge credential.
	#[serde(skip_serializing)]
	pub mfa_token: Option<String>,
	/// One-time code.
	#[serde(skip_serializing)]
	pub otp: Option<TokenSecret>,
	/// Given name supplied by the client (Apple only sends it on first consent).
	#[serde(skip_serializing_if = "Option::is_none")]
	pub first_name: Option<String>,
	/// Family name supplied by the client.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub last_name: Option<String>,
	/// Opaque token passed through into the claims.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub custom_token: Option<String>,
	/// Resolved member id.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub user_id: Option<MemberId>,
	/// Resolved email.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub email: Option<String>,
	/// Resolved display name.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub name: Option<String>,
	/// Resolved mobile number.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub mobile: Option<String>,
	/// Whether the login created the member.
	pub new_member: bool,
	/// Whether the member has a local password.
	pub has_password: bool,
	/// Whether the member has MFA enabled.
	pub mfa_enabled: bool,
	/// Access token (presented on refresh, issued otherwise).
	#[serde(skip_serializing_if = "Option::is_none")]
	pub access_token: Option<TokenSecret>,
	/// Refresh token (presented on refresh, issued otherwise).
	#[serde(skip_serializing_if = "Option::is_none")]
	pub refresh_token: Option<TokenSecret>,
	/// Keyed-hash token identifier.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub jti: Option<String>,
	/// Seconds until the access token expires.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub expires_in: Option<i64>,
}
impl TokenRequest {
	/// Empty request for `grant`.
	pub fn new(grant: GrantType) -> Self {
		Self { grant_type: grant.as_str().into(), ..Default::default() }
	}

	/// Sets the device binding fields.
	pub fn with_device(mut self, device_id: impl Into<String>, device_login: DeviceLogin) -> Self {
		self.device_id = Some(device_id.into());
		self.device_login = Some(device_login.as_str().into());

		self
	}

	/// Language of user-facing messages for this request.
	pub fn language(&self) -> Language {
		Language::from_tag(self.language.as_deref())
	}

	/// Checks the fields the grant needs before any collaborator is called.
	pub fn validate(&self, version: ApiVersion, config: &BrokerConfig) -> Result<GrantContext> {
		let grant = self.grant_type.parse::<GrantType>()?;
		let member_type = match self.member_type.as_deref().map(str::trim) {
			Some(value) if !value.is_empty() => value.to_owned(),
			_ => config.default_member_type.clone(),
		};

		if !config.is_allowed_member_type(&member_type) {
			return Err(Error::invalid_request(format!("member type `{member_type}` is not allowed")));
		}

		let binding = if grant == GrantType::RefreshToken { None } else { Some(self.binding()?) };

		match grant {
			GrantType::Anonymous => {},
			GrantType::Password | GrantType::Ldap => {
				require("username", self.username.as_deref())?;
				require("password", self.password.as_ref().map(TokenSecret::expose))?;
			},
			GrantType::Azure => {
				require("code", self.code.as_ref().map(TokenSecret::expose))?;
				require("redirectUri", self.redirect_uri.as_deref())?;
			},
			GrantType::Google | GrantType::Apple => {
				require("code", self.code.as_ref().map(TokenSecret::expose))?;
			},
			GrantType::Facebook => {
				let code = self.code.as_ref().map(TokenSecret::expose).filter(|v| !v.trim().is_empty());
				let token = self.token.as_ref().map(TokenSecret::expose).filter(|v| !v.trim().is_empty());

				if code.is_none() && token.is_none() {
					return Err(Error::invalid_request("code or token is required"));
				}
			},
			GrantType::GoogleOneTap => {
				require("token", self.token.as_ref().map(TokenSecret::expose))?;
			},
			GrantType::RefreshToken => {
				require("accessToken", self.access_token.as_ref().map(TokenSecret::expose))?;
				require("refreshToken", self.refresh_token.as_ref().map(TokenSecret::expose))?;
			},
			GrantType::VerifyMfa | GrantType::VerifyMfaNarwhal => {
				require("mfaToken", self.mfa_token.as_deref())?;
				require("otp", self.otp.as_ref().map(TokenSecret::expose))?;
			},
		}

		Ok(GrantContext { grant, version, binding, member_type, language: self.language() })
	}

	/// Federation artifact for the provider, built from the validated fields.
	pub fn artifact(&self, provider: Provider) -> Result<FederationArtifact> {
		let code = || {
			self.code.clone().map(|code| FederationArtifact::Code {
				code,
				redirect_uri: self.redirect_uri.clone(),
			})
		};
		let artifact = match provider {
			Provider::Azure | Provider::Google | Provider::Apple => code(),
			Provider::Facebook => code().or_else(|| self.token.clone().map(FederationArtifact::Token)),
			Provider::GoogleOneTap => self.token.clone().map(FederationArtifact::Token),
			Provider::Ldap => match (&self.username, &self.password) {
				(Some(username), Some(password)) => Some(FederationArtifact::Credentials {
					username: username.trim().to_owned(),
					password: password.clone(),
				}),
				_ => None,
			},
		};

		artifact.ok_or_else(|| Error::invalid_request(format!("{provider} credentials are missing")))
	}

	fn binding(&self) -> Result<DeviceBinding> {
		let device_id = require("deviceId", self.device_id.as_deref())?;
		let device_id = DeviceId::new(device_id)
			.map_err(|e| Error::invalid_request(format!("deviceId is malformed: {e}")))?;
		let device_login = require("deviceLogin", self.device_login.as_deref())?
			.parse::<DeviceLogin>()
			.map_err(|e| Error::invalid_request(e.to_string()))?;

		Ok(DeviceBinding::new(device_id, device_login))
	}
}

/// Validated view of a [`TokenRequest`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GrantContext {
	/// Grant being dispatched.
	pub grant: GrantType,
	/// Caller API version.
	pub version: ApiVersion,
	/// Device binding; absent only for refresh grants, which read it from the token.
	pub binding: Option<DeviceBinding>,
	/// Member type the session is opened for.
	pub member_type: String,
	/// Message language.
	pub language: Language,
}
impl GrantContext {
	/// Device binding required by every grant except refresh.
	pub fn device(&self) -> Result<&DeviceBinding> {
		self.binding.as_ref().ok_or_else(|| Error::invalid_request("deviceId is required"))
	}
}

fn require<'a>(field: &'static str, value: Option<&'a str>) -> Result<&'a str> {
	value
		.map(str::trim)
		.filter(|v| !v.is_empty())
		.ok_or_else(|| Error::invalid_request(format!("{field} is required")))
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn config() -> BrokerConfig {
		BrokerConfig::builder("iss", "aud", "key").build().expect("Config fixture should be valid.")
	}

	fn reason(result: Result<GrantContext>) -> String {
		match result {
			Err(Error::InvalidRequest { reason }) => reason,
			other => panic!("Expected a validation error, got {other:?}."),
		}
	}

	#[test]
	fn grant_labels_round_trip() {
		for grant in GrantType::ALL {
			assert_eq!(grant.as_str().parse::<GrantType>().expect("Label should parse."), grant);
		}

		assert!(matches!("magic".parse::<GrantType>(), Err(Error::UnsupportedGrant { .. })));
		assert_eq!(GrantType::GoogleOneTap.provider(), Some(Provider::GoogleOneTap));
		assert_eq!(GrantType::RefreshToken.provider(), None);
	}

	#[test]
	fn api_version_accepts_prefixed_labels() {
		assert_eq!("3".parse::<ApiVersion>().expect("Version should parse."), ApiVersion::V3);
		assert_eq!("v2".parse::<ApiVersion>().expect("Version should parse."), ApiVersion::V2);
		assert!("4".parse::<ApiVersion>().is_err());
	}

	#[test]
	fn device_is_required_unless_refreshing() {
		let config = config();
		let request = TokenRequest::new(GrantType::Anonymous);

		assert_eq!(reason(request.validate(ApiVersion::V1, &config)), "deviceId is required");

		let request = TokenRequest::new(GrantType::Anonymous).with_device("dev-1", DeviceLogin::Web);
		let ctx = request.validate(ApiVersion::V1, &config).expect("Anonymous request should validate.");

		assert_eq!(ctx.member_type, "member");
		assert_eq!(ctx.device().expect("Binding should exist.").device_id.to_string(), "dev-1");

		let mut request = TokenRequest::new(GrantType::RefreshToken);

		request.access_token = Some(TokenSecret::new("a"));
		request.refresh_token = Some(TokenSecret::new("r"));

		assert!(request.validate(ApiVersion::V1, &config).expect("Refresh should validate.").binding.is_none());
	}

	#[test]
	fn device_login_must_be_known() {
		let mut request = TokenRequest::new(GrantType::Anonymous);

		request.device_id = Some("dev-1".into());
		request.device_login = Some("TV".into());

		assert!(reason(request.validate(ApiVersion::V1, &config())).contains("WEB, MOBILE, or APPS"));
	}

	#[test]
	fn grant_specific_fields_are_enforced() {
		let config = config();
		let mut azure = TokenRequest::new(GrantType::Azure).with_device("dev-1", DeviceLogin::Web);

		azure.code = Some(TokenSecret::new("code"));

		assert_eq!(reason(azure.validate(ApiVersion::V1, &config)), "redirectUri is required");

		let one_tap = TokenRequest::new(GrantType::GoogleOneTap).with_device("dev-1", DeviceLogin::Web);

		assert_eq!(reason(one_tap.validate(ApiVersion::V1, &config)), "token is required");

		let mut facebook = TokenRequest::new(GrantType::Facebook).with_device("dev-1", DeviceLogin::Web);

		assert!(facebook.validate(ApiVersion::V1, &config).is_err());

		facebook.token = Some(TokenSecret::new("user-token"));

		assert!(facebook.validate(ApiVersion::V1, &config).is_ok());
		assert!(matches!(
			facebook.artifact(Provider::Facebook).expect("Artifact should build."),
			FederationArtifact::Token(_)
		));

		let mut verify = TokenRequest::new(GrantType::VerifyMfa).with_device("dev-1", DeviceLogin::Web);

		verify.mfa_token = Some("challenge".into());

		assert_eq!(reason(verify.validate(ApiVersion::V1, &config)), "otp is required");
	}

	#[test]
	fn member_type_must_be_allowed_or_microsite() {
		let config = config();
		let mut request = TokenRequest::new(GrantType::Anonymous).with_device("dev-1", DeviceLogin::Web);

		request.member_type = Some("reseller".into());

		assert!(reason(request.validate(ApiVersion::V1, &config)).contains("reseller"));

		request.member_type = Some("microsite-summer".into());

		assert!(request.validate(ApiVersion::V1, &config).is_ok());
	}

	#[test]
	fn secrets_are_never_serialized() {
		let mut request = TokenRequest::new(GrantType::Password).with_device("dev-1", DeviceLogin::Web);

		request.username = Some("a@example.com".into());
		request.password = Some(TokenSecret::new("hunter2"));

		let payload = serde_json::to_string(&request).expect("Request should serialize.");

		assert!(!payload.contains("hunter2"));
		assert!(!format!("{request:?}").contains("hunter2"));
	}
}
