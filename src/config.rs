//! Broker configuration: token lifetimes, lockout policy, member-type rules, and clients.

// self
use crate::{_prelude::*, auth::TokenSecret, error::ConfigError};

const DEFAULT_TOKEN_AGE: Duration = Duration::hours(1);
const DEFAULT_SPECIAL_TOKEN_AGE: Duration = Duration::days(30);
const DEFAULT_REFRESH_TOKEN_AGE: Duration = Duration::days(30);
const DEFAULT_SPECIAL_REFRESH_TOKEN_AGE: Duration = Duration::days(365);
const DEFAULT_LOCKOUT_THRESHOLD: u32 = 9;
const DEFAULT_LOCKOUT_WINDOW: Duration = Duration::minutes(30);
const DEFAULT_MFA_CHALLENGE_TTL: Duration = Duration::minutes(5);
const DEFAULT_CLOCK_SKEW: Duration = Duration::seconds(90);
const DEFAULT_FEDERATION_TIMEOUT: Duration = Duration::seconds(10);
const DEFAULT_MEMBER_TYPE: &str = "member";
const DEFAULT_MICROSITE_PREFIX: &str = "microsite";

/// Runtime settings consumed by every broker component.
///
/// Durations are expressed in whole seconds when (de)serialized.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BrokerConfig {
	/// `iss` claim stamped on every access token.
	pub issuer: String,
	/// `aud` claim stamped on every access token.
	pub audience: String,
	/// Key mixed into JTI and MFA challenge digests.
	pub hash_key: TokenSecret,
	/// Access-token lifetime.
	#[serde(with = "duration_secs", default = "defaults::token_age")]
	pub token_age: Duration,
	/// Access-token lifetime for allow-listed emails.
	#[serde(with = "duration_secs", default = "defaults::special_token_age")]
	pub special_token_age: Duration,
	/// Refresh-token lifetime.
	#[serde(with = "duration_secs", default = "defaults::refresh_token_age")]
	pub refresh_token_age: Duration,
	/// Refresh-token lifetime for allow-listed emails.
	#[serde(with = "duration_secs", default = "defaults::special_refresh_token_age")]
	pub special_refresh_token_age: Duration,
	/// Emails granted the long-lived token variants (compared case-insensitively).
	#[serde(default)]
	pub special_emails: BTreeSet<String>,
	/// Consecutive password failures that block a member.
	#[serde(default = "defaults::lockout_threshold")]
	pub lockout_threshold: u32,
	/// Sliding window for the attempt counter.
	#[serde(with = "duration_secs", default = "defaults::lockout_window")]
	pub lockout_window: Duration,
	/// Lifetime of a pending MFA challenge.
	#[serde(with = "duration_secs", default = "defaults::mfa_challenge_ttl")]
	pub mfa_challenge_ttl: Duration,
	/// Backdate applied to token expiry to tolerate clock drift between services.
	#[serde(with = "duration_secs", default = "defaults::clock_skew")]
	pub clock_skew: Duration,
	/// Member types accepted by the dispatcher.
	#[serde(default = "defaults::member_types")]
	pub member_types: BTreeSet<String>,
	/// Prefix that admits any microsite member type.
	#[serde(default = "defaults::microsite_prefix")]
	pub microsite_prefix: String,
	/// Member type applied when the request omits one.
	#[serde(default = "defaults::member_type")]
	pub default_member_type: String,
	/// Email domains whose owners are flagged as staff.
	#[serde(default)]
	pub internal_domains: BTreeSet<String>,
	/// Forces an admin-scoped MFA challenge on every LDAP login.
	#[serde(default)]
	pub narwhal_admin_mfa: bool,
	/// Issuer label embedded in TOTP provisioning URLs.
	#[serde(default)]
	pub totp_issuer: Option<String>,
	/// Upper bound for a single federation round trip.
	#[serde(with = "duration_secs", default = "defaults::federation_timeout")]
	pub federation_timeout: Duration,
	/// Basic-auth clients keyed by client id.
	#[serde(default)]
	pub clients: BTreeMap<String, TokenSecret>,
}
impl BrokerConfig {
	/// Starts a builder seeded with the mandatory claims and hash key.
	pub fn builder(
		issuer: impl Into<String>,
		audience: impl Into<String>,
		hash_key: impl Into<String>,
	) -> BrokerConfigBuilder {
		BrokerConfigBuilder::new(issuer, audience, hash_key)
	}

	/// Parses and validates a JSON configuration document.
	pub fn from_json(document: &str) -> Result<Self, ConfigError> {
		let mut de = serde_json::Deserializer::from_str(document);
		let config: Self = serde_path_to_error::deserialize(&mut de)
			.map_err(|source| ConfigError::Parse { source })?;

		config.validate()?;

		Ok(config)
	}

	/// Whether the email belongs to the long-lived allow-list.
	pub fn is_special_email(&self, email: &str) -> bool {
		self.special_emails.iter().any(|e| e.eq_ignore_ascii_case(email))
	}

	/// Access-token lifetime for the email.
	pub fn token_age_for(&self, email: &str) -> Duration {
		if self.is_special_email(email) { self.special_token_age } else { self.token_age }
	}

	/// Refresh-token lifetime for the email.
	pub fn refresh_age_for(&self, email: &str) -> Duration {
		if self.is_special_email(email) {
			self.special_refresh_token_age
		} else {
			self.refresh_token_age
		}
	}

	/// Whether the member type is configured or carries the microsite prefix.
	pub fn is_allowed_member_type(&self, member_type: &str) -> bool {
		self.member_types.contains(member_type)
			|| (!self.microsite_prefix.is_empty() && member_type.starts_with(&self.microsite_prefix))
	}

	/// Whether the email's domain is one of the internal staff domains.
	pub fn is_internal_email(&self, email: &str) -> bool {
		let Some((_, domain)) = email.rsplit_once('@') else { return false };

		self.internal_domains.iter().any(|d| d.eq_ignore_ascii_case(domain))
	}

	/// Registered secret for a basic-auth client.
	pub fn client_secret(&self, client_id: &str) -> Option<&TokenSecret> {
		self.clients.get(client_id)
	}

	fn validate(&self) -> Result<(), ConfigError> {
		for (field, value) in [
			("issuer", self.issuer.as_str()),
			("audience", self.audience.as_str()),
			("hashKey", self.hash_key.expose()),
			("defaultMemberType", self.default_member_type.as_str()),
		] {
			if value.trim().is_empty() {
				return Err(ConfigError::MissingSetting { field });
			}
		}
		for (field, value) in [
			("tokenAge", self.token_age),
			("specialTokenAge", self.special_token_age),
			("refreshTokenAge", self.refresh_token_age),
			("specialRefreshTokenAge", self.special_refresh_token_age),
			("lockoutWindow", self.lockout_window),
			("mfaChallengeTtl", self.mfa_challenge_ttl),
			("federationTimeout", self.federation_timeout),
		] {
			if !value.is_positive() {
				return Err(ConfigError::NonPositiveDuration { field });
			}
		}
		if self.clock_skew.is_negative() {
			return Err(ConfigError::NonPositiveDuration { field: "clockSkew" });
		}
		if self.lockout_threshold == 0 {
			return Err(ConfigError::InvalidLockoutThreshold);
		}

		Ok(())
	}
}

/// Builder for [`BrokerConfig`] values.
#[derive(Debug)]
pub struct BrokerConfigBuilder {
	config: BrokerConfig,
}
impl BrokerConfigBuilder {
	/// Creates a builder populated with defaults.
	pub fn new(
		issuer: impl Into<String>,
		audience: impl Into<String>,
		hash_key: impl Into<String>,
	) -> Self {
		Self {
			config: BrokerConfig {
				issuer: issuer.into(),
				audience: audience.into(),
				hash_key: TokenSecret::new(hash_key),
				token_age: DEFAULT_TOKEN_AGE,
				special_token_age: DEFAULT_SPECIAL_TOKEN_AGE,
				refresh_token_age: DEFAULT_REFRESH_TOKEN_AGE,
				special_refresh_token_age: DEFAULT_SPECIAL_REFRESH_TOKEN_AGE,
				special_emails: BTreeSet::new(),
				lockout_threshold: DEFAULT_LOCKOUT_THRESHOLD,
				lockout_window: DEFAULT_LOCKOUT_WINDOW,
				mfa_challenge_ttl: DEFAULT_MFA_CHALLENGE_TTL,
				clock_skew: DEFAULT_CLOCK_SKEW,
				member_types: defaults::member_types(),
				microsite_prefix: DEFAULT_MICROSITE_PREFIX.into(),
				default_member_type: DEFAULT_MEMBER_TYPE.into(),
				internal_domains: BTreeSet::new(),
				narwhal_admin_mfa: false,
				totp_issuer: None,
				federation_timeout: DEFAULT_FEDERATION_TIMEOUT,
				clients: BTreeMap::new(),
			},
		}
	}

	/// Overrides the regular and allow-listed access-token lifetimes.
	pub fn token_ages(mut self, regular: Duration, special: Duration) -> Self {
		self.config.token_age = regular;
		self.config.special_token_age = special;

		self
	}

	/// Overrides the regular and allow-listed refresh-token lifetimes.
	pub fn refresh_token_ages(mut self, regular: Duration, special: Duration) -> Self {
		self.config.refresh_token_age = regular;
		self.config.special_refresh_token_age = special;

		self
	}

	/// Adds an email to the long-lived allow-list.
	pub fn special_email(mut self, email: impl Into<String>) -> Self {
		self.config.special_emails.insert(email.into());

		self
	}

	/// Overrides the lockout threshold and window.
	pub fn lockout(mut self, threshold: u32, window: Duration) -> Self {
		self.config.lockout_threshold = threshold;
		self.config.lockout_window = window;

		self
	}

	/// Overrides the MFA challenge lifetime.
	pub fn mfa_challenge_ttl(mut self, ttl: Duration) -> Self {
		self.config.mfa_challenge_ttl = ttl;

		self
	}

	/// Overrides the expiry backdate.
	pub fn clock_skew(mut self, skew: Duration) -> Self {
		self.config.clock_skew = skew;

		self
	}

	/// Adds an accepted member type.
	pub fn member_type(mut self, member_type: impl Into<String>) -> Self {
		self.config.member_types.insert(member_type.into());

		self
	}

	/// Overrides the microsite prefix.
	pub fn microsite_prefix(mut self, prefix: impl Into<String>) -> Self {
		self.config.microsite_prefix = prefix.into();

		self
	}

	/// Overrides the member type applied when the request omits one.
	pub fn default_member_type(mut self, member_type: impl Into<String>) -> Self {
		self.config.default_member_type = member_type.into();

		self
	}

	/// Adds an internal staff domain.
	pub fn internal_domain(mut self, domain: impl Into<String>) -> Self {
		self.config.internal_domains.insert(domain.into());

		self
	}

	/// Toggles the admin MFA challenge on LDAP logins.
	pub fn narwhal_admin_mfa(mut self, enabled: bool) -> Self {
		self.config.narwhal_admin_mfa = enabled;

		self
	}

	/// Sets the TOTP issuer label.
	pub fn totp_issuer(mut self, issuer: impl Into<String>) -> Self {
		self.config.totp_issuer = Some(issuer.into());

		self
	}

	/// Overrides the federation round-trip bound.
	pub fn federation_timeout(mut self, timeout: Duration) -> Self {
		self.config.federation_timeout = timeout;

		self
	}

	/// Registers a basic-auth client.
	pub fn client(mut self, client_id: impl Into<String>, secret: impl Into<String>) -> Self {
		self.config.clients.insert(client_id.into(), TokenSecret::new(secret));

		self
	}

	/// Consumes the builder and validates the configuration.
	pub fn build(self) -> Result<BrokerConfig, ConfigError> {
		self.config.validate()?;

		Ok(self.config)
	}
}

mod defaults {
	// self
	use super::*;

	pub(super) fn token_age() -> Duration {
		DEFAULT_TOKEN_AGE
	}

	pub(super) fn special_token_age() -> Duration {
		DEFAULT_SPECIAL_TOKEN_AGE
	}

	pub(super) fn refresh_token_age() -> Duration {
		DEFAULT_REFRESH_TOKEN_AGE
	}

	pub(super) fn special_refresh_token_age() -> Duration {
		DEFAULT_SPECIAL_REFRESH_TOKEN_AGE
	}

	pub(super) fn lockout_threshold() -> u32 {
		DEFAULT_LOCKOUT_THRESHOLD
	}

	pub(super) fn lockout_window() -> Duration {
		DEFAULT_LOCKOUT_WINDOW
	}

	pub(super) fn mfa_challenge_ttl() -> Duration {
		DEFAULT_MFA_CHALLENGE_TTL
	}

	pub(super) fn clock_skew() -> Duration {
		DEFAULT_CLOCK_SKEW
	}

	pub(super) fn federation_timeout() -> Duration {
		DEFAULT_FEDERATION_TIMEOUT
	}

	pub(super) fn member_types() -> BTreeSet<String> {
		BTreeSet::from([DEFAULT_MEMBER_TYPE.to_owned()])
	}

	pub(super) fn microsite_prefix() -> String {
		DEFAULT_MICROSITE_PREFIX.into()
	}

	pub(super) fn member_type() -> String {
		DEFAULT_MEMBER_TYPE.into()
	}
}

/// Serde adapter encoding [`Duration`] as whole seconds.
pub mod duration_secs {
	// crates.io
	use serde::{Deserializer, Serializer};
	// self
	use crate::_prelude::*;

	/// Serializes the duration as whole seconds.
	pub fn serialize<S>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		serializer.serialize_i64(value.whole_seconds())
	}

	/// Deserializes whole seconds into a duration.
	pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
	where
		D: Deserializer<'de>,
	{
		i64::deserialize(deserializer).map(Duration::seconds)
	}
}
