//! Broker-level error types shared across grants, gateways, and stores.
//!
//! Every variant maps onto the HTTP taxonomy consumed by the binding layer through
//! [`Error::status_code`], and onto a user-facing string through [`Error::message`].

// self
use crate::{
	_prelude::*,
	messages::{Language, Message},
	provider::Provider,
};

/// Broker-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical broker error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Cache failure (sessions, refresh tokens, attempt counters, MFA challenges).
	#[error("{0}")]
	Storage(
		#[from]
		#[source]
		crate::store::StoreError,
	),
	/// Member store failure.
	#[error("{0}")]
	Member(
		#[from]
		#[source]
		crate::member::MemberStoreError,
	),
	/// Cache key could not be derived from the supplied identifiers.
	#[error(transparent)]
	Key(#[from] crate::store::KeyError),
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Identity provider failed or rejected the exchange.
	#[error(transparent)]
	Upstream(#[from] UpstreamError),
	/// Transport failure (DNS, TCP, TLS).
	#[error(transparent)]
	Transport(#[from] TransportError),
	/// Access token could not be signed.
	#[error("Access token could not be signed.")]
	Signing {
		/// Underlying signing failure.
		#[source]
		source: jsonwebtoken::errors::Error,
	},

	/// Request is malformed or misses a mandatory field.
	#[error("Invalid token request: {reason}.")]
	InvalidRequest {
		/// Human-readable reason.
		reason: String,
	},
	/// Grant type is not recognized.
	#[error("Grant type `{grant}` is not supported.")]
	UnsupportedGrant {
		/// Grant label supplied by the caller.
		grant: String,
	},
	/// Username or password did not match.
	#[error("Invalid credentials.")]
	InvalidCredentials,
	/// Presented refresh token does not match the stored one.
	#[error("Refresh token is invalid.")]
	InvalidRefreshToken,
	/// MFA challenge or one-time code did not verify.
	#[error("One-time password is invalid.")]
	InvalidOtp,
	/// Basic-auth client credentials did not verify.
	#[error("Client authentication failed.")]
	InvalidClient,
	/// Access token failed signature, algorithm, or claim validation.
	#[error("Access token is invalid: {reason}.")]
	InvalidToken {
		/// Human-readable reason.
		reason: String,
	},
	/// Token is no longer the live session for its device.
	#[error("Session has expired or was replaced by a newer login.")]
	SessionExpired,
	/// Referenced member does not exist.
	#[error("Member not found.")]
	MemberNotFound,
	/// Member has been locked out.
	#[error("Account is blocked.")]
	AccountBlocked,
	/// Member has been deactivated.
	#[error("Account is inactive.")]
	AccountInactive,
	/// Member has not completed activation.
	#[error("Account is not activated.")]
	AccountNotActivated,
}
impl Error {
	/// Shorthand for [`Error::InvalidRequest`].
	pub fn invalid_request(reason: impl Into<String>) -> Self {
		Self::InvalidRequest { reason: reason.into() }
	}

	/// HTTP status the binding layer should answer with.
	pub fn status_code(&self) -> u16 {
		match self {
			Self::Storage(_) | Self::Member(_) | Self::Config(_) | Self::Signing { .. } => 500,
			Self::Transport(_) => 500,
			Self::Upstream(e) => e.status_code(),
			Self::Key(_)
			| Self::InvalidRequest { .. }
			| Self::UnsupportedGrant { .. }
			| Self::AccountInactive
			| Self::AccountNotActivated => 400,
			Self::InvalidCredentials
			| Self::InvalidRefreshToken
			| Self::InvalidOtp
			| Self::InvalidClient
			| Self::InvalidToken { .. }
			| Self::SessionExpired
			| Self::MemberNotFound
			| Self::AccountBlocked => 401,
		}
	}

	/// Catalog entry used for the user-facing message.
	pub fn catalog_entry(&self) -> Message {
		match self {
			Self::Storage(_)
			| Self::Member(_)
			| Self::Config(_)
			| Self::Transport(_)
			| Self::Signing { .. } => Message::ServiceUnavailable,
			Self::Upstream(e) => e.catalog_entry(),
			Self::Key(_) | Self::InvalidRequest { .. } => Message::InvalidRequest,
			Self::UnsupportedGrant { .. } => Message::UnsupportedGrant,
			Self::InvalidCredentials => Message::InvalidCredentials,
			Self::InvalidRefreshToken => Message::InvalidRefreshToken,
			Self::InvalidOtp => Message::InvalidOtp,
			Self::InvalidClient => Message::InvalidClient,
			Self::InvalidToken { .. } => Message::InvalidToken,
			Self::SessionExpired => Message::SessionExpired,
			Self::MemberNotFound => Message::MemberNotFound,
			Self::AccountBlocked => Message::AccountBlocked,
			Self::AccountInactive => Message::AccountInactive,
			Self::AccountNotActivated => Message::AccountNotActivated,
		}
	}

	/// Localized user-facing message.
	pub fn message(&self, language: Language) -> &'static str {
		self.catalog_entry().text(language)
	}
}

/// Configuration and validation failures raised while wiring the broker.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// Configuration document could not be parsed.
	#[error("Configuration document is malformed.")]
	Parse {
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
	},
	/// A mandatory string setting is empty.
	#[error("The `{field}` setting must not be empty.")]
	MissingSetting {
		/// Setting name.
		field: &'static str,
	},
	/// A duration setting is zero or negative.
	#[error("The `{field}` setting must be a positive duration.")]
	NonPositiveDuration {
		/// Setting name.
		field: &'static str,
	},
	/// Lockout threshold must allow at least one attempt.
	#[error("The lockout threshold must be at least 1.")]
	InvalidLockoutThreshold,
	/// Key material could not be parsed.
	#[error("The {which} key could not be parsed.")]
	InvalidKey {
		/// Which key failed (signing, verification, apple).
		which: &'static str,
		/// Underlying parsing failure.
		#[source]
		source: jsonwebtoken::errors::Error,
	},
	/// Key file could not be read.
	#[error("Key file {path} could not be read.")]
	KeyFile {
		/// Path that failed.
		path: String,
		/// Underlying IO failure.
		#[source]
		source: std::io::Error,
	},
	/// Endpoints must use HTTPS unless they point at a loopback host.
	#[error("The {endpoint} endpoint must use HTTPS: {url}.")]
	InsecureEndpoint {
		/// Which endpoint failed validation.
		endpoint: &'static str,
		/// Endpoint URL that failed validation.
		url: String,
	},
	/// Endpoint URL cannot be parsed.
	#[error("The {endpoint} endpoint is not a valid URL.")]
	InvalidEndpoint {
		/// Which endpoint failed validation.
		endpoint: &'static str,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// A federated grant was requested but no gateway is registered for it.
	#[error("No federation gateway is registered for {provider}.")]
	MissingGateway {
		/// Provider without a gateway.
		provider: Provider,
	},
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Identity provider failures.
#[derive(Debug, ThisError)]
pub enum UpstreamError {
	/// Provider rejected the artifact (bad code, bad token, bad directory credentials).
	#[error("{provider} rejected the request: {reason}.")]
	Rejected {
		/// Provider that answered.
		provider: Provider,
		/// Provider- or broker-supplied reason string.
		reason: String,
	},
	/// Authorization code expired or was already redeemed.
	#[error("{provider} authorization code has expired.")]
	AuthorizationCodeExpired {
		/// Provider that answered.
		provider: Provider,
	},
	/// Provider refused the broker's client credentials.
	#[error("{provider} refused the client credentials: {reason}.")]
	MisconfiguredClient {
		/// Provider that answered.
		provider: Provider,
		/// Provider- or broker-supplied reason string.
		reason: String,
	},
	/// Provider returned an unexpected status.
	#[error("{provider} returned an unexpected response: {message}.")]
	Unavailable {
		/// Provider that answered.
		provider: Provider,
		/// Summary of the failure.
		message: String,
		/// HTTP status code, when available.
		status: Option<u16>,
	},
	/// Provider responded with malformed JSON.
	#[error("{provider} returned malformed JSON.")]
	MalformedResponse {
		/// Provider that answered.
		provider: Provider,
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
	},
	/// Provider response lacked a mandatory field.
	#[error("{provider} response is missing `{field}`.")]
	IncompleteResponse {
		/// Provider that answered.
		provider: Provider,
		/// Missing field.
		field: &'static str,
	},
	/// Provider profile carries no usable email address.
	#[error("{provider} profile does not expose an email address.")]
	MissingEmail {
		/// Provider that answered.
		provider: Provider,
	},
	/// Provider did not answer within the configured bound.
	#[error("{provider} did not answer within {after}.")]
	Timeout {
		/// Provider that was called.
		provider: Provider,
		/// Configured bound.
		after: Duration,
	},
}
impl UpstreamError {
	/// Provider that caused the failure.
	pub fn provider(&self) -> Provider {
		match self {
			Self::Rejected { provider, .. }
			| Self::AuthorizationCodeExpired { provider }
			| Self::MisconfiguredClient { provider, .. }
			| Self::Unavailable { provider, .. }
			| Self::MalformedResponse { provider, .. }
			| Self::IncompleteResponse { provider, .. }
			| Self::MissingEmail { provider }
			| Self::Timeout { provider, .. } => *provider,
		}
	}

	/// HTTP status the binding layer should answer with.
	pub fn status_code(&self) -> u16 {
		match self {
			Self::Rejected { .. } | Self::AuthorizationCodeExpired { .. } | Self::MissingEmail { .. } =>
				401,
			_ => 500,
		}
	}

	fn catalog_entry(&self) -> Message {
		match self {
			Self::AuthorizationCodeExpired { .. } => Message::AuthorizationCodeExpired,
			Self::Rejected { .. } | Self::MissingEmail { .. } => Message::ProviderRejected,
			_ => Message::ServiceUnavailable,
		}
	}
}

/// Transport-level failures (network, IO).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling an identity provider.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred while calling an identity provider.")]
	Io(#[from] std::io::Error),
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for TransportError {
	fn from(e: ReqwestError) -> Self {
		Self::network(e)
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn taxonomy_maps_to_http_statuses() {
		assert_eq!(Error::invalid_request("deviceId is required").status_code(), 400);
		assert_eq!(Error::UnsupportedGrant { grant: "magic".into() }.status_code(), 400);
		assert_eq!(Error::InvalidCredentials.status_code(), 401);
		assert_eq!(Error::AccountBlocked.status_code(), 401);
		assert_eq!(Error::AccountInactive.status_code(), 400);
		assert_eq!(
			Error::from(UpstreamError::AuthorizationCodeExpired { provider: Provider::Azure })
				.status_code(),
			401
		);
		assert_eq!(
			Error::from(UpstreamError::Timeout {
				provider: Provider::Google,
				after: Duration::seconds(5)
			})
			.status_code(),
			500
		);
	}

	#[test]
	fn expired_azure_code_uses_localized_message() {
		let err = Error::from(UpstreamError::AuthorizationCodeExpired { provider: Provider::Azure });

		assert_eq!(err.message(Language::En), Message::AuthorizationCodeExpired.text(Language::En));
		assert_ne!(err.message(Language::En), err.message(Language::Id));
	}

	#[test]
	fn store_error_converts_with_source() {
		let store_error = crate::store::StoreError::Backend { message: "cache unreachable".into() };
		let err: Error = store_error.clone().into();

		assert!(matches!(err, Error::Storage(_)));
		assert!(err.to_string().contains("cache unreachable"));

		let source = StdError::source(&err).expect("Broker error should expose the store error.");

		assert_eq!(source.to_string(), store_error.to_string());
	}
}
