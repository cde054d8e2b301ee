//! Grant dispatch orchestrated by the [`TokenBroker`] facade.
//!
//! [`TokenBroker::generate_token`] validates the request, selects the grant handler, and maps
//! every path onto a [`TokenResult`]. Handlers live in their own modules as `impl TokenBroker`
//! blocks; they share the commit path in `issue`, which signs the token, rotates the refresh
//! token, records the session, and spawns the detached side effects.

pub mod outcome;
pub mod request;

mod anonymous;
mod federated;
mod issue;
mod password;
mod refresh;
mod session;
mod verify_mfa;

pub use outcome::*;
pub use request::*;
pub use session::parse_basic_authorization;

// self
use crate::{
	_prelude::*,
	auth::{KeyProvider, TokenSigner},
	config::BrokerConfig,
	events::{EventPublisher, NoopPublisher},
	member::MemberStore,
	mfa::MfaGate,
	obs::{self, GrantOutcome, GrantSpan},
	provider::{FederationGateway, Provider},
	session::{LoginAttemptTracker, RefreshTokenStore, SessionStore},
	store::CacheStore,
};

/// Issues, rotates, and verifies member credentials.
///
/// The broker owns no per-request state: the cache is the single source of truth for sessions,
/// refresh tokens, attempt counters, and MFA challenges, so clones are cheap and share
/// everything.
#[derive(Clone)]
pub struct TokenBroker {
	config: Arc<BrokerConfig>,
	signer: TokenSigner,
	sessions: SessionStore,
	refresh_tokens: RefreshTokenStore,
	attempts: LoginAttemptTracker,
	mfa: MfaGate,
	members: Arc<dyn MemberStore>,
	publisher: Arc<dyn EventPublisher>,
	gateways: HashMap<Provider, Arc<dyn FederationGateway>>,
}
impl TokenBroker {
	/// Creates a broker with no gateways and a publisher that drops every event.
	pub fn new(
		config: Arc<BrokerConfig>,
		keys: Arc<KeyProvider>,
		cache: Arc<dyn CacheStore>,
		members: Arc<dyn MemberStore>,
	) -> Self {
		Self {
			signer: TokenSigner::new(config.clone(), keys),
			sessions: SessionStore::new(cache.clone()),
			refresh_tokens: RefreshTokenStore::new(cache.clone(), config.clone()),
			attempts: LoginAttemptTracker::new(
				cache.clone(),
				config.lockout_threshold,
				config.lockout_window,
			),
			mfa: MfaGate::new(cache, config.clone()),
			config,
			members,
			publisher: Arc::new(NoopPublisher),
			gateways: HashMap::new(),
		}
	}

	/// Replaces the event publisher.
	pub fn with_publisher(mut self, publisher: Arc<dyn EventPublisher>) -> Self {
		self.publisher = publisher;

		self
	}

	/// Registers the gateway for its provider, replacing any previous one.
	pub fn with_gateway(mut self, gateway: Arc<dyn FederationGateway>) -> Self {
		self.gateways.insert(gateway.provider(), gateway);

		self
	}

	/// Shared configuration.
	pub fn config(&self) -> &BrokerConfig {
		&self.config
	}

	/// Signer used for issuance and verification.
	pub fn signer(&self) -> &TokenSigner {
		&self.signer
	}

	/// MFA gate, exposed for enrollment.
	pub fn mfa(&self) -> &MfaGate {
		&self.mfa
	}

	/// Runs one grant end to end.
	///
	/// Validation failures and unknown grants return before any collaborator is called.
	/// Dropping the returned future cancels in-flight federation calls and cache writes;
	/// detached side effects already spawned keep running.
	pub async fn generate_token(
		&self,
		version: ApiVersion,
		request: TokenRequest,
	) -> Result<TokenResult> {
		let grant = request.grant_type.parse::<GrantType>()?;
		let span = GrantSpan::new(grant, "generate_token");

		obs::record_grant_outcome(grant, GrantOutcome::Attempt);

		let result = span
			.instrument(async move {
				let ctx = request.validate(version, &self.config)?;

				match ctx.grant {
					GrantType::Anonymous => self.anonymous_grant(&ctx, request).await,
					GrantType::Password => self.password_grant(&ctx, request).await,
					GrantType::Azure
					| GrantType::Facebook
					| GrantType::Google
					| GrantType::GoogleOneTap
					| GrantType::Apple
					| GrantType::Ldap => self.federated_grant(&ctx, request).await,
					GrantType::RefreshToken => self.refresh_grant(&ctx, request).await,
					GrantType::VerifyMfa | GrantType::VerifyMfaNarwhal =>
						self.verify_mfa_grant(&ctx, request).await,
				}
			})
			.await;
		let outcome = match &result {
			Ok(TokenResult::Issued(_)) => GrantOutcome::Success,
			Ok(TokenResult::Challenge(_)) => GrantOutcome::Challenge,
			Ok(TokenResult::ProfileOnly(_)) => GrantOutcome::ProfileOnly,
			Err(_) => GrantOutcome::Failure,
		};

		obs::record_grant_outcome(grant, outcome);

		result
	}
}
impl Debug for TokenBroker {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		let mut providers = self.gateways.keys().copied().collect::<Vec<_>>();

		providers.sort();

		f.debug_struct("TokenBroker")
			.field("issuer", &self.config.issuer)
			.field("gateways", &providers)
			.finish_non_exhaustive()
	}
}
