#![allow(dead_code)]

// std
use std::sync::Arc;
// crates.io
use totp_rs::{Algorithm, Secret, TOTP};
// self
use identity_broker::{
	auth::{DeviceLogin, KeyProvider, TokenSecret, hash_password},
	config::{BrokerConfig, BrokerConfigBuilder},
	events::MemoryPublisher,
	flows::{ApiVersion, GrantType, TokenBroker, TokenRequest, TokenResult},
	member::{Member, MemoryMemberStore},
	store::MemoryCache,
};

pub const SIGNING_KEY: &[u8] = include_bytes!("../fixtures/signing_key.pem");
pub const SIGNING_PUB: &[u8] = include_bytes!("../fixtures/signing_key.pub.pem");
pub const FOREIGN_KEY: &[u8] = include_bytes!("../fixtures/foreign_key.pem");
pub const FOREIGN_PUB: &[u8] = include_bytes!("../fixtures/foreign_key.pub.pem");
pub const TOTP_SECRET: &str = "JBSWY3DPEHPK3PXPJBSWY3DPEHPK3PXP";
pub const PASSWORD: &str = "correct horse battery";
pub const DEVICE: &str = "device-1";

pub struct Harness {
	pub broker: TokenBroker,
	pub cache: MemoryCache,
	pub members: MemoryMemberStore,
	pub publisher: MemoryPublisher,
	pub config: Arc<BrokerConfig>,
}

pub fn config_builder() -> BrokerConfigBuilder {
	BrokerConfig::builder("https://id.example.com", "members", "hash-key")
		.internal_domain("corp.example.com")
		.totp_issuer("Example")
}

pub fn keys() -> Arc<KeyProvider> {
	Arc::new(
		KeyProvider::from_rsa_pem("primary", SIGNING_KEY, SIGNING_PUB)
			.expect("Signing key fixtures should load."),
	)
}

pub fn harness() -> Harness {
	harness_with(config_builder())
}

pub fn harness_with(builder: BrokerConfigBuilder) -> Harness {
	let config = Arc::new(builder.build().expect("Broker config fixture should be valid."));
	let cache = MemoryCache::default();
	let members = MemoryMemberStore::default();
	let publisher = MemoryPublisher::default();
	let broker =
		TokenBroker::new(config.clone(), keys(), Arc::new(cache.clone()), Arc::new(members.clone()))
			.with_publisher(Arc::new(publisher.clone()));

	Harness { broker, cache, members, publisher, config }
}

pub fn seed_member(members: &MemoryMemberStore, email: &str) -> Member {
	let mut member = Member::new(email, "member");

	member.first_name = "Ada".into();
	member.last_name = "Lovelace".into();
	member.password_salt = Some("salt".into());
	member.password_hash = Some(hash_password("salt", PASSWORD));
	members.insert(member.clone());

	member
}

pub fn seed_mfa_member(members: &MemoryMemberStore, email: &str) -> Member {
	let mut member = seed_member(members, email);

	member.mfa_enabled = true;
	member.mfa_secret = Some(TokenSecret::new(TOTP_SECRET));
	members.insert(member.clone());

	member
}

pub fn device_request(grant: GrantType) -> TokenRequest {
	TokenRequest::new(grant).with_device(DEVICE, DeviceLogin::Web)
}

pub fn password_request(email: &str, password: &str) -> TokenRequest {
	let mut request = device_request(GrantType::Password);

	request.username = Some(email.into());
	request.password = Some(TokenSecret::new(password));

	request
}

pub fn current_otp() -> String {
	let bytes = Secret::Encoded(TOTP_SECRET.into()).to_bytes().expect("Fixture secret should decode.");

	TOTP::new(Algorithm::SHA1, 6, 1, 30, bytes, None, "member".into())
		.expect("Fixture TOTP should build.")
		.generate_current()
		.expect("Clock should be after the epoch.")
}

pub fn issued(result: TokenResult) -> TokenRequest {
	match result {
		TokenResult::Issued(request) => *request,
		other => panic!("Expected issued credentials, got {other:?}."),
	}
}

pub async fn login(harness: &Harness, email: &str) -> TokenRequest {
	let result = harness
		.broker
		.generate_token(ApiVersion::V1, password_request(email, PASSWORD))
		.await
		.expect("Password login should succeed.");

	issued(result)
}

/// Polls until `check` holds, for side effects running on detached tasks.
pub async fn wait_until(check: impl Fn() -> bool) {
	for _ in 0..100 {
		if check() {
			return;
		}

		tokio::time::sleep(std::time::Duration::from_millis(10)).await;
	}

	panic!("Detached side effect did not complete in time.");
}
