mod common;

// self
use common::*;
use identity_broker::{
	auth::{DeviceBinding, DeviceId, DeviceLogin, MemberId},
	flows::{ApiVersion, GrantType},
};

#[tokio::test]
async fn anonymous_tokens_are_memoized_per_device() {
	let harness = harness();
	let first = issued(
		harness
			.broker
			.generate_token(ApiVersion::V1, device_request(GrantType::Anonymous))
			.await
			.expect("Anonymous grant should succeed."),
	);
	let second = issued(
		harness
			.broker
			.generate_token(ApiVersion::V1, device_request(GrantType::Anonymous))
			.await
			.expect("Anonymous grant should succeed."),
	);

	assert!(first.refresh_token.is_none());
	assert!(first.user_id.is_none());
	assert_eq!(first.access_token, second.access_token);
	assert!(harness.cache.ttl(&format!("STG-anonymous-{DEVICE}-WEB")).is_some());
	assert!(harness.cache.ttl(&format!("RT-anonymous-{DEVICE}-WEB")).is_none());

	let other = harness
		.broker
		.generate_anonymous(
			DeviceBinding::new(
				DeviceId::new("device-2").expect("Device fixture should be valid."),
				DeviceLogin::Mobile,
			),
			"member",
		)
		.await
		.expect("Anonymous grant should succeed.");

	assert_ne!(other.access_token, first.access_token);

	let verified = harness
		.broker
		.verify_token_member(first.access_token.expect("Token should be issued.").expose())
		.await
		.expect("Anonymous token should verify.");

	assert_eq!(verified.member_id, MemberId::anonymous());
	assert!(!verified.authorised);
	assert!(verified.email.is_empty());

	tokio::time::sleep(std::time::Duration::from_millis(50)).await;

	assert!(harness.publisher.sessions().is_empty(), "Anonymous grants record no session info.");
}
