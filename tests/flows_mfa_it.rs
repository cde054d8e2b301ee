mod common;

// self
use common::*;
use identity_broker::{
	auth::{DeviceLogin, TokenSecret},
	error::Error,
	flows::{ApiVersion, GrantType, TokenRequest, TokenResult},
	mfa::MfaChallenge,
};

fn verify_request(grant: GrantType, challenge: &MfaChallenge, otp: &str) -> TokenRequest {
	let mut request = device_request(grant);

	request.mfa_token = Some(challenge.mfa_token.clone());
	request.otp = Some(TokenSecret::new(otp));

	request
}

async fn challenge(harness: &Harness) -> MfaChallenge {
	let result = harness
		.broker
		.generate_token(ApiVersion::V1, password_request("ada@example.com", PASSWORD))
		.await
		.expect("Password step should succeed.");

	assert_eq!(result.status_code(), 403);

	match result {
		TokenResult::Challenge(challenge) => challenge,
		other => panic!("Expected an MFA challenge, got {other:?}."),
	}
}

#[tokio::test]
async fn challenge_then_code_issues_credentials_once() {
	let harness = harness();
	let member = seed_mfa_member(&harness.members, "ada@example.com");
	let challenge = challenge(&harness).await;

	assert!(!challenge.admin);
	assert_eq!(challenge.expires_in, 300);
	assert!(harness.cache.ttl(&format!("mfa-otp-{}-{DEVICE}-WEB", member.id)).is_some());
	assert!(
		harness.cache.ttl(&format!("STG-{}-{DEVICE}-WEB", member.id)).is_none(),
		"No session may exist before the code is verified."
	);

	let issued = issued(
		harness
			.broker
			.generate_token(
				ApiVersion::V1,
				verify_request(GrantType::VerifyMfa, &challenge, &current_otp()),
			)
			.await
			.expect("Valid code should verify."),
	);

	assert_eq!(issued.user_id.as_ref(), Some(&member.id));
	assert!(issued.mfa_enabled);
	assert!(issued.refresh_token.is_some());
	assert!(harness.cache.ttl(&format!("mfa-otp-{}-{DEVICE}-WEB", member.id)).is_none());

	let replay = harness
		.broker
		.generate_token(
			ApiVersion::V1,
			verify_request(GrantType::VerifyMfa, &challenge, &current_otp()),
		)
		.await
		.expect_err("Challenges are consumed by the first success.");

	assert!(matches!(replay, Error::InvalidOtp));
}

#[tokio::test]
async fn every_mismatch_reports_invalid_otp() {
	let harness = harness();

	seed_mfa_member(&harness.members, "ada@example.com");

	let challenge = challenge(&harness).await;
	let forged = MfaChallenge { mfa_token: "deadbeef-Z2hvc3Q=".into(), ..challenge.clone() };
	let cases = [
		verify_request(GrantType::VerifyMfa, &challenge, "12345x"),
		verify_request(GrantType::VerifyMfa, &forged, &current_otp()),
		verify_request(GrantType::VerifyMfaNarwhal, &challenge, &current_otp()),
		verify_request(GrantType::VerifyMfa, &challenge, &current_otp())
			.with_device("device-2", DeviceLogin::Web),
	];

	for request in cases {
		let err = harness
			.broker
			.generate_token(ApiVersion::V1, request)
			.await
			.expect_err("Mismatch should fail.");

		assert!(matches!(err, Error::InvalidOtp), "Unexpected error: {err:?}.");
		assert_eq!(err.status_code(), 401);
	}

	harness
		.broker
		.generate_token(
			ApiVersion::V1,
			verify_request(GrantType::VerifyMfa, &challenge, &current_otp()),
		)
		.await
		.expect("Failed attempts must leave the challenge pending.");
}
