#![cfg(feature = "reqwest")]

mod common;

// std
use std::sync::Arc;
// crates.io
use httpmock::prelude::*;
use serde_json::json;
use time::Duration;
use url::Url;
// self
use common::*;
use identity_broker::{
	auth::TokenSecret,
	error::{Error, UpstreamError},
	flows::{ApiVersion, GrantType},
	http::FederationHttpClient,
	provider::{
		AzureGateway, AzureSettings, FacebookGateway, FacebookSettings, FederationArtifact,
		FederationGateway, GoogleGateway, GoogleOneTapGateway, GoogleSettings, LdapGateway,
		LdapSettings, Provider, ProviderProfile,
	},
};

fn http() -> FederationHttpClient {
	FederationHttpClient::with_timeout(Duration::seconds(5)).expect("Client should build.")
}

fn endpoint(server: &MockServer, path: &str) -> Url {
	Url::parse(&server.url(path)).expect("Mock endpoint should parse.")
}

fn azure(server: &MockServer) -> AzureGateway {
	let settings = AzureSettings::new("contoso", "azure-client", "azure-secret")
		.expect("Azure settings should build.")
		.with_endpoints(endpoint(server, "/token"), endpoint(server, "/me"));

	AzureGateway::new(http(), settings).expect("Azure gateway should build.")
}

fn google_settings(server: &MockServer) -> GoogleSettings {
	GoogleSettings::new("google-client", "google-secret")
		.expect("Google settings should build.")
		.with_endpoints(
			endpoint(server, "/token"),
			endpoint(server, "/userinfo"),
			endpoint(server, "/tokeninfo"),
		)
}

fn code(redirect_uri: Option<&str>) -> FederationArtifact {
	FederationArtifact::Code {
		code: TokenSecret::new("provider-code"),
		redirect_uri: redirect_uri.map(str::to_owned),
	}
}

#[tokio::test]
async fn azure_expired_codes_are_classified() {
	let server = MockServer::start_async().await;

	server
		.mock_async(|when, then| {
			when.method(POST).path("/token").form_urlencoded_tuple("code", "provider-code");
			then.status(400).json_body(json!({
				"error": "invalid_grant",
				"error_description": "AADSTS70008: The provided authorization code has expired."
			}));
		})
		.await;

	let err = azure(&server)
		.fetch_profile(&code(Some("https://app.example.com/cb")))
		.await
		.expect_err("Expired code should fail.");

	assert!(matches!(
		err,
		Error::Upstream(UpstreamError::AuthorizationCodeExpired { provider: Provider::Azure })
	));
	assert_eq!(err.status_code(), 401);
}

#[tokio::test]
async fn azure_grant_runs_end_to_end() {
	let server = MockServer::start_async().await;
	let token = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/token")
				.form_urlencoded_tuple("grant_type", "authorization_code")
				.form_urlencoded_tuple("redirect_uri", "https://app.example.com/cb");
			then.status(200).json_body(json!({ "access_token": "graph-token" }));
		})
		.await;
	let me = server
		.mock_async(|when, then| {
			when.method(GET).path("/me").header("authorization", "Bearer graph-token");
			then.status(200).json_body(json!({
				"id": "azure-oid",
				"displayName": "Ada Lovelace",
				"userPrincipalName": "ada@corp.example.com",
				"mobilePhone": "+44 20 7946 0000"
			}));
		})
		.await;
	let mut harness = harness();

	harness.broker = harness.broker.with_gateway(Arc::new(azure(&server)));

	let mut request = device_request(GrantType::Azure);

	request.code = Some(TokenSecret::new("provider-code"));
	request.redirect_uri = Some("https://app.example.com/cb".into());

	let issued = issued(
		harness
			.broker
			.generate_token(ApiVersion::V1, request)
			.await
			.expect("Azure grant should succeed."),
	);

	token.assert_async().await;
	me.assert_async().await;

	assert!(issued.new_member);
	assert_eq!(issued.email.as_deref(), Some("ada@corp.example.com"));
	assert_eq!(issued.mobile.as_deref(), Some("+44 20 7946 0000"));

	let member = harness
		.members
		.snapshot_by_email("ada@corp.example.com")
		.expect("Member should be created.");

	assert!(member.staff);
	assert!(!member.admin);
}

#[tokio::test]
async fn google_code_exchange_reads_userinfo() {
	let server = MockServer::start_async().await;

	server
		.mock_async(|when, then| {
			when.method(POST).path("/token").form_urlencoded_tuple("client_id", "google-client");
			then.status(200).json_body(json!({ "access_token": "google-token", "id_token": "ignored" }));
		})
		.await;
	server
		.mock_async(|when, then| {
			when.method(GET).path("/userinfo").header("authorization", "Bearer google-token");
			then.status(200).json_body(json!({
				"sub": "google-sub",
				"email": "grace@example.com",
				"email_verified": true,
				"given_name": "Grace",
				"family_name": "Hopper"
			}));
		})
		.await;

	let gateway =
		GoogleGateway::new(http(), google_settings(&server)).expect("Google gateway should build.");
	let profile = gateway.fetch_profile(&code(None)).await.expect("Google exchange should succeed.");

	assert_eq!(profile.subject(), "google-sub");
	assert_eq!(profile.email(), Some("grace@example.com"));
	assert_eq!(profile.names(), ("Grace".into(), "Hopper".into()));
}

#[tokio::test]
async fn one_tap_rejects_foreign_audiences() {
	let server = MockServer::start_async().await;

	server
		.mock_async(|when, then| {
			when.method(GET).path("/tokeninfo").query_param("id_token", "foreign-token");
			then.status(200).json_body(json!({
				"sub": "google-sub",
				"email": "grace@example.com",
				"email_verified": "true",
				"aud": "someone-else"
			}));
		})
		.await;
	server
		.mock_async(|when, then| {
			when.method(GET).path("/tokeninfo").query_param("id_token", "own-token");
			then.status(200).json_body(json!({
				"sub": "google-sub",
				"email": "grace@example.com",
				"email_verified": "true",
				"aud": "google-client"
			}));
		})
		.await;

	let gateway = GoogleOneTapGateway::new(http(), google_settings(&server))
		.expect("One-tap gateway should build.");
	let err = gateway
		.fetch_profile(&FederationArtifact::Token(TokenSecret::new("foreign-token")))
		.await
		.expect_err("Foreign audience should fail.");

	assert!(matches!(err, Error::Upstream(UpstreamError::Rejected { .. })));

	let ProviderProfile::Google(profile) = gateway
		.fetch_profile(&FederationArtifact::Token(TokenSecret::new("own-token")))
		.await
		.expect("Own audience should pass.")
	else {
		panic!("Expected a Google profile.");
	};

	assert!(profile.email_verified);
}

#[tokio::test]
async fn facebook_accepts_user_tokens_directly() {
	let server = MockServer::start_async().await;
	let me = server
		.mock_async(|when, then| {
			when.method(GET).path("/me").query_param("access_token", "fb-user-token");
			then.status(200).json_body(json!({
				"id": "fb-id",
				"email": "linus@example.com",
				"name": "Linus Torvalds"
			}));
		})
		.await;
	let settings = FacebookSettings::new("fb-app", "fb-secret")
		.expect("Facebook settings should build.")
		.with_endpoints(endpoint(&server, "/oauth/access_token"), endpoint(&server, "/me"));
	let gateway = FacebookGateway::new(http(), settings).expect("Facebook gateway should build.");
	let profile = gateway
		.fetch_profile(&FederationArtifact::Token(TokenSecret::new("fb-user-token")))
		.await
		.expect("User token should resolve.");

	me.assert_async().await;

	assert_eq!(profile.subject(), "fb-id");
	assert_eq!(profile.names(), ("Linus".into(), "Torvalds".into()));
}

#[tokio::test]
async fn directory_binds_map_rejections() {
	let server = MockServer::start_async().await;

	server
		.mock_async(|when, then| {
			when.method(POST).path("/bind").json_body(json!({ "username": "ada", "password": "pw" }));
			then.status(200).json_body(json!({
				"username": "ada",
				"email": "ada@corp.example.com",
				"displayName": "Ada Lovelace"
			}));
		})
		.await;
	server
		.mock_async(|when, then| {
			when.method(POST).path("/bind").json_body(json!({ "username": "ada", "password": "bad" }));
			then.status(401).body("invalid credentials");
		})
		.await;

	let gateway = LdapGateway::new(
		http(),
		LdapSettings::new(&server.url("/bind")).expect("Loopback endpoint should be accepted."),
	)
	.expect("Directory gateway should build.");
	let profile = gateway
		.fetch_profile(&FederationArtifact::Credentials {
			username: "ada".into(),
			password: TokenSecret::new("pw"),
		})
		.await
		.expect("Bind should succeed.");

	assert_eq!(profile.email(), Some("ada@corp.example.com"));

	let err = gateway
		.fetch_profile(&FederationArtifact::Credentials {
			username: "ada".into(),
			password: TokenSecret::new("bad"),
		})
		.await
		.expect_err("Bad directory credentials should fail.");

	assert!(matches!(err, Error::Upstream(UpstreamError::Rejected { provider: Provider::Ldap, .. })));

	let err = gateway
		.fetch_profile(&code(None))
		.await
		.expect_err("Directory gateway only accepts credentials.");

	assert_eq!(err.status_code(), 400);
}
