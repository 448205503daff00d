mod common;

// std
use std::time::Duration as StdDuration;
// crates.io
use httpmock::prelude::*;
use oauth2_confidential::{
	client::{
		AcquireTokenRequest, ClientConfig, ClientOptions, ReqwestTokenClient, SecretAuthMethod,
		TokenSource,
	},
	credential::CredentialMaterial,
	error::{Error, MalformedResponseError, TransientError},
	oauth::ReqwestTransportErrorMapper,
};
use time::Duration;
// self
use common::*;

const CLIENT_ID: &str = "secret-client";

fn secret_config(server: &MockServer, secret: &str) -> ClientConfig {
	ClientConfig::new(
		CLIENT_ID,
		CredentialMaterial::secret(secret).expect("Secret should be accepted."),
		authority(server),
	)
	.expect("Client configuration should be valid.")
}

#[tokio::test]
async fn secret_token_is_cached_after_success() {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path(TOKEN_PATH).header("content-type", "application/x-www-form-urlencoded");
			then.status(200).header("content-type", "application/json").body(token_body("cached", 1800));
		})
		.await;
	let client = build_client(secret_config(&server, "s3cret"));
	let first = client
		.acquire_token(["api.write", "api.read"])
		.await
		.expect("Initial acquisition should succeed.");
	let second = client
		.acquire_token(["api.read", "api.write"])
		.await
		.expect("Cached acquisition should succeed.");

	assert_eq!(first.access_token.expose(), "cached");
	assert_eq!(first.source, TokenSource::IdentityProvider);
	assert_eq!(second.source, TokenSource::Cache);
	assert_eq!(second.authorization_header(), "Bearer cached");

	mock.assert_calls_async(1).await;
}

#[tokio::test]
async fn concurrent_acquisitions_request_once() {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path(TOKEN_PATH);
			then.status(200)
				.header("content-type", "application/json")
				.body(token_body("coalesced", 900))
				.delay(StdDuration::from_millis(200));
		})
		.await;
	let client = build_client(secret_config(&server, "s3cret"));
	let (first, second) =
		tokio::join!(client.acquire_token(["notifications"]), client.acquire_token(["notifications"]));

	assert_eq!(first.expect("First call should succeed.").access_token.expose(), "coalesced");
	assert_eq!(second.expect("Second call should succeed.").access_token.expose(), "coalesced");
	assert_eq!(client.metrics().coalesced(), 1);

	mock.assert_calls_async(1).await;
}

#[tokio::test]
async fn bad_secret_is_denied_and_not_cached() {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path(TOKEN_PATH);
			then.status(401).header("content-type", "application/json").body(
				r#"{"error":"invalid_client","error_description":"AADSTS7000215: Invalid client secret provided."}"#,
			);
		})
		.await;
	let client = build_client(secret_config(&server, "bad-secret"));
	let err = client.acquire_token(["api.read"]).await.expect_err("Bad secret should be denied.");

	assert!(matches!(
		err,
		Error::AuthorizationDenied { ref code, status: Some(401), ref description }
			if code == "invalid_client" && description.as_deref().is_some_and(|d| d.contains("AADSTS7000215"))
	));
	assert!(!err.is_transient());
	assert!(client.cache().is_empty());

	mock.assert_async().await;
}

#[tokio::test]
async fn basic_auth_sends_authorization_header() {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path(TOKEN_PATH).header_exists("authorization");
			then.status(200).header("content-type", "application/json").body(token_body("basic", 600));
		})
		.await;
	let options = ClientOptions { secret_auth_method: SecretAuthMethod::Basic, ..Default::default() };
	let client = build_client(secret_config(&server, "s3cret").with_options(options));

	client.acquire_token(["api.read"]).await.expect("Basic authentication should succeed.");

	mock.assert_async().await;
}

#[tokio::test]
async fn server_errors_are_transient_with_retry_hint() {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path(TOKEN_PATH);
			then.status(503)
				.header("content-type", "application/json")
				.header("retry-after", "7")
				.body(r#"{"error":"temporarily_unavailable"}"#);
		})
		.await;
	let client = build_client(secret_config(&server, "s3cret"));
	let err = client.acquire_token(["api.read"]).await.expect_err("503 should fail.");

	assert!(err.is_transient());
	assert_eq!(err.retry_after(), Some(Duration::seconds(7)));
	assert!(matches!(
		err,
		Error::Transient(TransientError::TokenEndpoint { status: Some(503), .. })
	));
	assert!(client.cache().is_empty());

	mock.assert_async().await;
}

#[tokio::test]
async fn empty_bodied_gateway_errors_are_transient() {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path(TOKEN_PATH);
			then.status(502);
		})
		.await;
	let client = build_client(secret_config(&server, "s3cret"));
	let err = client.acquire_token(["api.read"]).await.expect_err("502 should fail.");

	assert!(matches!(err, Error::Transient(TransientError::TokenEndpoint { status: Some(502), .. })));

	mock.assert_async().await;
}

#[tokio::test]
async fn malformed_success_bodies_are_rejected() {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path(TOKEN_PATH);
			then.status(200)
				.header("content-type", "application/json")
				.body(r#"{"token_type":"bearer","expires_in":3600}"#);
		})
		.await;
	let client = build_client(secret_config(&server, "s3cret"));
	let err = client.acquire_token(["api.read"]).await.expect_err("Missing token should fail.");

	assert!(matches!(
		err,
		Error::MalformedResponse(MalformedResponseError::Parse { status: Some(200), .. })
	));
	assert!(client.cache().is_empty());

	mock.assert_async().await;
}

#[tokio::test]
async fn missing_expiry_is_rejected() {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path(TOKEN_PATH);
			then.status(200)
				.header("content-type", "application/json")
				.body(r#"{"access_token":"no-expiry","token_type":"bearer"}"#);
		})
		.await;
	let client = build_client(secret_config(&server, "s3cret"));
	let err = client.acquire_token(["api.read"]).await.expect_err("Missing expiry should fail.");

	assert!(matches!(err, Error::MalformedResponse(MalformedResponseError::MissingExpiresIn)));

	mock.assert_async().await;
}

#[tokio::test]
async fn slow_endpoints_time_out() {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path(TOKEN_PATH);
			then.status(200)
				.header("content-type", "application/json")
				.body(token_body("late", 600))
				.delay(StdDuration::from_millis(800));
		})
		.await;
	let client = build_client(secret_config(&server, "s3cret"));
	let request = AcquireTokenRequest::new(["api.read"])
		.expect("Scopes should be valid.")
		.with_timeout(Duration::milliseconds(100));
	let err = client.acquire(request).await.expect_err("Slow endpoint should time out.");

	assert!(matches!(err, Error::Transient(TransientError::Timeout)));
	assert!(client.cache().is_empty());

	mock.assert_async().await;
}

#[tokio::test]
async fn redirects_are_not_followed() {
	let server = MockServer::start_async().await;
	let redirect = server
		.mock_async(|when, then| {
			when.method(POST).path(TOKEN_PATH);
			then.status(302).header("location", "https://phishing.example.com/token");
		})
		.await;
	let client = build_client(secret_config(&server, "s3cret"));
	let err = client.acquire_token(["api.read"]).await.expect_err("Redirects should fail.");

	assert!(matches!(
		err,
		Error::MalformedResponse(MalformedResponseError::Unexpected { status: Some(302), .. })
	));

	redirect.assert_async().await;
}

#[tokio::test]
async fn scheme_less_authority_fails_before_network() {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path(TOKEN_PATH);
			then.status(200);
		})
		.await;
	let config = ClientConfig::new(
		CLIENT_ID,
		CredentialMaterial::secret("s3cret").expect("Secret should be accepted."),
		"login.microsoftonline.com/common",
	)
	.expect("Client configuration should be valid.");
	let result = ReqwestTokenClient::with_http_client(
		config,
		test_reqwest_http_client(),
		ReqwestTransportErrorMapper,
	);

	assert!(matches!(result, Err(Error::InvalidAuthority(_))));

	mock.assert_calls_async(0).await;
}
