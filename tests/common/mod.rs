//! Helpers shared by the integration tests.

#![allow(dead_code)]

// std
use std::path::Path;
// crates.io
use httpmock::prelude::*;
use jsonwebtoken::Algorithm;
use oauth2_confidential::{
	client::{ClientConfig, ReqwestTokenClient, TokenClient},
	credential::CertificateCredential,
	http::ReqwestHttpClient,
	oauth::ReqwestTransportErrorMapper,
	reqwest,
};

/// Token path appended to the mock authority.
pub const TOKEN_PATH: &str = "/tenant/oauth2/v2.0/token";

/// Authority URL served by `server`.
pub fn authority(server: &MockServer) -> String {
	server.url("/tenant")
}

/// Successful token endpoint body.
pub fn token_body(token: &str, expires_in: u64) -> String {
	format!(r#"{{"access_token":"{token}","token_type":"Bearer","expires_in":{expires_in}}}"#)
}

/// Reads a PEM fixture shipped under `tests/fixtures`.
pub fn fixture(name: &str) -> Vec<u8> {
	let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("tests").join("fixtures").join(name);

	std::fs::read(&path).unwrap_or_else(|e| panic!("Failed to read fixture {}: {e}", path.display()))
}

/// RSA certificate credential matching `client.crt.pem`.
pub fn rsa_certificate() -> CertificateCredential {
	CertificateCredential::from_pem(
		&fixture("client.key.pem"),
		&fixture("client.crt.pem"),
		Algorithm::RS256,
	)
	.expect("Certificate fixture should load.")
}

/// Builds a reqwest HTTP client that accepts the self-signed certificates produced by
/// `httpmock` and never follows redirects.
pub fn test_reqwest_http_client() -> ReqwestHttpClient {
	let client = reqwest::Client::builder()
		.danger_accept_invalid_certs(true)
		.redirect(reqwest::redirect::Policy::none())
		.build()
		.expect("Failed to build insecure Reqwest client for tests.");

	ReqwestHttpClient::with_client(client)
}

/// Constructs a [`TokenClient`] backed by the reqwest transport used across tests.
pub fn build_client(config: ClientConfig) -> ReqwestTokenClient {
	TokenClient::with_http_client(config, test_reqwest_http_client(), ReqwestTransportErrorMapper)
		.expect("Test client configuration should be valid.")
}
