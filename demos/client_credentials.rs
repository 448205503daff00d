//! Demonstrates acquiring a service token with a client secret over the default reqwest
//! transport, then reusing it from the in-memory cache.

// crates.io
use color_eyre::Result;
use httpmock::prelude::*;
// self
use oauth2_confidential::{
	client::{ClientConfig, ReqwestTokenClient},
	credential::CredentialMaterial,
	http::ReqwestHttpClient,
	oauth::ReqwestTransportErrorMapper,
	reqwest::Client,
};

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let server = MockServer::start_async().await;
	let token_mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/tenant-acme/oauth2/v2.0/token");
			then.status(200).header("content-type", "application/json").body(
				"{\"access_token\":\"demo-access\",\"token_type\":\"Bearer\",\"expires_in\":900}",
			);
		})
		.await;
	let config = ClientConfig::new(
		"demo-client",
		CredentialMaterial::secret("super-secret")?,
		server.url("/tenant-acme"),
	)?;
	let http_client = ReqwestHttpClient::with_client(
		Client::builder()
			.danger_accept_invalid_certs(true)
			.danger_accept_invalid_hostnames(true)
			.build()?,
	);
	let client =
		ReqwestTokenClient::with_http_client(config, http_client, ReqwestTransportErrorMapper)?;
	let first = client.acquire_token(["email.read", "profile.read"]).await?;
	let second = client.acquire_token(["profile.read", "email.read"]).await?;

	println!("Access token: {} (from {:?}).", first.access_token.expose(), first.source);
	println!("Second call served from {:?}.", second.source);
	println!(
		"Attempts: {}, cache hits: {}, network calls: {}.",
		client.metrics().attempts(),
		client.metrics().cache_hits(),
		client.metrics().network_calls()
	);

	token_mock.assert_async().await;

	Ok(())
}
