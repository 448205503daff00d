//! Token endpoint facade over the `oauth2` crate.
//!
//! The facade owns the configured `oauth2` client, the transport, and the credential. One
//! call to [`TokenEndpointFacade::exchange`] performs exactly one client credentials
//! request and turns the outcome into either a [`TokenCacheEntry`] or a classified
//! [`Error`].

pub(crate) mod classify;

pub use oauth2;

// std
use std::time::Duration as StdDuration;
// crates.io
use oauth2::{
	AuthType, ClientId as OAuthClientId, ClientSecret, EndpointNotSet, EndpointSet,
	HttpClientError, RequestTokenError, Scope, TokenResponse, TokenUrl,
	basic::{BasicClient, BasicRequestTokenError, BasicTokenResponse},
};
// self
use crate::{
	_prelude::*,
	assertion::AssertionBuilder,
	auth::{ClientId, ScopeSet, SecretString},
	authority::Authority,
	cache::TokenCacheEntry,
	client::SecretAuthMethod,
	credential::{CredentialKind, CredentialMaterial, JWT_BEARER_ASSERTION_TYPE},
	error::{ConfigError, MalformedResponseError, TransientError},
	http::{ResponseMetadata, ResponseMetadataSlot, TokenHttpClient},
};

type ConfiguredBasicClient =
	BasicClient<EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointSet>;
type FacadeFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + 'a + Send>>;

/// Maps HTTP transport failures into crate [`Error`] values.
pub trait TransportErrorMapper<E>
where
	Self: 'static + Send + Sync,
	E: 'static + Send + Sync + StdError,
{
	/// Converts an [`HttpClientError`] emitted by the transport into a crate error.
	///
	/// Deadline overruns must become [`TransientError::Timeout`].
	fn map_transport_error(
		&self,
		metadata: Option<&ResponseMetadata>,
		error: HttpClientError<E>,
	) -> Error;
}

/// Default mapper for reqwest-backed transports.
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug, Default)]
pub struct ReqwestTransportErrorMapper;
#[cfg(feature = "reqwest")]
impl TransportErrorMapper<ReqwestError> for ReqwestTransportErrorMapper {
	fn map_transport_error(
		&self,
		meta: Option<&ResponseMetadata>,
		err: HttpClientError<ReqwestError>,
	) -> Error {
		match err {
			HttpClientError::Reqwest(inner) => map_reqwest_error(*inner),
			HttpClientError::Http(inner) => ConfigError::from(inner).into(),
			HttpClientError::Io(inner) => TransientError::network(inner).into(),
			HttpClientError::Other(message) => map_generic_transport_error(meta, message),
			_ => map_generic_transport_error(meta, "unknown failure"),
		}
	}
}

/// One configured token endpoint plus the credential used to authenticate against it.
pub(crate) struct TokenEndpointFacade<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	oauth_client: ConfiguredBasicClient,
	http_client: Arc<C>,
	error_mapper: Arc<M>,
	assertion_builder: AssertionBuilder,
	client_id: ClientId,
	authority: Authority,
	credential: CredentialMaterial,
}
impl<C, M> TokenEndpointFacade<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	pub(crate) fn new(
		client_id: ClientId,
		authority: Authority,
		credential: CredentialMaterial,
		secret_auth: SecretAuthMethod,
		http_client: Arc<C>,
		error_mapper: Arc<M>,
	) -> Result<Self> {
		let token_url = TokenUrl::new(authority.token_endpoint().to_string())
			.map_err(|source| ConfigError::InvalidTokenEndpoint { source })?;
		let mut oauth_client =
			BasicClient::new(OAuthClientId::new(client_id.to_string())).set_token_uri(token_url);

		// Assertions carry `client_id` in the body; only secrets may use HTTP Basic.
		oauth_client = match (&credential, secret_auth) {
			(CredentialMaterial::Secret(secret), SecretAuthMethod::Basic) => oauth_client
				.set_client_secret(ClientSecret::new(secret.expose().to_owned()))
				.set_auth_type(AuthType::BasicAuth),
			(CredentialMaterial::Secret(secret), SecretAuthMethod::Post) => oauth_client
				.set_client_secret(ClientSecret::new(secret.expose().to_owned()))
				.set_auth_type(AuthType::RequestBody),
			_ => oauth_client.set_auth_type(AuthType::RequestBody),
		};

		Ok(Self {
			oauth_client,
			http_client,
			error_mapper,
			assertion_builder: AssertionBuilder::new(),
			client_id,
			authority,
			credential,
		})
	}

	pub(crate) fn client_id(&self) -> &ClientId {
		&self.client_id
	}

	pub(crate) fn authority(&self) -> &Authority {
		&self.authority
	}

	pub(crate) fn credential_kind(&self) -> CredentialKind {
		self.credential.kind()
	}

	/// Performs one client credentials request for `scopes`.
	pub(crate) fn exchange<'a>(
		&'a self,
		scopes: &'a ScopeSet,
		timeout: StdDuration,
	) -> FacadeFuture<'a, TokenCacheEntry> {
		let meta = ResponseMetadataSlot::default();

		Box::pin(async move {
			let instrumented = self.http_client.handle(meta.clone(), timeout);
			let assertion = self.client_assertion()?;
			let mut request = self.oauth_client.exchange_client_credentials();

			for scope in scopes.iter() {
				request = request.add_scope(Scope::new(scope.to_owned()));
			}
			if let Some(assertion) = assertion {
				request = request
					.add_extra_param("client_assertion_type", JWT_BEARER_ASSERTION_TYPE)
					.add_extra_param("client_assertion", assertion.expose().to_owned());
			}

			let response = request.request_async(&instrumented).await.map_err(|err| {
				map_request_error(meta.take(), err, self.error_mapper.as_ref())
			})?;

			self.map_token_response(scopes, response)
		})
	}

	fn client_assertion(&self) -> Result<Option<SecretString>> {
		match &self.credential {
			CredentialMaterial::Secret(_) => Ok(None),
			CredentialMaterial::Certificate(credential) => {
				let assertion = self.assertion_builder.build(
					&self.client_id,
					credential,
					self.authority.token_endpoint().as_str(),
				)?;

				Ok(Some(assertion.into_secret()))
			},
			CredentialMaterial::PrebuiltAssertion(jwt) => Ok(Some(jwt.clone())),
		}
	}

	fn map_token_response(
		&self,
		scopes: &ScopeSet,
		response: BasicTokenResponse,
	) -> Result<TokenCacheEntry> {
		let access_token = response.access_token().secret();

		if access_token.is_empty() {
			return Err(MalformedResponseError::EmptyAccessToken.into());
		}

		let expires_in =
			response.expires_in().ok_or(MalformedResponseError::MissingExpiresIn)?.as_secs();
		let expires_in =
			i64::try_from(expires_in).map_err(|_| MalformedResponseError::ExpiresInOutOfRange)?;

		if expires_in <= 0 {
			return Err(MalformedResponseError::NonPositiveExpiresIn.into());
		}

		TokenCacheEntry::builder(self.client_id.clone(), self.authority.as_str(), scopes.clone())
			.access_token(access_token.to_owned())
			.token_type(response.token_type().as_ref())
			.issued_at(OffsetDateTime::now_utc())
			.expires_in(Duration::seconds(expires_in))
			.build()
			.map_err(|e| MalformedResponseError::from(e).into())
	}
}

fn map_request_error<E, M>(
	meta: Option<ResponseMetadata>,
	err: BasicRequestTokenError<HttpClientError<E>>,
	mapper: &M,
) -> Error
where
	E: 'static + Send + Sync + StdError,
	M: ?Sized + TransportErrorMapper<E>,
{
	let meta_ref = meta.as_ref();

	match err {
		RequestTokenError::ServerResponse(response) => classify::server_response(
			meta_ref,
			response.error().as_ref(),
			response.error_description().map(String::as_str),
		),
		RequestTokenError::Request(error) => mapper.map_transport_error(meta_ref, error),
		RequestTokenError::Parse(error, body) => classify::unparsed_body(meta_ref, error, &body),
		RequestTokenError::Other(message) => classify::unexpected(meta_ref, message),
	}
}

#[cfg(feature = "reqwest")]
fn map_reqwest_error(err: ReqwestError) -> Error {
	if err.is_builder() {
		return ConfigError::from(err).into();
	}
	if err.is_timeout() {
		return TransientError::Timeout.into();
	}

	TransientError::network(err).into()
}

#[cfg(feature = "reqwest")]
fn map_generic_transport_error(meta: Option<&ResponseMetadata>, message: impl Display) -> Error {
	TransientError::TokenEndpoint {
		message: format!("HTTP client error: {message}"),
		status: classify::meta_status(meta),
		retry_after: classify::meta_retry_after(meta),
	}
	.into()
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::{_preludet::*, authority::AuthorityResolver};
	#[cfg(feature = "reqwest")] use crate::http::ReqwestHttpClient;

	const AUTHORITY: &str = "https://login.example.com/tenant";

	fn client_id() -> ClientId {
		ClientId::new("facade-client").expect("Client id fixture should be valid.")
	}

	fn authority() -> Authority {
		AuthorityResolver::new().resolve(AUTHORITY).expect("Authority fixture should resolve.")
	}

	fn scopes() -> ScopeSet {
		ScopeSet::new(["api/.default"]).expect("Scope fixture should be valid.")
	}

	fn facade(
		credential: CredentialMaterial,
		secret_auth: SecretAuthMethod,
		stub: &StubHttpClient,
	) -> TokenEndpointFacade<StubHttpClient, StubTransportErrorMapper> {
		TokenEndpointFacade::new(
			client_id(),
			authority(),
			credential,
			secret_auth,
			Arc::new(stub.clone()),
			Arc::new(StubTransportErrorMapper),
		)
		.expect("Facade should build.")
	}

	#[cfg(feature = "reqwest")]
	#[test]
	fn builds_reqwest_facades_for_every_credential() {
		let secret = CredentialMaterial::secret("secret").expect("Secret should be accepted.");
		let assertion =
			CredentialMaterial::prebuilt_assertion("a.b.c").expect("JWT should be accepted.");
		let certificate = CredentialMaterial::certificate(rsa_certificate_fixture());

		for credential in [secret, assertion, certificate] {
			let kind = credential.kind();
			let facade = <TokenEndpointFacade<ReqwestHttpClient, ReqwestTransportErrorMapper>>::new(
				client_id(),
				authority(),
				credential,
				SecretAuthMethod::Basic,
				Arc::new(ReqwestHttpClient::new().expect("Reqwest client should build.")),
				Arc::new(ReqwestTransportErrorMapper),
			)
			.expect("Facade should build.");

			assert_eq!(facade.credential_kind(), kind);
			assert_eq!(facade.authority().as_str(), AUTHORITY);
			assert_eq!(facade.client_id().as_str(), "facade-client");
		}
	}

	#[tokio::test]
	async fn secret_post_sends_credentials_in_body() {
		let stub = StubHttpClient::new();

		stub.reply(200, r#"{"access_token":"abc","token_type":"Bearer","expires_in":3600}"#);

		let facade = facade(
			CredentialMaterial::secret("s3cret").expect("Secret should be accepted."),
			SecretAuthMethod::Post,
			&stub,
		);
		let entry = facade
			.exchange(&scopes(), StdDuration::from_secs(5))
			.await
			.expect("Exchange should succeed.");
		let request = stub.last_request().expect("One request should be recorded.");

		assert_eq!(entry.access_token.expose(), "abc");
		assert_eq!(entry.token_type, "bearer");
		assert_eq!(entry.authority, AUTHORITY);
		assert_eq!(request.uri, format!("{AUTHORITY}/oauth2/v2.0/token"));
		assert_eq!(request.form("grant_type"), Some("client_credentials"));
		assert_eq!(request.form("client_id"), Some("facade-client"));
		assert_eq!(request.form("client_secret"), Some("s3cret"));
		assert_eq!(request.form("scope"), Some("api/.default"));
		assert_eq!(request.form("client_assertion"), None);
		assert!(request.authorization.is_none());
	}

	#[tokio::test]
	async fn secret_basic_uses_authorization_header() {
		let stub = StubHttpClient::new();

		stub.reply(200, r#"{"access_token":"abc","token_type":"bearer","expires_in":60}"#);

		let facade = facade(
			CredentialMaterial::secret("s3cret").expect("Secret should be accepted."),
			SecretAuthMethod::Basic,
			&stub,
		);

		facade
			.exchange(&scopes(), StdDuration::from_secs(5))
			.await
			.expect("Exchange should succeed.");

		let request = stub.last_request().expect("One request should be recorded.");

		assert_eq!(request.form("client_secret"), None);
		assert!(request.authorization.as_deref().is_some_and(|value| value.starts_with("Basic ")));
	}

	#[tokio::test]
	async fn prebuilt_assertion_is_sent_unmodified() {
		let stub = StubHttpClient::new();

		stub.reply(200, r#"{"access_token":"abc","token_type":"bearer","expires_in":60}"#);

		let facade = facade(
			CredentialMaterial::prebuilt_assertion("header.payload.signature")
				.expect("JWT should be accepted."),
			SecretAuthMethod::Basic,
			&stub,
		);

		facade
			.exchange(&scopes(), StdDuration::from_secs(5))
			.await
			.expect("Exchange should succeed.");

		let request = stub.last_request().expect("One request should be recorded.");

		assert_eq!(request.form("client_assertion"), Some("header.payload.signature"));
		assert_eq!(request.form("client_assertion_type"), Some(JWT_BEARER_ASSERTION_TYPE));
		assert_eq!(request.form("client_id"), Some("facade-client"));
		assert_eq!(request.form("client_secret"), None);
		assert!(request.authorization.is_none());
	}

	#[tokio::test]
	async fn certificate_builds_a_fresh_assertion_per_request() {
		let stub = StubHttpClient::new();

		stub.reply(200, r#"{"access_token":"abc","token_type":"bearer","expires_in":60}"#);

		let facade = facade(
			CredentialMaterial::certificate(rsa_certificate_fixture()),
			SecretAuthMethod::Post,
			&stub,
		);

		for _ in 0..2 {
			facade
				.exchange(&scopes(), StdDuration::from_secs(5))
				.await
				.expect("Exchange should succeed.");
		}

		let requests = stub.requests();
		let first = requests[0].form("client_assertion").expect("Assertion should be sent.");
		let second = requests[1].form("client_assertion").expect("Assertion should be sent.");

		assert_ne!(first, second);
		assert_eq!(first.split('.').count(), 3);
		assert_eq!(requests[0].form("client_assertion_type"), Some(JWT_BEARER_ASSERTION_TYPE));
	}

	#[tokio::test]
	async fn unusable_success_bodies_are_malformed() {
		let cases = [
			r#"{"access_token":"","token_type":"bearer","expires_in":60}"#,
			r#"{"access_token":"abc","token_type":"bearer"}"#,
			r#"{"access_token":"abc","token_type":"bearer","expires_in":0}"#,
			r#"{"token_type":"bearer","expires_in":60}"#,
			"not json",
		];

		for body in cases {
			let stub = StubHttpClient::new();

			stub.reply(200, body);

			let err = facade(
				CredentialMaterial::secret("s3cret").expect("Secret should be accepted."),
				SecretAuthMethod::Post,
				&stub,
			)
			.exchange(&scopes(), StdDuration::from_secs(5))
			.await
			.expect_err("Body should be rejected.");

			assert!(matches!(err, Error::MalformedResponse(_)), "{body}: {err:?}");
		}
	}

	#[tokio::test]
	async fn only_200_carries_a_token() {
		let stub = StubHttpClient::new();
		let facade = facade(
			CredentialMaterial::secret("s3cret").expect("Secret should be accepted."),
			SecretAuthMethod::Post,
			&stub,
		);

		stub.reply(201, r#"{"access_token":"abc","token_type":"bearer","expires_in":60}"#);

		let created = facade
			.exchange(&scopes(), StdDuration::from_secs(5))
			.await
			.expect_err("201 should not be accepted as a token response.");

		assert!(matches!(
			created,
			Error::MalformedResponse(MalformedResponseError::Parse { status: Some(201), .. })
		));

		stub.reply(204, "");

		let no_content = facade
			.exchange(&scopes(), StdDuration::from_secs(5))
			.await
			.expect_err("204 should not be accepted as a token response.");

		assert!(matches!(
			no_content,
			Error::MalformedResponse(MalformedResponseError::Unexpected { status: Some(204), .. })
		));
	}

	#[tokio::test]
	async fn failures_are_classified() {
		let stub = StubHttpClient::new();

		stub.reply(400, r#"{"error":"invalid_scope","error_description":"unknown scope"}"#);

		let facade = facade(
			CredentialMaterial::secret("s3cret").expect("Secret should be accepted."),
			SecretAuthMethod::Post,
			&stub,
		);
		let denied = facade
			.exchange(&scopes(), StdDuration::from_secs(5))
			.await
			.expect_err("400 should fail.");

		assert!(matches!(
			denied,
			Error::AuthorizationDenied { ref code, status: Some(400), .. } if code == "invalid_scope"
		));

		stub.reply(503, "");

		let unavailable = facade
			.exchange(&scopes(), StdDuration::from_secs(5))
			.await
			.expect_err("503 should fail.");

		assert!(unavailable.is_transient());

		stub.fail("connection reset");

		let network = facade
			.exchange(&scopes(), StdDuration::from_secs(5))
			.await
			.expect_err("Transport failure should fail.");

		assert!(matches!(network, Error::Transient(TransientError::Network { .. })));
	}
}
