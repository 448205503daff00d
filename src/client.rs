//! Token acquisition client for one confidential client registration.
//!
//! Every call walks the same path: check the cache, authenticate the client (secret,
//! fresh certificate assertion, or caller-built assertion), send one client credentials
//! request, classify the response, and store the token before returning it. Concurrent
//! misses for one cache key share a single in-flight request; failures never touch the
//! cache, and no call is retried internally.

pub mod config;
pub mod request;

mod metrics;
mod singleflight;

pub use config::*;
pub use metrics::*;
pub use request::*;

// std
use std::{pin::pin, time::Duration as StdDuration};
// crates.io
use futures::future::{self, BoxFuture, Either, FutureExt};
// self
use crate::{
	_prelude::*,
	auth::{ClientId, ScopeSet},
	authority::{Authority, AuthorityResolver},
	cache::{CacheKey, TokenCache, TokenCacheEntry},
	client::singleflight::{Admission, FlightGuard, InFlight},
	credential::CredentialKind,
	error::{ConfigError, TransientError},
	http::TokenHttpClient,
	oauth::{TokenEndpointFacade, TransportErrorMapper},
	obs::{self, AcquireOutcome, AcquireSpan},
};
#[cfg(feature = "reqwest")]
use crate::{http::ReqwestHttpClient, oauth::ReqwestTransportErrorMapper};

#[cfg(feature = "reqwest")]
/// Client specialized for the crate's default reqwest transport stack.
pub type ReqwestTokenClient = TokenClient<ReqwestHttpClient, ReqwestTransportErrorMapper>;

/// Acquires and caches access tokens for one client id, credential, and authority.
///
/// Cloning is cheap; clones share the cache, metrics, and in-flight requests.
pub struct TokenClient<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	inner: Arc<ClientInner<C, M>>,
}
impl<C, M> TokenClient<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Validates `config` and builds a client on the caller-provided transport + mapper pair.
	///
	/// Authority, credential, and certificate problems are reported here, before any
	/// network activity.
	pub fn with_http_client(
		config: ClientConfig,
		http_client: impl Into<Arc<C>>,
		mapper: impl Into<Arc<M>>,
	) -> Result<Self> {
		let ClientConfig { client_id, credential, authority, options, token_cache } = config;
		let authority =
			AuthorityResolver::new().with_token_path(&options.token_path).resolve(&authority)?;

		options.validate()?;
		credential.validate()?;

		let cache = match token_cache {
			Some(cache) => {
				config::validate_expiry_skew(cache.expiry_skew())?;

				cache
			},
			None => Arc::new(
				TokenCache::new()
					.with_expiry_skew(options.expiry_skew)
					.with_capacity(options.cache_capacity),
			),
		};
		let facade = TokenEndpointFacade::new(
			client_id,
			authority,
			credential,
			options.secret_auth_method,
			http_client.into(),
			mapper.into(),
		)?;

		Ok(Self {
			inner: Arc::new(ClientInner {
				facade,
				cache,
				timeout: options.timeout,
				metrics: Default::default(),
				in_flight: Default::default(),
			}),
		})
	}

	/// Client identifier.
	pub fn client_id(&self) -> &ClientId {
		self.inner.facade.client_id()
	}

	/// Resolved authority.
	pub fn authority(&self) -> &Authority {
		self.inner.facade.authority()
	}

	/// Credential variant used to authenticate.
	pub fn credential_kind(&self) -> CredentialKind {
		self.inner.facade.credential_kind()
	}

	/// Token cache backing this client.
	pub fn cache(&self) -> &Arc<TokenCache> {
		&self.inner.cache
	}

	/// Acquisition counters for this client and its clones.
	pub fn metrics(&self) -> &AcquisitionMetrics {
		&self.inner.metrics
	}

	/// Returns a token for `scopes`, from the cache when a fresh one exists.
	pub async fn acquire_token<I, S>(&self, scopes: I) -> Result<AuthResult>
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		let request = AcquireTokenRequest::new(scopes)?;

		self.acquire(request).await
	}

	/// Runs one acquisition described by `request`.
	pub async fn acquire(&self, request: AcquireTokenRequest) -> Result<AuthResult> {
		self.acquire_with_cancellation(request, future::pending()).await
	}

	/// Runs one acquisition that gives up with [`Error::Cancelled`] once `cancel` resolves.
	///
	/// Cancelling detaches only this caller: a request shared with other callers keeps
	/// running for them and is dropped once its last waiter is gone.
	pub async fn acquire_with_cancellation<F>(
		&self,
		request: AcquireTokenRequest,
		cancel: F,
	) -> Result<AuthResult>
	where
		F: Future<Output = ()>,
	{
		let kind = self.credential_kind();
		let span = AcquireSpan::new(self.client_id(), kind);

		self.inner.metrics.record_attempt();
		obs::record_acquire_outcome(kind, AcquireOutcome::Attempt);

		let result = span
			.instrument(async move {
				let acquire = pin!(self.acquire_inner(request));
				let cancel = pin!(cancel);

				match future::select(acquire, cancel).await {
					Either::Left((result, _)) => result,
					Either::Right(((), _)) => Err(Error::Cancelled),
				}
			})
			.await;

		match &result {
			Ok(_) => {
				self.inner.metrics.record_success();
				obs::record_acquire_outcome(kind, AcquireOutcome::Success);
			},
			Err(e) => {
				self.inner.metrics.record_failure();
				obs::record_acquire_outcome(kind, AcquireOutcome::Failure);
				obs::trace_acquire_failure(e);
			},
		}

		result
	}

	/// Drops the cached token for `scopes`, e.g. after a resource server rejected it.
	///
	/// Returns `true` when an entry was removed.
	pub fn invalidate<I, S>(&self, scopes: I) -> Result<bool>
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		let scopes = ScopeSet::new(scopes).map_err(ConfigError::from)?;

		Ok(self.inner.cache.invalidate(&self.cache_key(&scopes)).is_some())
	}

	fn cache_key(&self, scopes: &ScopeSet) -> CacheKey {
		CacheKey::new(self.client_id(), self.authority().as_str(), scopes)
	}

	async fn acquire_inner(&self, request: AcquireTokenRequest) -> Result<AuthResult> {
		if request.scopes.is_empty() {
			return Err(ConfigError::EmptyScope.into());
		}

		let key = self.cache_key(&request.scopes);
		let timeout = config::transport_timeout(request.timeout.unwrap_or(self.inner.timeout))?;
		let admission = self.inner.in_flight.admit(
			&key,
			|| if request.force_refresh { None } else { self.inner.cache.lookup(&key) },
			|guard| self.start_exchange(request.scopes.clone(), timeout, guard),
		);
		let entry = match admission {
			Admission::Cached(entry) => {
				self.record_progress(AcquireOutcome::CacheHit);

				return Ok(AuthResult::from_entry(entry, TokenSource::Cache));
			},
			Admission::Joined(shared) => {
				self.record_progress(AcquireOutcome::Coalesced);

				// The leader's transport deadline may be longer than ours; giving up drops only
				// this waiter's handle.
				tokio::time::timeout(timeout, shared)
					.await
					.map_err(|_| Error::from(TransientError::Timeout))??
			},
			Admission::Started(shared) => shared.await?,
		};

		Ok(AuthResult::from_entry(entry, TokenSource::IdentityProvider))
	}

	fn start_exchange(
		&self,
		scopes: ScopeSet,
		timeout: StdDuration,
		guard: FlightGuard,
	) -> BoxFuture<'static, Result<TokenCacheEntry>> {
		let inner = self.inner.clone();

		self.record_progress(AcquireOutcome::Network);

		async move {
			let result = inner.facade.exchange(&scopes, timeout).await;

			if let Ok(entry) = &result {
				inner.cache.store(entry.key(), entry.clone());
			}

			guard.finish();

			result
		}
		.boxed()
	}

	fn record_progress(&self, outcome: AcquireOutcome) {
		match outcome {
			AcquireOutcome::CacheHit => self.inner.metrics.record_cache_hit(),
			AcquireOutcome::Coalesced => self.inner.metrics.record_coalesced(),
			AcquireOutcome::Network => self.inner.metrics.record_network_call(),
			_ => {},
		}

		obs::record_acquire_outcome(self.credential_kind(), outcome);
		obs::trace_acquire_outcome(outcome);
	}
}
#[cfg(feature = "reqwest")]
impl TokenClient<ReqwestHttpClient, ReqwestTransportErrorMapper> {
	/// Creates a client that provisions its own reqwest-backed transport.
	pub fn new(config: ClientConfig) -> Result<Self> {
		Self::with_http_client(
			config,
			ReqwestHttpClient::new()?,
			Arc::new(ReqwestTransportErrorMapper),
		)
	}
}
impl<C, M> Clone for TokenClient<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn clone(&self) -> Self {
		Self { inner: self.inner.clone() }
	}
}
impl<C, M> Debug for TokenClient<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenClient")
			.field("client_id", self.client_id())
			.field("authority", &self.authority().as_str())
			.field("credential", &self.credential_kind())
			.field("timeout", &self.inner.timeout)
			.finish()
	}
}

struct ClientInner<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	facade: TokenEndpointFacade<C, M>,
	cache: Arc<TokenCache>,
	timeout: Duration,
	metrics: AcquisitionMetrics,
	in_flight: InFlight,
}
