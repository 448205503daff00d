//! Per-call request parameters and the acquisition result.

// self
use crate::{
	_prelude::*,
	auth::{ScopeSet, SecretString},
	cache::TokenCacheEntry,
	error::ConfigError,
};

/// Parameters of one acquisition call.
#[derive(Clone, Debug)]
pub struct AcquireTokenRequest {
	/// Normalized scopes to request.
	pub scopes: ScopeSet,
	/// Skips the cache lookup when true; the fresh token still replaces the cached one.
	pub force_refresh: bool,
	/// Overrides the client's default request timeout.
	pub timeout: Option<Duration>,
}
impl AcquireTokenRequest {
	/// Normalizes `scopes` into a request.
	pub fn new<I, S>(scopes: I) -> Result<Self, ConfigError>
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		Ok(Self::from_scopes(ScopeSet::new(scopes)?))
	}

	/// Wraps an already normalized scope set.
	pub fn from_scopes(scopes: ScopeSet) -> Self {
		Self { scopes, force_refresh: false, timeout: None }
	}

	/// Bypasses the cache for this call.
	pub fn force_refresh(mut self) -> Self {
		self.force_refresh = true;

		self
	}

	/// Overrides the request timeout for this call.
	pub fn with_timeout(mut self, timeout: Duration) -> Self {
		self.timeout = Some(timeout);

		self
	}
}

/// Where an [`AuthResult`] came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TokenSource {
	/// Served from the token cache without network I/O.
	Cache,
	/// Issued by the token endpoint during this call (or a call it joined).
	IdentityProvider,
}

/// Access token handed back to callers.
#[derive(Clone)]
pub struct AuthResult {
	/// Access token secret; callers must avoid logging it.
	pub access_token: SecretString,
	/// Token type reported by the endpoint.
	pub token_type: String,
	/// Absolute expiry.
	pub expires_at: OffsetDateTime,
	/// Scopes the token was requested for.
	pub scopes: ScopeSet,
	/// Whether the token came from the cache or the endpoint.
	pub source: TokenSource,
}
impl AuthResult {
	pub(crate) fn from_entry(entry: TokenCacheEntry, source: TokenSource) -> Self {
		Self {
			access_token: entry.access_token,
			token_type: entry.token_type,
			expires_at: entry.expires_at,
			scopes: entry.scopes,
			source,
		}
	}

	/// `Authorization` header value, e.g. `Bearer eyJ...`.
	pub fn authorization_header(&self) -> String {
		let scheme = if self.token_type.eq_ignore_ascii_case("bearer") {
			"Bearer"
		} else {
			self.token_type.as_str()
		};

		format!("{scheme} {}", self.access_token.expose())
	}
}
impl Debug for AuthResult {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("AuthResult")
			.field("access_token", &self.access_token)
			.field("token_type", &self.token_type)
			.field("expires_at", &self.expires_at)
			.field("scopes", &self.scopes)
			.field("source", &self.source)
			.finish()
	}
}
