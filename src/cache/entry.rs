//! Immutable cache entries and their builder.

// self
use crate::{
	_prelude::*,
	auth::{ClientId, ScopeSet, SecretString},
	cache::CacheKey,
};

/// Errors produced by [`TokenCacheEntryBuilder`].
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum TokenEntryBuilderError {
	/// Issued when no access token value was provided.
	#[error("Access token is required.")]
	MissingAccessToken,
	/// Issued when no expiry (absolute or relative) was configured.
	#[error("Expiry must be supplied via expires_at or expires_in.")]
	MissingExpiry,
	/// Issued when the expiry does not fit the supported time range.
	#[error("Expiry exceeds the supported time range.")]
	ExpiryOutOfRange,
}

/// Access token issued for one (client id, authority, scopes) triple.
#[derive(Clone)]
pub struct TokenCacheEntry {
	/// Client the token was issued to.
	pub client_id: ClientId,
	/// Canonical authority the token came from.
	pub authority: String,
	/// Normalized scopes the token was requested for.
	pub scopes: ScopeSet,
	/// Access token secret; callers must avoid logging it.
	pub access_token: SecretString,
	/// Token type reported by the endpoint (usually `bearer`).
	pub token_type: String,
	/// Instant the response was received.
	pub issued_at: OffsetDateTime,
	/// Absolute expiry derived from `issued_at + expires_in`.
	pub expires_at: OffsetDateTime,
}
impl TokenCacheEntry {
	/// Returns a builder for the given cache identity.
	pub fn builder(
		client_id: ClientId,
		authority: impl Into<String>,
		scopes: ScopeSet,
	) -> TokenCacheEntryBuilder {
		TokenCacheEntryBuilder::new(client_id, authority.into(), scopes)
	}

	/// Cache key this entry is stored under.
	pub fn key(&self) -> CacheKey {
		CacheKey::new(&self.client_id, &self.authority, &self.scopes)
	}

	/// Returns `true` while `now` is earlier than `expires_at - skew`.
	pub fn is_fresh_at(&self, now: OffsetDateTime, skew: Duration) -> bool {
		self.expires_at.checked_sub(skew).is_some_and(|deadline| now < deadline)
	}

	/// Time left until `expires_at`, saturating at zero.
	pub fn remaining_at(&self, now: OffsetDateTime) -> Duration {
		(self.expires_at - now).max(Duration::ZERO)
	}
}
impl Debug for TokenCacheEntry {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenCacheEntry")
			.field("client_id", &self.client_id)
			.field("authority", &self.authority)
			.field("scopes", &self.scopes)
			.field("access_token", &"<redacted>")
			.field("token_type", &self.token_type)
			.field("issued_at", &self.issued_at)
			.field("expires_at", &self.expires_at)
			.finish()
	}
}

/// Builder for [`TokenCacheEntry`].
#[derive(Clone, Debug)]
pub struct TokenCacheEntryBuilder {
	client_id: ClientId,
	authority: String,
	scopes: ScopeSet,
	access_token: Option<SecretString>,
	token_type: Option<String>,
	issued_at: Option<OffsetDateTime>,
	expires_at: Option<OffsetDateTime>,
	expires_in: Option<Duration>,
}
impl TokenCacheEntryBuilder {
	fn new(client_id: ClientId, authority: String, scopes: ScopeSet) -> Self {
		Self {
			client_id,
			authority,
			scopes,
			access_token: None,
			token_type: None,
			issued_at: None,
			expires_at: None,
			expires_in: None,
		}
	}

	/// Provides the access token value.
	pub fn access_token(mut self, token: impl Into<String>) -> Self {
		self.access_token = Some(SecretString::new(token));

		self
	}

	/// Sets the token type; defaults to `bearer`.
	pub fn token_type(mut self, token_type: impl Into<String>) -> Self {
		self.token_type = Some(token_type.into());

		self
	}

	/// Sets the issued-at instant; defaults to the current clock.
	pub fn issued_at(mut self, instant: OffsetDateTime) -> Self {
		self.issued_at = Some(instant);

		self
	}

	/// Sets an absolute expiry instant.
	pub fn expires_at(mut self, instant: OffsetDateTime) -> Self {
		self.expires_at = Some(instant);

		self
	}

	/// Sets a relative expiry duration from the issued instant.
	pub fn expires_in(mut self, duration: Duration) -> Self {
		self.expires_in = Some(duration);

		self
	}

	/// Consumes the builder and produces a [`TokenCacheEntry`].
	pub fn build(self) -> Result<TokenCacheEntry, TokenEntryBuilderError> {
		let access_token = self.access_token.ok_or(TokenEntryBuilderError::MissingAccessToken)?;
		let issued_at = self.issued_at.unwrap_or_else(OffsetDateTime::now_utc);
		let expires_at = match (self.expires_at, self.expires_in) {
			(Some(instant), _) => instant,
			(None, Some(delta)) =>
				issued_at.checked_add(delta).ok_or(TokenEntryBuilderError::ExpiryOutOfRange)?,
			(None, None) => return Err(TokenEntryBuilderError::MissingExpiry),
		};

		Ok(TokenCacheEntry {
			client_id: self.client_id,
			authority: self.authority,
			scopes: self.scopes,
			access_token,
			token_type: self.token_type.unwrap_or_else(|| "bearer".into()),
			issued_at,
			expires_at,
		})
	}
}
