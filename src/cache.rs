//! In-memory token cache keyed by client, authority, and normalized scopes.
//!
//! Freshness is checked lazily on [`TokenCache::lookup`]; expired entries stay in the
//! cache until they are replaced, invalidated, or evicted by the optional capacity bound.
//! Entries are replaced whole, so readers never observe a token paired with another
//! response's expiry.

pub mod entry;

pub use entry::*;

// std
use std::num::NonZeroUsize;
// crates.io
use moka::{policy::EvictionPolicy, sync::Cache};
// self
use crate::{
	_prelude::*,
	auth::{ClientId, ScopeSet},
};

/// Default margin subtracted from `expires_at` before an entry counts as stale.
pub const DEFAULT_EXPIRY_SKEW: Duration = Duration::minutes(5);

/// Identity of a cached token: client id, canonical authority, and scope fingerprint.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CacheKey {
	/// Client identifier.
	pub client_id: ClientId,
	/// Canonical authority string.
	pub authority: String,
	/// Fingerprint of the normalized scope set.
	pub scope_fingerprint: String,
}
impl CacheKey {
	/// Builds the key for a request. Permutations of the same scopes yield equal keys.
	pub fn new(client_id: &ClientId, authority: &str, scopes: &ScopeSet) -> Self {
		Self {
			client_id: client_id.clone(),
			authority: authority.to_owned(),
			scope_fingerprint: scopes.fingerprint().to_owned(),
		}
	}
}

/// Thread-safe token cache with optional least-recently-used eviction.
pub struct TokenCache {
	entries: Cache<CacheKey, TokenCacheEntry>,
	capacity: Option<NonZeroUsize>,
	skew: Duration,
}
impl TokenCache {
	/// Creates an unbounded cache using [`DEFAULT_EXPIRY_SKEW`].
	pub fn new() -> Self {
		Self::default()
	}

	/// Overrides the expiry skew.
	pub fn with_expiry_skew(mut self, skew: Duration) -> Self {
		self.skew = skew;

		self
	}

	/// Bounds the number of entries; `None` keeps the cache unbounded.
	///
	/// Meant for freshly built caches: entries stored before the call are dropped.
	pub fn with_capacity(mut self, capacity: Option<NonZeroUsize>) -> Self {
		self.entries = entries(capacity);
		self.capacity = capacity;

		self
	}

	/// Configured expiry skew.
	pub fn expiry_skew(&self) -> Duration {
		self.skew
	}

	/// Configured capacity bound.
	pub fn capacity(&self) -> Option<NonZeroUsize> {
		self.capacity
	}

	/// Returns the entry for `key` if it is still fresh.
	pub fn lookup(&self, key: &CacheKey) -> Option<TokenCacheEntry> {
		self.lookup_at(key, OffsetDateTime::now_utc())
	}

	/// Returns the entry for `key` if it is fresh at `now`.
	pub fn lookup_at(&self, key: &CacheKey, now: OffsetDateTime) -> Option<TokenCacheEntry> {
		self.entries.get(key).filter(|entry| entry.is_fresh_at(now, self.skew))
	}

	/// Inserts or replaces the entry for `key`; beyond capacity the least recently used
	/// entries are evicted.
	pub fn store(&self, key: CacheKey, entry: TokenCacheEntry) {
		self.entries.insert(key, entry);
	}

	/// Removes the entry for `key`, returning it when present.
	pub fn invalidate(&self, key: &CacheKey) -> Option<TokenCacheEntry> {
		self.entries.remove(key)
	}

	/// Number of stored entries, fresh or not.
	pub fn len(&self) -> usize {
		self.entries.run_pending_tasks();

		usize::try_from(self.entries.entry_count()).unwrap_or(usize::MAX)
	}

	/// Returns `true` when no entries are stored.
	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	/// Drops every entry.
	pub fn clear(&self) {
		self.entries.invalidate_all();
	}
}
impl Default for TokenCache {
	fn default() -> Self {
		Self { entries: entries(None), capacity: None, skew: DEFAULT_EXPIRY_SKEW }
	}
}
impl Debug for TokenCache {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenCache")
			.field("entries", &self.entries.entry_count())
			.field("capacity", &self.capacity)
			.field("skew", &self.skew)
			.finish()
	}
}

fn entries(capacity: Option<NonZeroUsize>) -> Cache<CacheKey, TokenCacheEntry> {
	let builder = Cache::builder().eviction_policy(EvictionPolicy::lru());

	match capacity {
		Some(capacity) =>
			builder.max_capacity(u64::try_from(capacity.get()).unwrap_or(u64::MAX)).build(),
		None => builder.build(),
	}
}
