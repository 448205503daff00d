//! Coalesces concurrent cache misses for one key into a single token request.
//!
//! The map holds weak handles only, so the shared request lives exactly as long as its
//! waiters: when the last waiter is dropped the request is dropped with it and the stale
//! slot is cleared. Lock order is in-flight map, then cache; the leader stores into the
//! cache before it clears its slot and never holds both locks.
//!
//! Each slot carries the generation of the request that owns it. Guards compare
//! generations instead of upgrading handles, so no request is ever dropped while the map
//! lock is held.

// crates.io
use futures::future::{BoxFuture, FutureExt, Shared, WeakShared};
// self
use crate::{
	_prelude::*,
	cache::{CacheKey, TokenCacheEntry},
};

type ExchangeFuture = BoxFuture<'static, Result<TokenCacheEntry>>;

/// Token request shared by every caller waiting on one key.
pub(crate) type SharedExchange = Shared<ExchangeFuture>;

/// How a caller was admitted for a key.
pub(crate) enum Admission {
	/// A fresh cached entry was found.
	Cached(TokenCacheEntry),
	/// Another caller's request is already in flight.
	Joined(SharedExchange),
	/// This caller started the request.
	Started(SharedExchange),
}

struct Slot {
	generation: u64,
	exchange: WeakShared<ExchangeFuture>,
}

#[derive(Default)]
struct Flights {
	next_generation: u64,
	slots: HashMap<CacheKey, Slot>,
}
impl Flights {
	fn release(&mut self, key: &CacheKey, generation: u64) {
		if self.slots.get(key).is_some_and(|slot| slot.generation == generation) {
			self.slots.remove(key);
		}
	}
}

/// Registry of token requests currently in flight.
#[derive(Clone, Default)]
pub(crate) struct InFlight(Arc<Mutex<Flights>>);
impl InFlight {
	/// Checks the cache, then the registry, and otherwise starts a new request, all under
	/// one lock so a finishing leader can never be missed.
	pub(crate) fn admit<L, S>(&self, key: &CacheKey, lookup: L, start: S) -> Admission
	where
		L: FnOnce() -> Option<TokenCacheEntry>,
		S: FnOnce(FlightGuard) -> ExchangeFuture,
	{
		let mut flights = self.0.lock();

		if let Some(entry) = lookup() {
			return Admission::Cached(entry);
		}
		if let Some(shared) = flights.slots.get(key).and_then(|slot| slot.exchange.upgrade()) {
			return Admission::Joined(shared);
		}

		let generation = flights.next_generation;

		flights.next_generation += 1;

		let guard = FlightGuard { in_flight: self.clone(), key: key.clone(), generation };
		let shared = start(guard).shared();

		if let Some(exchange) = shared.downgrade() {
			flights.slots.insert(key.clone(), Slot { generation, exchange });
		}

		Admission::Started(shared)
	}

	#[cfg(test)]
	fn len(&self) -> usize {
		self.0.lock().slots.len()
	}
}

/// Owned by the leader's request; clears the registry slot when the request ends or is
/// dropped by its last waiter.
pub(crate) struct FlightGuard {
	in_flight: InFlight,
	key: CacheKey,
	generation: u64,
}
impl FlightGuard {
	/// Clears the slot after the result has been stored.
	pub(crate) fn finish(self) {
		drop(self);
	}
}
impl Drop for FlightGuard {
	fn drop(&mut self) {
		// A newer request may already own the slot.
		self.in_flight.0.lock().release(&self.key, self.generation);
	}
}
