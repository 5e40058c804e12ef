// std
use std::sync::atomic::{AtomicU64, Ordering::Relaxed};

/// Counts what one credential's refreshes did: exchanges started, tokens cached, errors returned.
///
/// Cache hits are not counted; a credential serving every request from its cache reports zero
/// exchanges.
#[derive(Debug, Default)]
pub struct RefreshMetrics {
	exchanges: AtomicU64,
	cached: AtomicU64,
	errors: AtomicU64,
}
impl RefreshMetrics {
	/// Calls made to the token exchange.
	pub fn exchanges(&self) -> u64 {
		self.exchanges.load(Relaxed)
	}

	/// Refreshed tokens written to the cache.
	pub fn cached(&self) -> u64 {
		self.cached.load(Relaxed)
	}

	/// Refreshes that ended in an error returned to the caller.
	pub fn errors(&self) -> u64 {
		self.errors.load(Relaxed)
	}

	pub(crate) fn record_exchange(&self) {
		self.exchanges.fetch_add(1, Relaxed);
	}

	pub(crate) fn record_cached(&self) {
		self.cached.fetch_add(1, Relaxed);
	}

	pub(crate) fn record_error(&self) {
		self.errors.fetch_add(1, Relaxed);
	}
}
