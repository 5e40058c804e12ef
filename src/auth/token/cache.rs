//! Lock-guarded token slot embedded in every caching credential.

// self
use crate::{_prelude::*, auth::token::Token, error::ArgumentError};

/// Pairs a [`Token`] with a short-critical-section lock.
///
/// Every read copies the whole token out and every write copies a whole token in, both under the
/// lock, so value and expiry are always observed together. The lock is never held across a
/// network call; refreshes happen outside and publish their result through [`TokenCache::set`].
pub struct TokenCache {
	token: Mutex<Token>,
}
impl TokenCache {
	/// Creates a cache holding the never-fetched sentinel.
	pub fn new() -> Self {
		Self { token: Mutex::new(Token::empty()) }
	}

	/// Returns a copy of the cached token, or `None` if nothing has been fetched yet.
	pub fn get(&self) -> Option<Token> {
		let token = *self.token.lock();

		(!token.is_never_fetched()).then_some(token)
	}

	/// Validates and stores a new token, returning the copy that was written.
	///
	/// Oversized or header-unsafe values are rejected before the lock is taken, so the previous
	/// token stays in place.
	pub fn set(
		&self,
		value: impl AsRef<[u8]>,
		expires_at_msec: i64,
	) -> Result<Token, ArgumentError> {
		let token = Token::new(value, expires_at_msec)?;

		self.store(token);

		Ok(token)
	}

	/// Overwrites the cached token with an already validated one.
	pub fn store(&self, token: Token) {
		*self.token.lock() = token;
	}

	/// Resets the cache to the never-fetched sentinel.
	pub fn clear(&self) {
		self.store(Token::empty());
	}
}
impl Default for TokenCache {
	fn default() -> Self {
		Self::new()
	}
}
impl Debug for TokenCache {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		let token = *self.token.lock();

		f.debug_struct("TokenCache")
			.field("fetched", &!token.is_never_fetched())
			.field("expires_at_msec", &token.expires_at_msec())
			.finish()
	}
}

#[cfg(test)]
mod tests {
	// std
	use std::thread;
	// self
	use super::*;
	use crate::auth::token::TOKEN_BUF_SIZE;

	#[test]
	fn get_returns_none_until_first_set() {
		let cache = TokenCache::new();

		assert!(cache.get().is_none());

		let written = cache.set("first", 1_000).expect("Valid token should be stored.");
		let read = cache.get().expect("Token should be present after set.");

		assert_eq!(read, written);
		assert_eq!(read.as_str(), "first");
		assert_eq!(read.expires_at_msec(), 1_000);

		cache.clear();

		assert!(cache.get().is_none());
	}

	#[test]
	fn oversized_set_leaves_previous_token() {
		let cache = TokenCache::new();

		cache.set("kept", 5_000).expect("Valid token should be stored.");

		let err = cache
			.set(vec![b'x'; TOKEN_BUF_SIZE + 1], 9_000)
			.expect_err("Oversized token must be rejected.");

		assert!(matches!(err, ArgumentError::TokenTooLarge { .. }));

		let current = cache.get().expect("Previous token should remain cached.");

		assert_eq!(current.as_str(), "kept");
		assert_eq!(current.expires_at_msec(), 5_000);
	}

	#[test]
	fn successful_set_is_always_visible() {
		let cache = TokenCache::new();

		cache.set("kept", 5_000).expect("Valid token should be stored.");

		let err = cache.set("hidden", 0).expect_err("The never-fetched expiry must be rejected.");

		assert!(matches!(err, ArgumentError::ReservedExpiry { expires_at_msec: 0 }));
		assert_eq!(cache.get().map(|token| token.expires_at_msec()), Some(5_000));

		let written = cache.set("visible", -1).expect("Any other expiry should be stored.");

		assert_eq!(cache.get(), Some(written));
	}

	#[test]
	fn concurrent_get_and_set_never_tear() {
		const WRITERS: i64 = 4;
		const ROUNDS: i64 = 2_000;

		let cache = Arc::new(TokenCache::new());
		let writers = (1..=WRITERS)
			.map(|writer| {
				let cache = cache.clone();

				thread::spawn(move || {
					for round in 1..=ROUNDS {
						let expiry = writer * 1_000_000 + round;
						// Vary the length too so a torn copy would also show up as a length mismatch.
						let value = format!("{expiry}-{}", "v".repeat((round % 64) as usize));

						cache.set(value, expiry).expect("Writer token should be valid.");
					}
				})
			})
			.collect::<Vec<_>>();
		let readers = (0..4)
			.map(|_| {
				let cache = cache.clone();

				thread::spawn(move || {
					for _ in 0..ROUNDS {
						if let Some(token) = cache.get() {
							let expiry = token.expires_at_msec();
							let expected =
								format!("{expiry}-{}", "v".repeat((expiry % 1_000_000 % 64) as usize));

							assert_eq!(token.as_str(), expected, "Snapshot mixed two writes.");
						}
					}
				})
			})
			.collect::<Vec<_>>();

		for handle in writers.into_iter().chain(readers) {
			handle.join().expect("Cache worker thread should not panic.");
		}
	}
}
