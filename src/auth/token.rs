//! Fixed-capacity bearer token buffer and its freshness states.
//!
//! A [`Token`] stores the access token bytes inline (no heap allocation) next to the expiry
//! instant expressed in milliseconds since the Unix epoch. Tokens are copied in and out of a
//! [`TokenCache`] wholesale, so a reader never observes a value from one refresh paired with the
//! expiry from another.

pub mod cache;
pub mod policy;

pub use cache::*;
pub use policy::*;

// crates.io
use oauth2::http::HeaderValue;
// self
use crate::{_prelude::*, error::ArgumentError};

/// Maximum size of a stored token value in bytes.
pub const TOKEN_BUF_SIZE: usize = 2 * 1024;

const NEVER_FETCHED_MSEC: i64 = 0;
const BEARER_PREFIX: &[u8] = b"Bearer ";

/// Freshness of a token relative to an instant and a refresh margin.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TokenStatus {
	/// Nothing has been fetched yet.
	Missing,
	/// The expiry instant has passed.
	Expired,
	/// Still valid, but inside the refresh margin.
	Expiring,
	/// Valid beyond the refresh margin.
	Active,
}
impl TokenStatus {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			TokenStatus::Missing => "missing",
			TokenStatus::Expired => "expired",
			TokenStatus::Expiring => "expiring",
			TokenStatus::Active => "active",
		}
	}

	/// Only [`TokenStatus::Active`] tokens may be attached without refreshing.
	pub const fn is_fresh(self) -> bool {
		matches!(self, TokenStatus::Active)
	}
}
impl Display for TokenStatus {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Bearer token stored inline with its expiry.
#[derive(Clone, Copy)]
pub struct Token {
	expires_at_msec: i64,
	len: u16,
	bytes: [u8; TOKEN_BUF_SIZE],
}
impl Token {
	/// The "never fetched" sentinel: empty value, expiry `0`.
	pub const fn empty() -> Self {
		Self { expires_at_msec: NEVER_FETCHED_MSEC, len: 0, bytes: [0; TOKEN_BUF_SIZE] }
	}

	/// Copies `value` into a new token expiring at `expires_at_msec` (Unix milliseconds).
	pub fn new(value: impl AsRef<[u8]>, expires_at_msec: i64) -> Result<Self, ArgumentError> {
		let value = value.as_ref();

		if value.len() > TOKEN_BUF_SIZE {
			return Err(ArgumentError::TokenTooLarge { len: value.len(), capacity: TOKEN_BUF_SIZE });
		}
		if value.is_empty() || !value.iter().all(u8::is_ascii_graphic) {
			return Err(ArgumentError::InvalidTokenEncoding);
		}
		if expires_at_msec == NEVER_FETCHED_MSEC {
			return Err(ArgumentError::ReservedExpiry { expires_at_msec });
		}

		let mut token = Self::empty();

		token.bytes[..value.len()].copy_from_slice(value);
		// Bounded by `TOKEN_BUF_SIZE`, which fits in `u16`.
		token.len = value.len() as u16;
		token.expires_at_msec = expires_at_msec;

		Ok(token)
	}

	/// Same as [`Token::new`] with the expiry given as an instant.
	pub fn with_expiry(
		value: impl AsRef<[u8]>,
		expires_at: OffsetDateTime,
	) -> Result<Self, ArgumentError> {
		Self::new(value, unix_msec(expires_at))
	}

	/// Raw token bytes.
	pub fn value(&self) -> &[u8] {
		&self.bytes[..usize::from(self.len)]
	}

	/// Token bytes as text; tokens only ever hold visible ASCII.
	pub fn as_str(&self) -> &str {
		std::str::from_utf8(self.value()).unwrap_or_default()
	}

	/// Expiry in milliseconds since the Unix epoch; `0` when never fetched.
	pub fn expires_at_msec(&self) -> i64 {
		self.expires_at_msec
	}

	/// Expiry as an instant, or `None` for the never-fetched sentinel.
	pub fn expires_at(&self) -> Option<OffsetDateTime> {
		if self.is_never_fetched() {
			return None;
		}

		OffsetDateTime::from_unix_timestamp_nanos(i128::from(self.expires_at_msec) * 1_000_000)
			.ok()
	}

	/// Returns `true` for the sentinel produced by [`Token::empty`].
	pub fn is_never_fetched(&self) -> bool {
		self.expires_at_msec == NEVER_FETCHED_MSEC
	}

	/// Computes the freshness at `now`, treating tokens that expire within `margin` as
	/// [`TokenStatus::Expiring`].
	pub fn status_at(&self, now: OffsetDateTime, margin: Duration) -> TokenStatus {
		if self.is_never_fetched() {
			return TokenStatus::Missing;
		}

		let now_msec = unix_msec(now);

		if self.expires_at_msec <= now_msec {
			return TokenStatus::Expired;
		}

		let margin_msec = i64::try_from(margin.whole_milliseconds()).unwrap_or(i64::MAX).max(0);

		if self.expires_at_msec.saturating_sub(now_msec) <= margin_msec {
			TokenStatus::Expiring
		} else {
			TokenStatus::Active
		}
	}

	/// Renders the `Authorization` header value `Bearer <token>`.
	pub fn authorization_value(&self) -> Result<HeaderValue, ArgumentError> {
		let mut buf = [0_u8; BEARER_PREFIX.len() + TOKEN_BUF_SIZE];
		let value = self.value();
		let end = BEARER_PREFIX.len() + value.len();

		buf[..BEARER_PREFIX.len()].copy_from_slice(BEARER_PREFIX);
		buf[BEARER_PREFIX.len()..end].copy_from_slice(value);

		let mut header = HeaderValue::from_bytes(&buf[..end])
			.map_err(|e| ArgumentError::HttpRequest(e.into()))?;

		header.set_sensitive(true);

		Ok(header)
	}
}
impl Default for Token {
	fn default() -> Self {
		Self::empty()
	}
}
impl PartialEq for Token {
	fn eq(&self, other: &Self) -> bool {
		self.expires_at_msec == other.expires_at_msec && self.value() == other.value()
	}
}
impl Eq for Token {}
impl Debug for Token {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Token")
			.field("value", &"<redacted>")
			.field("len", &self.len)
			.field("expires_at_msec", &self.expires_at_msec)
			.finish()
	}
}
impl Display for Token {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("<redacted>")
	}
}

/// Milliseconds since the Unix epoch, saturating at the `i64` range.
pub fn unix_msec(instant: OffsetDateTime) -> i64 {
	i64::try_from(instant.unix_timestamp_nanos() / 1_000_000).unwrap_or(i64::MAX)
}
