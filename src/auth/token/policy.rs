//! Refresh decision made by credentials before attaching a cached token.

// self
use crate::{
	_prelude::*,
	auth::token::{Token, TokenStatus},
};

/// Decides when a cached token is too close to expiry to be attached.
///
/// A token whose expiry falls within `margin` of the current instant is refreshed before use so
/// it cannot expire while the request is in flight.
///
/// The margin is not scaled to the issued lifetime. When the token endpoint issues tokens that
/// live no longer than `margin`, every freshly cached token is already
/// [`TokenStatus::Expiring`], so each use triggers another exchange. Choose a margin well below
/// the shortest lifetime the endpoint issues.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RefreshPolicy {
	margin: Duration,
}
impl RefreshPolicy {
	/// Margin applied when none is configured.
	pub const DEFAULT_MARGIN: Duration = Duration::seconds(60);

	/// Creates a policy with the given margin; negative margins clamp to zero.
	pub fn new(margin: Duration) -> Self {
		Self { margin: if margin.is_negative() { Duration::ZERO } else { margin } }
	}

	/// Configured refresh margin.
	pub fn margin(&self) -> Duration {
		self.margin
	}

	/// Classifies a cache snapshot at `now`.
	pub fn status(&self, token: Option<&Token>, now: OffsetDateTime) -> TokenStatus {
		token.map_or(TokenStatus::Missing, |token| token.status_at(now, self.margin))
	}

	/// Returns `true` unless the snapshot is [`TokenStatus::Active`].
	pub fn should_refresh(&self, token: Option<&Token>, now: OffsetDateTime) -> bool {
		!self.status(token, now).is_fresh()
	}
}
impl Default for RefreshPolicy {
	fn default() -> Self {
		Self::new(Self::DEFAULT_MARGIN)
	}
}
