//! Optional observability helpers for credentials.
//!
//! # Feature Flags
//!
//! - Enable `tracing` to emit spans named `token_credentials.credential` with the `op` (apply or
//!   refresh) and `credential` (kind label) fields, plus debug events describing refresh
//!   decisions. Token values are never recorded; scopes appear only as their fingerprint.
//! - Enable `metrics` to increment the `token_credentials_refresh_total` counter for every
//!   refresh attempt/success/failure, labeled by `credential` + `outcome`.

mod metrics;
mod tracing;

pub use metrics::*;
pub use tracing::*;

// self
use crate::_prelude::*;

/// Credential operations observed by the crate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CredentialOp {
	/// Attaching the `Authorization` header to a request.
	Apply,
	/// Obtaining a new token from the exchange.
	Refresh,
}
impl CredentialOp {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			CredentialOp::Apply => "apply",
			CredentialOp::Refresh => "refresh",
		}
	}
}
impl Display for CredentialOp {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded for each refresh.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RefreshOutcome {
	/// A refresh was started.
	Attempt,
	/// A new token was cached.
	Success,
	/// The refresh failed and the error was returned to the caller.
	Failure,
}
impl RefreshOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			RefreshOutcome::Attempt => "attempt",
			RefreshOutcome::Success => "success",
			RefreshOutcome::Failure => "failure",
		}
	}
}
impl Display for RefreshOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
