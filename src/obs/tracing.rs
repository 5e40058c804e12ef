// self
use crate::{_prelude::*, auth::TokenStatus, obs::CredentialOp};

/// Type alias that resolves to an instrumented future when tracing is enabled.
#[cfg(feature = "tracing")]
pub type InstrumentedCredential<F> = tracing::instrument::Instrumented<F>;
/// Passthrough future type when tracing is disabled.
#[cfg(not(feature = "tracing"))]
pub type InstrumentedCredential<F> = F;

/// Span wrapping one credential operation.
#[derive(Clone, Debug)]
pub struct CredentialSpan {
	#[cfg(feature = "tracing")]
	span: tracing::Span,
}
impl CredentialSpan {
	/// Creates a span tagged with the operation and credential kind.
	pub fn new(op: CredentialOp, credential: &'static str) -> Self {
		#[cfg(feature = "tracing")]
		{
			let span =
				tracing::debug_span!("token_credentials.credential", op = op.as_str(), credential);

			Self { span }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = (op, credential);

			Self {}
		}
	}

	/// Instruments an async block without holding a guard across `.await` points.
	pub fn instrument<Fut>(&self, fut: Fut) -> InstrumentedCredential<Fut>
	where
		Fut: Future,
	{
		#[cfg(feature = "tracing")]
		{
			use tracing::Instrument;

			fut.instrument(self.span.clone())
		}
		#[cfg(not(feature = "tracing"))]
		{
			fut
		}
	}
}

/// Emits a debug event describing the cache state seen before deciding whether to refresh.
pub fn trace_cache_status(status: TokenStatus, scopes_fingerprint: &str) {
	#[cfg(feature = "tracing")]
	{
		tracing::debug!(
			status = status.as_str(),
			refresh = !status.is_fresh(),
			scopes = scopes_fingerprint,
			"Checked cached token."
		);
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = (status, scopes_fingerprint);
	}
}

/// Emits a debug event once a refreshed token has been cached.
pub fn trace_token_cached(expires_at_msec: i64) {
	#[cfg(feature = "tracing")]
	{
		tracing::debug!(expires_at_msec, "Cached refreshed token.");
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = expires_at_msec;
	}
}

/// Emits a warning when a refresh fails.
pub fn trace_refresh_failure(error: &Error) {
	#[cfg(feature = "tracing")]
	{
		tracing::warn!(error = %error, "Token refresh failed.");
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = error;
	}
}
