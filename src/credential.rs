//! Credential contract shared by every way of authorizing a request.
//!
//! A pipeline holds some `Arc<dyn Credential>` and calls [`Credential::apply`] once per outgoing
//! request. Capabilities beyond `apply` are optional: credentials that cannot honor them answer
//! with [`Error::UnsupportedOperation`] and leave their state untouched.

pub mod client_secret;
mod metrics;

pub use client_secret::*;
pub use metrics::*;

// self
use crate::{_prelude::*, auth::ScopeSet, http::HttpRequest};

/// Boxed future returned by credential operations.
pub type CredentialFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + 'a + Send>>;

/// Something that can authorize an outgoing HTTP request.
///
/// `apply` may be called concurrently from many tasks on one instance.
pub trait Credential
where
	Self: Send + Sync,
{
	/// Stable label used in logs and metrics.
	fn kind(&self) -> &'static str;

	/// Mutates `request` so the server will accept it (usually by setting `Authorization`).
	///
	/// On error the request is left untouched and must not be sent.
	fn apply<'a>(&'a self, request: &'a mut HttpRequest) -> CredentialFuture<'a, ()>;

	/// Returns `true` when [`set_scopes`](Self::set_scopes) is implemented.
	fn supports_scopes(&self) -> bool {
		false
	}

	/// Replaces the scopes requested for future tokens.
	fn set_scopes(&mut self, _scopes: ScopeSet) -> Result<()> {
		Err(Error::UnsupportedOperation { credential: self.kind(), operation: "set_scopes" })
	}
}

/// Null credential; leaves every request as it is.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AnonymousCredential;
impl Credential for AnonymousCredential {
	fn kind(&self) -> &'static str {
		"anonymous"
	}

	fn apply<'a>(&'a self, _request: &'a mut HttpRequest) -> CredentialFuture<'a, ()> {
		Box::pin(async { Ok(()) })
	}
}

/// Shared [`AnonymousCredential`] instance.
pub const ANONYMOUS: AnonymousCredential = AnonymousCredential;
