//! Credential-level error types shared by the token cache, credentials, and exchanges.

// self
use crate::_prelude::*;

/// Crate-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical credential error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Malformed or oversized input; a caller programming error.
	#[error(transparent)]
	InvalidArgument(#[from] ArgumentError),
	/// The credential does not implement the requested capability.
	#[error("The {credential} credential does not support {operation}.")]
	UnsupportedOperation {
		/// Credential kind label.
		credential: &'static str,
		/// Capability that was requested.
		operation: &'static str,
	},
	/// The token endpoint rejected the credentials or answered with unusable data.
	#[error(transparent)]
	AuthFailure(#[from] AuthError),
	/// Transport failure (DNS, TCP, TLS, timeouts).
	#[error(transparent)]
	TransportFailure(#[from] TransportError),
}
impl From<crate::auth::IdentifierError> for Error {
	fn from(e: crate::auth::IdentifierError) -> Self {
		ArgumentError::from(e).into()
	}
}
impl From<crate::auth::ScopeValidationError> for Error {
	fn from(e: crate::auth::ScopeValidationError) -> Self {
		ArgumentError::from(e).into()
	}
}

/// Invalid inputs rejected before any state is touched.
#[derive(Debug, ThisError)]
pub enum ArgumentError {
	/// Token value does not fit the fixed token buffer.
	#[error("Token of {len} bytes exceeds the {capacity}-byte token buffer.")]
	TokenTooLarge {
		/// Length of the rejected value.
		len: usize,
		/// Fixed buffer capacity.
		capacity: usize,
	},
	/// Token value is empty or contains bytes that cannot travel in an HTTP header.
	#[error("Token value must be non-empty visible ASCII.")]
	InvalidTokenEncoding,
	/// Token expiry equals the never-fetched sentinel and would make the token invisible.
	#[error("Token expiry of {expires_at_msec} ms is reserved for the never-fetched state.")]
	ReservedExpiry {
		/// The rejected expiry in milliseconds since the Unix epoch.
		expires_at_msec: i64,
	},
	/// Tenant or client identifier failed validation.
	#[error(transparent)]
	Identifier(#[from] crate::auth::IdentifierError),
	/// Client secret was empty.
	#[error("Client secret cannot be empty.")]
	EmptySecret,
	/// Scopes cannot be normalized.
	#[error("Requested scopes are invalid.")]
	InvalidScope(#[from] crate::auth::ScopeValidationError),
	/// Authority host cannot be used to build a token endpoint.
	#[error("Authority host is invalid: {reason}.")]
	InvalidAuthority {
		/// Why the authority was rejected.
		reason: String,
	},
	/// Authority host or token endpoint failed to parse.
	#[error("Authority URL cannot be parsed.")]
	AuthorityParse(#[from] url::ParseError),
	/// Required configuration key was not provided.
	#[error("Missing required setting `{key}`.")]
	MissingSetting {
		/// Configuration key.
		key: &'static str,
	},
	/// Configuration value could not be interpreted.
	#[error("Setting `{key}` is invalid: {reason}.")]
	InvalidSetting {
		/// Configuration key.
		key: &'static str,
		/// Parser or validation message.
		reason: String,
	},
	/// HTTP request or header construction failed.
	#[error(transparent)]
	HttpRequest(#[from] oauth2::http::Error),
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
}
impl ArgumentError {
	/// Wraps a transport's builder failure inside [`ArgumentError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for ArgumentError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Token endpoint refusals and unusable responses.
#[derive(Debug, ThisError)]
pub enum AuthError {
	/// Client authentication failed (wrong secret, unknown client).
	#[error("Client authentication failed: {reason}.")]
	InvalidClient {
		/// Provider-supplied reason string.
		reason: String,
	},
	/// The grant was refused (consent missing, disabled principal).
	#[error("Token endpoint rejected the grant: {reason}.")]
	InvalidGrant {
		/// Provider-supplied reason string.
		reason: String,
	},
	/// Requested scopes cannot be granted.
	#[error("Token endpoint rejected the requested scopes: {reason}.")]
	InsufficientScope {
		/// Provider-supplied reason string.
		reason: String,
	},
	/// Unexpected or temporary endpoint failure.
	#[error("Token endpoint returned an unexpected response: {message}.")]
	TokenEndpoint {
		/// Summary of the failure.
		message: String,
		/// HTTP status code, when available.
		status: Option<u16>,
		/// Retry-After hint from upstream, if supplied.
		retry_after: Option<Duration>,
	},
	/// Token endpoint answered with JSON that is not a token response.
	#[error("Token endpoint returned malformed JSON.")]
	MalformedResponse {
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::error::Error>,
		/// HTTP status code, when available.
		status: Option<u16>,
	},
	/// Token response omitted `expires_in`.
	#[error("Token endpoint response is missing expires_in.")]
	MissingExpiresIn,
	/// Token response carried a zero or negative lifetime.
	#[error("The expires_in value must be positive.")]
	NonPositiveExpiresIn,
	/// Token response carried a lifetime that does not fit the expiry clock.
	#[error("The expires_in value exceeds the supported range.")]
	ExpiresInOutOfRange,
}
impl AuthError {
	/// Returns `true` when the failure is worth retrying later.
	pub fn is_retryable(&self) -> bool {
		match self {
			Self::TokenEndpoint { status, .. } =>
				!matches!(status, Some(code) if (400..500).contains(code) && *code != 429),
			_ => false,
		}
	}
}

/// Transport-level failures (network, IO).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling the token endpoint.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// The transport gave up waiting for the token endpoint.
	#[error("Request timed out while calling the token endpoint.")]
	Timeout {
		/// HTTP status code, when one was observed before the timeout.
		status: Option<u16>,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred while calling the token endpoint.")]
	Io(#[from] std::io::Error),
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for TransportError {
	fn from(e: ReqwestError) -> Self {
		Self::network(e)
	}
}
