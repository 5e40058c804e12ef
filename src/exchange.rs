//! Token-endpoint collaborator used by caching credentials to mint new tokens.
//!
//! Credentials only see [`TokenExchange`]: given the tenant, client id, client secret, and scopes,
//! return a token value and its expiry. [`OAuth2Exchange`] implements it with the OAuth 2.0
//! client-credentials grant over any [`TokenHttpClient`], classifying endpoint refusals as
//! [`AuthError`] and network problems as [`TransportError`](crate::error::TransportError).

// crates.io
use oauth2::{
	AuthType, ClientId as OAuthClientId, ClientSecret as OAuthClientSecret, EndpointNotSet,
	EndpointSet, HttpClientError, RequestTokenError, Scope, TokenResponse, TokenUrl,
	basic::{BasicClient, BasicErrorResponse, BasicRequestTokenError, BasicTokenResponse},
};
// self
use crate::{
	_prelude::*,
	auth::{ClientId, ClientSecret, ScopeSet, TenantId},
	authority::{Authority, ClientAuthMethod},
	error::{ArgumentError, AuthError},
	http::{ResponseMetadata, ResponseMetadataSlot, TokenHttpClient},
};
#[cfg(feature = "reqwest")] use crate::{error::TransportError, http::ReqwestHttpClient};

type ConfiguredClient =
	BasicClient<EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointSet>;

/// Boxed future returned by [`TokenExchange::exchange`].
pub type ExchangeFuture<'a> = Pin<Box<dyn Future<Output = Result<ExchangedToken>> + 'a + Send>>;

/// Exchange specialized for the crate's default reqwest transport stack.
#[cfg(feature = "reqwest")]
pub type ReqwestExchange = OAuth2Exchange<ReqwestHttpClient, ReqwestTransportErrorMapper>;

/// Obtains a fresh token for a set of client credentials.
///
/// Implementations may block on network I/O; callers never hold a lock while awaiting them.
pub trait TokenExchange
where
	Self: Send + Sync,
{
	/// Performs one exchange. Errors are returned to the caller unchanged.
	fn exchange<'a>(&'a self, request: ExchangeRequest<'a>) -> ExchangeFuture<'a>;
}

/// Inputs to a single token exchange.
#[derive(Clone, Copy, Debug)]
pub struct ExchangeRequest<'a> {
	/// Tenant to authenticate against.
	pub tenant_id: &'a TenantId,
	/// Application identifier.
	pub client_id: &'a ClientId,
	/// Application secret.
	pub client_secret: &'a ClientSecret,
	/// Scopes to request; may be empty.
	pub scopes: &'a ScopeSet,
}

/// Token minted by a [`TokenExchange`].
#[derive(Clone)]
pub struct ExchangedToken {
	/// Bearer token value; callers must avoid logging it.
	pub access_token: String,
	/// Absolute expiry instant.
	pub expires_at: OffsetDateTime,
}
impl ExchangedToken {
	/// Creates a token that expires at `expires_at`.
	pub fn new(access_token: impl Into<String>, expires_at: OffsetDateTime) -> Self {
		Self { access_token: access_token.into(), expires_at }
	}
}
impl Debug for ExchangedToken {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ExchangedToken")
			.field("access_token", &"<redacted>")
			.field("expires_at", &self.expires_at)
			.finish()
	}
}

/// Maps HTTP transport failures into crate [`Error`] values.
pub trait TransportErrorMapper<E>
where
	Self: 'static + Send + Sync,
	E: 'static + Send + Sync + StdError,
{
	/// Converts an [`HttpClientError`] emitted by the transport.
	fn map_transport_error(
		&self,
		metadata: Option<&ResponseMetadata>,
		error: HttpClientError<E>,
	) -> Error;
}

/// Default mapper for reqwest-backed transports.
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug, Default)]
pub struct ReqwestTransportErrorMapper;
#[cfg(feature = "reqwest")]
impl TransportErrorMapper<ReqwestError> for ReqwestTransportErrorMapper {
	fn map_transport_error(
		&self,
		meta: Option<&ResponseMetadata>,
		err: HttpClientError<ReqwestError>,
	) -> Error {
		match err {
			HttpClientError::Reqwest(inner) => map_reqwest_error(meta, *inner),
			HttpClientError::Http(inner) => ArgumentError::from(inner).into(),
			HttpClientError::Io(inner) => TransportError::Io(inner).into(),
			HttpClientError::Other(message) => map_generic_transport_error(meta, message),
			_ => map_generic_transport_error(meta, "unrecognized transport failure"),
		}
	}
}

/// Client-credentials grant against an [`Authority`].
pub struct OAuth2Exchange<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	authority: Authority,
	http_client: Arc<C>,
	error_mapper: Arc<M>,
}
impl<C, M> OAuth2Exchange<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Creates an exchange that reuses the caller-provided transport + mapper pair.
	pub fn with_http_client(
		authority: Authority,
		http_client: impl Into<Arc<C>>,
		error_mapper: impl Into<Arc<M>>,
	) -> Self {
		Self { authority, http_client: http_client.into(), error_mapper: error_mapper.into() }
	}

	/// Authority the exchange targets.
	pub fn authority(&self) -> &Authority {
		&self.authority
	}

	fn oauth_client(&self, request: &ExchangeRequest<'_>) -> Result<ConfiguredClient> {
		let endpoint = self.authority.token_endpoint(request.tenant_id)?;
		let token_url = TokenUrl::new(endpoint.to_string()).map_err(ArgumentError::from)?;
		let client = BasicClient::new(OAuthClientId::new(request.client_id.to_string()))
			.set_client_secret(OAuthClientSecret::new(request.client_secret.expose().to_owned()))
			.set_token_uri(token_url);
		let client = match self.authority.client_auth() {
			ClientAuthMethod::ClientSecretPost => client.set_auth_type(AuthType::RequestBody),
			ClientAuthMethod::ClientSecretBasic => client.set_auth_type(AuthType::BasicAuth),
		};

		Ok(client)
	}
}
#[cfg(feature = "reqwest")]
impl OAuth2Exchange<ReqwestHttpClient, ReqwestTransportErrorMapper> {
	/// Creates an exchange backed by a default reqwest client.
	pub fn new(authority: Authority) -> Self {
		Self::with_http_client(
			authority,
			ReqwestHttpClient::default(),
			ReqwestTransportErrorMapper,
		)
	}
}
impl<C, M> TokenExchange for OAuth2Exchange<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn exchange<'a>(&'a self, request: ExchangeRequest<'a>) -> ExchangeFuture<'a> {
		let meta = ResponseMetadataSlot::default();

		Box::pin(async move {
			let client = self.oauth_client(&request)?;
			let instrumented = self.http_client.with_metadata(meta.clone());
			let mut token_request = client.exchange_client_credentials();

			for scope in request.scopes.iter() {
				token_request = token_request.add_scope(Scope::new(scope.to_owned()));
			}

			let response = token_request.request_async(&instrumented).await.map_err(|err| {
				map_request_error(meta.take(), err, self.error_mapper.as_ref())
			})?;

			map_token_response(response, OffsetDateTime::now_utc())
		})
	}
}
impl<C, M> Debug for OAuth2Exchange<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("OAuth2Exchange").field("authority", &self.authority).finish()
	}
}

fn map_token_response(
	response: BasicTokenResponse,
	issued_at: OffsetDateTime,
) -> Result<ExchangedToken> {
	let expires_in = response.expires_in().ok_or(AuthError::MissingExpiresIn)?.as_secs();
	let expires_in = i64::try_from(expires_in).map_err(|_| AuthError::ExpiresInOutOfRange)?;

	if expires_in <= 0 {
		return Err(AuthError::NonPositiveExpiresIn.into());
	}

	let expires_at = issued_at
		.checked_add(Duration::seconds(expires_in))
		.ok_or(AuthError::ExpiresInOutOfRange)?;

	Ok(ExchangedToken::new(response.access_token().secret().to_owned(), expires_at))
}

fn map_request_error<E, M>(
	meta: Option<ResponseMetadata>,
	err: BasicRequestTokenError<HttpClientError<E>>,
	mapper: &M,
) -> Error
where
	E: 'static + Send + Sync + StdError,
	M: ?Sized + TransportErrorMapper<E>,
{
	let meta = meta.as_ref();

	match err {
		RequestTokenError::ServerResponse(response) => map_server_response_error(response, meta),
		RequestTokenError::Request(error) => mapper.map_transport_error(meta, error),
		RequestTokenError::Parse(source, _body) =>
			AuthError::MalformedResponse { source, status: meta_status(meta) }.into(),
		RequestTokenError::Other(message) => AuthError::TokenEndpoint {
			message,
			status: meta_status(meta),
			retry_after: meta_retry_after(meta),
		}
		.into(),
	}
}

fn map_server_response_error(
	response: BasicErrorResponse,
	meta: Option<&ResponseMetadata>,
) -> Error {
	let code = response.error().as_ref().to_owned();
	let reason = response.error_description().cloned().unwrap_or_else(|| code.clone());

	match classify_oauth_error(&code, meta_status(meta)) {
		Refusal::InvalidClient => AuthError::InvalidClient { reason },
		Refusal::InvalidGrant => AuthError::InvalidGrant { reason },
		Refusal::InsufficientScope => AuthError::InsufficientScope { reason },
		Refusal::Other => AuthError::TokenEndpoint {
			message: format!("{code}: {reason}"),
			status: meta_status(meta),
			retry_after: meta_retry_after(meta),
		},
	}
	.into()
}

enum Refusal {
	InvalidClient,
	InvalidGrant,
	InsufficientScope,
	Other,
}

fn classify_oauth_error(code: &str, status: Option<u16>) -> Refusal {
	const CLIENT: [&str; 2] = ["invalid_client", "unauthorized_client"];
	const GRANT: [&str; 2] = ["invalid_grant", "access_denied"];
	const SCOPE: [&str; 2] = ["invalid_scope", "insufficient_scope"];

	let matches = |codes: [&str; 2]| codes.iter().any(|known| code.eq_ignore_ascii_case(known));

	if matches(CLIENT) {
		Refusal::InvalidClient
	} else if matches(GRANT) {
		Refusal::InvalidGrant
	} else if matches(SCOPE) {
		Refusal::InsufficientScope
	} else if status == Some(401) {
		Refusal::InvalidClient
	} else {
		Refusal::Other
	}
}

#[cfg(feature = "reqwest")]
fn map_reqwest_error(meta: Option<&ResponseMetadata>, err: ReqwestError) -> Error {
	if err.is_builder() {
		return ArgumentError::from(err).into();
	}
	if err.is_timeout() {
		return TransportError::Timeout {
			status: meta_status(meta).or_else(|| err.status().map(|code| code.as_u16())),
		}
		.into();
	}

	TransportError::from(err).into()
}

#[cfg(feature = "reqwest")]
fn map_generic_transport_error(meta: Option<&ResponseMetadata>, message: impl Display) -> Error {
	AuthError::TokenEndpoint {
		message: format!("HTTP client error occurred while calling the token endpoint: {message}"),
		status: meta_status(meta),
		retry_after: meta_retry_after(meta),
	}
	.into()
}

fn meta_status(meta: Option<&ResponseMetadata>) -> Option<u16> {
	meta.and_then(|value| value.status)
}

fn meta_retry_after(meta: Option<&ResponseMetadata>) -> Option<Duration> {
	meta.and_then(|value| value.retry_after)
}
