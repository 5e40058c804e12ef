//! Token endpoint location and client authentication preferences.
//!
//! An [`Authority`] names the identity host (Microsoft Entra by default) and derives the
//! per-tenant v2.0 token endpoint `{host}{tenant}/oauth2/v2.0/token`. Hosts must use HTTPS;
//! plain HTTP is accepted only for loopback hosts so local mock endpoints keep working.

// self
use crate::{_prelude::*, auth::TenantId, error::ArgumentError};

/// How the client secret is presented to the token endpoint.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClientAuthMethod {
	#[default]
	/// Form POST body parameters for `client_id`/`client_secret`.
	ClientSecretPost,
	/// HTTP Basic with `client_id`/`client_secret`.
	ClientSecretBasic,
}

/// Identity host that issues client-credential tokens.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "AuthorityRepr", into = "AuthorityRepr")]
pub struct Authority {
	host: Url,
	client_auth: ClientAuthMethod,
}
impl Authority {
	/// Public-cloud Microsoft Entra host.
	pub const DEFAULT_HOST: &str = "https://login.microsoftonline.com/";

	/// Validates `host` and normalizes it to end with `/`.
	pub fn new(host: Url) -> Result<Self, ArgumentError> {
		Ok(Self { host: validate_host(host)?, client_auth: ClientAuthMethod::default() })
	}

	/// Parses and validates a host string.
	pub fn parse(host: &str) -> Result<Self, ArgumentError> {
		Self::new(Url::parse(host)?)
	}

	/// Overrides the client authentication method.
	pub fn with_client_auth(mut self, method: ClientAuthMethod) -> Self {
		self.client_auth = method;

		self
	}

	/// Normalized host URL.
	pub fn host(&self) -> &Url {
		&self.host
	}

	/// Configured client authentication method.
	pub fn client_auth(&self) -> ClientAuthMethod {
		self.client_auth
	}

	/// Token endpoint for `tenant`.
	pub fn token_endpoint(&self, tenant: &TenantId) -> Result<Url, ArgumentError> {
		Ok(self.host.join(&format!("{tenant}/oauth2/v2.0/token"))?)
	}
}
impl Default for Authority {
	fn default() -> Self {
		Self {
			host: Url::parse(Self::DEFAULT_HOST).expect("Default authority host must parse."),
			client_auth: ClientAuthMethod::default(),
		}
	}
}

#[derive(Serialize, Deserialize)]
struct AuthorityRepr {
	host: Url,
	#[serde(default)]
	client_auth: ClientAuthMethod,
}
impl TryFrom<AuthorityRepr> for Authority {
	type Error = ArgumentError;

	fn try_from(repr: AuthorityRepr) -> Result<Self, Self::Error> {
		Ok(Self::new(repr.host)?.with_client_auth(repr.client_auth))
	}
}
impl From<Authority> for AuthorityRepr {
	fn from(authority: Authority) -> Self {
		Self { host: authority.host, client_auth: authority.client_auth }
	}
}

fn validate_host(mut host: Url) -> Result<Url, ArgumentError> {
	match host.scheme() {
		"https" => {},
		"http" if is_loopback(&host) => {},
		scheme =>
			return Err(ArgumentError::InvalidAuthority {
				reason: format!("scheme `{scheme}` is not allowed for {host}"),
			}),
	}

	if host.cannot_be_a_base() || host.host_str().is_none() {
		return Err(ArgumentError::InvalidAuthority { reason: format!("{host} has no host") });
	}
	if host.query().is_some() || host.fragment().is_some() {
		return Err(ArgumentError::InvalidAuthority {
			reason: format!("{host} must not carry a query or fragment"),
		});
	}
	if !host.path().ends_with('/') {
		let path = format!("{}/", host.path());

		host.set_path(&path);
	}

	Ok(host)
}

fn is_loopback(url: &Url) -> bool {
	match url.host() {
		Some(url::Host::Domain(domain)) => domain.eq_ignore_ascii_case("localhost"),
		Some(url::Host::Ipv4(ip)) => ip.is_loopback(),
		Some(url::Host::Ipv6(ip)) => ip.is_loopback(),
		None => false,
	}
}
