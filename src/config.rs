//! Configuration for client-secret credentials loaded from the environment or JSON.

// self
use crate::{
	_prelude::*,
	auth::{ClientId, ClientSecret, RefreshPolicy, ScopeSet, TenantId},
	authority::{Authority, ClientAuthMethod},
	error::ArgumentError,
};

/// Environment key holding the tenant identifier.
pub const ENV_TENANT_ID: &str = "AZURE_TENANT_ID";
/// Environment key holding the application (client) identifier.
pub const ENV_CLIENT_ID: &str = "AZURE_CLIENT_ID";
/// Environment key holding the client secret.
pub const ENV_CLIENT_SECRET: &str = "AZURE_CLIENT_SECRET";
/// Optional environment key overriding the authority host.
pub const ENV_AUTHORITY_HOST: &str = "AZURE_AUTHORITY_HOST";
/// Optional environment key with space-separated scopes.
pub const ENV_TOKEN_SCOPES: &str = "AZURE_TOKEN_SCOPES";
/// Optional environment key with the refresh margin in seconds.
pub const ENV_TOKEN_REFRESH_MARGIN: &str = "AZURE_TOKEN_REFRESH_MARGIN";

/// Everything needed to build a
/// [`ClientSecretCredential`](crate::credential::ClientSecretCredential).
#[derive(Clone, Debug, Deserialize)]
pub struct ClientSecretConfig {
	/// Tenant to authenticate against.
	pub tenant_id: TenantId,
	/// Application identifier.
	pub client_id: ClientId,
	/// Application secret.
	pub client_secret: ClientSecret,
	/// Scopes requested for every token.
	#[serde(default)]
	pub scopes: ScopeSet,
	/// Authority host; the public Entra host when absent.
	#[serde(default)]
	pub authority_host: Option<Url>,
	/// How the secret is sent to the token endpoint.
	#[serde(default)]
	pub client_auth: ClientAuthMethod,
	/// Refresh margin in seconds; [`RefreshPolicy::DEFAULT_MARGIN`] when absent.
	#[serde(default)]
	pub refresh_margin_secs: Option<u32>,
}
impl ClientSecretConfig {
	/// Reads the configuration from process environment variables.
	pub fn from_env() -> Result<Self, ArgumentError> {
		Self::from_lookup(|key| std::env::var(key).ok())
	}

	/// Reads the configuration through `lookup`, which maps a key to its value.
	///
	/// Optional keys whose value is blank are treated as absent.
	pub fn from_lookup<F>(lookup: F) -> Result<Self, ArgumentError>
	where
		F: Fn(&str) -> Option<String>,
	{
		let required = |key: &'static str| lookup(key).ok_or(ArgumentError::MissingSetting { key });
		let optional = |key: &'static str| lookup(key).filter(|value| !value.trim().is_empty());
		let tenant_id = TenantId::new(required(ENV_TENANT_ID)?)?;
		let client_id = ClientId::new(required(ENV_CLIENT_ID)?)?;
		let client_secret = ClientSecret::new(required(ENV_CLIENT_SECRET)?)?;
		let scopes = optional(ENV_TOKEN_SCOPES)
			.map(|raw| ScopeSet::from_str(&raw))
			.transpose()?
			.unwrap_or_default();
		let authority_host = optional(ENV_AUTHORITY_HOST)
			.map(|raw| Url::parse(raw.trim()))
			.transpose()?;
		let refresh_margin_secs = optional(ENV_TOKEN_REFRESH_MARGIN)
			.map(|raw| {
				raw.trim().parse::<u32>().map_err(|e| ArgumentError::InvalidSetting {
					key: ENV_TOKEN_REFRESH_MARGIN,
					reason: e.to_string(),
				})
			})
			.transpose()?;

		Ok(Self {
			tenant_id,
			client_id,
			client_secret,
			scopes,
			authority_host,
			client_auth: ClientAuthMethod::default(),
			refresh_margin_secs,
		})
	}

	/// Parses the configuration from a JSON document.
	pub fn from_json(json: &str) -> Result<Self, ArgumentError> {
		let mut de = serde_json::Deserializer::from_str(json);

		serde_path_to_error::deserialize(&mut de).map_err(|e| ArgumentError::InvalidSetting {
			key: "json",
			reason: format!("{} at `{}`", e.inner(), e.path()),
		})
	}

	/// Validated authority built from `authority_host` and `client_auth`.
	pub fn authority(&self) -> Result<Authority, ArgumentError> {
		let authority = match &self.authority_host {
			Some(host) => Authority::new(host.clone())?,
			None => Authority::default(),
		};

		Ok(authority.with_client_auth(self.client_auth))
	}

	/// Refresh policy built from `refresh_margin_secs`.
	pub fn refresh_policy(&self) -> RefreshPolicy {
		self.refresh_margin_secs
			.map(|secs| RefreshPolicy::new(Duration::seconds(i64::from(secs))))
			.unwrap_or_default()
	}
}
