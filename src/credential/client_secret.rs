//! Client-secret credential with an embedded token cache.
//!
//! [`ClientSecretCredential::token`] copies the cached token out under the cache lock and
//! returns it while it is fresh. Otherwise it asks the [`TokenExchange`] for a new one with no
//! lock held and publishes the result through [`TokenCache::set`]. Concurrent stale callers may
//! each refresh; whichever `set` lands last wins. Exchange errors reach the caller unchanged:
//! there is no retry and no fallback to a stale token.

// crates.io
use oauth2::http::header::AUTHORIZATION;
// self
use crate::{
	_prelude::*,
	auth::{ClientId, ClientSecret, RefreshPolicy, ScopeSet, TenantId, Token, TokenCache, unix_msec},
	config::ClientSecretConfig,
	credential::{Credential, CredentialFuture, RefreshMetrics},
	exchange::{ExchangeRequest, TokenExchange},
	http::HttpRequest,
	obs::{self, CredentialOp, CredentialSpan, RefreshOutcome},
};
#[cfg(feature = "reqwest")]
use crate::{authority::Authority, exchange::ReqwestExchange};

/// Authorizes requests with tokens obtained through the client-credentials grant.
pub struct ClientSecretCredential {
	tenant_id: TenantId,
	client_id: ClientId,
	client_secret: ClientSecret,
	scopes: ScopeSet,
	cache: TokenCache,
	policy: RefreshPolicy,
	exchange: Arc<dyn TokenExchange>,
	refresh_metrics: Arc<RefreshMetrics>,
}
impl ClientSecretCredential {
	/// Kind label reported by [`Credential::kind`].
	pub const KIND: &str = "client_secret";

	/// Creates a credential that talks to the public Entra token endpoint over reqwest.
	#[cfg(feature = "reqwest")]
	pub fn new(
		tenant_id: impl AsRef<str>,
		client_id: impl AsRef<str>,
		client_secret: impl Into<String>,
	) -> Result<Self> {
		Self::with_exchange(
			tenant_id,
			client_id,
			client_secret,
			Arc::new(ReqwestExchange::new(Authority::default())),
		)
	}

	/// Creates a credential backed by any [`TokenExchange`].
	///
	/// Identifiers and the secret are validated here; the scope set starts empty and the cache
	/// starts in the never-fetched state.
	pub fn with_exchange(
		tenant_id: impl AsRef<str>,
		client_id: impl AsRef<str>,
		client_secret: impl Into<String>,
		exchange: Arc<dyn TokenExchange>,
	) -> Result<Self> {
		Ok(Self::from_parts(
			TenantId::new(tenant_id)?,
			ClientId::new(client_id)?,
			ClientSecret::new(client_secret)?,
			exchange,
		))
	}

	/// Builds a reqwest-backed credential from loaded configuration.
	#[cfg(feature = "reqwest")]
	pub fn from_config(config: ClientSecretConfig) -> Result<Self> {
		let exchange = Arc::new(ReqwestExchange::new(config.authority()?));

		Ok(Self::from_config_with_exchange(config, exchange))
	}

	/// Builds a credential from loaded configuration and a caller-provided exchange.
	///
	/// The configured authority host is ignored; the exchange decides where tokens come from.
	pub fn from_config_with_exchange(
		config: ClientSecretConfig,
		exchange: Arc<dyn TokenExchange>,
	) -> Self {
		let policy = config.refresh_policy();

		Self::from_parts(config.tenant_id, config.client_id, config.client_secret, exchange)
			.with_scopes(config.scopes)
			.with_refresh_policy(policy)
	}

	fn from_parts(
		tenant_id: TenantId,
		client_id: ClientId,
		client_secret: ClientSecret,
		exchange: Arc<dyn TokenExchange>,
	) -> Self {
		Self {
			tenant_id,
			client_id,
			client_secret,
			scopes: ScopeSet::default(),
			cache: TokenCache::new(),
			policy: RefreshPolicy::default(),
			exchange,
			refresh_metrics: Default::default(),
		}
	}

	/// Replaces the requested scopes before first use.
	pub fn with_scopes(mut self, scopes: ScopeSet) -> Self {
		self.scopes = scopes;

		self
	}

	/// Replaces the refresh policy.
	pub fn with_refresh_policy(mut self, policy: RefreshPolicy) -> Self {
		self.policy = policy;

		self
	}

	/// Tenant the credential authenticates against.
	pub fn tenant_id(&self) -> &TenantId {
		&self.tenant_id
	}

	/// Application identifier.
	pub fn client_id(&self) -> &ClientId {
		&self.client_id
	}

	/// Scopes requested for new tokens.
	pub fn scopes(&self) -> &ScopeSet {
		&self.scopes
	}

	/// Refresh policy in effect.
	pub fn refresh_policy(&self) -> RefreshPolicy {
		self.policy
	}

	/// Embedded token cache.
	pub fn cache(&self) -> &TokenCache {
		&self.cache
	}

	/// Refresh counters for this credential.
	pub fn refresh_metrics(&self) -> Arc<RefreshMetrics> {
		Arc::clone(&self.refresh_metrics)
	}

	/// Returns a token that is fresh under the refresh policy, refreshing when needed.
	pub async fn token(&self) -> Result<Token> {
		let snapshot = self.cache.get();
		let status = self.policy.status(snapshot.as_ref(), OffsetDateTime::now_utc());

		obs::trace_cache_status(status, self.scopes.fingerprint());

		match snapshot {
			Some(token) if status.is_fresh() => Ok(token),
			_ => self.refresh().await,
		}
	}

	async fn refresh(&self) -> Result<Token> {
		let span = CredentialSpan::new(CredentialOp::Refresh, Self::KIND);

		self.refresh_metrics.record_exchange();
		obs::record_refresh_outcome(Self::KIND, RefreshOutcome::Attempt);

		let result = span
			.instrument(async {
				let exchanged = self
					.exchange
					.exchange(ExchangeRequest {
						tenant_id: &self.tenant_id,
						client_id: &self.client_id,
						client_secret: &self.client_secret,
						scopes: &self.scopes,
					})
					.await?;
				let token =
					self.cache.set(&exchanged.access_token, unix_msec(exchanged.expires_at))?;

				obs::trace_token_cached(token.expires_at_msec());

				Ok(token)
			})
			.await;

		match &result {
			Ok(_) => {
				self.refresh_metrics.record_cached();
				obs::record_refresh_outcome(Self::KIND, RefreshOutcome::Success);
			},
			Err(e) => {
				self.refresh_metrics.record_error();
				obs::record_refresh_outcome(Self::KIND, RefreshOutcome::Failure);
				obs::trace_refresh_failure(e);
			},
		}

		result
	}
}
impl Credential for ClientSecretCredential {
	fn kind(&self) -> &'static str {
		Self::KIND
	}

	fn apply<'a>(&'a self, request: &'a mut HttpRequest) -> CredentialFuture<'a, ()> {
		let span = CredentialSpan::new(CredentialOp::Apply, Self::KIND);

		Box::pin(span.instrument(async move {
			let header = self.token().await?.authorization_value()?;

			request.headers_mut().insert(AUTHORIZATION, header);

			Ok(())
		}))
	}

	fn supports_scopes(&self) -> bool {
		true
	}

	/// Tokens are bound to the scopes they were issued for, so the cache is cleared.
	fn set_scopes(&mut self, scopes: ScopeSet) -> Result<()> {
		self.scopes = scopes;
		self.cache.clear();

		Ok(())
	}
}
impl Debug for ClientSecretCredential {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ClientSecretCredential")
			.field("tenant_id", &self.tenant_id)
			.field("client_id", &self.client_id)
			.field("client_secret", &self.client_secret)
			.field("scopes", &self.scopes)
			.field("cache", &self.cache)
			.field("policy", &self.policy)
			.finish_non_exhaustive()
	}
}

#[cfg(test)]
mod tests {
	// std
	use std::sync::atomic::{AtomicUsize, Ordering};
	// self
	use super::*;
	use crate::{
		auth::TOKEN_BUF_SIZE,
		error::{ArgumentError, AuthError},
		exchange::{ExchangeFuture, ExchangedToken},
	};

	type Respond = dyn Fn(usize) -> Result<ExchangedToken> + Send + Sync;

	struct CountingExchange {
		calls: AtomicUsize,
		seen_scopes: Mutex<Vec<ScopeSet>>,
		respond: Box<Respond>,
	}
	impl CountingExchange {
		fn new(respond: impl 'static + Fn(usize) -> Result<ExchangedToken> + Send + Sync) -> Arc<Self> {
			Arc::new(Self {
				calls: AtomicUsize::new(0),
				seen_scopes: Mutex::new(Vec::new()),
				respond: Box::new(respond),
			})
		}

		fn issuing(lifetime: Duration) -> Arc<Self> {
			Self::new(move |call| {
				Ok(ExchangedToken::new(
					format!("tok-{call}"),
					OffsetDateTime::now_utc() + lifetime,
				))
			})
		}

		fn calls(&self) -> usize {
			self.calls.load(Ordering::SeqCst)
		}
	}
	impl TokenExchange for CountingExchange {
		fn exchange<'a>(&'a self, request: ExchangeRequest<'a>) -> ExchangeFuture<'a> {
			let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;

			self.seen_scopes.lock().push(request.scopes.clone());

			let result = (self.respond)(call);

			Box::pin(async move { result })
		}
	}

	fn credential(exchange: Arc<CountingExchange>) -> ClientSecretCredential {
		ClientSecretCredential::with_exchange("t1", "c1", "s1", exchange)
			.expect("Credential fixture should be valid.")
	}

	fn request() -> HttpRequest {
		oauth2::http::Request::builder()
			.uri("https://vault.example.com/secrets/db")
			.body(Vec::new())
			.expect("Request fixture should build.")
	}

	fn authorization(req: &HttpRequest) -> Option<&str> {
		req.headers().get(AUTHORIZATION).and_then(|value| value.to_str().ok())
	}

	#[test]
	fn construction_validates_inputs() {
		let exchange = CountingExchange::issuing(Duration::hours(1));
		let empty_tenant = ClientSecretCredential::with_exchange("", "c1", "s1", exchange.clone())
			.expect_err("Empty tenant must be rejected.");
		let empty_client = ClientSecretCredential::with_exchange("t1", "", "s1", exchange.clone())
			.expect_err("Empty client must be rejected.");
		let empty_secret = ClientSecretCredential::with_exchange("t1", "c1", "", exchange.clone())
			.expect_err("Empty secret must be rejected.");
		let ok = credential(exchange.clone());

		assert!(matches!(empty_tenant, Error::InvalidArgument(ArgumentError::Identifier(_))));
		assert!(matches!(empty_client, Error::InvalidArgument(ArgumentError::Identifier(_))));
		assert!(matches!(empty_secret, Error::InvalidArgument(ArgumentError::EmptySecret)));
		assert!(ok.scopes().is_empty());
		assert!(ok.cache().get().is_none());
		assert_eq!(exchange.calls(), 0);
	}

	#[tokio::test]
	async fn fresh_token_is_reused() {
		let exchange = CountingExchange::issuing(Duration::hours(1));
		let credential = credential(exchange.clone());
		let mut first = request();
		let mut second = request();

		credential.apply(&mut first).await.expect("First apply should refresh.");
		credential.apply(&mut second).await.expect("Second apply should hit the cache.");

		assert_eq!(exchange.calls(), 1);
		assert_eq!(authorization(&first), Some("Bearer tok-1"));
		assert_eq!(authorization(&second), Some("Bearer tok-1"));
		assert!(first.headers().get(AUTHORIZATION).is_some_and(|value| value.is_sensitive()));
		assert_eq!(credential.refresh_metrics().cached(), 1);
		assert_eq!(credential.refresh_metrics().exchanges(), 1);
	}

	#[tokio::test]
	async fn expired_token_refreshes_exactly_once() {
		let exchange = CountingExchange::issuing(Duration::hours(1));
		let credential = credential(exchange.clone());

		credential
			.cache()
			.set("stale", unix_msec(OffsetDateTime::now_utc()) - 1_000)
			.expect("Stale fixture should be stored.");

		let mut req = request();

		credential.apply(&mut req).await.expect("Stale token should be refreshed.");

		assert_eq!(exchange.calls(), 1);
		assert_eq!(authorization(&req), Some("Bearer tok-1"));
		assert_eq!(credential.cache().get().map(|token| token.as_str().to_owned()), Some("tok-1".into()));
	}

	#[tokio::test]
	async fn lifetime_shorter_than_margin_refreshes_on_every_use() {
		let exchange = CountingExchange::issuing(Duration::seconds(30));
		let credential = credential(exchange.clone());

		for _ in 0..3 {
			credential.token().await.expect("Short-lived token should still be issued.");
		}

		assert_eq!(exchange.calls(), 3);

		let tuned = ClientSecretCredential::with_exchange("t1", "c1", "s1", exchange.clone())
			.expect("Credential fixture should be valid.")
			.with_refresh_policy(RefreshPolicy::new(Duration::seconds(5)));

		for _ in 0..3 {
			tuned.token().await.expect("Short-lived token should be reused under a small margin.");
		}

		assert_eq!(exchange.calls(), 4);
	}

	#[tokio::test]
	async fn token_inside_margin_is_refreshed() {
		let exchange = CountingExchange::issuing(Duration::hours(1));
		let credential = credential(exchange.clone());

		credential
			.cache()
			.set("expiring", unix_msec(OffsetDateTime::now_utc() + Duration::seconds(30)))
			.expect("Expiring fixture should be stored.");
		credential.token().await.expect("Expiring token should be refreshed.");

		assert_eq!(exchange.calls(), 1);

		let relaxed = ClientSecretCredential::with_exchange("t1", "c1", "s1", exchange.clone())
			.expect("Credential fixture should be valid.")
			.with_refresh_policy(RefreshPolicy::new(Duration::seconds(10)));

		relaxed
			.cache()
			.set("expiring", unix_msec(OffsetDateTime::now_utc() + Duration::seconds(30)))
			.expect("Expiring fixture should be stored.");

		let token = relaxed.token().await.expect("Token outside a short margin should be reused.");

		assert_eq!(token.as_str(), "expiring");
		assert_eq!(exchange.calls(), 1);
	}

	#[tokio::test]
	async fn exchange_failure_propagates_without_stale_fallback() {
		let exchange = CountingExchange::new(|_| {
			Err(AuthError::InvalidClient { reason: "AADSTS7000215: invalid secret".into() }.into())
		});
		let credential = credential(exchange.clone());
		let stale_at = unix_msec(OffsetDateTime::now_utc()) - 1_000;
		let stale = credential.cache().set("stale", stale_at).expect("Stale fixture should be stored.");
		let mut req = request();
		let err = credential.apply(&mut req).await.expect_err("Refresh failure must surface.");

		assert!(matches!(err, Error::AuthFailure(AuthError::InvalidClient { .. })));
		assert!(req.headers().get(AUTHORIZATION).is_none());
		assert_eq!(credential.cache().get(), Some(stale));
		assert_eq!(exchange.calls(), 1);
		assert_eq!(credential.refresh_metrics().errors(), 1);
		assert_eq!(credential.refresh_metrics().exchanges(), 1);
	}

	#[tokio::test]
	async fn oversized_token_leaves_cache_unchanged() {
		let exchange = CountingExchange::new(|_| {
			Ok(ExchangedToken::new(
				"a".repeat(TOKEN_BUF_SIZE + 1),
				OffsetDateTime::now_utc() + Duration::hours(1),
			))
		});
		let credential = credential(exchange);
		let mut req = request();
		let err = credential.apply(&mut req).await.expect_err("Oversized token must be rejected.");

		assert!(matches!(err, Error::InvalidArgument(ArgumentError::TokenTooLarge { .. })));
		assert!(credential.cache().get().is_none());
		assert!(req.headers().get(AUTHORIZATION).is_none());
	}

	#[tokio::test]
	async fn token_at_capacity_is_accepted() {
		let exchange = CountingExchange::new(|_| {
			Ok(ExchangedToken::new(
				"a".repeat(TOKEN_BUF_SIZE),
				OffsetDateTime::now_utc() + Duration::hours(1),
			))
		});
		let credential = credential(exchange);
		let mut req = request();

		credential.apply(&mut req).await.expect("Token at capacity should fit.");

		assert_eq!(
			authorization(&req).map(str::len),
			Some("Bearer ".len() + TOKEN_BUF_SIZE)
		);
	}

	#[tokio::test]
	async fn set_scopes_clears_cache_and_applies_to_next_refresh() {
		let exchange = CountingExchange::issuing(Duration::hours(1));
		let mut credential = credential(exchange.clone());
		let scopes = ScopeSet::new(["https://vault.azure.net/.default"])
			.expect("Scope fixture should be valid.");

		credential.token().await.expect("Initial refresh should succeed.");

		assert!(credential.supports_scopes());

		credential.set_scopes(scopes.clone()).expect("Client-secret credential supports scopes.");

		assert!(credential.cache().get().is_none());

		credential.token().await.expect("Refresh with new scopes should succeed.");

		let seen = exchange.seen_scopes.lock().clone();

		assert_eq!(seen.len(), 2);
		assert!(seen[0].is_empty());
		assert_eq!(seen[1], scopes);
	}

	#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
	async fn concurrent_apply_always_attaches_a_token() {
		let exchange = CountingExchange::issuing(Duration::hours(1));
		let credential = Arc::new(credential(exchange.clone()));
		let handles = (0..16)
			.map(|_| {
				let credential = Arc::clone(&credential);

				tokio::spawn(async move {
					let mut req = request();

					credential.apply(&mut req).await?;

					Ok::<_, Error>(authorization(&req).map(str::to_owned).unwrap_or_default())
				})
			})
			.collect::<Vec<_>>();

		for handle in handles {
			let header = handle
				.await
				.expect("Task should not panic.")
				.expect("Concurrent apply should succeed.");

			assert!(header.starts_with("Bearer tok-"), "{header}");
		}

		assert!((1..=16).contains(&exchange.calls()));
		assert!(credential.cache().get().is_some());
	}

	#[test]
	fn debug_redacts_secret_and_token() {
		let credential = credential(CountingExchange::issuing(Duration::hours(1)));

		credential
			.cache()
			.set("super-secret-token", unix_msec(OffsetDateTime::now_utc() + Duration::hours(1)))
			.expect("Token fixture should be stored.");

		let rendered = format!("{credential:?}");

		assert!(!rendered.contains("s1\""));
		assert!(!rendered.contains("super-secret-token"));
		assert!(rendered.contains("<redacted>"));
	}

	#[test]
	fn config_builds_credential() {
		let config = ClientSecretConfig::from_json(
			"{\"tenant_id\":\"t1\",\"client_id\":\"c1\",\"client_secret\":\"s1\",\"scopes\":[\"https://vault.azure.net/.default\"],\"refresh_margin_secs\":120}",
		)
		.expect("Configuration fixture should parse.");
		let credential = ClientSecretCredential::from_config_with_exchange(
			config,
			CountingExchange::issuing(Duration::hours(1)),
		);

		assert_eq!(credential.refresh_policy().margin(), Duration::seconds(120));
		assert!(credential.scopes().contains("https://vault.azure.net/.default"));
		assert_eq!(credential.tenant_id().as_ref(), "t1");
	}
}
