//! Authorizes pipeline requests with a client-secret credential whose token endpoint is a local
//! mock, showing that the second request reuses the cached token.

// std
use std::sync::Arc;
// crates.io
use color_eyre::Result;
use httpmock::prelude::*;
// self
use token_credentials::{
	auth::ScopeSet,
	authority::Authority,
	credential::{ClientSecretCredential, Credential},
	exchange::{OAuth2Exchange, ReqwestExchange, ReqwestTransportErrorMapper},
	http::{HttpRequest, ReqwestHttpClient},
	policy::CredentialPolicy,
	reqwest::Client,
};

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let server = MockServer::start_async().await;
	let token_mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/demo-tenant/oauth2/v2.0/token");
			then.status(200).header("content-type", "application/json").body(
				"{\"access_token\":\"demo-access\",\"token_type\":\"Bearer\",\"expires_in\":3599}",
			);
		})
		.await;
	let http_client = ReqwestHttpClient::with_client(
		Client::builder()
			.danger_accept_invalid_certs(true)
			.danger_accept_invalid_hostnames(true)
			.build()?,
	);
	let exchange: ReqwestExchange = OAuth2Exchange::with_http_client(
		Authority::parse(&server.url("/"))?,
		http_client,
		ReqwestTransportErrorMapper,
	);
	let credential = ClientSecretCredential::with_exchange(
		"demo-tenant",
		"demo-client",
		"super-secret",
		Arc::new(exchange),
	)?
	.with_scopes(ScopeSet::new(["https://vault.azure.net/.default"])?);
	let metrics = credential.refresh_metrics();
	let credential: Arc<dyn Credential> = Arc::new(credential);
	let policy = CredentialPolicy::from(Some(credential));

	for path in ["/secrets/db", "/secrets/cache"] {
		let mut request = HttpRequest::new(Vec::new());

		*request.uri_mut() = format!("https://vault.example.com{path}").parse()?;

		policy.process(&mut request).await?;

		println!(
			"{path}: authorization attached = {}",
			request.headers().contains_key("authorization")
		);
	}

	println!(
		"token endpoint calls = {}, cached refreshes = {}",
		token_mock.calls_async().await,
		metrics.cached()
	);

	Ok(())
}
