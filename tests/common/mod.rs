//! Shared fixtures for integration tests against mock token endpoints.

#![allow(dead_code)]

// std
use std::sync::Arc;
// crates.io
use httpmock::prelude::*;
// self
use token_credentials::{
	authority::Authority,
	credential::ClientSecretCredential,
	exchange::{OAuth2Exchange, ReqwestExchange, ReqwestTransportErrorMapper},
	http::{HttpRequest, ReqwestHttpClient},
	reqwest::{Client, ClientBuilder},
};

pub const TENANT_ID: &str = "t1";
pub const CLIENT_ID: &str = "c1";
pub const CLIENT_SECRET: &str = "s1";
pub const TOKEN_PATH: &str = "/t1/oauth2/v2.0/token";

/// Reqwest builder that accepts the mock server's self-signed certificate.
pub fn test_reqwest_client_builder() -> ClientBuilder {
	Client::builder().danger_accept_invalid_certs(true).danger_accept_invalid_hostnames(true)
}

/// Builds a reqwest transport that accepts the mock server's self-signed certificate.
pub fn test_reqwest_http_client() -> ReqwestHttpClient {
	let client = test_reqwest_client_builder()
		.build()
		.expect("Failed to build insecure Reqwest client for tests.");

	ReqwestHttpClient::with_client(client)
}

/// Authority whose host is `server`.
pub fn mock_authority(server: &MockServer) -> Authority {
	Authority::parse(&server.url("/")).expect("Mock authority host should be accepted.")
}

/// Exchange pointed at `server`.
pub fn build_exchange(server: &MockServer) -> ReqwestExchange {
	build_exchange_with(mock_authority(server), test_reqwest_http_client())
}

/// Exchange using a caller-chosen authority and transport.
pub fn build_exchange_with(
	authority: Authority,
	http_client: ReqwestHttpClient,
) -> ReqwestExchange {
	OAuth2Exchange::with_http_client(authority, http_client, ReqwestTransportErrorMapper)
}

/// Client-secret credential whose token endpoint is `server`.
pub fn build_credential(server: &MockServer) -> ClientSecretCredential {
	credential_with_exchange(build_exchange(server))
}

/// Client-secret credential backed by `exchange`.
pub fn credential_with_exchange(exchange: ReqwestExchange) -> ClientSecretCredential {
	ClientSecretCredential::with_exchange(TENANT_ID, CLIENT_ID, CLIENT_SECRET, Arc::new(exchange))
		.expect("Credential fixture should be valid.")
}

/// Outgoing request fixture.
pub fn request() -> HttpRequest {
	HttpRequest::new(Vec::new())
}

/// Token endpoint success body.
pub fn token_body(access_token: &str, expires_in: i64) -> String {
	format!(
		"{{\"token_type\":\"Bearer\",\"expires_in\":{expires_in},\"ext_expires_in\":{expires_in},\"access_token\":\"{access_token}\"}}"
	)
}
