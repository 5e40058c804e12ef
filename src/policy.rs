//! Pipeline stage that authorizes every outgoing request with one credential.

// self
use crate::{
	_prelude::*,
	credential::{ANONYMOUS, Credential},
	http::HttpRequest,
};

/// Holds the credential a pipeline uses and applies it to each request.
///
/// The pipeline never inspects which credential it holds; an absent credential is represented
/// by [`AnonymousCredential`](crate::credential::AnonymousCredential).
#[derive(Clone)]
pub struct CredentialPolicy {
	credential: Arc<dyn Credential>,
}
impl CredentialPolicy {
	/// Wraps a shared credential.
	pub fn new(credential: Arc<dyn Credential>) -> Self {
		Self { credential }
	}

	/// Policy that sends requests without authorization.
	pub fn anonymous() -> Self {
		Self::new(Arc::new(ANONYMOUS))
	}

	/// Credential applied to requests.
	pub fn credential(&self) -> &Arc<dyn Credential> {
		&self.credential
	}

	/// Authorizes `request`; on error the request must not be sent.
	pub async fn process(&self, request: &mut HttpRequest) -> Result<()> {
		self.credential.apply(request).await
	}
}
impl Default for CredentialPolicy {
	fn default() -> Self {
		Self::anonymous()
	}
}
impl From<Arc<dyn Credential>> for CredentialPolicy {
	fn from(credential: Arc<dyn Credential>) -> Self {
		Self::new(credential)
	}
}
impl From<Option<Arc<dyn Credential>>> for CredentialPolicy {
	fn from(credential: Option<Arc<dyn Credential>>) -> Self {
		credential.map(Self::new).unwrap_or_else(Self::anonymous)
	}
}
impl Debug for CredentialPolicy {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("CredentialPolicy").field("credential", &self.credential.kind()).finish()
	}
}
