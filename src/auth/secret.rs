//! Redacted client secret wrapper.

// self
use crate::{_prelude::*, error::ArgumentError};

/// Client secret that never reaches logs through `Debug` or `Display`.
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub struct ClientSecret(String);
impl ClientSecret {
	/// Wraps a non-empty secret.
	pub fn new(value: impl Into<String>) -> Result<Self, ArgumentError> {
		let value = value.into();

		if value.is_empty() {
			return Err(ArgumentError::EmptySecret);
		}

		Ok(Self(value))
	}

	/// Returns the inner secret. Callers must avoid logging this string.
	pub fn expose(&self) -> &str {
		&self.0
	}
}
impl TryFrom<String> for ClientSecret {
	type Error = ArgumentError;

	fn try_from(value: String) -> Result<Self, Self::Error> {
		Self::new(value)
	}
}
impl Debug for ClientSecret {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_tuple("ClientSecret").field(&"<redacted>").finish()
	}
}
impl Display for ClientSecret {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("<redacted>")
	}
}
