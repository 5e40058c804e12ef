//! Identifiers, secrets, scopes, and the fixed-capacity token cache.

pub mod id;
pub mod scope;
pub mod secret;
pub mod token;

pub use id::*;
pub use scope::*;
pub use secret::*;
pub use token::*;
