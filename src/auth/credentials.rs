//! Long-lived API credentials exchanged for tokens.

// self
use crate::{_prelude::*, auth::TokenSecret};

/// Secret id + secret key pair issued by the API console.
///
/// Only the token endpoint ever sees these values; business calls use the bearer token.
#[derive(Clone, PartialEq, Eq, Serialize)]
pub struct Credentials {
	/// Public half of the pair.
	pub secret_id: TokenSecret,
	/// Private half of the pair.
	pub secret_key: TokenSecret,
}
impl Credentials {
	/// Creates a credentials pair.
	pub fn new(secret_id: impl Into<String>, secret_key: impl Into<String>) -> Self {
		Self {
			secret_id: TokenSecret::new(secret_id),
			secret_key: TokenSecret::new(secret_key),
		}
	}
}
impl Debug for Credentials {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Credentials")
			.field("secret_id", &self.secret_id)
			.field("secret_key", &self.secret_key)
			.finish()
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn credentials_debug_never_leaks_secrets() {
		let rendered = format!("{:?}", Credentials::new("id-123", "key-456"));

		assert!(!rendered.contains("id-123"));
		assert!(!rendered.contains("key-456"));
	}

	#[test]
	fn credentials_serialize_as_token_request_body() {
		let body = serde_json::to_value(Credentials::new("id", "key"))
			.expect("Credentials should serialize to JSON.");

		assert_eq!(body, serde_json::json!({ "secret_id": "id", "secret_key": "key" }));
	}
}
