//! Async access layer for the GoCardless Bank Account Data API: self-renewing access/refresh
//! tokens, request decoration, and typed rate-limit errors in one crate.
//!
//! The heart of the crate is the [`manager::TokenManager`], a background task that keeps the
//! two-tier credential published in a [`store::TokenStore`] fresh while any number of callers
//! read it concurrently. [`client::Client`] wires the manager, the token endpoint
//! ([`source::HttpTokenSource`]), and the [`http::RequestDecorator`] together.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod auth;
pub mod client;
pub mod error;
pub mod http;
pub mod manager;
pub mod obs;
pub mod rate_limit;
pub mod source;
pub mod store;
#[doc(hidden)]
pub mod _preludet {
	//! Convenience re-exports and helpers for unit and integration tests.

	pub use crate::_prelude::*;

	// self
	use crate::{
		auth::{Credentials, Token},
		client::{Client, ClientConfig},
		http::ApiEndpoint,
		manager::RenewalPolicy,
	};

	/// Builds a reqwest client that accepts the self-signed certificates produced by
	/// `httpmock` during tests.
	pub fn test_reqwest_client() -> ReqwestClient {
		ReqwestClient::builder()
			.danger_accept_invalid_certs(true)
			.danger_accept_invalid_hostnames(true)
			.build()
			.expect("Failed to build insecure Reqwest client for tests.")
	}

	/// Points an [`ApiEndpoint`] at a mock server base URL (for example `server.url("/api/v2")`).
	pub fn test_endpoint(base: &str) -> ApiEndpoint {
		let url = Url::parse(base).expect("Mock server base URL should parse.");

		ApiEndpoint::new(url).expect("Mock server endpoint should be accepted.")
	}

	/// Credentials fixture shared by the integration suites.
	pub fn test_credentials() -> Credentials {
		Credentials::new("secret-id-fixture", "secret-key-fixture")
	}

	/// Builds a token whose access and refresh halves expire after the given offsets from now.
	pub fn token_expiring_in(
		access: &str,
		access_in: Duration,
		refresh: &str,
		refresh_in: Duration,
	) -> Token {
		let now = OffsetDateTime::now_utc();

		Token::new(access, now + access_in, refresh, now + refresh_in)
	}

	/// Starts a [`Client`] against a mock server using the insecure test transport.
	pub async fn build_test_client(base: &str) -> Result<Client> {
		let config = ClientConfig::default()
			.with_endpoint(test_endpoint(base))
			.with_renewal(RenewalPolicy::default());

		Client::with_http_client(test_credentials(), config, test_reqwest_client()).await
	}
}

mod _prelude {
	pub use std::{
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		sync::Arc,
	};

	pub use parking_lot::{Mutex, RwLock};
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError, StatusCode};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

pub use reqwest;
pub use url;
#[cfg(test)] use {color_eyre as _, httpmock as _};
