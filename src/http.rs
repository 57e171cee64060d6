//! Request addressing and decoration for the Bank Account Data API.
//!
//! [`ApiEndpoint`] pins every request to the fixed host and version prefix and stamps the
//! JSON headers. [`RequestDecorator`] layers the bearer token from the [`TokenStore`] on top.
//! Token endpoint calls go through [`ApiEndpoint::address`] only, so their own authentication
//! (credentials pair or refresh token in the body) is never overwritten by a bearer header.

// crates.io
use reqwest::{
	Method, Request,
	header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue},
};
// self
use crate::{_prelude::*, error::ConfigError, store::TokenStore};

/// Host serving the API.
pub const API_HOST: &str = "bankaccountdata.gocardless.com";
/// Version prefix every API path lives under.
pub const API_PATH: &str = "/api/v2";

const JSON: &str = "application/json";

/// Base URL every request is rewritten onto.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ApiEndpoint {
	base: Url,
}
impl ApiEndpoint {
	/// Validates and normalizes a base URL (scheme, host, and version prefix).
	///
	/// Only `https` bases are accepted. A trailing slash is added so relative paths land under
	/// the prefix instead of replacing its last segment.
	pub fn new(mut base: Url) -> Result<Self, ConfigError> {
		if base.scheme() != "https" {
			return Err(ConfigError::InvalidEndpoint {
				url: base.to_string(),
				reason: "scheme must be https",
			});
		}
		if base.host_str().is_none() || base.cannot_be_a_base() {
			return Err(ConfigError::InvalidEndpoint {
				url: base.to_string(),
				reason: "a host is required",
			});
		}
		if !base.path().ends_with('/') {
			let path = format!("{}/", base.path());

			base.set_path(&path);
		}

		base.set_query(None);
		base.set_fragment(None);

		Ok(Self { base })
	}

	/// Normalized base URL.
	pub fn base(&self) -> &Url {
		&self.base
	}

	/// Resolves a path relative to the version prefix.
	///
	/// The path is appended to the base path verbatim, so segments that look like a scheme or
	/// an authority (`http:evil.test`, `accounts:list`) never change the scheme or host.
	/// Dot segments that climb out of the version prefix are rejected.
	pub fn resolve(&self, path: &str) -> Result<Url, ConfigError> {
		let mut url = self.base.clone();

		url.set_path(&format!("{}{}", self.base.path(), path.trim_start_matches('/')));

		if !url.path().starts_with(self.base.path()) {
			return Err(ConfigError::InvalidPath {
				path: path.to_owned(),
				reason: "escapes the API version prefix",
			});
		}

		Ok(url)
	}

	/// URL carrying only `path` on the API origin, for requests that are addressed later by
	/// [`ApiEndpoint::address`] or [`RequestDecorator::decorate`].
	///
	/// A `?query` suffix is kept; a `#fragment` is dropped.
	pub fn relative(&self, path: &str) -> Result<Url, ConfigError> {
		let path = path.split_once('#').map_or(path, |(path, _)| path);
		let (path, query) = match path.split_once('?') {
			Some((path, query)) => (path, Some(query)),
			None => (path, None),
		};
		let mut url = self.base.clone();

		url.set_path(&format!("/{}", path.trim_start_matches('/')));
		url.set_query(query);

		Ok(url)
	}

	/// Rewrites `request` onto the endpoint and sets the JSON headers.
	///
	/// Only the path and query of the incoming URL are kept; scheme, host, and port are forced
	/// and the path is prefixed with the version segment.
	pub fn address(&self, request: &mut Request) -> Result<(), ConfigError> {
		let query = request.url().query().map(str::to_owned);
		let mut url = self.resolve(request.url().path())?;

		url.set_query(query.as_deref());

		*request.url_mut() = url;

		set_json_headers(request.headers_mut());

		Ok(())
	}
}
impl Default for ApiEndpoint {
	fn default() -> Self {
		let base = Url::parse(&format!("https://{API_HOST}{API_PATH}/"))
			.expect("Built-in API endpoint must parse.");

		Self { base }
	}
}

/// Addresses business requests and injects the current bearer token.
#[derive(Clone, Debug)]
pub struct RequestDecorator {
	endpoint: ApiEndpoint,
	store: TokenStore,
}
impl RequestDecorator {
	/// Creates a decorator reading tokens from `store`.
	pub fn new(endpoint: ApiEndpoint, store: TokenStore) -> Self {
		Self { endpoint, store }
	}

	/// Endpoint requests are rewritten onto.
	pub fn endpoint(&self) -> &ApiEndpoint {
		&self.endpoint
	}

	/// Builds a relative request for `path`, ready for [`decorate`](Self::decorate).
	pub fn request(&self, method: Method, path: &str) -> Result<Request, ConfigError> {
		Ok(Request::new(method, self.endpoint.relative(path)?))
	}

	/// Addresses `request` and attaches `Authorization: Bearer <access>` when a token has been
	/// published. Without one the request goes out unauthenticated.
	///
	/// Reads whatever token is current; never waits for an in-flight renewal.
	pub fn decorate(&self, request: &mut Request) -> Result<(), ConfigError> {
		self.endpoint.address(request)?;

		let Some(token) = self.store.current() else {
			return Ok(());
		};

		if let Ok(mut value) = HeaderValue::from_str(&format!("Bearer {}", token.access.expose())) {
			value.set_sensitive(true);
			request.headers_mut().insert(AUTHORIZATION, value);
		}

		Ok(())
	}
}

fn set_json_headers(headers: &mut HeaderMap) {
	headers.insert(CONTENT_TYPE, HeaderValue::from_static(JSON));
	headers.insert(ACCEPT, HeaderValue::from_static(JSON));
}
