//! Client facade tying the token manager, the token endpoint, and request decoration together.

// std
use std::time::Duration as StdDuration;
// crates.io
use reqwest::{Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
// self
use crate::{
	_prelude::*,
	auth::{Credentials, Token},
	error::{ApiError, ConfigError, RateLimitError, TransportError},
	http::{ApiEndpoint, RequestDecorator},
	manager::{ManagerState, RenewalPolicy, TokenManager},
	obs,
	rate_limit::RateLimit,
	source::HttpTokenSource,
	store::TokenStore,
};

/// Construction-time settings for a [`Client`].
#[derive(Clone, Debug)]
pub struct ClientConfig {
	/// Endpoint every call (token and business) is addressed to.
	pub endpoint: ApiEndpoint,
	/// Per-request timeout, applied to token endpoint calls and business calls alike.
	pub timeout: StdDuration,
	/// Renewal tunables for the token manager.
	pub renewal: RenewalPolicy,
}
impl ClientConfig {
	const DEFAULT_TIMEOUT: StdDuration = StdDuration::from_secs(60);

	/// Overrides the endpoint.
	pub fn with_endpoint(mut self, endpoint: ApiEndpoint) -> Self {
		self.endpoint = endpoint;

		self
	}

	/// Overrides the request timeout (defaults to 60 seconds).
	pub fn with_timeout(mut self, timeout: StdDuration) -> Self {
		self.timeout = timeout;

		self
	}

	/// Overrides the renewal policy.
	pub fn with_renewal(mut self, renewal: RenewalPolicy) -> Self {
		self.renewal = renewal;

		self
	}
}
impl Default for ClientConfig {
	fn default() -> Self {
		Self {
			endpoint: ApiEndpoint::default(),
			timeout: Self::DEFAULT_TIMEOUT,
			renewal: RenewalPolicy::default(),
		}
	}
}

/// Authenticated API client.
///
/// Construction issues the first token and fails if that fails. Afterwards the manager
/// renews tokens in the background while requests read whatever token is current. Clones
/// share the manager; dropping the last clone stops renewals.
#[derive(Clone)]
pub struct Client {
	http: ReqwestClient,
	decorator: RequestDecorator,
	manager: Arc<TokenManager>,
	timeout: StdDuration,
}
impl Client {
	/// Creates a client for the production API from a secret id + secret key pair.
	pub async fn new(secret_id: impl Into<String>, secret_key: impl Into<String>) -> Result<Self> {
		Self::with_config(Credentials::new(secret_id, secret_key), ClientConfig::default()).await
	}

	/// Creates a client with custom settings.
	pub async fn with_config(credentials: Credentials, config: ClientConfig) -> Result<Self> {
		let http = ReqwestClient::builder()
			.timeout(config.timeout)
			.build()
			.map_err(ConfigError::http_client_build)?;

		Self::with_http_client(credentials, config, http).await
	}

	/// Creates a client on top of a caller-provided reqwest client.
	///
	/// The configured timeout is still applied per request.
	pub async fn with_http_client(
		credentials: Credentials,
		config: ClientConfig,
		http: ReqwestClient,
	) -> Result<Self> {
		let store = TokenStore::default();
		let source = Arc::new(
			HttpTokenSource::new(http.clone(), config.endpoint.clone()).with_timeout(config.timeout),
		);
		let manager =
			TokenManager::start(source, credentials, store.clone(), config.renewal).await?;

		Ok(Self {
			http,
			decorator: RequestDecorator::new(config.endpoint, store),
			manager: Arc::new(manager),
			timeout: config.timeout,
		})
	}

	/// Current token snapshot; fails once renewals have halted.
	pub fn token(&self) -> Result<Arc<Token>> {
		self.manager.ensure_healthy()?;
		self.manager.token()
	}

	/// Token manager backing this client.
	pub fn manager(&self) -> &TokenManager {
		&self.manager
	}

	/// Lifecycle state of the token manager.
	pub fn state(&self) -> ManagerState {
		self.manager.state()
	}

	/// Starts a request for `path`, relative to the API version prefix.
	///
	/// Addressing and authentication happen in [`send`](Self::send).
	pub fn request(&self, method: Method, path: &str) -> Result<RequestBuilder> {
		let url = self.decorator.endpoint().relative(path)?;

		Ok(self.http.request(method, url))
	}

	/// Decorates and dispatches a request.
	///
	/// HTTP 429 is converted into [`RateLimitError`]; every other status is returned untouched
	/// for the calling operation to judge. Transport errors propagate as
	/// [`TransportError`].
	pub async fn send(&self, request: RequestBuilder) -> Result<Response> {
		self.manager.ensure_healthy()?;

		let mut request = request.build().map_err(TransportError::from)?;

		self.decorator.decorate(&mut request)?;

		if request.timeout().is_none() {
			*request.timeout_mut() = Some(self.timeout);
		}

		let response = self.http.execute(request).await.map_err(TransportError::from)?;

		if response.status() == StatusCode::TOO_MANY_REQUESTS {
			return Err(throttled(response).await.into());
		}

		Ok(response)
	}

	/// Returns `response` if it carries the `expected` status, otherwise an [`ApiError`] with
	/// the body.
	pub async fn expect(response: Response, expected: StatusCode) -> Result<Response> {
		if response.status() == expected {
			return Ok(response);
		}

		let status = response.status().as_u16();
		let body = response.text().await.unwrap_or_default();

		Err(ApiError::new(status, body).into())
	}

	/// Checks the status like [`expect`](Self::expect) and decodes the JSON body.
	pub async fn expect_json<T>(response: Response, expected: StatusCode) -> Result<T>
	where
		T: DeserializeOwned,
	{
		let response = Self::expect(response, expected).await?;
		let status = response.status().as_u16();
		let bytes = response.bytes().await.map_err(TransportError::from)?;

		serde_json::from_slice(&bytes).map_err(|e| {
			ApiError::new(status, String::from_utf8_lossy(&bytes)).with_source(e).into()
		})
	}

	/// Stops background renewals. The last token stays readable but is no longer renewed.
	pub fn shutdown(&self) {
		self.manager.cancel();
	}
}
impl Debug for Client {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Client")
			.field("endpoint", self.decorator.endpoint())
			.field("manager", &self.manager)
			.field("timeout", &self.timeout)
			.finish()
	}
}

async fn throttled(response: Response) -> RateLimitError {
	let status = response.status().as_u16();
	let rate_limit = RateLimit::from_headers(response.headers());
	let body = response.text().await.unwrap_or_default();

	obs::event!(
		warn,
		limit = rate_limit.limit,
		remaining = rate_limit.remaining,
		reset = rate_limit.reset,
		"request throttled"
	);

	RateLimitError::new(ApiError::new(status, body), rate_limit)
}
