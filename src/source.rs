//! Token endpoint contract and its reqwest-backed implementation.

// std
use std::time::Duration as StdDuration;
// crates.io
use reqwest::{Method, Request};
// self
use crate::{
	_prelude::*,
	auth::{Credentials, Token, TokenSecret},
	error::AuthError,
	http::ApiEndpoint,
	obs::TokenOperation,
};

/// Path of the credentials exchange, relative to the version prefix.
pub const ISSUE_PATH: &str = "token/new/";
/// Path of the refresh-token exchange, relative to the version prefix.
pub const REFRESH_PATH: &str = "token/refresh/";

/// Boxed future returned by [`TokenSource`] operations.
pub type TokenFuture<'a> = Pin<Box<dyn Future<Output = Result<Token, AuthError>> + 'a + Send>>;

/// Produces tokens from the API's token endpoint.
///
/// Both operations are plain exchanges: they read nothing from the token store and publish
/// nothing to it. The manager decides when to call which one.
pub trait TokenSource
where
	Self: Send + Sync,
{
	/// Exchanges the credentials pair for a fresh access/refresh token pair.
	fn issue<'a>(&'a self, credentials: &'a Credentials) -> TokenFuture<'a>;

	/// Exchanges the refresh token held by `current` for a renewed access token.
	///
	/// When the endpoint does not rotate the refresh token, the returned token carries over
	/// `current`'s refresh token and its expiry.
	fn refresh<'a>(&'a self, current: &'a Token) -> TokenFuture<'a>;
}

/// [`TokenSource`] that talks to the real token endpoint over reqwest.
///
/// Requests are addressed through [`ApiEndpoint::address`] and never receive a bearer header.
#[derive(Clone, Debug)]
pub struct HttpTokenSource {
	http: ReqwestClient,
	endpoint: ApiEndpoint,
	timeout: Option<StdDuration>,
}
impl HttpTokenSource {
	/// Creates a source that posts to `endpoint` with `http`.
	pub fn new(http: ReqwestClient, endpoint: ApiEndpoint) -> Self {
		Self { http, endpoint, timeout: None }
	}

	/// Applies a per-request timeout to token calls.
	pub fn with_timeout(mut self, timeout: StdDuration) -> Self {
		self.timeout = Some(timeout);

		self
	}

	async fn exchange<B>(
		&self,
		operation: TokenOperation,
		path: &'static str,
		body: &B,
		previous: Option<&Token>,
	) -> Result<Token, AuthError>
	where
		B: Serialize + ?Sized,
	{
		let payload = serde_json::to_vec(body).map_err(|e| AuthError::transport(operation, e))?;
		let url =
			self.endpoint.relative(path).map_err(|e| AuthError::transport(operation, e))?;
		let mut request = Request::new(Method::POST, url);

		self.endpoint.address(&mut request).map_err(|e| AuthError::transport(operation, e))?;
		*request.body_mut() = Some(payload.into());
		*request.timeout_mut() = self.timeout;

		let response =
			self.http.execute(request).await.map_err(|e| AuthError::transport(operation, e))?;
		let status = response.status();
		let bytes = response.bytes().await.map_err(|e| AuthError::transport(operation, e))?;

		if !status.is_success() {
			return Err(AuthError::Rejected {
				operation,
				status: status.as_u16(),
				body: String::from_utf8_lossy(&bytes).into_owned(),
			});
		}

		let mut de = serde_json::Deserializer::from_slice(&bytes);
		let parsed: TokenResponse = serde_path_to_error::deserialize(&mut de).map_err(|source| {
			AuthError::MalformedResponse { operation, status: status.as_u16(), source }
		})?;

		parsed.into_token(operation, OffsetDateTime::now_utc(), previous)
	}
}
impl TokenSource for HttpTokenSource {
	fn issue<'a>(&'a self, credentials: &'a Credentials) -> TokenFuture<'a> {
		Box::pin(self.exchange(TokenOperation::Issue, ISSUE_PATH, credentials, None))
	}

	fn refresh<'a>(&'a self, current: &'a Token) -> TokenFuture<'a> {
		Box::pin(async move {
			let body = RefreshRequest { refresh: &current.refresh };

			self.exchange(TokenOperation::Refresh, REFRESH_PATH, &body, Some(current)).await
		})
	}
}

#[derive(Serialize)]
struct RefreshRequest<'a> {
	refresh: &'a TokenSecret,
}

/// Token endpoint payload. Lifetimes are seconds relative to the response.
#[derive(Debug, Deserialize)]
struct TokenResponse {
	access: TokenSecret,
	access_expires: i64,
	#[serde(default)]
	refresh: Option<TokenSecret>,
	#[serde(default)]
	refresh_expires: Option<i64>,
}
impl TokenResponse {
	fn into_token(
		self,
		operation: TokenOperation,
		now: OffsetDateTime,
		previous: Option<&Token>,
	) -> Result<Token, AuthError> {
		let access_expires_at = expiry(operation, "access_expires", now, self.access_expires)?;
		let (refresh, refresh_expires_at) = match (self.refresh, self.refresh_expires, previous) {
			(Some(refresh), Some(secs), _) =>
				(refresh, expiry(operation, "refresh_expires", now, secs)?),
			(Some(refresh), None, Some(previous)) => (refresh, previous.refresh_expires_at),
			(None, _, Some(previous)) => (previous.refresh.clone(), previous.refresh_expires_at),
			(Some(_), None, None) =>
				return Err(AuthError::MissingField { operation, field: "refresh_expires" }),
			(None, _, None) => return Err(AuthError::MissingField { operation, field: "refresh" }),
		};

		Ok(Token::new(self.access, access_expires_at, refresh, refresh_expires_at))
	}
}

fn expiry(
	operation: TokenOperation,
	field: &'static str,
	now: OffsetDateTime,
	secs: i64,
) -> Result<OffsetDateTime, AuthError> {
	if secs < 0 {
		return Err(AuthError::InvalidLifetime { operation, field });
	}

	now.checked_add(Duration::seconds(secs)).ok_or(AuthError::InvalidLifetime { operation, field })
}
