//! Crate-level error types shared by the token lifecycle, the transport layer, and callers.

// self
use crate::{_prelude::*, obs::TokenOperation, rate_limit::RateLimit};

/// Crate-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Token issuance or refresh failed.
	#[error(transparent)]
	Auth(#[from] AuthError),
	/// Business endpoint answered with an unexpected status.
	#[error(transparent)]
	Api(#[from] ApiError),
	/// Business endpoint throttled the caller with HTTP 429.
	#[error(transparent)]
	RateLimited(#[from] RateLimitError),
	/// Transport failure (DNS, TCP, TLS, timeout) on a business call.
	#[error(transparent)]
	Transport(#[from] TransportError),
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),

	/// The token store has not received its first token yet.
	#[error("Token store has not been initialized with a token.")]
	NotInitialized,
	/// The renewal task hit a fatal failure; the published token can no longer be trusted.
	#[error("Token renewal halted after a fatal failure: {reason}.")]
	RenewalHalted {
		/// Rendering of the failure that stopped the renewal task.
		reason: String,
	},
}
impl Error {
	/// Returns the [`ApiError`] carried by this error, including the one wrapped by a
	/// [`RateLimitError`].
	pub fn api_error(&self) -> Option<&ApiError> {
		match self {
			Self::Api(e) => Some(e),
			Self::RateLimited(e) => Some(&e.api),
			_ => None,
		}
	}

	/// Returns the [`RateLimitError`] if the call was throttled.
	pub fn rate_limit_error(&self) -> Option<&RateLimitError> {
		match self {
			Self::RateLimited(e) => Some(e),
			_ => None,
		}
	}
}

/// Failures raised while talking to the token endpoint.
#[derive(Debug, ThisError)]
pub enum AuthError {
	/// Token endpoint answered with a non-success status.
	#[error("Token {operation} was rejected with status {status}: {body}.")]
	Rejected {
		/// Operation that was rejected.
		operation: TokenOperation,
		/// HTTP status code.
		status: u16,
		/// Raw response body.
		body: String,
	},
	/// Token endpoint could not be reached.
	#[error("Network error occurred during token {operation}.")]
	Transport {
		/// Operation that failed.
		operation: TokenOperation,
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Token endpoint responded with JSON that does not match the token schema.
	#[error("Token {operation} returned a malformed response.")]
	MalformedResponse {
		/// Operation that failed.
		operation: TokenOperation,
		/// HTTP status code.
		status: u16,
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
	},
	/// Token endpoint omitted a field the operation requires.
	#[error("Token {operation} response is missing `{field}`.")]
	MissingField {
		/// Operation that failed.
		operation: TokenOperation,
		/// Missing response field.
		field: &'static str,
	},
	/// Token endpoint returned a negative or unrepresentable lifetime.
	#[error("Token {operation} returned an invalid `{field}` lifetime.")]
	InvalidLifetime {
		/// Operation that failed.
		operation: TokenOperation,
		/// Offending response field.
		field: &'static str,
	},
}
impl AuthError {
	/// Wraps a transport-specific network error.
	pub fn transport(
		operation: TokenOperation,
		src: impl 'static + Send + Sync + std::error::Error,
	) -> Self {
		Self::Transport { operation, source: Box::new(src) }
	}

	/// Operation that produced the failure.
	pub fn operation(&self) -> TokenOperation {
		match self {
			Self::Rejected { operation, .. }
			| Self::Transport { operation, .. }
			| Self::MalformedResponse { operation, .. }
			| Self::MissingField { operation, .. }
			| Self::InvalidLifetime { operation, .. } => *operation,
		}
	}

	/// HTTP status code, when the endpoint answered at all.
	pub fn status(&self) -> Option<u16> {
		match self {
			Self::Rejected { status, .. } | Self::MalformedResponse { status, .. } => Some(*status),
			_ => None,
		}
	}
}

/// Business endpoint returned a status code the calling operation did not expect.
#[derive(Debug, ThisError)]
#[error("API error {status}: {body}")]
pub struct ApiError {
	/// HTTP status code.
	pub status: u16,
	/// Raw response body.
	pub body: String,
	/// Optional underlying cause.
	#[source]
	pub source: Option<BoxError>,
}
impl ApiError {
	/// Creates an error for the provided status and body.
	pub fn new(status: u16, body: impl Into<String>) -> Self {
		Self { status, body: body.into(), source: None }
	}

	/// Attaches an underlying cause.
	pub fn with_source(mut self, src: impl 'static + Send + Sync + std::error::Error) -> Self {
		self.source = Some(Box::new(src));

		self
	}
}

/// HTTP 429 specialization of [`ApiError`] carrying the parsed [`RateLimit`] headers.
///
/// [`StdError::source`] yields the wrapped [`ApiError`], so generic inspection for an
/// `ApiError` also matches a throttled response.
#[derive(Debug, ThisError)]
#[error(
	"Rate limited with status {}: limit={} remaining={} reset={}.",
	.api.status,
	.rate_limit.limit,
	.rate_limit.remaining,
	.rate_limit.reset
)]
pub struct RateLimitError {
	/// Wrapped API error (status 429 and raw body).
	#[source]
	pub api: ApiError,
	/// Parsed rate-limit headers.
	pub rate_limit: RateLimit,
}
impl RateLimitError {
	/// Creates a rate-limit error from a throttled response.
	pub fn new(api: ApiError, rate_limit: RateLimit) -> Self {
		Self { api, rate_limit }
	}

	/// Time until the quota resets.
	pub fn resets(&self) -> Duration {
		self.rate_limit.resets()
	}
}
impl AsRef<ApiError> for RateLimitError {
	fn as_ref(&self) -> &ApiError {
		&self.api
	}
}

/// Configuration and validation failures.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// API base URL is not usable.
	#[error("API endpoint `{url}` is invalid: {reason}.")]
	InvalidEndpoint {
		/// Offending URL.
		url: String,
		/// Why the URL was rejected.
		reason: &'static str,
	},
	/// A relative path could not be joined onto the API base.
	#[error("Request path `{path}` cannot be joined onto the API endpoint: {reason}.")]
	InvalidPath {
		/// Offending path.
		path: String,
		/// Why the path was rejected.
		reason: &'static str,
	},
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}

/// Transport-level failures on business calls (network, IO).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling the API.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Box::new(src) }
	}
}
impl From<ReqwestError> for TransportError {
	fn from(e: ReqwestError) -> Self {
		Self::network(e)
	}
}
