//! Rate-limit header interpretation for throttled (HTTP 429) responses.
//!
//! The API publishes two header families: a global one and an account-scoped one that
//! applies to per-account endpoints. When both are present the account-scoped value wins,
//! field by field.

// crates.io
use reqwest::header::HeaderMap;
// self
use crate::_prelude::*;

const LIMIT: &str = "http_x_ratelimit_limit";
const REMAINING: &str = "http_x_ratelimit_remaining";
const RESET: &str = "http_x_ratelimit_reset";
const ACCOUNT_LIMIT: &str = "http_x_ratelimit_account_success_limit";
const ACCOUNT_REMAINING: &str = "http_x_ratelimit_account_success_remaining";
const ACCOUNT_RESET: &str = "http_x_ratelimit_account_success_reset";

/// Quota snapshot parsed from rate-limit headers.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimit {
	/// Maximum number of requests allowed in the window.
	pub limit: i64,
	/// Requests remaining before the limit is hit.
	pub remaining: i64,
	/// Seconds until the limit resets.
	pub reset: i64,
}
impl RateLimit {
	/// Extracts the quota from response headers; absent or non-numeric values become 0.
	///
	/// Signed values are kept as sent, so a `-1` sentinel survives.
	pub fn from_headers(headers: &HeaderMap) -> Self {
		Self {
			limit: preferred(headers, ACCOUNT_LIMIT, LIMIT),
			remaining: preferred(headers, ACCOUNT_REMAINING, REMAINING),
			reset: preferred(headers, ACCOUNT_RESET, RESET),
		}
	}

	/// Time until the quota resets.
	pub fn resets(&self) -> Duration {
		Duration::seconds(self.reset)
	}
}

// An account-scoped header that is present but empty falls back to the global one.
fn preferred(headers: &HeaderMap, account: &str, global: &str) -> i64 {
	let raw = headers
		.get(account)
		.and_then(|v| v.to_str().ok())
		.filter(|v| !v.trim().is_empty())
		.or_else(|| headers.get(global).and_then(|v| v.to_str().ok()));

	raw.and_then(|v| v.trim().parse().ok()).unwrap_or(0)
}
