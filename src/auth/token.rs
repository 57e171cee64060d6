//! Immutable access/refresh token pair with absolute expiry instants.

// self
use crate::{_prelude::*, auth::TokenSecret};

/// Lifecycle status of one half of a [`Token`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TokenStatus {
	/// Both halves are valid.
	Active,
	/// The access token expired; the refresh token can still renew it.
	AccessExpired,
	/// The refresh token expired; only a full re-issue helps.
	RefreshExpired,
}

/// Two-tier credential published by the token manager.
///
/// Values are never mutated once built; renewals produce a new `Token`.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
	/// Short-lived bearer credential; callers must avoid logging it.
	pub access: TokenSecret,
	/// Instant the access token stops being accepted.
	pub access_expires_at: OffsetDateTime,
	/// Longer-lived credential used to renew `access`.
	pub refresh: TokenSecret,
	/// Instant the refresh token stops being accepted.
	pub refresh_expires_at: OffsetDateTime,
}
impl Token {
	/// Creates a token from absolute expiry instants.
	pub fn new(
		access: impl Into<TokenSecret>,
		access_expires_at: OffsetDateTime,
		refresh: impl Into<TokenSecret>,
		refresh_expires_at: OffsetDateTime,
	) -> Self {
		Self { access: access.into(), access_expires_at, refresh: refresh.into(), refresh_expires_at }
	}

	/// Instant the access token should be renewed, `margin` ahead of its expiry.
	pub fn renew_access_at(&self, margin: Duration) -> OffsetDateTime {
		self.access_expires_at.saturating_sub(margin)
	}

	/// Instant the refresh token should be replaced, `margin` ahead of its expiry.
	pub fn renew_refresh_at(&self, margin: Duration) -> OffsetDateTime {
		self.refresh_expires_at.saturating_sub(margin)
	}

	/// Computes the status at a given instant.
	///
	/// Refresh expiry wins regardless of how the two instants are ordered.
	pub fn status_at(&self, instant: OffsetDateTime) -> TokenStatus {
		if instant >= self.refresh_expires_at {
			return TokenStatus::RefreshExpired;
		}
		if instant >= self.access_expires_at {
			return TokenStatus::AccessExpired;
		}

		TokenStatus::Active
	}

	/// Convenience helper that checks the status using the current UTC instant.
	pub fn status(&self) -> TokenStatus {
		self.status_at(OffsetDateTime::now_utc())
	}

	/// Returns `true` if the access token can still be sent at `instant`.
	pub fn is_access_valid_at(&self, instant: OffsetDateTime) -> bool {
		matches!(self.status_at(instant), TokenStatus::Active)
	}
}
impl Debug for Token {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Token")
			.field("access", &"<redacted>")
			.field("access_expires_at", &self.access_expires_at)
			.field("refresh", &"<redacted>")
			.field("refresh_expires_at", &self.refresh_expires_at)
			.finish()
	}
}
