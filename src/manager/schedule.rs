//! Renewal deadlines derived from a token's expiry instants.

// std
use std::time::Duration as StdDuration;
// self
use crate::{_prelude::*, auth::Token};

/// Tunables for the renewal loop.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RenewalPolicy {
	/// How far ahead of an expiry the matching renewal fires.
	pub margin: Duration,
	/// Shortest pause between two consecutive renewals.
	///
	/// Tokens whose lifetime does not exceed `margin` are due the moment they are published;
	/// this floor keeps the loop from calling the token endpoint back to back.
	pub min_interval: Duration,
}
impl RenewalPolicy {
	/// Default margin: two seconds ahead of each expiry.
	pub const DEFAULT_MARGIN: Duration = Duration::seconds(2);
	/// Default floor between consecutive renewals.
	pub const DEFAULT_MIN_INTERVAL: Duration = Duration::seconds(1);

	/// Overrides the safety margin; negative margins clamp to zero.
	pub fn with_margin(mut self, margin: Duration) -> Self {
		self.margin = non_negative(margin);

		self
	}

	/// Overrides the floor between consecutive renewals; negative values clamp to zero.
	pub fn with_min_interval(mut self, min_interval: Duration) -> Self {
		self.min_interval = non_negative(min_interval);

		self
	}

	/// Wait before the next renewal given the scheduled `wait`, applying the floor when the
	/// previous iteration already renewed.
	pub fn paced(&self, wait: StdDuration, renewed: bool) -> StdDuration {
		if !renewed {
			return wait;
		}

		wait.max(StdDuration::try_from(self.min_interval).unwrap_or(StdDuration::ZERO))
	}
}
impl Default for RenewalPolicy {
	fn default() -> Self {
		Self { margin: Self::DEFAULT_MARGIN, min_interval: Self::DEFAULT_MIN_INTERVAL }
	}
}

/// Which token endpoint call a deadline triggers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Renewal {
	/// Refresh-token exchange; the access token is about to expire.
	Refresh,
	/// Full re-authentication; the refresh token is about to expire.
	Reissue,
}

/// Both renewal deadlines for one token snapshot.
///
/// Recomputed from the current token on every loop iteration.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RenewalSchedule {
	/// Instant the access token is renewed through the refresh token.
	pub refresh_at: OffsetDateTime,
	/// Instant the whole pair is re-issued from the credentials.
	pub reissue_at: OffsetDateTime,
}
impl RenewalSchedule {
	/// Derives the deadlines for `token` under `policy`.
	pub fn for_token(token: &Token, policy: RenewalPolicy) -> Self {
		Self {
			refresh_at: token.renew_access_at(policy.margin),
			reissue_at: token.renew_refresh_at(policy.margin),
		}
	}

	/// Earliest deadline and the renewal it triggers.
	///
	/// Re-issue wins ties since it also yields a fresh access token.
	pub fn next(&self) -> (Renewal, OffsetDateTime) {
		if self.reissue_at <= self.refresh_at {
			(Renewal::Reissue, self.reissue_at)
		} else {
			(Renewal::Refresh, self.refresh_at)
		}
	}

	/// Time left until `deadline`; deadlines in the past yield zero.
	pub fn wait_until(deadline: OffsetDateTime, now: OffsetDateTime) -> StdDuration {
		StdDuration::try_from(deadline - now).unwrap_or(StdDuration::ZERO)
	}
}

fn non_negative(duration: Duration) -> Duration {
	if duration.is_negative() { Duration::ZERO } else { duration }
}
