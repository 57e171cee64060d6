//! Optional observability helpers for token operations.
//!
//! # Feature Flags
//!
//! - Enable `tracing` (default) to emit structured spans named `bank_account_data.token` with
//!   the `operation` (issue/refresh) and `stage` (call site) fields, plus the manager's
//!   scheduling and failure events.
//! - Enable `metrics` to increment the `bank_account_data_token_total` counter for every
//!   attempt/success/failure, labeled by `operation` + `outcome`.

mod metrics;
mod tracing;

pub use metrics::*;
pub use tracing::*;
pub(crate) use tracing::event;

// self
use crate::_prelude::*;

/// Token endpoint operations observed by the crate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TokenOperation {
	/// Credentials exchange for a fresh access/refresh pair.
	Issue,
	/// Refresh-token exchange for a renewed access token.
	Refresh,
}
impl TokenOperation {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			TokenOperation::Issue => "issue",
			TokenOperation::Refresh => "refresh",
		}
	}
}
impl Display for TokenOperation {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded for each attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TokenOutcome {
	/// Entry to a token endpoint call.
	Attempt,
	/// Successful completion.
	Success,
	/// Failure propagated back to the caller.
	Failure,
}
impl TokenOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			TokenOutcome::Attempt => "attempt",
			TokenOutcome::Success => "success",
			TokenOutcome::Failure => "failure",
		}
	}
}
impl Display for TokenOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
