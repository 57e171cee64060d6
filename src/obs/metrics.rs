// self
use crate::obs::{TokenOperation, TokenOutcome};

/// Records a token operation outcome via the global metrics recorder (when enabled).
pub fn record_token_outcome(operation: TokenOperation, outcome: TokenOutcome) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!(
			"bank_account_data_token_total",
			"operation" => operation.as_str(),
			"outcome" => outcome.as_str()
		)
		.increment(1);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = (operation, outcome);
	}
}
