// std
use std::{collections::VecDeque, time::Duration as StdDuration};
// crates.io
use tokio::sync::Notify;
// self
use bank_account_data::{
	_preludet::*,
	auth::{Credentials, Token},
	error::AuthError,
	manager::{ManagerState, RenewalPolicy, TokenManager},
	obs::TokenOperation,
	source::{TokenFuture, TokenSource},
	store::TokenStore,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Call {
	Issue,
	Refresh,
}

/// Reply computed when the call happens so relative lifetimes start at call time.
#[derive(Clone, Copy, Debug)]
enum Reply {
	Token { access_in: Duration, refresh_in: Duration },
	Reject(u16),
}

/// Holds refresh calls until released.
#[derive(Default)]
struct Gate {
	entered: Notify,
	release: Notify,
}

/// Fake endpoint that replays scripted replies and records every call.
///
/// Once the script runs out it hands out long-lived tokens.
#[derive(Default)]
struct ScriptedSource {
	replies: Mutex<VecDeque<Reply>>,
	calls: Mutex<Vec<(Call, String)>>,
	gate: Option<Arc<Gate>>,
}
impl ScriptedSource {
	fn with_replies(replies: impl IntoIterator<Item = Reply>) -> Arc<Self> {
		Arc::new(Self { replies: Mutex::new(replies.into_iter().collect()), ..Default::default() })
	}

	fn gated(gate: Arc<Gate>) -> Arc<Self> {
		Arc::new(Self { gate: Some(gate), ..Default::default() })
	}

	fn calls(&self) -> Vec<Call> {
		self.calls.lock().iter().map(|(call, _)| *call).collect()
	}

	fn answer(&self, call: Call, input: String) -> Result<Token, AuthError> {
		let index = {
			let mut calls = self.calls.lock();

			calls.push((call, input));
			calls.len()
		};
		let reply = self.replies.lock().pop_front().unwrap_or(Reply::Token {
			access_in: Duration::hours(24),
			refresh_in: Duration::days(30),
		});
		let operation = match call {
			Call::Issue => TokenOperation::Issue,
			Call::Refresh => TokenOperation::Refresh,
		};

		match reply {
			Reply::Token { access_in, refresh_in } => Ok(token_expiring_in(
				&format!("access-{index}"),
				access_in,
				&format!("refresh-{index}"),
				refresh_in,
			)),
			Reply::Reject(status) =>
				Err(AuthError::Rejected { operation, status, body: "rejected".into() }),
		}
	}
}
impl TokenSource for ScriptedSource {
	fn issue<'a>(&'a self, credentials: &'a Credentials) -> TokenFuture<'a> {
		let input = credentials.secret_id.expose().to_owned();

		Box::pin(async move { self.answer(Call::Issue, input) })
	}

	fn refresh<'a>(&'a self, current: &'a Token) -> TokenFuture<'a> {
		let input = current.refresh.expose().to_owned();

		Box::pin(async move {
			if let Some(gate) = &self.gate {
				gate.entered.notify_one();
				gate.release.notified().await;
			}

			self.answer(Call::Refresh, input)
		})
	}
}

fn long_lived(access: &str) -> Token {
	token_expiring_in(access, Duration::hours(24), "seed-refresh", Duration::days(30))
}

async fn eventually<F>(what: &str, mut check: F)
where
	F: FnMut() -> bool,
{
	for _ in 0..200 {
		if check() {
			return;
		}

		tokio::time::sleep(StdDuration::from_millis(10)).await;
	}

	panic!("Timed out waiting for {what}.");
}

fn spawn(source: Arc<ScriptedSource>, token: Token, policy: RenewalPolicy) -> TokenManager {
	TokenManager::spawn(source, test_credentials(), TokenStore::with_token(token), policy)
		.expect("Manager should spawn over a seeded store.")
}

#[tokio::test]
async fn start_issues_synchronously_and_publishes() {
	let source = ScriptedSource::with_replies([]);
	let store = TokenStore::default();
	let manager =
		TokenManager::start(source.clone(), test_credentials(), store.clone(), Default::default())
			.await
			.expect("Manager should start when issuance succeeds.");

	assert_eq!(manager.state(), ManagerState::Active);
	assert_eq!(source.calls(), vec![Call::Issue]);
	assert_eq!(source.calls.lock()[0].1, "secret-id-fixture");
	assert_eq!(store.get().expect("Store should hold the issued token.").access.expose(), "access-1");

	manager.cancel();
	manager.wait().await.expect("Cancelled manager should stop cleanly.");
}

#[tokio::test]
async fn start_fails_when_issuance_fails() {
	let source = ScriptedSource::with_replies([Reply::Reject(401)]);
	let store = TokenStore::default();
	let err = TokenManager::start(source.clone(), test_credentials(), store.clone(), Default::default())
		.await
		.expect_err("Manager must not start without an initial token.");

	assert!(matches!(err, Error::Auth(AuthError::Rejected { status: 401, .. })));
	assert!(!store.is_initialized());
	assert_eq!(source.calls(), vec![Call::Issue]);
}

#[tokio::test]
async fn spawn_requires_a_published_token() {
	let err = TokenManager::spawn(
		ScriptedSource::with_replies([]),
		test_credentials(),
		TokenStore::default(),
		Default::default(),
	)
	.expect_err("Spawning over an empty store should fail fast.");

	assert!(matches!(err, Error::NotInitialized));
}

#[tokio::test]
async fn expired_access_token_is_refreshed_first() {
	let source = ScriptedSource::with_replies([]);
	let seed =
		token_expiring_in("stale", Duration::seconds(-5), "seed-refresh", Duration::days(30));
	let manager = spawn(source.clone(), seed, Default::default());

	eventually("the refreshed token", || {
		manager.token().map(|t| t.access.expose() == "access-1").unwrap_or(false)
	})
	.await;

	manager.cancel();
	manager.wait().await.expect("Cancelled manager should stop cleanly.");

	assert_eq!(source.calls(), vec![Call::Refresh]);
	assert_eq!(source.calls.lock()[0].1, "seed-refresh");
	assert_eq!(manager.state(), ManagerState::Stopped);
}

#[tokio::test]
async fn expired_refresh_token_triggers_reissue() {
	let source = ScriptedSource::with_replies([]);
	let seed = token_expiring_in("a", Duration::hours(1), "expired", Duration::seconds(-5));
	let manager = spawn(source.clone(), seed, Default::default());

	eventually("the re-issued token", || {
		manager.token().map(|t| t.refresh.expose() == "refresh-1").unwrap_or(false)
	})
	.await;

	manager.cancel();
	manager.wait().await.expect("Cancelled manager should stop cleanly.");

	assert_eq!(source.calls(), vec![Call::Issue]);
}

#[tokio::test]
async fn both_expired_prefers_reissue() {
	let source = ScriptedSource::with_replies([]);
	let seed = token_expiring_in("a", Duration::seconds(-5), "r", Duration::seconds(-5));
	let manager = spawn(source.clone(), seed, Default::default());

	eventually("the re-issued token", || {
		manager.token().map(|t| t.access.expose() == "access-1").unwrap_or(false)
	})
	.await;

	manager.cancel();
	manager.wait().await.expect("Cancelled manager should stop cleanly.");

	assert_eq!(source.calls(), vec![Call::Issue]);
}

#[tokio::test]
async fn renewals_rearm_from_the_new_token() {
	let policy =
		RenewalPolicy::default().with_margin(Duration::ZERO).with_min_interval(Duration::ZERO);
	let source = ScriptedSource::with_replies([Reply::Token {
		access_in: Duration::milliseconds(150),
		refresh_in: Duration::days(30),
	}]);
	let seed = token_expiring_in("stale", Duration::seconds(-1), "seed", Duration::days(30));
	let manager = spawn(source.clone(), seed, policy);

	eventually("the second refresh", || {
		manager.token().map(|t| t.access.expose() == "access-2").unwrap_or(false)
	})
	.await;

	manager.cancel();
	manager.wait().await.expect("Cancelled manager should stop cleanly.");

	let calls = source.calls.lock().clone();

	assert_eq!(calls.len(), 2);
	assert_eq!(calls[0], (Call::Refresh, "seed".to_owned()));
	assert_eq!(calls[1], (Call::Refresh, "refresh-1".to_owned()));
}

#[tokio::test]
async fn cancellation_before_any_deadline_makes_no_calls() {
	let source = ScriptedSource::with_replies([]);
	let manager = spawn(source.clone(), long_lived("fresh"), Default::default());

	manager.cancel();
	manager.cancel();
	manager.wait().await.expect("Cancelled manager should stop cleanly.");

	assert!(source.calls().is_empty());
	assert_eq!(manager.state(), ManagerState::Stopped);
	assert!(manager.ensure_healthy().is_ok());
	assert_eq!(
		manager.token().expect("Stopped manager should keep the last token.").access.expose(),
		"fresh"
	);
}

#[tokio::test]
async fn refresh_failure_is_fatal_and_observable() {
	let source = ScriptedSource::with_replies([Reply::Reject(500)]);
	let seed = token_expiring_in("stale", Duration::seconds(-5), "seed", Duration::days(30));
	let manager = spawn(source.clone(), seed, Default::default());
	let err = tokio::time::timeout(StdDuration::from_secs(5), manager.wait())
		.await
		.expect("Failed manager should finish instead of retrying.")
		.expect_err("Refresh failure should surface as an error.");

	assert!(matches!(
		err,
		Error::Auth(AuthError::Rejected { operation: TokenOperation::Refresh, status: 500, .. })
	));
	assert_eq!(manager.state(), ManagerState::Failed);
	assert!(matches!(manager.ensure_healthy(), Err(Error::RenewalHalted { .. })));
	assert!(matches!(manager.wait().await, Err(Error::RenewalHalted { .. })));
	assert_eq!(source.calls(), vec![Call::Refresh]);
	assert_eq!(
		manager.token().expect("Failed manager keeps the stale token readable.").access.expose(),
		"stale"
	);
}

#[tokio::test]
async fn dropping_the_manager_stops_renewals() {
	let source = ScriptedSource::with_replies([]);
	let manager = spawn(source.clone(), long_lived("fresh"), Default::default());
	let store = manager.store().clone();

	drop(manager);
	tokio::time::sleep(StdDuration::from_millis(50)).await;

	assert!(source.calls().is_empty());
	assert_eq!(store.get().expect("Store outlives the manager.").access.expose(), "fresh");
}

#[tokio::test]
async fn cancel_during_renewal_publishes_the_result_then_stops() {
	let gate = Arc::new(Gate::default());
	let source = ScriptedSource::gated(gate.clone());
	let seed = token_expiring_in("stale", Duration::seconds(-5), "seed", Duration::days(30));
	let manager = spawn(source.clone(), seed, Default::default());

	tokio::time::timeout(StdDuration::from_secs(5), gate.entered.notified())
		.await
		.expect("Refresh should start for an expired access token.");
	manager.cancel();

	assert_eq!(manager.state(), ManagerState::Active);

	gate.release.notify_one();
	tokio::time::timeout(StdDuration::from_secs(5), manager.wait())
		.await
		.expect("Manager should stop once the in-flight refresh completes.")
		.expect("Cancelled manager should stop cleanly.");

	assert_eq!(source.calls(), vec![Call::Refresh]);
	assert_eq!(manager.state(), ManagerState::Stopped);
	assert_eq!(
		manager.token().expect("Refreshed token should be published.").access.expose(),
		"access-1"
	);
}

#[tokio::test]
async fn renewals_that_land_inside_the_margin_are_spaced_out() {
	let policy = RenewalPolicy::default().with_min_interval(Duration::milliseconds(300));
	// One-second lifetimes sit inside the two-second margin, so every deadline is already due.
	let short = Reply::Token { access_in: Duration::seconds(1), refresh_in: Duration::days(30) };
	let source = ScriptedSource::with_replies([short, short, short]);
	let seed = token_expiring_in("stale", Duration::seconds(-5), "seed", Duration::days(30));
	let manager = spawn(source.clone(), seed, policy);

	eventually("the first refresh", || source.calls().len() == 1).await;
	tokio::time::sleep(StdDuration::from_millis(100)).await;

	assert_eq!(source.calls().len(), 1);

	eventually("the second refresh", || source.calls().len() == 2).await;

	manager.cancel();
	manager.wait().await.expect("Cancelled manager should stop cleanly.");
}
