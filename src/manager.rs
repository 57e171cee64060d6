//! Background token lifecycle: issue once, then renew ahead of every expiry.
//!
//! [`TokenManager::start`] performs the initial issuance synchronously and only spawns the
//! renewal task once a token is published. The task derives a [`RenewalSchedule`] from the
//! current token, sleeps until the earliest deadline (or cancellation), calls the
//! [`TokenSource`], and publishes the result into the [`TokenStore`] before scheduling again.
//!
//! A failed renewal is fatal: the task stops, the manager moves to [`ManagerState::Failed`],
//! and [`TokenManager::wait`] / [`TokenManager::ensure_healthy`] surface the error. Nothing is
//! retried.

pub mod schedule;

pub use schedule::*;

// crates.io
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
// self
use crate::{
	_prelude::*,
	auth::{Credentials, Token},
	error::AuthError,
	obs::{self, TokenOperation, TokenOutcome, TokenSpan},
	source::TokenSource,
	store::TokenStore,
};

/// Lifecycle state of a [`TokenManager`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ManagerState {
	/// No token has been issued yet.
	#[default]
	Uninitialized,
	/// The renewal task is running.
	Active,
	/// The renewal task was cancelled; the last token stays readable but is no longer renewed.
	Stopped,
	/// A renewal failed and the task stopped.
	Failed,
}

#[derive(Debug, Default)]
struct Status {
	state: ManagerState,
	failure: Option<String>,
}

/// Owns the renewal task and the store it publishes into.
///
/// Dropping the manager cancels the task.
pub struct TokenManager {
	store: TokenStore,
	cancel: CancellationToken,
	status: Arc<Mutex<Status>>,
	task: Mutex<Option<JoinHandle<Result<()>>>>,
}
impl TokenManager {
	/// Issues the first token, publishes it, and spawns the renewal task.
	///
	/// Fails without spawning anything when issuance fails.
	pub async fn start<S>(
		source: Arc<S>,
		credentials: Credentials,
		store: TokenStore,
		policy: RenewalPolicy,
	) -> Result<Self>
	where
		S: 'static + ?Sized + TokenSource,
	{
		let token = call(TokenOperation::Issue, "start", source.issue(&credentials)).await?;

		store.set(token);

		Self::spawn(source, credentials, store, policy)
	}

	/// Spawns the renewal task over a store that already holds a token.
	///
	/// Must be called within a Tokio runtime.
	pub fn spawn<S>(
		source: Arc<S>,
		credentials: Credentials,
		store: TokenStore,
		policy: RenewalPolicy,
	) -> Result<Self>
	where
		S: 'static + ?Sized + TokenSource,
	{
		if !store.is_initialized() {
			return Err(Error::NotInitialized);
		}

		let cancel = CancellationToken::new();
		let status = Arc::new(Mutex::new(Status { state: ManagerState::Active, failure: None }));
		let task = RenewalTask {
			source,
			credentials,
			store: store.clone(),
			policy,
			cancel: cancel.clone(),
			status: status.clone(),
		};
		let handle = tokio::spawn(task.run());

		Ok(Self { store, cancel, status, task: Mutex::new(Some(handle)) })
	}

	/// Store the task publishes into.
	pub fn store(&self) -> &TokenStore {
		&self.store
	}

	/// Current token snapshot.
	pub fn token(&self) -> Result<Arc<Token>> {
		self.store.get()
	}

	/// Current lifecycle state.
	pub fn state(&self) -> ManagerState {
		self.status.lock().state
	}

	/// Returns [`Error::RenewalHalted`] once the task has failed.
	pub fn ensure_healthy(&self) -> Result<()> {
		let status = self.status.lock();

		match status.state {
			ManagerState::Failed => Err(Error::RenewalHalted {
				reason: status.failure.clone().unwrap_or_else(|| "unknown failure".into()),
			}),
			_ => Ok(()),
		}
	}

	/// Requests shutdown. Idempotent; a renewal already in flight still completes and is
	/// published.
	pub fn cancel(&self) {
		self.cancel.cancel();
	}

	/// Returns `true` once [`cancel`](Self::cancel) has been called.
	pub fn is_cancelled(&self) -> bool {
		self.cancel.is_cancelled()
	}

	/// Waits for the task to finish and returns its outcome.
	///
	/// The first caller receives the task's own error; later callers get
	/// [`Error::RenewalHalted`] if the task failed.
	pub async fn wait(&self) -> Result<()> {
		let handle = self.task.lock().take();

		match handle {
			Some(handle) => match handle.await {
				Ok(result) => result,
				Err(e) => {
					let reason = e.to_string();

					mark(&self.status, ManagerState::Failed, Some(reason.clone()));

					Err(Error::RenewalHalted { reason })
				},
			},
			None => self.ensure_healthy(),
		}
	}
}
impl Debug for TokenManager {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenManager")
			.field("state", &self.state())
			.field("cancelled", &self.is_cancelled())
			.finish()
	}
}
impl Drop for TokenManager {
	fn drop(&mut self) {
		self.cancel.cancel();
	}
}

struct RenewalTask<S>
where
	S: ?Sized,
{
	source: Arc<S>,
	credentials: Credentials,
	store: TokenStore,
	policy: RenewalPolicy,
	cancel: CancellationToken,
	status: Arc<Mutex<Status>>,
}
impl<S> RenewalTask<S>
where
	S: 'static + ?Sized + TokenSource,
{
	async fn run(self) -> Result<()> {
		let result = self.renew_until_cancelled().await;

		match &result {
			Ok(()) => {
				obs::event!(info, "token renewal stopped");

				mark(&self.status, ManagerState::Stopped, None);
			},
			Err(e) => {
				obs::event!(error, error = %e, "token renewal failed; no further renewals");

				mark(&self.status, ManagerState::Failed, Some(e.to_string()));
			},
		}

		result
	}

	async fn renew_until_cancelled(&self) -> Result<()> {
		let mut renewed = false;

		loop {
			let token = self.store.get()?;
			let schedule = RenewalSchedule::for_token(&token, self.policy);
			let (renewal, deadline) = schedule.next();
			let wait = self
				.policy
				.paced(RenewalSchedule::wait_until(deadline, OffsetDateTime::now_utc()), renewed);

			obs::event!(debug, ?renewal, %deadline, wait_ms = wait.as_millis() as u64, "renewal scheduled");

			// Cancellation is only observed here; a started renewal always completes.
			tokio::select! {
				biased;
				_ = self.cancel.cancelled() => return Ok(()),
				_ = tokio::time::sleep(wait) => {},
			}

			let next = match renewal {
				Renewal::Reissue =>
					call(TokenOperation::Issue, "reissue", self.source.issue(&self.credentials))
						.await?,
				Renewal::Refresh =>
					call(TokenOperation::Refresh, "refresh", self.source.refresh(&token)).await?,
			};

			self.store.set(next);

			renewed = true;

			obs::event!(info, ?renewal, "token renewed");
		}
	}
}

async fn call<F>(operation: TokenOperation, stage: &'static str, fut: F) -> Result<Token>
where
	F: Future<Output = Result<Token, AuthError>>,
{
	obs::record_token_outcome(operation, TokenOutcome::Attempt);

	let result = TokenSpan::new(operation, stage).instrument(fut).await;

	match &result {
		Ok(_) => obs::record_token_outcome(operation, TokenOutcome::Success),
		Err(_) => obs::record_token_outcome(operation, TokenOutcome::Failure),
	}

	result.map_err(Into::into)
}

fn mark(status: &Mutex<Status>, state: ManagerState, failure: Option<String>) {
	let mut status = status.lock();

	status.state = state;

	if failure.is_some() {
		status.failure = failure;
	}
}
