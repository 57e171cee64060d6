//! Shared slot holding the currently published [`Token`].

// self
use crate::{_prelude::*, auth::Token};

/// Read/write-locked slot for the current token snapshot.
///
/// The manager task is the only writer. Readers clone an `Arc` out of the lock, so the
/// read guard is held for a pointer copy only and a reader never sees a half-written token.
/// Cloning the store shares the slot.
#[derive(Clone, Debug, Default)]
pub struct TokenStore(Arc<RwLock<Option<Arc<Token>>>>);
impl TokenStore {
	/// Creates a store that already holds `token`.
	pub fn with_token(token: Token) -> Self {
		Self(Arc::new(RwLock::new(Some(Arc::new(token)))))
	}

	/// Returns the current token, failing fast with [`Error::NotInitialized`] before the first
	/// [`set`](Self::set).
	pub fn get(&self) -> Result<Arc<Token>> {
		self.current().ok_or(Error::NotInitialized)
	}

	/// Returns the current token, if one has been published.
	pub fn current(&self) -> Option<Arc<Token>> {
		self.0.read().clone()
	}

	/// Atomically replaces the current token.
	pub fn set(&self, token: Token) {
		let token = Arc::new(token);

		*self.0.write() = Some(token);
	}

	/// Returns `true` once a token has been published.
	pub fn is_initialized(&self) -> bool {
		self.0.read().is_some()
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn token(access: &str) -> Token {
		let now = OffsetDateTime::now_utc();

		Token::new(access, now + Duration::hours(1), "refresh", now + Duration::days(1))
	}

	#[test]
	fn get_before_first_set_fails_fast() {
		let store = TokenStore::default();

		assert!(!store.is_initialized());
		assert!(store.current().is_none());
		assert!(matches!(store.get(), Err(Error::NotInitialized)));
	}

	#[test]
	fn set_replaces_snapshot_without_touching_old_readers() {
		let store = TokenStore::with_token(token("first"));
		let before = store.get().expect("Seeded store should return a token.");

		store.set(token("second"));

		let after = store.get().expect("Store should return the replacement token.");

		assert_eq!(before.access.expose(), "first");
		assert_eq!(after.access.expose(), "second");
	}

	#[test]
	fn clones_share_the_slot() {
		let store = TokenStore::default();
		let reader = store.clone();

		store.set(token("shared"));

		assert_eq!(reader.get().expect("Clone should observe the write.").access.expose(), "shared");
	}
}
