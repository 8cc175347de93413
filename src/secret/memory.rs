//! Thread-safe in-memory [`SecretStore`] for local development and tests.

// std
use std::sync::atomic::{AtomicUsize, Ordering};
// self
use crate::{
	_prelude::*,
	auth::SecretId,
	secret::{SecretFuture, SecretStore, SecretStoreError},
};

type SecretMap = Arc<RwLock<HashMap<SecretId, String>>>;

/// Secret store that keeps payloads in-process and counts lookups.
///
/// Payloads can be swapped at runtime with [`MemorySecretStore::insert`] to simulate rotation.
#[derive(Clone, Debug, Default)]
pub struct MemorySecretStore {
	secrets: SecretMap,
	fetches: Arc<AtomicUsize>,
}
impl MemorySecretStore {
	/// Seeds the store with a single payload.
	pub fn with_secret(id: SecretId, payload: impl Into<String>) -> Self {
		let store = Self::default();

		store.insert(id, payload);

		store
	}

	/// Inserts or replaces the payload stored under `id`.
	pub fn insert(&self, id: SecretId, payload: impl Into<String>) {
		self.secrets.write().insert(id, payload.into());
	}

	/// Removes the payload stored under `id`, returning it if present.
	pub fn remove(&self, id: &SecretId) -> Option<String> {
		self.secrets.write().remove(id)
	}

	/// Number of lookups served so far, including failed ones.
	pub fn fetches(&self) -> usize {
		self.fetches.load(Ordering::SeqCst)
	}

	fn fetch_now(map: &SecretMap, id: &SecretId) -> Result<String, SecretStoreError> {
		map.read()
			.get(id)
			.cloned()
			.ok_or_else(|| SecretStoreError::NotFound { secret_id: id.to_string() })
	}
}
impl SecretStore for MemorySecretStore {
	fn fetch_secret<'a>(&'a self, id: &'a SecretId) -> SecretFuture<'a, String> {
		self.fetches.fetch_add(1, Ordering::SeqCst);

		let map = self.secrets.clone();

		Box::pin(async move { Self::fetch_now(&map, id) })
	}
}
