//! Secret-store contract and built-in store implementations.
//!
//! A [`SecretStore`] resolves an opaque [`SecretId`] to the raw secret string. Parsing the
//! payload into [`Credentials`](crate::auth::Credentials) is the cache's job, so stores stay
//! ignorant of field names and formats.

#[cfg(feature = "reqwest")] pub mod extension;
pub mod file;
pub mod memory;

#[cfg(feature = "reqwest")] pub use extension::ExtensionSecretStore;
pub use file::FileSecretStore;
pub use memory::MemorySecretStore;

// self
use crate::{_prelude::*, auth::SecretId};

/// Boxed future returned by [`SecretStore`] lookups.
pub type SecretFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, SecretStoreError>> + 'a + Send>>;

/// Lookup contract implemented by secret-store backends.
pub trait SecretStore
where
	Self: Send + Sync,
{
	/// Fetches the raw secret string stored under `id`.
	fn fetch_secret<'a>(&'a self, id: &'a SecretId) -> SecretFuture<'a, String>;
}

/// Error type produced by [`SecretStore`] implementations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum SecretStoreError {
	/// No secret exists under the requested identifier.
	#[error("Secret `{secret_id}` was not found.")]
	NotFound {
		/// Identifier that was requested.
		secret_id: String,
	},
	/// The caller is not permitted to read the secret.
	#[error("Access to the secret was denied: {message}.")]
	Denied {
		/// Human-readable error payload.
		message: String,
	},
	/// Backend-level failure for the storage engine.
	#[error("Backend failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
	/// Network failure while reaching the store.
	#[error("Transport failure: {message}.")]
	Transport {
		/// Human-readable error payload.
		message: String,
	},
}
