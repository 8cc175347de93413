//! Directory-backed [`SecretStore`] for lightweight deployments and local runs.

// std
use std::{
	fs,
	io::ErrorKind,
	path::{Component, Path, PathBuf},
};
// self
use crate::{
	_prelude::*,
	auth::SecretId,
	secret::{SecretFuture, SecretStore, SecretStoreError},
};

/// Resolves each secret identifier to `<root>/<identifier>.json` and reads it on every lookup.
///
/// Identifiers containing `/` map onto nested directories; parent-directory components are
/// refused so a lookup can never escape `root`.
#[derive(Clone, Debug)]
pub struct FileSecretStore {
	root: PathBuf,
}
impl FileSecretStore {
	const SUFFIX: &'static str = ".json";

	/// Creates a store rooted at `root`.
	pub fn new(root: impl Into<PathBuf>) -> Self {
		Self { root: root.into() }
	}

	/// Returns the directory secrets are read from.
	pub fn root(&self) -> &Path {
		&self.root
	}

	fn path_for(&self, id: &SecretId) -> Result<PathBuf, SecretStoreError> {
		let relative = Path::new(id.as_str());

		if !relative.components().all(|component| matches!(component, Component::Normal(_))) {
			return Err(SecretStoreError::Denied {
				message: format!("Secret identifier `{id}` escapes the store root"),
			});
		}

		let mut path = self.root.join(relative).into_os_string();

		path.push(Self::SUFFIX);

		Ok(path.into())
	}

	fn read_now(&self, id: &SecretId) -> Result<String, SecretStoreError> {
		let path = self.path_for(id)?;

		fs::read_to_string(&path).map_err(|e| match e.kind() {
			ErrorKind::NotFound => SecretStoreError::NotFound { secret_id: id.to_string() },
			ErrorKind::PermissionDenied => SecretStoreError::Denied {
				message: format!("Failed to read {}: {e}", path.display()),
			},
			_ => SecretStoreError::Backend {
				message: format!("Failed to read {}: {e}", path.display()),
			},
		})
	}
}
impl SecretStore for FileSecretStore {
	fn fetch_secret<'a>(&'a self, id: &'a SecretId) -> SecretFuture<'a, String> {
		Box::pin(async move { self.read_now(id) })
	}
}

#[cfg(test)]
mod tests {
	// std
	use std::{
		process,
		time::{SystemTime, UNIX_EPOCH},
	};
	// self
	use super::*;

	fn scratch_dir(label: &str) -> PathBuf {
		let nanos = SystemTime::now()
			.duration_since(UNIX_EPOCH)
			.expect("System clock should be after the Unix epoch.")
			.as_nanos();
		let dir = std::env::temp_dir()
			.join(format!("rotating-creds-{label}-{}-{nanos}", process::id()));

		fs::create_dir_all(&dir).expect("Scratch directory should be creatable.");

		dir
	}

	#[tokio::test]
	async fn reads_nested_secret_files() {
		let root = scratch_dir("nested");

		fs::create_dir_all(root.join("prod")).expect("Nested directory should be creatable.");
		fs::write(root.join("prod/auth0.json"), r#"{"id":"abc","secret":"xyz"}"#)
			.expect("Secret fixture should be writable.");

		let store = FileSecretStore::new(&root);
		let id = SecretId::new("prod/auth0").expect("Secret id fixture should be valid.");
		let payload = store.fetch_secret(&id).await.expect("Secret file should be readable.");

		assert_eq!(payload, r#"{"id":"abc","secret":"xyz"}"#);

		fs::remove_dir_all(root).expect("Scratch directory should be removable.");
	}

	#[tokio::test]
	async fn missing_file_maps_to_not_found() {
		let root = scratch_dir("missing");
		let store = FileSecretStore::new(&root);
		let id = SecretId::new("absent").expect("Secret id fixture should be valid.");
		let err = store.fetch_secret(&id).await.expect_err("Absent file should not resolve.");

		assert_eq!(err, SecretStoreError::NotFound { secret_id: "absent".into() });

		fs::remove_dir_all(root).expect("Scratch directory should be removable.");
	}

	#[tokio::test]
	async fn parent_components_are_refused() {
		let store = FileSecretStore::new(std::env::temp_dir());
		let id = SecretId::new("../etc/passwd").expect("Identifier syntax itself is valid.");
		let err = store.fetch_secret(&id).await.expect_err("Traversal should be refused.");

		assert!(matches!(err, SecretStoreError::Denied { .. }));
	}
}
