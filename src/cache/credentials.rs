//! First tier: client credentials fetched from the secret store.

// self
use crate::{
	_prelude::*,
	auth::{Credentials, SecretFields, SecretId},
	cache::SharedSlot,
	config::CacheConfig,
	error::ExternalServiceError,
	obs::{self, FlowKind, FlowOutcome, FlowSpan, MissReason},
	secret::SecretStore,
};

/// Process-wide holder of the client credentials.
///
/// Clones share the same slot, so one instance can be constructed at startup and handed to
/// every request handler.
#[derive(Clone)]
pub struct CredentialCache {
	store: Arc<dyn SecretStore>,
	secret_id: SecretId,
	fields: SecretFields,
	state: Arc<SharedSlot<Credentials>>,
}
impl CredentialCache {
	const KIND: FlowKind = FlowKind::Credentials;

	/// Creates an empty cache reading `secret_id` from `store`.
	pub fn new(store: Arc<dyn SecretStore>, secret_id: SecretId, fields: SecretFields) -> Self {
		Self { store, secret_id, fields, state: Default::default() }
	}

	/// Creates an empty cache using the secret identifier and field names in `config`.
	pub fn from_config(config: &CacheConfig, store: Arc<dyn SecretStore>) -> Self {
		Self::new(store, config.secret_id.clone(), config.secret_fields.clone())
	}

	/// Identifier of the secret backing this cache.
	pub fn secret_id(&self) -> &SecretId {
		&self.secret_id
	}

	/// Returns the cached credentials without touching the secret store.
	pub fn cached(&self) -> Option<Credentials> {
		self.state.value()
	}

	/// Drops the cached credentials so the next call fetches from the store.
	pub fn invalidate(&self) {
		self.state.clear();
	}

	/// Returns the cached credentials, or fetches them when absent or when `force_refresh` is
	/// set.
	///
	/// # Errors
	///
	/// - [`Error::ExternalService`] when the store lookup fails.
	/// - [`Error::Config`] when the payload is not a JSON object carrying both configured fields.
	///
	/// Neither is retried, and a failed call leaves the cached value untouched.
	pub async fn get_credentials(&self, force_refresh: bool) -> Result<Credentials> {
		let span = FlowSpan::new(Self::KIND, "get_credentials");

		obs::record_flow_outcome(Self::KIND, FlowOutcome::Attempt);

		let result = span.instrument(self.resolve(force_refresh)).await;

		match &result {
			Ok(_) => obs::record_flow_outcome(Self::KIND, FlowOutcome::Success),
			Err(_) => obs::record_flow_outcome(Self::KIND, FlowOutcome::Failure),
		}

		result
	}

	async fn resolve(&self, force_refresh: bool) -> Result<Credentials> {
		let (cached, observed) = self.state.snapshot();

		if let (false, Some(credentials)) = (force_refresh, cached) {
			obs::cache_hit(Self::KIND);

			return Ok(credentials);
		}

		let _refresh = self.state.lock_refresh().await;
		let (cached, current) = self.state.snapshot();

		match &cached {
			Some(credentials) if !force_refresh || current != observed => {
				obs::cache_hit(Self::KIND);

				return Ok(credentials.clone());
			},
			_ => {},
		}

		obs::cache_miss(
			Self::KIND,
			if force_refresh { MissReason::Forced } else { MissReason::Empty },
		);

		let fresh = self.fetch().await?;

		if let Some(previous) = cached {
			let fingerprint = fresh.fingerprint();

			if previous.fingerprint() == fingerprint {
				obs::credentials_unchanged(&self.secret_id, &fingerprint);
			}
		}

		self.state.store(fresh.clone());

		Ok(fresh)
	}

	async fn fetch(&self) -> Result<Credentials> {
		let payload = self.store.fetch_secret(&self.secret_id).await.map_err(|source| {
			ExternalServiceError::SecretStore { secret_id: self.secret_id.to_string(), source }
		})?;

		Ok(Credentials::from_secret_payload(self.secret_id.as_str(), &payload, &self.fields)?)
	}
}
impl Debug for CredentialCache {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("CredentialCache")
			.field("secret_id", &self.secret_id)
			.field("fields", &self.fields)
			.field("cached", &self.state.value().is_some())
			.finish()
	}
}
