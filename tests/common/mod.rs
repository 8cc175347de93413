//! Shared fakes for the integration suites.

#![allow(dead_code)]

// std
use std::{
	collections::VecDeque,
	error::Error as StdError,
	fmt::{Display, Formatter, Result as FmtResult},
	future::Future,
	pin::Pin,
	sync::{
		Arc,
		atomic::{AtomicUsize, Ordering},
	},
};
// crates.io
use parking_lot::Mutex;
use time::{Duration, OffsetDateTime, macros};
// self
use rotating_creds::{
	CacheConfig, CredentialCache, ForceRefreshPolicy, SecretId, TokenCache,
	clock::ManualClock,
	error::TransportError,
	exchange::TransportErrorMapper,
	http::{
		ResponseMetadata, ResponseMetadataSlot, TokenHttpClient,
		oauth2::{AsyncHttpClient, HttpClientError, HttpRequest, HttpResponse, http::StatusCode},
	},
	secret::MemorySecretStore,
	url::Url,
};

pub const SECRET_ID: &str = "prod/auth0";
pub const VALID_SECRET: &str = r#"{"id":"abc","secret":"xyz"}"#;
pub const TOKEN_ENDPOINT: &str = "https://issuer.example.com/v2/token";

pub type ScriptedTokenCache = TokenCache<ScriptedHttpClient, FakeTransportErrorMapper>;

pub fn epoch() -> OffsetDateTime {
	macros::datetime!(2025-01-01 00:00 UTC)
}

pub fn secret_id() -> SecretId {
	SecretId::new(SECRET_ID).expect("Secret id fixture should be valid.")
}

pub fn seeded_store() -> MemorySecretStore {
	MemorySecretStore::with_secret(secret_id(), VALID_SECRET)
}

pub fn config(policy: ForceRefreshPolicy) -> CacheConfig {
	CacheConfig::builder(secret_id())
		.token_endpoint(Url::parse(TOKEN_ENDPOINT).expect("Token endpoint fixture should parse."))
		.force_refresh(policy)
		.build()
		.expect("Test configuration should validate.")
}

pub fn token_cache(
	store: &MemorySecretStore,
	http: &ScriptedHttpClient,
	clock: &ManualClock,
	policy: ForceRefreshPolicy,
) -> ScriptedTokenCache {
	let config = config(policy);
	let credentials = CredentialCache::from_config(&config, Arc::new(store.clone()));

	TokenCache::new(&config, credentials, http.clone(), FakeTransportErrorMapper)
		.with_clock(Arc::new(clock.clone()))
}

pub fn token_body(access_token: &str, expires_in: i64) -> String {
	format!(r#"{{"access_token":"{access_token}","token_type":"bearer","expires_in":{expires_in}}}"#)
}

#[derive(Debug)]
pub struct FakeTransportError(pub &'static str);
impl Display for FakeTransportError {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		write!(f, "Fake transport failure: {}.", self.0)
	}
}
impl StdError for FakeTransportError {}

/// One canned outcome for a [`ScriptedHttpClient`] call.
#[derive(Clone, Debug)]
pub enum Scripted {
	Respond { status: u16, body: String },
	Fail(&'static str),
}
impl Scripted {
	pub fn token(access_token: &str, expires_in: i64) -> Self {
		Self::Respond { status: 200, body: token_body(access_token, expires_in) }
	}

	pub fn status(status: u16, body: &str) -> Self {
		Self::Respond { status, body: body.to_owned() }
	}
}

/// Request as seen by the fake transport.
#[derive(Clone, Debug)]
pub struct Recorded {
	pub method: String,
	pub uri: String,
	pub authorization: Option<String>,
	pub body: Vec<u8>,
}
impl Recorded {
	pub fn json(&self) -> serde_json::Value {
		serde_json::from_slice(&self.body).expect("Recorded body should be JSON.")
	}
}

#[derive(Default)]
struct Script {
	queue: Mutex<VecDeque<Scripted>>,
	requests: Mutex<Vec<Recorded>>,
	calls: AtomicUsize,
}

/// Transport replaying queued outcomes in order; an exhausted script answers HTTP 500.
#[derive(Clone, Default)]
pub struct ScriptedHttpClient(Arc<Script>);
impl ScriptedHttpClient {
	pub fn new(outcomes: impl IntoIterator<Item = Scripted>) -> Self {
		let client = Self::default();

		client.push(outcomes);

		client
	}

	pub fn push(&self, outcomes: impl IntoIterator<Item = Scripted>) {
		self.0.queue.lock().extend(outcomes);
	}

	pub fn calls(&self) -> usize {
		self.0.calls.load(Ordering::SeqCst)
	}

	pub fn requests(&self) -> Vec<Recorded> {
		self.0.requests.lock().clone()
	}
}
impl TokenHttpClient for ScriptedHttpClient {
	type Handle = ScriptedHandle;
	type TransportError = FakeTransportError;

	fn with_metadata(&self, slot: ResponseMetadataSlot) -> Self::Handle {
		ScriptedHandle { slot, script: self.0.clone() }
	}
}

pub struct ScriptedHandle {
	slot: ResponseMetadataSlot,
	script: Arc<Script>,
}
impl<'a> AsyncHttpClient<'a> for ScriptedHandle {
	type Error = HttpClientError<FakeTransportError>;
	type Future =
		Pin<Box<dyn Future<Output = Result<HttpResponse, Self::Error>> + 'a + Send + Sync>>;

	fn call(&'a self, request: HttpRequest) -> Self::Future {
		let slot = self.slot.clone();
		let script = self.script.clone();

		Box::pin(async move {
			slot.take();
			script.calls.fetch_add(1, Ordering::SeqCst);
			script.requests.lock().push(Recorded {
				method: request.method().to_string(),
				uri: request.uri().to_string(),
				authorization: request
					.headers()
					.get("authorization")
					.and_then(|value| value.to_str().ok())
					.map(str::to_owned),
				body: request.body().clone(),
			});

			// Yield so concurrent callers actually overlap.
			tokio::task::yield_now().await;

			let next = script.queue.lock().pop_front();

			match next.unwrap_or(Scripted::Respond { status: 500, body: String::new() }) {
				Scripted::Respond { status, body } => {
					slot.store(ResponseMetadata {
						status: Some(status),
						retry_after: Some(Duration::seconds(3)),
					});

					let mut response = HttpResponse::new(body.into_bytes());

					*response.status_mut() = StatusCode::from_u16(status)
						.expect("Scripted status codes should be valid.");

					Ok(response)
				},
				Scripted::Fail(reason) =>
					Err(HttpClientError::Reqwest(Box::new(FakeTransportError(reason)))),
			}
		})
	}
}

#[derive(Clone, Copy, Debug, Default)]
pub struct FakeTransportErrorMapper;
impl TransportErrorMapper<FakeTransportError> for FakeTransportErrorMapper {
	fn map_transport_error(
		&self,
		target: &'static str,
		_metadata: Option<&ResponseMetadata>,
		error: HttpClientError<FakeTransportError>,
	) -> TransportError {
		match error {
			HttpClientError::Reqwest(inner) => TransportError::network(target, *inner),
			other => TransportError::Other { target, message: other.to_string() },
		}
	}
}
