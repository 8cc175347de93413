//! [`SecretStore`] backed by a local HTTP secrets endpoint.
//!
//! The wire format follows the AWS Parameters and Secrets Lambda extension:
//! `GET {base}/secretsmanager/get?secretId=<id>` authenticated with the
//! `X-Aws-Parameters-Secrets-Token` header, answering with a `GetSecretValue`-shaped JSON
//! document whose `SecretString` member carries the payload.

// crates.io
use reqwest::StatusCode;
// self
use crate::{
	_prelude::*,
	auth::{SecretId, TokenSecret},
	error::ConfigError,
	secret::{SecretFuture, SecretStore, SecretStoreError},
};

/// Header carrying the session token expected by the extension.
pub const SESSION_TOKEN_HEADER: &str = "X-Aws-Parameters-Secrets-Token";

const PORT_ENV: &str = "PARAMETERS_SECRETS_EXTENSION_HTTP_PORT";
const SESSION_TOKEN_ENV: &str = "AWS_SESSION_TOKEN";
const DEFAULT_PORT: u16 = 2773;

#[derive(Deserialize)]
struct GetSecretValueResponse {
	#[serde(rename = "SecretString")]
	secret_string: Option<String>,
}

/// HTTP secrets endpoint client.
#[derive(Clone)]
pub struct ExtensionSecretStore {
	client: ReqwestClient,
	endpoint: Url,
	session_token: Option<TokenSecret>,
}
impl ExtensionSecretStore {
	/// Creates a store that calls `base` (e.g. `http://localhost:2773`).
	pub fn new(client: ReqwestClient, base: Url) -> Result<Self, ConfigError> {
		let endpoint = base
			.join("secretsmanager/get")
			.map_err(|source| ConfigError::InvalidUrl { name: "secret extension", source })?;

		Ok(Self { client, endpoint, session_token: None })
	}

	/// Builds a store from the Lambda runtime environment.
	///
	/// Reads the extension port (defaulting to 2773) and the session token the extension uses to
	/// authenticate callers.
	pub fn from_env(client: ReqwestClient) -> Result<Self, ConfigError> {
		Self::from_lookup(client, |name| std::env::var(name).ok())
	}

	/// Same as [`from_env`](Self::from_env), reading variables through `lookup`.
	///
	/// Unset and blank variables are treated alike.
	pub fn from_lookup<F>(client: ReqwestClient, lookup: F) -> Result<Self, ConfigError>
	where
		F: Fn(&str) -> Option<String>,
	{
		let read = |name: &'static str| lookup(name).filter(|value| !value.trim().is_empty());
		let port = match read(PORT_ENV) {
			Some(raw) => raw.trim().parse::<u16>().map_err(|_| ConfigError::InvalidSetting {
				name: PORT_ENV,
				value: raw,
				reason: "expected a TCP port number",
			})?,
			None => DEFAULT_PORT,
		};
		let base = Url::parse(&format!("http://localhost:{port}/"))
			.map_err(|source| ConfigError::InvalidUrl { name: "secret extension", source })?;
		let store = Self::new(client, base)?;

		Ok(match read(SESSION_TOKEN_ENV) {
			Some(token) => store.with_session_token(token),
			None => store,
		})
	}

	/// Attaches the session token sent in [`SESSION_TOKEN_HEADER`].
	pub fn with_session_token(mut self, token: impl Into<String>) -> Self {
		self.session_token = Some(TokenSecret::new(token));

		self
	}

	async fn fetch_now(&self, id: &SecretId) -> Result<String, SecretStoreError> {
		let mut request = self.client.get(self.endpoint.clone()).query(&[("secretId", id.as_str())]);

		if let Some(token) = &self.session_token {
			request = request.header(SESSION_TOKEN_HEADER, token.expose());
		}

		let response = request
			.send()
			.await
			.map_err(|e| SecretStoreError::Transport { message: e.to_string() })?;
		let status = response.status();

		match status {
			StatusCode::OK => {},
			StatusCode::NOT_FOUND => return Err(SecretStoreError::NotFound { secret_id: id.to_string() }),
			StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN =>
				return Err(SecretStoreError::Denied {
					message: format!("Secrets endpoint answered HTTP {}", status.as_u16()),
				}),
			_ =>
				return Err(SecretStoreError::Backend {
					message: format!("Secrets endpoint answered HTTP {}", status.as_u16()),
				}),
		}

		let body = response
			.bytes()
			.await
			.map_err(|e| SecretStoreError::Transport { message: e.to_string() })?;
		let parsed: GetSecretValueResponse = serde_json::from_slice(&body).map_err(|e| {
			SecretStoreError::Backend { message: format!("Secrets endpoint returned malformed JSON: {e}") }
		})?;

		parsed.secret_string.ok_or_else(|| SecretStoreError::Backend {
			message: format!("Secret `{id}` has no SecretString"),
		})
	}
}
impl SecretStore for ExtensionSecretStore {
	fn fetch_secret<'a>(&'a self, id: &'a SecretId) -> SecretFuture<'a, String> {
		Box::pin(self.fetch_now(id))
	}
}
impl Debug for ExtensionSecretStore {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ExtensionSecretStore")
			.field("endpoint", &self.endpoint.as_str())
			.field("session_token_set", &self.session_token.is_some())
			.finish()
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn endpoint_joins_base_path() {
		let store = ExtensionSecretStore::new(
			ReqwestClient::new(),
			Url::parse("http://localhost:2773/").expect("Base URL fixture should parse."),
		)
		.expect("Store should build from a valid base URL.");

		assert_eq!(store.endpoint.as_str(), "http://localhost:2773/secretsmanager/get");

		let store = store.with_session_token("very-secret-session");
		let debug = format!("{store:?}");

		assert!(debug.contains("session_token_set: true"));
		assert!(!debug.contains("very-secret-session"));
	}

	#[test]
	fn lookup_defaults_port_and_reads_session_token() {
		let store = ExtensionSecretStore::from_lookup(ReqwestClient::new(), |name| {
			(name == SESSION_TOKEN_ENV).then(|| "session".to_owned())
		})
		.expect("Defaults should build a store.");

		assert_eq!(store.endpoint.as_str(), "http://localhost:2773/secretsmanager/get");
		assert_eq!(store.session_token.as_ref().map(TokenSecret::expose), Some("session"));

		let store = ExtensionSecretStore::from_lookup(ReqwestClient::new(), |name| {
			(name == PORT_ENV).then(|| " 4000 ".to_owned())
		})
		.expect("Explicit port should build a store.");

		assert_eq!(store.endpoint.as_str(), "http://localhost:4000/secretsmanager/get");
		assert!(store.session_token.is_none());
	}

	#[test]
	fn lookup_rejects_invalid_port() {
		for raw in ["http", "70000", "-1"] {
			let err = ExtensionSecretStore::from_lookup(ReqwestClient::new(), |name| {
				(name == PORT_ENV).then(|| raw.to_owned())
			})
			.expect_err("Invalid ports should be rejected.");

			assert!(
				matches!(err, ConfigError::InvalidSetting { name: PORT_ENV, ref value, .. } if value == raw)
			);
		}
	}
}
