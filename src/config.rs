//! Cache configuration: where credentials live, where tokens come from, and how refreshes behave.
//!
//! `builder` validates programmatic configuration; `env` loads the same settings from
//! environment variables for serverless deployments.

/// Builder API for assembling cache configuration.
pub mod builder;
/// Environment-variable loader.
pub mod env;

pub use builder::*;
pub use env::*;

// self
use crate::{
	_prelude::*,
	auth::{SecretFields, SecretId},
};

/// Default token endpoint used for the client-credentials exchange.
pub const DEFAULT_TOKEN_ENDPOINT: &str = "https://oauth.cimpress.io/v2/token";
/// Default audience requested from the token endpoint.
pub const DEFAULT_AUDIENCE: &str = "https://api.cimpress.io/";
/// Default deduction applied to issuer-reported token lifetimes.
pub const DEFAULT_SAFETY_MARGIN: Duration = Duration::seconds(100);
/// Default timeout applied to each outbound HTTP request.
pub const DEFAULT_REQUEST_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(10);

/// How [`TokenCache::get_token`](crate::cache::TokenCache::get_token) treats `force_refresh`
/// while the cached token is still valid.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ForceRefreshPolicy {
	#[default]
	/// A forced refresh skips the cached token even when it has not expired.
	Bypass,
	/// Only expiry invalidates the cached token; `force_refresh` is ignored while it is valid.
	ExpiryOnly,
}
impl ForceRefreshPolicy {
	/// Returns a stable label suitable for settings and logs.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Bypass => "bypass",
			Self::ExpiryOnly => "expiry_only",
		}
	}

	/// Resolves whether a call with `force_refresh` must skip a valid cached token.
	pub const fn bypasses_cache(self, force_refresh: bool) -> bool {
		force_refresh && matches!(self, Self::Bypass)
	}
}
impl Display for ForceRefreshPolicy {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
impl FromStr for ForceRefreshPolicy {
	type Err = ();

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.trim().to_ascii_lowercase().as_str() {
			"bypass" => Ok(Self::Bypass),
			"expiry_only" | "expiry-only" => Ok(Self::ExpiryOnly),
			_ => Err(()),
		}
	}
}

/// Validated configuration shared by the credential and token caches.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CacheConfig {
	/// Identifier of the secret holding the client credentials.
	pub secret_id: SecretId,
	/// Field names read from the secret payload.
	pub secret_fields: SecretFields,
	/// Token endpoint receiving the client-credentials exchange.
	pub token_endpoint: Url,
	/// Audience requested for issued tokens.
	pub audience: String,
	/// Deduction applied to issuer-reported lifetimes.
	pub safety_margin: Duration,
	/// Treatment of caller-driven forced refreshes.
	pub force_refresh: ForceRefreshPolicy,
	/// Timeout applied to each outbound HTTP request.
	pub request_timeout: std::time::Duration,
}
impl CacheConfig {
	/// Creates a new builder for the provided secret identifier.
	pub fn builder(secret_id: SecretId) -> CacheConfigBuilder {
		CacheConfigBuilder::new(secret_id)
	}
}
