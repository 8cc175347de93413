// self
use crate::{
	_prelude::*,
	auth::SecretId,
	config::{CacheConfig, ForceRefreshPolicy},
	error::ConfigError,
};

/// Required: identifier of the secret holding the client credentials.
pub const SECRET_ID_ENV: &str = "ROTATING_CREDS_SECRET_ID";
/// Optional: token endpoint URL.
pub const TOKEN_ENDPOINT_ENV: &str = "ROTATING_CREDS_TOKEN_ENDPOINT";
/// Optional: requested audience.
pub const AUDIENCE_ENV: &str = "ROTATING_CREDS_AUDIENCE";
/// Optional: lifetime deduction in whole seconds.
pub const SAFETY_MARGIN_ENV: &str = "ROTATING_CREDS_SAFETY_MARGIN_SECS";
/// Optional: `bypass` or `expiry_only`.
pub const FORCE_REFRESH_ENV: &str = "ROTATING_CREDS_FORCE_REFRESH";
/// Optional: per-request timeout in whole seconds.
pub const REQUEST_TIMEOUT_ENV: &str = "ROTATING_CREDS_REQUEST_TIMEOUT_SECS";

impl CacheConfig {
	/// Loads configuration from the process environment.
	pub fn from_env() -> Result<Self, ConfigError> {
		Self::from_lookup(|name| std::env::var(name).ok())
	}

	/// Loads configuration through `lookup`, which maps a variable name to its value.
	///
	/// Unset and empty variables fall back to the builder defaults; only
	/// [`SECRET_ID_ENV`] is mandatory.
	pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
	where
		F: Fn(&str) -> Option<String>,
	{
		let read = |name: &'static str| lookup(name).filter(|value| !value.trim().is_empty());
		let secret_id = read(SECRET_ID_ENV).ok_or(ConfigError::MissingSetting { name: SECRET_ID_ENV })?;
		let mut builder = CacheConfig::builder(SecretId::new(secret_id.trim())?);

		if let Some(raw) = read(TOKEN_ENDPOINT_ENV) {
			let url = Url::parse(raw.trim())
				.map_err(|source| ConfigError::InvalidUrl { name: "token endpoint", source })?;

			builder = builder.token_endpoint(url);
		}
		if let Some(raw) = read(AUDIENCE_ENV) {
			builder = builder.audience(raw.trim());
		}
		if let Some(raw) = read(SAFETY_MARGIN_ENV) {
			let secs = parse_secs(SAFETY_MARGIN_ENV, raw)?;

			builder = builder.safety_margin(Duration::seconds(i64::from(secs)));
		}
		if let Some(raw) = read(FORCE_REFRESH_ENV) {
			let policy = raw.parse::<ForceRefreshPolicy>().map_err(|_| ConfigError::InvalidSetting {
				name: FORCE_REFRESH_ENV,
				value: raw.clone(),
				reason: "expected `bypass` or `expiry_only`",
			})?;

			builder = builder.force_refresh(policy);
		}
		if let Some(raw) = read(REQUEST_TIMEOUT_ENV) {
			let secs = parse_secs(REQUEST_TIMEOUT_ENV, raw)?;

			builder = builder.request_timeout(std::time::Duration::from_secs(u64::from(secs)));
		}

		builder.build()
	}
}

fn parse_secs(name: &'static str, raw: String) -> Result<u32, ConfigError> {
	raw.trim().parse::<u32>().map_err(|_| ConfigError::InvalidSetting {
		name,
		value: raw,
		reason: "expected a non-negative number of seconds",
	})
}
