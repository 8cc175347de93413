// std
use std::net::IpAddr;
// self
use crate::{
	_prelude::*,
	auth::{SecretFields, SecretId},
	config::{
		CacheConfig, DEFAULT_AUDIENCE, DEFAULT_REQUEST_TIMEOUT, DEFAULT_SAFETY_MARGIN,
		DEFAULT_TOKEN_ENDPOINT, ForceRefreshPolicy,
	},
	error::ConfigError,
};

/// Builder for [`CacheConfig`] values.
#[derive(Debug)]
pub struct CacheConfigBuilder {
	/// Identifier of the secret holding the client credentials.
	pub secret_id: SecretId,
	/// Field names read from the secret payload.
	pub secret_fields: SecretFields,
	/// Token endpoint; `None` selects [`DEFAULT_TOKEN_ENDPOINT`].
	pub token_endpoint: Option<Url>,
	/// Audience requested for issued tokens.
	pub audience: String,
	/// Deduction applied to issuer-reported lifetimes.
	pub safety_margin: Duration,
	/// Treatment of caller-driven forced refreshes.
	pub force_refresh: ForceRefreshPolicy,
	/// Timeout applied to each outbound HTTP request.
	pub request_timeout: std::time::Duration,
}
impl CacheConfigBuilder {
	/// Creates a new builder seeded with defaults for everything except the secret identifier.
	pub fn new(secret_id: SecretId) -> Self {
		Self {
			secret_id,
			secret_fields: SecretFields::default(),
			token_endpoint: None,
			audience: DEFAULT_AUDIENCE.into(),
			safety_margin: DEFAULT_SAFETY_MARGIN,
			force_refresh: ForceRefreshPolicy::default(),
			request_timeout: DEFAULT_REQUEST_TIMEOUT,
		}
	}

	/// Overrides the secret payload field names.
	pub fn secret_fields(mut self, fields: SecretFields) -> Self {
		self.secret_fields = fields;

		self
	}

	/// Sets the token endpoint.
	pub fn token_endpoint(mut self, url: Url) -> Self {
		self.token_endpoint = Some(url);

		self
	}

	/// Sets the requested audience.
	pub fn audience(mut self, audience: impl Into<String>) -> Self {
		self.audience = audience.into();

		self
	}

	/// Sets the lifetime deduction.
	pub fn safety_margin(mut self, margin: Duration) -> Self {
		self.safety_margin = margin;

		self
	}

	/// Sets the forced-refresh policy.
	pub fn force_refresh(mut self, policy: ForceRefreshPolicy) -> Self {
		self.force_refresh = policy;

		self
	}

	/// Sets the per-request timeout.
	pub fn request_timeout(mut self, timeout: std::time::Duration) -> Self {
		self.request_timeout = timeout;

		self
	}

	/// Consumes the builder and validates the resulting configuration.
	pub fn build(self) -> Result<CacheConfig, ConfigError> {
		let token_endpoint = match self.token_endpoint {
			Some(url) => url,
			None => Url::parse(DEFAULT_TOKEN_ENDPOINT)
				.map_err(|source| ConfigError::InvalidUrl { name: "token endpoint", source })?,
		};
		let config = CacheConfig {
			secret_id: self.secret_id,
			secret_fields: self.secret_fields,
			token_endpoint,
			audience: self.audience,
			safety_margin: self.safety_margin,
			force_refresh: self.force_refresh,
			request_timeout: self.request_timeout,
		};

		config.validate()?;

		Ok(config)
	}
}

impl CacheConfig {
	/// Validates invariants for the configuration.
	fn validate(&self) -> Result<(), ConfigError> {
		if self.safety_margin.is_negative() {
			return Err(ConfigError::NegativeSafetyMargin);
		}
		if self.audience.trim().is_empty() {
			return Err(ConfigError::EmptyAudience);
		}
		if !self.secret_fields.is_valid() {
			return Err(ConfigError::InvalidSecretFields);
		}

		validate_endpoint("token", &self.token_endpoint)
	}
}

/// Requires HTTPS, except for loopback hosts used by local tooling and tests.
pub(crate) fn validate_endpoint(name: &'static str, url: &Url) -> Result<(), ConfigError> {
	if url.scheme() == "https" || (url.scheme() == "http" && is_loopback(url)) {
		Ok(())
	} else {
		Err(ConfigError::InsecureEndpoint { endpoint: name, url: url.to_string() })
	}
}

fn is_loopback(url: &Url) -> bool {
	match url.host() {
		Some(url::Host::Domain(domain)) => domain.eq_ignore_ascii_case("localhost"),
		Some(url::Host::Ipv4(ip)) => IpAddr::V4(ip).is_loopback(),
		Some(url::Host::Ipv6(ip)) => IpAddr::V6(ip).is_loopback(),
		None => false,
	}
}
