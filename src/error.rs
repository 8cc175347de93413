//! Cache-level error types shared across the secret store, token exchange, and API layers.

// self
use crate::{
	_prelude::*,
	auth::{IdentifierError, TokenBuildError},
	secret::SecretStoreError,
};

/// Crate-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical error exposed by public APIs.
///
/// Each variant maps to one propagation policy: configuration problems are fatal, secret-store
/// failures bubble up untouched, and authentication failures are only raised after the token
/// cache already retried once with freshly fetched credentials.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Local configuration problem or malformed secret payload; retrying will not help.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Secret-store lookup failed (network, permission, missing entry).
	#[error(transparent)]
	ExternalService(#[from] ExternalServiceError),
	/// Token exchange failed even after retrying with refreshed credentials.
	#[error(transparent)]
	Authentication(#[from] AuthenticationError),
	/// Downstream API call failed.
	#[error(transparent)]
	Api(#[from] ApiError),
}

/// Configuration and validation failures.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// Secret payload is not a JSON object.
	#[error("Secret `{secret_id}` does not contain a JSON object.")]
	MalformedSecret {
		/// Identifier of the secret that failed to parse.
		secret_id: String,
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
	},
	/// Secret payload omitted a required field (or left it empty).
	#[error("Secret `{secret_id}` is missing the required `{field}` field.")]
	MissingSecretField {
		/// Identifier of the malformed secret.
		secret_id: String,
		/// Name of the missing field.
		field: String,
	},
	/// Secret payload carried a required field with a non-string value.
	#[error("Secret `{secret_id}` field `{field}` must be a string.")]
	InvalidSecretField {
		/// Identifier of the malformed secret.
		secret_id: String,
		/// Name of the offending field.
		field: String,
	},
	/// Identifier validation failed.
	#[error(transparent)]
	InvalidIdentifier(#[from] IdentifierError),
	/// A configured URL could not be parsed.
	#[error("The {name} URL is invalid.")]
	InvalidUrl {
		/// Which setting failed validation.
		name: &'static str,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Remote endpoints must use HTTPS unless they point at a loopback host.
	#[error("The {endpoint} endpoint must use HTTPS: {url}.")]
	InsecureEndpoint {
		/// Which endpoint failed validation.
		endpoint: &'static str,
		/// Endpoint URL that failed validation.
		url: String,
	},
	/// Safety margin cannot be negative.
	#[error("The token safety margin must not be negative.")]
	NegativeSafetyMargin,
	/// Audience cannot be empty.
	#[error("The token audience must not be empty.")]
	EmptyAudience,
	/// Secret field names must be non-empty and distinct.
	#[error("Secret field names must be non-empty and distinct.")]
	InvalidSecretFields,
	/// Required environment setting is absent.
	#[error("Required setting `{name}` is not set.")]
	MissingSetting {
		/// Environment variable name.
		name: &'static str,
	},
	/// Environment setting could not be interpreted.
	#[error("Setting `{name}` has an invalid value `{value}`: {reason}.")]
	InvalidSetting {
		/// Environment variable name.
		name: &'static str,
		/// Raw value that failed to parse.
		value: String,
		/// Human-readable reason.
		reason: &'static str,
	},
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Failures raised by external services the cache depends on.
#[derive(Debug, ThisError)]
pub enum ExternalServiceError {
	/// Secret-store lookup failed.
	#[error("Secret store lookup for `{secret_id}` failed.")]
	SecretStore {
		/// Identifier that was being fetched.
		secret_id: String,
		/// Store-specific failure.
		#[source]
		source: SecretStoreError,
	},
}

/// Terminal token-exchange failure raised after the forced credential refresh retry.
#[derive(Debug, ThisError)]
#[error("Token exchange failed after {attempts} attempts.")]
pub struct AuthenticationError {
	/// Number of exchange attempts performed during the call.
	pub attempts: u8,
	/// Failure reported by the final attempt.
	#[source]
	pub source: ExchangeError,
}

/// A single failed token-exchange attempt.
#[derive(Debug, ThisError)]
pub enum ExchangeError {
	/// Token endpoint answered with a non-success HTTP status.
	#[error("Token endpoint rejected the request with HTTP {status}.")]
	Rejected {
		/// HTTP status code.
		status: u16,
		/// OAuth `error` code, when the body carried one.
		error: Option<String>,
		/// OAuth `error_description`, when the body carried one.
		description: Option<String>,
		/// Retry-After hint from upstream, if supplied.
		retry_after: Option<Duration>,
	},
	/// Transport failure while calling the token endpoint.
	#[error(transparent)]
	Transport(#[from] TransportError),
	/// Token endpoint responded with a body that is not a valid token response.
	#[error("Token endpoint returned malformed JSON.")]
	ResponseParse {
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
		/// HTTP status code, when available.
		status: Option<u16>,
	},
	/// Token endpoint reported a lifetime that is zero or negative.
	#[error("The expires_in value must be positive, got {expires_in}.")]
	NonPositiveExpiresIn {
		/// Reported lifetime in seconds.
		expires_in: i64,
	},
	/// Token endpoint reported a lifetime whose expiry cannot be represented.
	#[error("The expires_in value {expires_in} yields an out-of-range expiry.")]
	ExpiresInOutOfRange {
		/// Reported lifetime in seconds.
		expires_in: i64,
		/// Builder failure.
		#[source]
		source: TokenBuildError,
	},
}
impl ExchangeError {
	/// Returns the HTTP status associated with the failure, when one is known.
	pub fn status(&self) -> Option<u16> {
		match self {
			Self::Rejected { status, .. } => Some(*status),
			Self::ResponseParse { status, .. } => *status,
			Self::Transport(TransportError::Timeout { status, .. }) => *status,
			_ => None,
		}
	}
}

/// Transport-level failures (network, IO).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling {target}.")]
	Network {
		/// Logical target of the call (token endpoint, API, secret store).
		target: &'static str,
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Request did not complete within the configured timeout.
	#[error("Request timed out while calling {target}.")]
	Timeout {
		/// Logical target of the call.
		target: &'static str,
		/// HTTP status code, when one was observed before the timeout.
		status: Option<u16>,
	},
	/// Outbound request could not be converted for the transport.
	#[error("Request to {target} could not be prepared.")]
	InvalidRequest {
		/// Logical target of the call.
		target: &'static str,
		/// Conversion failure.
		#[source]
		source: BoxError,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred during transport.")]
	Io(#[from] std::io::Error),
	/// Transport reported a failure without a typed source.
	#[error("HTTP client error occurred while calling {target}: {message}.")]
	Other {
		/// Logical target of the call.
		target: &'static str,
		/// Transport-supplied message.
		message: String,
	},
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(target: &'static str, src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { target, source: Box::new(src) }
	}
}

/// Downstream API failures.
#[derive(Debug, ThisError)]
pub enum ApiError {
	/// API rejected the bearer token even after a forced token refresh.
	#[error("API rejected the bearer token with HTTP {status} after a forced token refresh.")]
	Unauthorized {
		/// HTTP status code (401).
		status: u16,
	},
	/// API answered with an unexpected HTTP status.
	#[error("API returned HTTP {status}.")]
	Status {
		/// HTTP status code.
		status: u16,
		/// Truncated response body for diagnostics.
		body_preview: Option<String>,
	},
	/// Transport failure while calling the API.
	#[error(transparent)]
	Transport(#[from] TransportError),
	/// API response body could not be decoded.
	#[error("API returned a body that could not be decoded.")]
	ResponseParse {
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
	},
}

#[cfg(test)]
mod tests {
	// std
	use std::error::Error as StdError;
	// self
	use super::*;

	#[test]
	fn secret_store_failure_exposes_source() {
		let err: Error = ExternalServiceError::SecretStore {
			secret_id: "prod/auth0".into(),
			source: SecretStoreError::Denied { message: "AccessDeniedException".into() },
		}
		.into();

		assert!(matches!(err, Error::ExternalService(_)));
		assert!(err.to_string().contains("prod/auth0"));

		let source = StdError::source(&err)
			.expect("Secret-store error should expose the store failure as its source.");

		assert!(source.to_string().contains("AccessDeniedException"));
	}

	#[test]
	fn authentication_error_wraps_final_attempt() {
		let err: Error = AuthenticationError {
			attempts: 2,
			source: ExchangeError::Rejected {
				status: 401,
				error: Some("access_denied".into()),
				description: None,
				retry_after: None,
			},
		}
		.into();

		assert_eq!(err.to_string(), "Token exchange failed after 2 attempts.");

		let Error::Authentication(inner) = &err else {
			panic!("Expected an authentication error, got {err:?}.");
		};

		assert_eq!(inner.source.status(), Some(401));
	}

	#[test]
	fn missing_field_message_names_field() {
		let err = ConfigError::MissingSecretField { secret_id: "svc".into(), field: "id".into() };

		assert_eq!(err.to_string(), "Secret `svc` is missing the required `id` field.");
	}
}
