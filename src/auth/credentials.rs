//! Client credentials fetched from the secret store and the payload parser that extracts them.

// crates.io
use base64::{Engine as _, engine::general_purpose::STANDARD_NO_PAD};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
// self
use crate::{_prelude::*, auth::TokenSecret, error::ConfigError};

/// Names of the secret payload fields holding the client identifier and secret.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecretFields {
	/// Field carrying the client identifier.
	pub id: String,
	/// Field carrying the client secret.
	pub secret: String,
}
impl SecretFields {
	/// Creates a custom field mapping.
	pub fn new(id: impl Into<String>, secret: impl Into<String>) -> Self {
		Self { id: id.into(), secret: secret.into() }
	}

	pub(crate) fn is_valid(&self) -> bool {
		!self.id.is_empty() && !self.secret.is_empty() && self.id != self.secret
	}
}
impl Default for SecretFields {
	fn default() -> Self {
		Self::new("id", "secret")
	}
}

/// Client identifier/secret pair used for the client-credentials grant.
///
/// Values are replaced wholesale on refresh and never patched in place.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
	/// OAuth client identifier.
	pub client_id: String,
	/// OAuth client secret; callers must avoid logging it.
	pub client_secret: TokenSecret,
}
impl Credentials {
	/// Wraps a client identifier/secret pair.
	pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
		Self { client_id: client_id.into(), client_secret: TokenSecret::new(client_secret) }
	}

	/// Parses a raw secret-store payload into credentials.
	///
	/// The payload must be a JSON object carrying both configured fields as non-empty strings.
	pub fn from_secret_payload(
		secret_id: &str,
		payload: &str,
		fields: &SecretFields,
	) -> Result<Self, ConfigError> {
		let mut de = serde_json::Deserializer::from_str(payload);
		let object: Map<String, Value> = serde_path_to_error::deserialize(&mut de)
			.map_err(|source| ConfigError::MalformedSecret { secret_id: secret_id.into(), source })?;
		let client_id = required_field(secret_id, &object, &fields.id)?;
		let client_secret = required_field(secret_id, &object, &fields.secret)?;

		Ok(Self::new(client_id, client_secret))
	}

	/// Stable, non-reversible fingerprint used to correlate credential generations in logs.
	///
	/// The value is a base64 (no padding) SHA-256 digest over the identifier and secret.
	pub fn fingerprint(&self) -> String {
		let mut hasher = Sha256::new();

		hasher.update(self.client_id.as_bytes());
		hasher.update([0]);
		hasher.update(self.client_secret.expose().as_bytes());

		STANDARD_NO_PAD.encode(hasher.finalize())
	}
}
impl Debug for Credentials {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Credentials")
			.field("client_id", &self.client_id)
			.field("client_secret", &"<redacted>")
			.finish()
	}
}

fn required_field(
	secret_id: &str,
	object: &Map<String, Value>,
	field: &str,
) -> Result<String, ConfigError> {
	match object.get(field) {
		Some(Value::String(value)) if !value.is_empty() => Ok(value.to_owned()),
		None | Some(Value::Null) | Some(Value::String(_)) =>
			Err(ConfigError::MissingSecretField { secret_id: secret_id.into(), field: field.into() }),
		Some(_) =>
			Err(ConfigError::InvalidSecretField { secret_id: secret_id.into(), field: field.into() }),
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn parses_default_fields() {
		let credentials = Credentials::from_secret_payload(
			"svc",
			r#"{"id":"abc","secret":"xyz","comment":"ignored"}"#,
			&SecretFields::default(),
		)
		.expect("Well-formed payload should parse.");

		assert_eq!(credentials.client_id, "abc");
		assert_eq!(credentials.client_secret.expose(), "xyz");
	}

	#[test]
	fn missing_or_empty_fields_are_config_errors() {
		let fields = SecretFields::default();

		for payload in [r#"{"secret":"xyz"}"#, r#"{"id":"","secret":"xyz"}"#, r#"{"id":null,"secret":"x"}"#] {
			let err = Credentials::from_secret_payload("svc", payload, &fields)
				.expect_err("Missing id should be rejected.");

			assert!(
				matches!(&err, ConfigError::MissingSecretField { field, .. } if field == "id"),
				"Unexpected error for {payload}: {err:?}."
			);
		}

		let err = Credentials::from_secret_payload("svc", r#"{"id":"abc"}"#, &fields)
			.expect_err("Missing secret should be rejected.");

		assert!(matches!(err, ConfigError::MissingSecretField { field, .. } if field == "secret"));
	}

	#[test]
	fn non_string_and_non_object_payloads_are_rejected() {
		let fields = SecretFields::default();
		let err = Credentials::from_secret_payload("svc", r#"{"id":42,"secret":"xyz"}"#, &fields)
			.expect_err("Numeric id should be rejected.");

		assert!(matches!(err, ConfigError::InvalidSecretField { .. }));

		let err = Credentials::from_secret_payload("svc", "not json", &fields)
			.expect_err("Non-JSON payload should be rejected.");

		assert!(matches!(err, ConfigError::MalformedSecret { .. }));

		let err = Credentials::from_secret_payload("svc", r#"["abc","xyz"]"#, &fields)
			.expect_err("Array payload should be rejected.");

		assert!(matches!(err, ConfigError::MalformedSecret { .. }));
	}

	#[test]
	fn custom_fields_are_honored() {
		let fields = SecretFields::new("client_id", "client_secret");
		let credentials = Credentials::from_secret_payload(
			"svc",
			r#"{"client_id":"abc","client_secret":"xyz"}"#,
			&fields,
		)
		.expect("Custom field mapping should parse.");

		assert_eq!(credentials, Credentials::new("abc", "xyz"));
	}

	#[test]
	fn fingerprint_tracks_rotation_without_leaking() {
		let original = Credentials::new("abc", "xyz");
		let rotated = Credentials::new("abc", "xyz-2");

		assert_eq!(original.fingerprint(), Credentials::new("abc", "xyz").fingerprint());
		assert_ne!(original.fingerprint(), rotated.fingerprint());
		assert!(!format!("{original:?}").contains("xyz"));
	}
}
