//! Strongly typed secret-store identifiers.

// std
use std::{borrow::Borrow, ops::Deref};
// self
use crate::_prelude::*;

// Matches the longest secret ARN accepted by AWS Secrets Manager.
const SECRET_ID_MAX_LEN: usize = 2048;

/// Opaque identifier that locates the client credentials inside a secret store.
///
/// Names and ARNs are both accepted; the cache never interprets the value beyond rejecting
/// empty strings, embedded whitespace, and values longer than the store would accept.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SecretId(String);
impl SecretId {
	/// Creates a new identifier after validation.
	pub fn new(value: impl AsRef<str>) -> Result<Self, IdentifierError> {
		let view = value.as_ref();

		validate_view(view)?;

		Ok(Self(view.to_owned()))
	}

	/// Returns the identifier as a string slice.
	pub fn as_str(&self) -> &str {
		&self.0
	}
}
impl Deref for SecretId {
	type Target = str;

	fn deref(&self) -> &Self::Target {
		&self.0
	}
}
impl AsRef<str> for SecretId {
	fn as_ref(&self) -> &str {
		&self.0
	}
}
impl From<SecretId> for String {
	fn from(value: SecretId) -> Self {
		value.0
	}
}
impl TryFrom<String> for SecretId {
	type Error = IdentifierError;

	fn try_from(value: String) -> Result<Self, Self::Error> {
		validate_view(&value)?;

		Ok(Self(value))
	}
}
impl Borrow<str> for SecretId {
	fn borrow(&self) -> &str {
		&self.0
	}
}
impl Debug for SecretId {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		write!(f, "Secret({})", self.0)
	}
}
impl Display for SecretId {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(&self.0)
	}
}
impl FromStr for SecretId {
	type Err = IdentifierError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Self::new(s)
	}
}

/// Error returned when identifier validation fails.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, ThisError)]
pub enum IdentifierError {
	/// The identifier was empty.
	#[error("Secret identifier cannot be empty.")]
	Empty,
	/// The identifier contains whitespace characters.
	#[error("Secret identifier contains whitespace.")]
	ContainsWhitespace,
	/// The identifier exceeded the allowed character count.
	#[error("Secret identifier exceeds {max} characters.")]
	TooLong {
		/// Maximum permitted character count.
		max: usize,
	},
}

fn validate_view(view: &str) -> Result<(), IdentifierError> {
	if view.is_empty() {
		return Err(IdentifierError::Empty);
	}
	if view.chars().any(char::is_whitespace) {
		return Err(IdentifierError::ContainsWhitespace);
	}
	if view.len() > SECRET_ID_MAX_LEN {
		return Err(IdentifierError::TooLong { max: SECRET_ID_MAX_LEN });
	}

	Ok(())
}
