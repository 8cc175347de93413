//! Immutable bearer token records, lifecycle helpers, and builders.

// self
use crate::{_prelude::*, auth::token::secret::TokenSecret};

/// Lifecycle state of the token slot held by a [`TokenCache`](crate::cache::TokenCache).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TokenState {
	/// No token has been issued yet.
	Empty,
	/// A token is cached and its (margin-adjusted) expiry is still in the future.
	Valid,
	/// A token is cached but its (margin-adjusted) expiry has passed.
	Expired,
}
impl TokenState {
	/// Derives the slot state for an optional token at `instant`.
	pub fn of(token: Option<&Token>, instant: OffsetDateTime) -> Self {
		match token {
			None => Self::Empty,
			Some(token) if token.is_valid_at(instant) => Self::Valid,
			Some(_) => Self::Expired,
		}
	}
}

/// Errors produced by [`TokenBuilder`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum TokenBuildError {
	/// Issued when no access token value was provided.
	#[error("Access token is required.")]
	MissingAccessToken,
	/// Issued when no expiry (absolute or relative) was configured.
	#[error("Expiry must be supplied via expires_at or expires_in.")]
	MissingExpiry,
	/// Issued when `issued_at + (expires_in - safety_margin)` falls outside the representable
	/// date range.
	#[error("Token expiry is out of range.")]
	ExpiryOutOfRange,
}

/// Bearer token issued by the token endpoint.
///
/// `expires_at` already has the safety margin subtracted, so every validity check compares
/// against it directly.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
	/// Access token secret; callers must avoid logging it.
	pub access_token: TokenSecret,
	/// Instant the token was received.
	pub issued_at: OffsetDateTime,
	/// Margin-adjusted expiry instant.
	pub expires_at: OffsetDateTime,
}
impl Token {
	/// Returns a builder for constructing token records.
	pub fn builder() -> TokenBuilder {
		TokenBuilder::default()
	}

	/// Returns `true` while `instant` is strictly before the expiry.
	pub fn is_valid_at(&self, instant: OffsetDateTime) -> bool {
		instant < self.expires_at
	}

	/// Returns `true` once `instant` reached the expiry.
	pub fn is_expired_at(&self, instant: OffsetDateTime) -> bool {
		!self.is_valid_at(instant)
	}

	/// Remaining lifetime at `instant`, clamped at zero.
	pub fn remaining_at(&self, instant: OffsetDateTime) -> Duration {
		let remaining = self.expires_at - instant;

		if remaining.is_negative() { Duration::ZERO } else { remaining }
	}
}
impl Debug for Token {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Token")
			.field("access_token", &"<redacted>")
			.field("issued_at", &self.issued_at)
			.field("expires_at", &self.expires_at)
			.finish()
	}
}

/// Builder for [`Token`].
#[derive(Clone, Debug, Default)]
pub struct TokenBuilder {
	access_token: Option<TokenSecret>,
	issued_at: Option<OffsetDateTime>,
	expires_at: Option<OffsetDateTime>,
	expires_in: Option<Duration>,
	safety_margin: Duration,
}
impl TokenBuilder {
	/// Provides the access token value.
	pub fn access_token(mut self, token: impl Into<String>) -> Self {
		self.access_token = Some(TokenSecret::new(token));

		self
	}

	/// Sets the issued-at instant (defaults to the current UTC clock).
	pub fn issued_at(mut self, instant: OffsetDateTime) -> Self {
		self.issued_at = Some(instant);

		self
	}

	/// Sets an absolute expiry instant; the safety margin is not applied to it.
	pub fn expires_at(mut self, instant: OffsetDateTime) -> Self {
		self.expires_at = Some(instant);

		self
	}

	/// Sets the issuer-reported lifetime relative to `issued_at`.
	pub fn expires_in(mut self, lifetime: Duration) -> Self {
		self.expires_in = Some(lifetime);

		self
	}

	/// Sets the margin subtracted from the issuer-reported lifetime.
	pub fn safety_margin(mut self, margin: Duration) -> Self {
		self.safety_margin = margin;

		self
	}

	/// Consumes the builder and produces a [`Token`].
	pub fn build(self) -> Result<Token, TokenBuildError> {
		let access_token = self.access_token.ok_or(TokenBuildError::MissingAccessToken)?;
		let issued_at = self.issued_at.unwrap_or_else(OffsetDateTime::now_utc);
		let expires_at = match (self.expires_at, self.expires_in) {
			(Some(instant), _) => instant,
			(None, Some(lifetime)) => lifetime
				.checked_sub(self.safety_margin)
				.and_then(|remaining| issued_at.checked_add(remaining))
				.ok_or(TokenBuildError::ExpiryOutOfRange)?,
			(None, None) => return Err(TokenBuildError::MissingExpiry),
		};

		Ok(Token { access_token, issued_at, expires_at })
	}
}
