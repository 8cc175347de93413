//! Optional observability helpers for cache flows.
//!
//! # Feature Flags
//!
//! - Enable `tracing` to emit structured spans named `rotating_creds.flow` with the `flow`
//!   (cache tier) and `stage` (call site) fields, plus debug/info/warn events for cache hits,
//!   misses, and retries.
//! - Enable `metrics` to increment the `rotating_creds_flow_total` counter for every
//!   attempt/cache hit/success/retry/failure, labeled by `flow` + `outcome`.

mod metrics;
mod tracing;

pub use metrics::*;
pub use tracing::*;

// self
use crate::_prelude::*;

/// Flow kinds observed by the caches.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FlowKind {
	/// Client credential lookups against the secret store.
	Credentials,
	/// Access token lookups against the token endpoint.
	Token,
	/// Downstream API calls authenticated with the cached token.
	Api,
}
impl FlowKind {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			FlowKind::Credentials => "credentials",
			FlowKind::Token => "token",
			FlowKind::Api => "api",
		}
	}
}
impl Display for FlowKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded for each call.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FlowOutcome {
	/// Entry to a cache operation.
	Attempt,
	/// Cached value returned without an external call.
	CacheHit,
	/// Successful completion.
	Success,
	/// Failed attempt followed by a retry with refreshed inputs.
	Retry,
	/// Failure propagated back to the caller.
	Failure,
}
impl FlowOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			FlowOutcome::Attempt => "attempt",
			FlowOutcome::CacheHit => "cache_hit",
			FlowOutcome::Success => "success",
			FlowOutcome::Retry => "retry",
			FlowOutcome::Failure => "failure",
		}
	}
}
impl Display for FlowOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Why a cache went to its backing service.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MissReason {
	/// Nothing was cached yet.
	Empty,
	/// The cached value reached its expiry instant.
	Expired,
	/// The caller forced a refresh.
	Forced,
}
impl MissReason {
	/// Returns a stable label suitable for event fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			MissReason::Empty => "empty",
			MissReason::Expired => "expired",
			MissReason::Forced => "forced",
		}
	}
}
impl Display for MissReason {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn labels_are_stable() {
		assert_eq!(FlowKind::Credentials.to_string(), "credentials");
		assert_eq!(FlowKind::Api.as_str(), "api");
		assert_eq!(FlowOutcome::CacheHit.to_string(), "cache_hit");
		assert_eq!(MissReason::Forced.as_str(), "forced");
	}
}
