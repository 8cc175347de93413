// self
use crate::{
	_prelude::*,
	auth::SecretId,
	error::ExchangeError,
	obs::{self, FlowKind, FlowOutcome, MissReason},
};

/// Type alias that resolves to an instrumented future when tracing is enabled.
#[cfg(feature = "tracing")]
pub type InstrumentedFlow<F> = tracing::instrument::Instrumented<F>;
/// Passthrough future type when tracing is disabled.
#[cfg(not(feature = "tracing"))]
pub type InstrumentedFlow<F> = F;

/// A span builder used by cache flows.
#[derive(Clone, Debug)]
pub struct FlowSpan {
	#[cfg(feature = "tracing")]
	span: tracing::Span,
}
impl FlowSpan {
	/// Creates a new span tagged with the provided flow kind + stage.
	pub fn new(kind: FlowKind, stage: &'static str) -> Self {
		#[cfg(feature = "tracing")]
		{
			let span = tracing::info_span!("rotating_creds.flow", flow = kind.as_str(), stage);

			Self { span }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = (kind, stage);

			Self {}
		}
	}

	/// Instruments an async block without holding a guard across `.await` points.
	pub fn instrument<Fut>(&self, fut: Fut) -> InstrumentedFlow<Fut>
	where
		Fut: Future,
	{
		#[cfg(feature = "tracing")]
		{
			use tracing::Instrument;

			fut.instrument(self.span.clone())
		}
		#[cfg(not(feature = "tracing"))]
		{
			fut
		}
	}
}

/// Cached value served without an external call.
pub(crate) fn cache_hit(kind: FlowKind) {
	#[cfg(feature = "tracing")]
	tracing::debug!(flow = kind.as_str(), "Serving cached value.");

	obs::record_flow_outcome(kind, FlowOutcome::CacheHit);
}

/// Cache is about to call its backing service.
pub(crate) fn cache_miss(kind: FlowKind, reason: MissReason) {
	#[cfg(feature = "tracing")]
	tracing::info!(flow = kind.as_str(), reason = reason.as_str(), "Refreshing cached value.");
	#[cfg(not(feature = "tracing"))]
	let _ = (kind, reason);
}

/// First exchange attempt failed; credentials are refreshed before the single retry.
pub(crate) fn exchange_retry(error: &ExchangeError) {
	#[cfg(feature = "tracing")]
	tracing::warn!(
		status = error.status(),
		error = %error,
		"Token exchange failed; retrying with refreshed credentials."
	);
	#[cfg(not(feature = "tracing"))]
	let _ = error;

	obs::record_flow_outcome(FlowKind::Token, FlowOutcome::Retry);
}

/// Forced credential refresh returned what was already cached.
pub(crate) fn credentials_unchanged(secret_id: &SecretId, fingerprint: &str) {
	#[cfg(feature = "tracing")]
	tracing::warn!(
		secret_id = secret_id.as_str(),
		fingerprint,
		"Forced credential refresh returned unchanged credentials."
	);
	#[cfg(not(feature = "tracing"))]
	let _ = (secret_id, fingerprint);
}

/// Issued token lives no longer than the safety margin and is expired on arrival.
pub(crate) fn short_lifetime(expires_in: i64, safety_margin: Duration) {
	#[cfg(feature = "tracing")]
	tracing::warn!(
		expires_in,
		safety_margin = safety_margin.whole_seconds(),
		"Token lifetime does not exceed the safety margin; it will be refreshed on next use."
	);
	#[cfg(not(feature = "tracing"))]
	let _ = (expires_in, safety_margin);
}

/// Downstream API rejected the bearer token; the token cache is forced before one retry.
pub(crate) fn api_unauthorized(status: u16) {
	#[cfg(feature = "tracing")]
	tracing::warn!(status, "API rejected the bearer token; forcing a token refresh.");
	#[cfg(not(feature = "tracing"))]
	let _ = status;

	obs::record_flow_outcome(FlowKind::Api, FlowOutcome::Retry);
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn event_helpers_run_without_subscriber() {
		cache_hit(FlowKind::Credentials);
		cache_miss(FlowKind::Token, MissReason::Expired);
		short_lifetime(50, Duration::seconds(100));
	}

	#[tokio::test]
	async fn instrument_wraps_future() {
		let span = FlowSpan::new(FlowKind::Token, "instrument_wraps_future");
		let value = span.instrument(async { 42 }).await;

		assert_eq!(value, 42);
	}
}
