//! Second tier: bearer token derived from the cached credentials.

// self
use crate::{
	_prelude::*,
	auth::{Token, TokenSecret, TokenState},
	cache::{CredentialCache, SharedSlot},
	clock::{Clock, SystemClock},
	config::{CacheConfig, ForceRefreshPolicy},
	error::AuthenticationError,
	exchange::{TokenExchange, TransportErrorMapper},
	http::TokenHttpClient,
	obs::{self, FlowKind, FlowOutcome, FlowSpan, MissReason},
};
#[cfg(feature = "reqwest")]
use crate::{exchange::ReqwestTransportErrorMapper, http::ReqwestHttpClient, secret::SecretStore};

/// [`TokenCache`] specialized for the bundled reqwest transport.
#[cfg(feature = "reqwest")]
pub type ReqwestTokenCache = TokenCache<ReqwestHttpClient, ReqwestTransportErrorMapper>;

/// Process-wide holder of the bearer token.
///
/// A cached token is returned until its margin-adjusted expiry. A refresh pulls credentials
/// from the [`CredentialCache`] and, if the exchange fails, refreshes the credentials and
/// tries exactly once more. Clones share the same slots.
pub struct TokenCache<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	credentials: CredentialCache,
	exchange: Arc<TokenExchange<C, M>>,
	clock: Arc<dyn Clock>,
	force_refresh: ForceRefreshPolicy,
	state: Arc<SharedSlot<Token>>,
}
impl<C, M> TokenCache<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	const KIND: FlowKind = FlowKind::Token;

	/// Creates an empty token cache on top of `credentials`.
	pub fn new(
		config: &CacheConfig,
		credentials: CredentialCache,
		http_client: impl Into<Arc<C>>,
		error_mapper: impl Into<Arc<M>>,
	) -> Self {
		Self {
			credentials,
			exchange: Arc::new(TokenExchange::from_config(config, http_client, error_mapper)),
			clock: Arc::new(SystemClock),
			force_refresh: config.force_refresh,
			state: Default::default(),
		}
	}

	/// Replaces the time source used for expiry bookkeeping.
	pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
		self.clock = clock;

		self
	}

	/// Credential tier feeding this cache.
	pub fn credentials(&self) -> &CredentialCache {
		&self.credentials
	}

	/// Exchange used to mint new tokens.
	pub fn exchange(&self) -> &TokenExchange<C, M> {
		&self.exchange
	}

	/// Policy applied to `force_refresh` while the cached token is still valid.
	pub fn force_refresh_policy(&self) -> ForceRefreshPolicy {
		self.force_refresh
	}

	/// Returns the cached token, valid or not, without any I/O.
	pub fn current(&self) -> Option<Token> {
		self.state.value()
	}

	/// Reports whether the slot is empty, valid, or expired right now.
	pub fn state(&self) -> TokenState {
		TokenState::of(self.state.value().as_ref(), self.clock.now())
	}

	/// Drops the cached token. Credentials stay cached.
	pub fn invalidate(&self) {
		self.state.clear();
	}

	/// Returns a valid bearer token, exchanging credentials for a new one when needed.
	///
	/// With [`ForceRefreshPolicy::Bypass`], `force_refresh` skips a still-valid cached token;
	/// with [`ForceRefreshPolicy::ExpiryOnly`] only expiry matters.
	///
	/// # Errors
	///
	/// - [`Error::Config`] or [`Error::ExternalService`] from the credential tier, unchanged.
	/// - [`Error::Authentication`] when the exchange failed twice, the second time with freshly
	///   fetched credentials. The cached token is left as it was.
	pub async fn get_token(&self, force_refresh: bool) -> Result<TokenSecret> {
		let span = FlowSpan::new(Self::KIND, "get_token");

		obs::record_flow_outcome(Self::KIND, FlowOutcome::Attempt);

		let result = span.instrument(self.resolve(force_refresh)).await;

		match &result {
			Ok(_) => obs::record_flow_outcome(Self::KIND, FlowOutcome::Success),
			Err(_) => obs::record_flow_outcome(Self::KIND, FlowOutcome::Failure),
		}

		result
	}

	async fn resolve(&self, force_refresh: bool) -> Result<TokenSecret> {
		let bypass = self.force_refresh.bypasses_cache(force_refresh);
		let (cached, observed) = self.state.snapshot();

		if let (false, Some(token)) = (bypass, valid_at(cached.as_ref(), self.clock.now())) {
			obs::cache_hit(Self::KIND);

			return Ok(token.access_token.clone());
		}

		let _refresh = self.state.lock_refresh().await;
		let (cached, current) = self.state.snapshot();
		let now = self.clock.now();

		match valid_at(cached.as_ref(), now) {
			Some(token) if !bypass || current != observed => {
				obs::cache_hit(Self::KIND);

				return Ok(token.access_token.clone());
			},
			Some(_) => obs::cache_miss(Self::KIND, MissReason::Forced),
			None if cached.is_some() => obs::cache_miss(Self::KIND, MissReason::Expired),
			None => obs::cache_miss(Self::KIND, MissReason::Empty),
		}

		let token = self.exchange_with_retry().await?;
		let access_token = token.access_token.clone();

		self.state.store(token);

		Ok(access_token)
	}

	async fn exchange_with_retry(&self) -> Result<Token> {
		let credentials = self.credentials.get_credentials(false).await?;
		let first = match self.exchange.exchange(&credentials, self.clock.now()).await {
			Ok(token) => return Ok(token),
			Err(e) => e,
		};

		obs::exchange_retry(&first);

		let credentials = self.credentials.get_credentials(true).await?;

		self.exchange
			.exchange(&credentials, self.clock.now())
			.await
			.map_err(|source| AuthenticationError { attempts: 2, source }.into())
	}
}
#[cfg(feature = "reqwest")]
impl ReqwestTokenCache {
	/// Builds both tiers from `config` on top of a reqwest client that honors
	/// `config.request_timeout` and never follows redirects.
	pub fn with_reqwest(config: &CacheConfig, store: Arc<dyn SecretStore>) -> Result<Self> {
		let credentials = CredentialCache::from_config(config, store);
		let http_client = ReqwestHttpClient::with_timeout(config.request_timeout)?;

		Ok(Self::new(config, credentials, http_client, ReqwestTransportErrorMapper))
	}
}
impl<C, M> Clone for TokenCache<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn clone(&self) -> Self {
		Self {
			credentials: self.credentials.clone(),
			exchange: self.exchange.clone(),
			clock: self.clock.clone(),
			force_refresh: self.force_refresh,
			state: self.state.clone(),
		}
	}
}
impl<C, M> Debug for TokenCache<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenCache")
			.field("credentials", &self.credentials)
			.field("exchange", &self.exchange)
			.field("force_refresh", &self.force_refresh)
			.field("state", &self.state())
			.finish()
	}
}

fn valid_at(token: Option<&Token>, instant: OffsetDateTime) -> Option<&Token> {
	token.filter(|token| token.is_valid_at(instant))
}
