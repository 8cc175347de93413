//! Downstream API client authenticated with the cached bearer token.
//!
//! A `401 Unauthorized` answer is the invalidation signal for the whole cache: the client asks
//! the [`TokenCache`] for a forced refresh and repeats the request exactly once.

// crates.io
use oauth2::{
	AsyncHttpClient, HttpRequest, HttpResponse,
	http::{
		Method, StatusCode,
		header::{ACCEPT, AUTHORIZATION},
	},
};
use serde::de::DeserializeOwned;
// self
use crate::{
	_prelude::*,
	auth::TokenSecret,
	cache::TokenCache,
	config::builder::validate_endpoint,
	error::{ApiError, ConfigError, TransportError},
	exchange::{JSON_MEDIA_TYPE, TransportErrorMapper},
	http::{ResponseMetadataSlot, TokenHttpClient},
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
};
#[cfg(feature = "reqwest")]
use crate::{exchange::ReqwestTransportErrorMapper, http::ReqwestHttpClient};

/// [`ApiClient`] specialized for the bundled reqwest transport.
#[cfg(feature = "reqwest")]
pub type ReqwestApiClient = ApiClient<ReqwestHttpClient, ReqwestTransportErrorMapper>;

const TARGET: &str = "API";
const BODY_PREVIEW_CHARS: usize = 256;

/// JSON API client that shares the transport of its [`TokenCache`].
pub struct ApiClient<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	tokens: TokenCache<C, M>,
	base_url: Url,
}
impl<C, M> ApiClient<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Creates a client resolving request paths against `base_url`.
	///
	/// Paths are joined with [`Url::join`], so keep a trailing slash on `base_url` when it has a
	/// path prefix.
	pub fn new(tokens: TokenCache<C, M>, base_url: Url) -> Result<Self, ConfigError> {
		validate_endpoint("API", &base_url)?;

		Ok(Self { tokens, base_url })
	}

	/// Token cache backing this client.
	pub fn tokens(&self) -> &TokenCache<C, M> {
		&self.tokens
	}

	/// Base URL requests are resolved against.
	pub fn base_url(&self) -> &Url {
		&self.base_url
	}

	/// Sends `GET {base_url}/{path}` and decodes the JSON response.
	///
	/// # Errors
	///
	/// - Token acquisition errors from the [`TokenCache`], unchanged.
	/// - [`ApiError::Unauthorized`] when the request is still rejected with HTTP 401 after a
	///   forced token refresh.
	/// - [`ApiError::Status`], [`ApiError::Transport`], or [`ApiError::ResponseParse`] for other
	///   failures. None of these are retried.
	pub async fn get_json<T>(&self, path: &str) -> Result<T>
	where
		T: DeserializeOwned,
	{
		const KIND: FlowKind = FlowKind::Api;

		let span = FlowSpan::new(KIND, "get_json");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span.instrument(self.get_json_inner(path)).await;

		match &result {
			Ok(_) => obs::record_flow_outcome(KIND, FlowOutcome::Success),
			Err(_) => obs::record_flow_outcome(KIND, FlowOutcome::Failure),
		}

		result
	}

	async fn get_json_inner<T>(&self, path: &str) -> Result<T>
	where
		T: DeserializeOwned,
	{
		let url = self
			.base_url
			.join(path)
			.map_err(|source| ConfigError::InvalidUrl { name: "API request", source })?;
		let token = self.tokens.get_token(false).await?;
		let mut response = self.send(&url, &token).await?;

		if response.status() == StatusCode::UNAUTHORIZED {
			obs::api_unauthorized(response.status().as_u16());

			let token = self.tokens.get_token(true).await?;

			response = self.send(&url, &token).await?;

			if response.status() == StatusCode::UNAUTHORIZED {
				return Err(ApiError::Unauthorized { status: response.status().as_u16() }.into());
			}
		}

		let status = response.status();

		if !status.is_success() {
			return Err(
				ApiError::Status { status: status.as_u16(), body_preview: preview(response.body()) }
					.into(),
			);
		}

		let mut de = serde_json::Deserializer::from_slice(response.body());

		Ok(serde_path_to_error::deserialize(&mut de)
			.map_err(|source| ApiError::ResponseParse { source })?)
	}

	async fn send(&self, url: &Url, token: &TokenSecret) -> Result<HttpResponse, ApiError> {
		let request = build_request(url, token)?;
		let exchange = self.tokens.exchange();
		let meta = ResponseMetadataSlot::default();
		let handle = exchange.http_client().with_metadata(meta.clone());

		handle.call(request).await.map_err(|e| {
			ApiError::Transport(exchange.error_mapper().map_transport_error(
				TARGET,
				meta.take().as_ref(),
				e,
			))
		})
	}
}
impl<C, M> Clone for ApiClient<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn clone(&self) -> Self {
		Self { tokens: self.tokens.clone(), base_url: self.base_url.clone() }
	}
}
impl<C, M> Debug for ApiClient<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ApiClient")
			.field("base_url", &self.base_url.as_str())
			.field("tokens", &self.tokens)
			.finish()
	}
}

fn build_request(url: &Url, token: &TokenSecret) -> Result<HttpRequest, ApiError> {
	oauth2::http::Request::builder()
		.method(Method::GET)
		.uri(url.as_str())
		.header(AUTHORIZATION, token.bearer_header())
		.header(ACCEPT, JSON_MEDIA_TYPE)
		.body(Vec::new())
		.map_err(|e| TransportError::InvalidRequest { target: TARGET, source: Box::new(e) }.into())
}

fn preview(body: &[u8]) -> Option<String> {
	let text = String::from_utf8_lossy(body);
	let text = text.trim();

	if text.is_empty() { None } else { Some(text.chars().take(BODY_PREVIEW_CHARS).collect()) }
}
