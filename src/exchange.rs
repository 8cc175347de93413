//! Client-credentials exchange against a JSON token endpoint.
//!
//! The endpoint takes a JSON body rather than the form encoding most OAuth libraries send,
//! so requests are assembled here and dispatched through [`TokenHttpClient`] directly.

// crates.io
use oauth2::{
	AsyncHttpClient, HttpClientError, HttpRequest,
	http::{
		Method,
		header::{ACCEPT, CONTENT_TYPE},
	},
};
// self
use crate::{
	_prelude::*,
	auth::{Credentials, Token},
	config::CacheConfig,
	error::{ExchangeError, TransportError},
	http::{ResponseMetadata, ResponseMetadataSlot, TokenHttpClient},
	obs,
};

pub(crate) const JSON_MEDIA_TYPE: &str = "application/json";

const TARGET: &str = "token endpoint";
const GRANT_TYPE: &str = "client_credentials";

/// Maps HTTP transport failures into [`TransportError`] values.
pub trait TransportErrorMapper<E>
where
	Self: 'static + Send + Sync,
	E: 'static + Send + Sync + StdError,
{
	/// Converts an [`HttpClientError`] emitted by the transport while calling `target`.
	fn map_transport_error(
		&self,
		target: &'static str,
		metadata: Option<&ResponseMetadata>,
		error: HttpClientError<E>,
	) -> TransportError;
}

/// Default mapper for reqwest-backed transports.
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug, Default)]
pub struct ReqwestTransportErrorMapper;
#[cfg(feature = "reqwest")]
impl TransportErrorMapper<ReqwestError> for ReqwestTransportErrorMapper {
	fn map_transport_error(
		&self,
		target: &'static str,
		meta: Option<&ResponseMetadata>,
		err: HttpClientError<ReqwestError>,
	) -> TransportError {
		match err {
			HttpClientError::Reqwest(inner) => map_reqwest_error(target, meta, *inner),
			HttpClientError::Http(inner) =>
				TransportError::InvalidRequest { target, source: Box::new(inner) },
			HttpClientError::Io(inner) => TransportError::Io(inner),
			HttpClientError::Other(message) => TransportError::Other { target, message },
			_ => TransportError::Other { target, message: "unclassified transport failure".into() },
		}
	}
}

#[derive(Serialize)]
struct TokenRequest<'a> {
	grant_type: &'a str,
	client_id: &'a str,
	client_secret: &'a str,
	audience: &'a str,
}

#[derive(Deserialize)]
struct TokenResponse {
	access_token: String,
	expires_in: i64,
}

#[derive(Default, Deserialize)]
struct ErrorResponse {
	error: Option<String>,
	error_description: Option<String>,
}

/// Performs the client-credentials exchange and applies the safety margin to the result.
pub struct TokenExchange<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	http_client: Arc<C>,
	error_mapper: Arc<M>,
	endpoint: Url,
	audience: String,
	safety_margin: Duration,
}
impl<C, M> TokenExchange<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Creates an exchange posting to `endpoint` for `audience`.
	pub fn new(
		http_client: impl Into<Arc<C>>,
		error_mapper: impl Into<Arc<M>>,
		endpoint: Url,
		audience: impl Into<String>,
		safety_margin: Duration,
	) -> Self {
		Self {
			http_client: http_client.into(),
			error_mapper: error_mapper.into(),
			endpoint,
			audience: audience.into(),
			safety_margin,
		}
	}

	/// Creates an exchange from the endpoint, audience, and margin in `config`.
	pub fn from_config(
		config: &CacheConfig,
		http_client: impl Into<Arc<C>>,
		error_mapper: impl Into<Arc<M>>,
	) -> Self {
		Self::new(
			http_client,
			error_mapper,
			config.token_endpoint.clone(),
			config.audience.clone(),
			config.safety_margin,
		)
	}

	/// Token endpoint receiving the exchange.
	pub fn endpoint(&self) -> &Url {
		&self.endpoint
	}

	/// Shared HTTP client used for the exchange.
	pub fn http_client(&self) -> &Arc<C> {
		&self.http_client
	}

	/// Shared transport error mapper.
	pub fn error_mapper(&self) -> &Arc<M> {
		&self.error_mapper
	}

	/// Exchanges `credentials` for a token issued at `now`.
	///
	/// The returned token expires at `now + (expires_in - safety_margin)`. A lifetime that does
	/// not exceed the margin still yields a token, already expired at `now`.
	pub async fn exchange(
		&self,
		credentials: &Credentials,
		now: OffsetDateTime,
	) -> Result<Token, ExchangeError> {
		let request = self.build_request(credentials)?;
		let meta = ResponseMetadataSlot::default();
		let handle = self.http_client.with_metadata(meta.clone());
		let response = handle.call(request).await.map_err(|e| {
			ExchangeError::from(self.error_mapper.map_transport_error(
				TARGET,
				meta.take().as_ref(),
				e,
			))
		})?;
		let metadata = meta.take();
		let status = response.status();

		if !status.is_success() {
			let body = serde_json::from_slice::<ErrorResponse>(response.body()).unwrap_or_default();

			return Err(ExchangeError::Rejected {
				status: status.as_u16(),
				error: body.error,
				description: body.error_description,
				retry_after: metadata.and_then(|meta| meta.retry_after),
			});
		}

		let mut de = serde_json::Deserializer::from_slice(response.body());
		let parsed: TokenResponse = serde_path_to_error::deserialize(&mut de)
			.map_err(|source| ExchangeError::ResponseParse { source, status: Some(status.as_u16()) })?;

		if parsed.expires_in <= 0 {
			return Err(ExchangeError::NonPositiveExpiresIn { expires_in: parsed.expires_in });
		}

		let lifetime = Duration::seconds(parsed.expires_in);

		if lifetime <= self.safety_margin {
			obs::short_lifetime(parsed.expires_in, self.safety_margin);
		}

		Token::builder()
			.access_token(parsed.access_token)
			.issued_at(now)
			.expires_in(lifetime)
			.safety_margin(self.safety_margin)
			.build()
			.map_err(|source| ExchangeError::ExpiresInOutOfRange {
				expires_in: parsed.expires_in,
				source,
			})
	}

	fn build_request(&self, credentials: &Credentials) -> Result<HttpRequest, ExchangeError> {
		let body = serde_json::to_vec(&TokenRequest {
			grant_type: GRANT_TYPE,
			client_id: &credentials.client_id,
			client_secret: credentials.client_secret.expose(),
			audience: &self.audience,
		})
		.map_err(|e| TransportError::InvalidRequest { target: TARGET, source: Box::new(e) })?;

		oauth2::http::Request::builder()
			.method(Method::POST)
			.uri(self.endpoint.as_str())
			.header(CONTENT_TYPE, JSON_MEDIA_TYPE)
			.header(ACCEPT, JSON_MEDIA_TYPE)
			.body(body)
			.map_err(|e| TransportError::InvalidRequest { target: TARGET, source: Box::new(e) }.into())
	}
}
impl<C, M> Debug for TokenExchange<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenExchange")
			.field("endpoint", &self.endpoint.as_str())
			.field("audience", &self.audience)
			.field("safety_margin", &self.safety_margin)
			.finish()
	}
}

#[cfg(feature = "reqwest")]
fn map_reqwest_error(
	target: &'static str,
	meta: Option<&ResponseMetadata>,
	err: ReqwestError,
) -> TransportError {
	if err.is_builder() {
		return TransportError::InvalidRequest { target, source: Box::new(err) };
	}
	if err.is_timeout() {
		return TransportError::Timeout {
			target,
			status: meta
				.and_then(|value| value.status)
				.or_else(|| err.status().map(|code| code.as_u16())),
		};
	}

	TransportError::network(target, err)
}

#[cfg(test)]
mod tests {
	// std
	use std::io;
	// crates.io
	use oauth2::HttpResponse;
	use time::macros;
	// self
	use super::*;
	use crate::auth::TokenBuildError;

	struct StaticClient {
		status: u16,
		body: &'static str,
		captured: Arc<Mutex<Option<HttpRequest>>>,
	}
	impl StaticClient {
		fn new(status: u16, body: &'static str) -> Self {
			Self { status, body, captured: Default::default() }
		}
	}
	impl TokenHttpClient for StaticClient {
		type Handle = StaticHandle;
		type TransportError = io::Error;

		fn with_metadata(&self, slot: ResponseMetadataSlot) -> Self::Handle {
			StaticHandle {
				slot,
				status: self.status,
				body: self.body,
				captured: self.captured.clone(),
			}
		}
	}

	struct StaticHandle {
		slot: ResponseMetadataSlot,
		status: u16,
		body: &'static str,
		captured: Arc<Mutex<Option<HttpRequest>>>,
	}
	impl<'c> AsyncHttpClient<'c> for StaticHandle {
		type Error = HttpClientError<io::Error>;
		type Future =
			Pin<Box<dyn Future<Output = Result<HttpResponse, Self::Error>> + 'c + Send + Sync>>;

		fn call(&'c self, request: HttpRequest) -> Self::Future {
			Box::pin(async move {
				self.slot.take();
				*self.captured.lock() = Some(request);
				self.slot.store(ResponseMetadata {
					status: Some(self.status),
					retry_after: Some(Duration::seconds(7)),
				});

				let mut response = HttpResponse::new(self.body.as_bytes().to_vec());

				*response.status_mut() = oauth2::http::StatusCode::from_u16(self.status)
					.map_err(|e| HttpClientError::Other(e.to_string()))?;

				Ok(response)
			})
		}
	}

	struct IoMapper;
	impl TransportErrorMapper<io::Error> for IoMapper {
		fn map_transport_error(
			&self,
			target: &'static str,
			_metadata: Option<&ResponseMetadata>,
			error: HttpClientError<io::Error>,
		) -> TransportError {
			TransportError::Other { target, message: error.to_string() }
		}
	}

	fn exchange(client: StaticClient) -> TokenExchange<StaticClient, IoMapper> {
		TokenExchange::new(
			client,
			IoMapper,
			Url::parse("https://issuer.example.com/v2/token").expect("Endpoint fixture should parse."),
			"https://api.example.com/",
			Duration::seconds(100),
		)
	}

	#[tokio::test]
	async fn posts_json_client_credentials_request() {
		let client = StaticClient::new(200, r#"{"access_token":"tok1","expires_in":200}"#);
		let captured = client.captured.clone();
		let now = macros::datetime!(2025-01-01 00:00 UTC);
		let token = exchange(client)
			.exchange(&Credentials::new("abc", "xyz"), now)
			.await
			.expect("Successful exchange should yield a token.");

		assert_eq!(token.access_token.expose(), "tok1");
		assert_eq!(token.issued_at, now);
		assert_eq!(token.expires_at, now + Duration::seconds(100));

		let request = captured.lock().take().expect("Request should have been captured.");
		let body: serde_json::Value =
			serde_json::from_slice(request.body()).expect("Request body should be JSON.");

		assert_eq!(request.method(), Method::POST);
		assert_eq!(request.uri(), "https://issuer.example.com/v2/token");
		assert_eq!(request.headers()[CONTENT_TYPE], JSON_MEDIA_TYPE);
		assert_eq!(request.headers()[ACCEPT], JSON_MEDIA_TYPE);
		assert_eq!(
			body,
			serde_json::json!({
				"grant_type": "client_credentials",
				"client_id": "abc",
				"client_secret": "xyz",
				"audience": "https://api.example.com/",
			})
		);
	}

	#[tokio::test]
	async fn rejection_carries_oauth_error_fields() {
		let client = StaticClient::new(
			401,
			r#"{"error":"access_denied","error_description":"Unauthorized"}"#,
		);
		let err = exchange(client)
			.exchange(&Credentials::new("abc", "revoked"), OffsetDateTime::now_utc())
			.await
			.expect_err("401 responses should be rejected.");

		let ExchangeError::Rejected { status, error, description, retry_after } = err else {
			panic!("Expected a rejection.");
		};

		assert_eq!(status, 401);
		assert_eq!(error.as_deref(), Some("access_denied"));
		assert_eq!(description.as_deref(), Some("Unauthorized"));
		assert_eq!(retry_after, Some(Duration::seconds(7)));
	}

	#[tokio::test]
	async fn rejection_tolerates_non_json_bodies() {
		let err = exchange(StaticClient::new(503, "<html>unavailable</html>"))
			.exchange(&Credentials::new("abc", "xyz"), OffsetDateTime::now_utc())
			.await
			.expect_err("503 responses should be rejected.");

		assert!(matches!(err, ExchangeError::Rejected { status: 503, error: None, .. }));
	}

	#[tokio::test]
	async fn malformed_and_non_positive_responses_fail() {
		let err = exchange(StaticClient::new(200, r#"{"access_token":"tok1"}"#))
			.exchange(&Credentials::new("abc", "xyz"), OffsetDateTime::now_utc())
			.await
			.expect_err("Responses without expires_in should fail.");

		assert!(matches!(err, ExchangeError::ResponseParse { status: Some(200), .. }));

		let err = exchange(StaticClient::new(200, r#"{"access_token":"tok1","expires_in":0}"#))
			.exchange(&Credentials::new("abc", "xyz"), OffsetDateTime::now_utc())
			.await
			.expect_err("Zero lifetimes should fail.");

		assert!(matches!(err, ExchangeError::NonPositiveExpiresIn { expires_in: 0 }));
	}

	#[tokio::test]
	async fn unrepresentable_expiry_is_an_exchange_failure() {
		let err = exchange(StaticClient::new(
			200,
			r#"{"access_token":"tok1","expires_in":100000000000000}"#,
		))
		.exchange(&Credentials::new("abc", "xyz"), OffsetDateTime::now_utc())
		.await
		.expect_err("Lifetimes beyond the date range should fail.");

		assert!(matches!(
			err,
			ExchangeError::ExpiresInOutOfRange {
				expires_in: 100_000_000_000_000,
				source: TokenBuildError::ExpiryOutOfRange,
			}
		));
	}

	#[tokio::test]
	async fn lifetime_within_margin_is_expired_on_arrival() {
		let now = macros::datetime!(2025-01-01 00:00 UTC);
		let token = exchange(StaticClient::new(200, r#"{"access_token":"tok1","expires_in":60}"#))
			.exchange(&Credentials::new("abc", "xyz"), now)
			.await
			.expect("Short lifetimes still produce a token.");

		assert!(token.is_expired_at(now));
	}
}
