//! Two-tier credential cache for service-to-service bearer tokens.
//!
//! Long-lived client credentials from a secret store feed a short-lived token. The token is
//! refreshed on expiry and re-derived from freshly fetched credentials whenever the issuer
//! rejects the cached ones.
//!
//! ```no_run
//! # async fn run() -> rotating_creds::Result<()> {
//! use std::sync::Arc;
//!
//! use rotating_creds::{CacheConfig, ReqwestTokenCache, secret::FileSecretStore};
//!
//! let config = CacheConfig::from_env()?;
//! let store = Arc::new(FileSecretStore::new("/run/secrets"));
//! let tokens = ReqwestTokenCache::with_reqwest(&config, store)?;
//! let authorization = tokens.get_token(false).await?.bearer_header();
//! # Ok(())
//! # }
//! ```

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod api;
pub mod auth;
pub mod cache;
pub mod clock;
pub mod config;
pub mod error;
pub mod exchange;
pub mod http;
pub mod obs;
pub mod secret;

mod _prelude {
	pub use std::{
		collections::HashMap,
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		str::FromStr,
		sync::Arc,
	};

	pub use async_lock::Mutex as AsyncMutex;
	pub use parking_lot::{Mutex, RwLock};
	#[cfg(feature = "reqwest")]
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

#[cfg(feature = "reqwest")] pub use reqwest;
pub use url;
#[cfg(test)] use {httpmock as _, tokio as _};

#[cfg(feature = "reqwest")]
pub use crate::{api::ReqwestApiClient, cache::ReqwestTokenCache};
pub use crate::{
	auth::{Credentials, SecretId, Token, TokenSecret, TokenState},
	cache::{CredentialCache, TokenCache},
	config::{CacheConfig, ForceRefreshPolicy},
	error::{Error, Result},
};
