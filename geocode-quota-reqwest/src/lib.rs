#![forbid(unsafe_code, future_incompatible)]
#![deny(
    missing_docs,
    missing_debug_implementations,
    missing_copy_implementations,
    nonstandard_style,
    unused_qualifications,
    unused_import_braces,
    unused_extern_crates,
    trivial_casts,
    trivial_numeric_casts
)]
#![allow(clippy::doc_lazy_continuation)]
#![cfg_attr(docsrs, feature(doc_cfg))]
//! # geocode-quota-reqwest
//!
//! A [`Transport`] for the [`geocode-quota`](geocode_quota) client built on
//! the [reqwest] HTTP client.
//!
//! ```no_run
//! use geocode_quota_reqwest::{
//!     FileStateStore, GeocodeError, PromptCredential, ReqwestGeocoder,
//!     ReqwestTransport,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), GeocodeError> {
//!     let client = ReqwestGeocoder::builder(
//!         ReqwestTransport::default(),
//!         FileStateStore::default(),
//!     )
//!     .credential_provider(PromptCredential::stdio())
//!     .build()
//!     .await?;
//!
//!     let response =
//!         client.get_results("704 S 2nd St, Minneapolis, MN 55401").await?;
//!     for result in response.results {
//!         println!("{}", result.formatted_address);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! Requests are paced and checked against the daily quota before they reach
//! reqwest, so the underlying [`reqwest::Client`] can be shared freely with
//! other code.
mod error;

pub use error::BadStatus;

use geocode_quota::{Result, Transport};
use url::Url;

pub use geocode_quota::{
    FileStateStore, GeocodeClient, GeocodeClientBuilder, GeocodeError,
    GeocodeOptions, GeocodeResponse, MemoryStateStore, PromptCredential,
    StateRecord, StateStore, StaticCredential,
};

/// A [`GeocodeClient`] sending its requests with reqwest.
pub type ReqwestGeocoder<S = FileStateStore> =
    GeocodeClient<ReqwestTransport, S>;

/// Implements [`Transport`] with a [`reqwest::Client`].
#[derive(Debug, Clone, Default)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Wraps a pre-configured client, e.g. one with a proxy or user agent
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait::async_trait]
impl Transport for ReqwestTransport {
    async fn get(&self, url: &Url) -> Result<Vec<u8>> {
        let response = self.client.get(url.clone()).send().await?;
        let status = response.status();
        log::debug!("geocoder responded with HTTP {status}");
        if !status.is_success() {
            return Err(BadStatus(status.as_u16()).into());
        }
        Ok(response.bytes().await?.to_vec())
    }
}
