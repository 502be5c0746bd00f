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
//! A geocoding client that paces its requests and honours a daily quota,
//! keeping that state on disk so the limits survive process restarts.
//!
//! Every request goes through a single [`GeocodeClient`], which serializes
//! callers behind one lock, enforces a minimum interval between requests,
//! refuses to call out once the service has reported the daily quota as
//! exhausted, and persists its [`StateRecord`] after every request.
//!
//! The quota resets at the next local midnight in a fixed timezone
//! (`America/Los_Angeles` by default), computed on calendar days so daylight
//! saving transitions are respected.
//!
//! ## Basic Usage
//!
//! The HTTP client is pluggable through the [`Transport`] trait; see
//! [`geocode-quota-reqwest`](https://docs.rs/geocode-quota-reqwest) for a
//! ready made implementation.
//!
//! ```rust,ignore
//! use geocode_quota::{FileStateStore, GeocodeClient, PromptCredential};
//! use geocode_quota_reqwest::ReqwestTransport;
//!
//! # async fn run() -> Result<(), geocode_quota::GeocodeError> {
//! let client = GeocodeClient::builder(
//!     ReqwestTransport::default(),
//!     FileStateStore::default(),
//! )
//! .credential_provider(PromptCredential::stdio())
//! .build()
//! .await?;
//!
//! let response = client.get_results("240 Summit Ave, St Paul, MN 55102").await?;
//! println!("{}", response.status);
//! # Ok(())
//! # }
//! ```
//!
//! ## State file
//!
//! [`FileStateStore`] keeps four lines in `./.geocoder-data` by default: the
//! API key, the last request time, whether the quota is exhausted and when
//! it resets. Deleting the file resets everything and the credential is
//! asked for again.
mod client;
mod credential;
mod error;
mod gate;
mod record;
mod response;
mod stores;

use std::time::Duration;

use chrono_tz::Tz;
use url::Url;

pub use client::{GeocodeClient, GeocodeClientBuilder};
pub use credential::{
    CredentialProvider, PromptCredential, StaticCredential, PROMPT,
};
pub use error::{BoxError, FieldError, GeocodeError, Result};
pub use gate::{next_local_midnight, AdmitDecision, QuotaGate, OVER_QUERY_LIMIT};
pub use record::{StateRecord, ZERO_TIMESTAMP};
pub use response::{
    AddressComponent, GeocodeResponse, GeocodeResult, Geometry, LatLng,
    Viewport,
};
pub use stores::{
    file::{FileStateStore, DEFAULT_STATE_PATH},
    memory::MemoryStateStore,
};

pub use chrono_tz;

/// Default geocoding endpoint.
pub const DEFAULT_ENDPOINT: &str =
    "https://maps.googleapis.com/maps/api/geocode/json";

/// Default minimum spacing between two requests.
pub const DEFAULT_MIN_INTERVAL: Duration = Duration::from_millis(20);

/// Default timezone whose midnight resets the daily quota.
pub const DEFAULT_RESET_TIMEZONE: Tz = Tz::America__Los_Angeles;

/// Sends the outbound geocoding request.
#[async_trait::async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Issues a GET for `url` and returns the raw response body.
    async fn get(&self, url: &Url) -> Result<Vec<u8>>;
}

/// A trait providing methods for loading and persisting the state record.
#[async_trait::async_trait]
pub trait StateStore: Send + Sync + 'static {
    /// Loads the stored record. A store with nothing in it yields
    /// [`StateRecord::default`]; fields that fail to parse take their zero
    /// value.
    async fn load(&self) -> Result<StateRecord>;
    /// Replaces the stored record with `record`.
    async fn save(&self, record: &StateRecord) -> Result<()>;
}

/// Configuration for a [`GeocodeClient`].
///
/// ```rust
/// use geocode_quota::GeocodeOptions;
/// use std::time::Duration;
///
/// let options = GeocodeOptions {
///     min_interval: Duration::from_millis(50),
///     request_timeout: Some(Duration::from_secs(10)),
///     ..Default::default()
/// }
/// .with_timezone_name("America/New_York")
/// .unwrap();
/// assert_eq!(options.reset_timezone.name(), "America/New_York");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct GeocodeOptions {
    /// Service endpoint; the `address` and `key` query parameters are
    /// appended to it.
    pub endpoint: Url,
    /// Minimum time between the release of two consecutive requests.
    pub min_interval: Duration,
    /// Timezone whose local midnight resets an exhausted daily quota.
    pub reset_timezone: Tz,
    /// Deadline for a single outbound call. `None` waits indefinitely,
    /// blocking every other caller for as long as the call hangs.
    pub request_timeout: Option<Duration>,
}

impl Default for GeocodeOptions {
    fn default() -> Self {
        Self {
            endpoint: Url::parse(DEFAULT_ENDPOINT)
                .expect("default endpoint is a valid URL"),
            min_interval: DEFAULT_MIN_INTERVAL,
            reset_timezone: DEFAULT_RESET_TIMEZONE,
            request_timeout: None,
        }
    }
}

impl GeocodeOptions {
    /// Sets the reset timezone from an IANA name such as
    /// `America/Los_Angeles`.
    pub fn with_timezone_name(
        mut self,
        name: &str,
    ) -> std::result::Result<Self, GeocodeError> {
        self.reset_timezone = name
            .parse()
            .map_err(|_| GeocodeError::InvalidTimezone(name.to_string()))?;
        Ok(self)
    }
}
