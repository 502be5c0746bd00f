use std::fmt;

use chrono::Utc;
use tokio::sync::Mutex;
use url::Url;

use crate::{
    AdmitDecision, CredentialProvider, GeocodeError, GeocodeOptions,
    GeocodeResponse, QuotaGate, StateRecord, StateStore, StaticCredential,
    Transport,
};

type ClientResult<T> = Result<T, GeocodeError>;

// How many times an empty answer from a credential provider is tolerated.
const MAX_CREDENTIAL_ATTEMPTS: usize = 3;

/// A geocoding client enforcing request pacing and the daily quota.
///
/// All requests made through one client are serialized: at most one
/// request cycle, including its pacing delay and network round trip, runs
/// at a time. The state is persisted after every cycle, whatever its
/// outcome.
#[derive(Debug)]
pub struct GeocodeClient<T: Transport, S: StateStore> {
    transport: T,
    store: S,
    options: GeocodeOptions,
    gate: Mutex<QuotaGate>,
}

impl<T: Transport, S: StateStore> GeocodeClient<T, S> {
    /// Starts building a client from a transport and a state store
    pub fn builder(transport: T, store: S) -> GeocodeClientBuilder<T, S> {
        GeocodeClientBuilder::new(transport, store)
    }

    /// Geocodes `address`.
    ///
    /// Fails with [`GeocodeError::QuotaExceeded`] without calling out while
    /// the daily quota is exhausted, and also when the service reports the
    /// quota exhausted in its response. A failure to persist the state takes
    /// precedence over any other outcome.
    ///
    /// Dropping the returned future mid-request releases the lock without
    /// saving; the in-memory state keeps the admitted request and is written
    /// by the next call. [`GeocodeOptions::request_timeout`] always saves, so
    /// prefer it over wrapping this call in a timeout.
    pub async fn get_results(
        &self,
        address: &str,
    ) -> ClientResult<GeocodeResponse> {
        let mut gate = self.gate.lock().await;
        let outcome = self.request_cycle(&mut gate, address).await;
        if let Err(e) = self.store.save(gate.record()).await {
            if let Err(cycle_error) = &outcome {
                log::error!(
                    "geocoding failed and its state could not be saved: {cycle_error}"
                );
            }
            return Err(GeocodeError::Persistence(e));
        }
        outcome
    }

    /// A copy of the current state
    pub async fn snapshot(&self) -> StateRecord {
        self.gate.lock().await.record().clone()
    }

    /// The options this client was built with
    pub fn options(&self) -> &GeocodeOptions {
        &self.options
    }

    async fn request_cycle(
        &self,
        gate: &mut QuotaGate,
        address: &str,
    ) -> ClientResult<GeocodeResponse> {
        let wait = match gate.admit(Utc::now()) {
            AdmitDecision::Rejected { reset_at } => {
                return Err(GeocodeError::QuotaExceeded { reset_at })
            }
            AdmitDecision::Admitted { wait } => wait,
        };
        if !wait.is_zero() {
            tokio::time::sleep(wait).await;
        }

        let url = self.request_url(address, &gate.record().credential);
        let body = self.fetch(&url).await?;
        let response = GeocodeResponse::from_slice(&body)?;

        match gate.observe(&response.status, Utc::now()) {
            Some(reset_at) => Err(GeocodeError::QuotaExceeded { reset_at }),
            None => Ok(response),
        }
    }

    fn request_url(&self, address: &str, credential: &str) -> Url {
        let mut url = self.options.endpoint.clone();
        url.query_pairs_mut()
            .append_pair("address", address)
            .append_pair("key", credential);
        url
    }

    async fn fetch(&self, url: &Url) -> ClientResult<Vec<u8>> {
        let request = self.transport.get(url);
        let body = match self.options.request_timeout {
            Some(limit) => tokio::time::timeout(limit, request)
                .await
                .map_err(|_| {
                    GeocodeError::Transport(
                        format!("request timed out after {limit:?}").into(),
                    )
                })?,
            None => request.await,
        };
        body.map_err(GeocodeError::Transport)
    }
}

/// Builder for creating a [`GeocodeClient`]
pub struct GeocodeClientBuilder<T: Transport, S: StateStore> {
    transport: T,
    store: S,
    options: GeocodeOptions,
    credential_provider: Option<Box<dyn CredentialProvider>>,
}

impl<T: Transport + fmt::Debug, S: StateStore + fmt::Debug> fmt::Debug
    for GeocodeClientBuilder<T, S>
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeocodeClientBuilder")
            .field("transport", &self.transport)
            .field("store", &self.store)
            .field("options", &self.options)
            .field(
                "credential_provider",
                &self.credential_provider.as_ref().map(|_| "CredentialProvider"),
            )
            .finish()
    }
}

impl<T: Transport, S: StateStore> GeocodeClientBuilder<T, S> {
    /// Create a new builder
    pub fn new(transport: T, store: S) -> Self {
        Self {
            transport,
            store,
            options: GeocodeOptions::default(),
            credential_provider: None,
        }
    }

    /// Set the client options
    pub fn options(mut self, options: GeocodeOptions) -> Self {
        self.options = options;
        self
    }

    /// Use a fixed credential when the store holds none
    pub fn credential(self, credential: impl Into<String>) -> Self {
        self.credential_provider(StaticCredential(credential.into()))
    }

    /// Ask `provider` for a credential when the store holds none
    ///
    /// A credential already present in the store always wins; the provider
    /// is only consulted to bootstrap an empty store.
    pub fn credential_provider(
        mut self,
        provider: impl CredentialProvider + 'static,
    ) -> Self {
        self.credential_provider = Some(Box::new(provider));
        self
    }

    /// Loads the stored state, acquires a credential if none is stored and
    /// builds the client.
    ///
    /// A freshly acquired credential is persisted immediately.
    pub async fn build(self) -> ClientResult<GeocodeClient<T, S>> {
        let mut record =
            self.store.load().await.map_err(GeocodeError::Persistence)?;

        if record.credential.is_empty() {
            record.credential =
                acquire_credential(self.credential_provider.as_deref()).await?;
            log::info!("API credential acquired");
            self.store
                .save(&record)
                .await
                .map_err(GeocodeError::Persistence)?;
        }

        let gate = QuotaGate::new(
            record,
            self.options.min_interval,
            self.options.reset_timezone,
        );
        Ok(GeocodeClient {
            transport: self.transport,
            store: self.store,
            options: self.options,
            gate: Mutex::new(gate),
        })
    }
}

async fn acquire_credential(
    provider: Option<&dyn CredentialProvider>,
) -> ClientResult<String> {
    let Some(provider) = provider else {
        return Err(GeocodeError::Credential(
            "no API credential is stored and no provider was configured"
                .to_string(),
        ));
    };
    for _ in 0..MAX_CREDENTIAL_ATTEMPTS {
        let credential = provider
            .provide_credential()
            .await
            .map_err(|e| GeocodeError::Credential(e.to_string()))?;
        let credential = credential.trim();
        if credential.contains(['\n', '\r']) {
            return Err(GeocodeError::Credential(
                "API credential must be a single line".to_string(),
            ));
        }
        if !credential.is_empty() {
            return Ok(credential.to_string());
        }
    }
    Err(GeocodeError::Credential(format!(
        "no API credential entered after {MAX_CREDENTIAL_ATTEMPTS} attempts"
    )))
}
