//! NATS JetStream key-value and object stores.
//!
//! One [`NatsConnection`] is shared by every bucket. It connects lazily on
//! first use and caches bucket handles by name. A connection-level failure
//! drops the connection and all cached handles so the next call reconnects.

use std::collections::HashMap;
use std::pin::pin;
use std::sync::Arc;
use std::time::Duration;

use async_nats::connection::State;
use async_nats::jetstream::{self, kv, object_store};
use async_trait::async_trait;
use futures::StreamExt;
use tokio::io::AsyncReadExt;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

use super::{KeyValueStore, ObjectStore, StoreError, StoredObject, with_timeout};

const CONTENT_TYPE_HEADER: &str = "Content-Type";
const IMAGE_BUCKET_DESCRIPTION: &str = "Product images";

/// Lazily established, shared JetStream connection.
pub struct NatsConnection {
    url: String,
    timeout: Duration,
    handles: Mutex<Option<Handles>>,
}

struct Handles {
    client: async_nats::Client,
    jetstream: jetstream::Context,
    key_values: HashMap<String, kv::Store>,
    object_stores: HashMap<String, object_store::ObjectStore>,
}

impl NatsConnection {
    /// Create a connection handle. Nothing is dialed until first use.
    #[must_use]
    pub fn new(url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            url: url.into(),
            timeout,
            handles: Mutex::new(None),
        }
    }

    /// Per-call timeout applied to every store operation.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn connect(&self) -> Result<Handles, StoreError> {
        let client = tokio::time::timeout(self.timeout, async_nats::connect(self.url.as_str()))
            .await
            .map_err(|_| StoreError::Timeout(self.timeout))?
            .map_err(|e| {
                warn!(url = %self.url, error = %e, "Failed to connect to NATS");
                StoreError::Unavailable(format!("could not connect to NATS server: {e}"))
            })?;

        info!(url = %self.url, "Connected to NATS server");

        Ok(Handles {
            jetstream: jetstream::new(client.clone()),
            client,
            key_values: HashMap::new(),
            object_stores: HashMap::new(),
        })
    }

    /// Get (or open, creating if missing) a key-value bucket.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Unavailable` if the server cannot be reached.
    #[instrument(skip(self))]
    pub async fn key_value(&self, bucket: &str) -> Result<kv::Store, StoreError> {
        let mut slot = self.handles.lock().await;
        if slot.is_none() {
            *slot = Some(self.connect().await?);
        }
        let handles = slot
            .as_mut()
            .ok_or_else(|| StoreError::Unavailable("connection not established".to_string()))?;

        if let Some(store) = handles.key_values.get(bucket) {
            return Ok(store.clone());
        }

        let opened = tokio::time::timeout(self.timeout, handles.jetstream.get_key_value(bucket)).await;
        let store = match opened {
            Ok(Ok(store)) => store,
            Ok(Err(e)) if handles.client.connection_state() != State::Connected => {
                return Err(StoreError::Unavailable(format!("key-value bucket {bucket}: {e}")));
            }
            Ok(Err(e)) => {
                debug!(error = %e, "Key-value bucket missing, creating it");
                let config = kv::Config {
                    bucket: bucket.to_string(),
                    history: 1,
                    ..Default::default()
                };
                tokio::time::timeout(self.timeout, handles.jetstream.create_key_value(config))
                    .await
                    .map_err(|_| StoreError::Timeout(self.timeout))?
                    .map_err(|e| {
                        classify(
                            Some(handles.client.connection_state()),
                            format!("key-value bucket {bucket}: {e}"),
                        )
                    })?
            }
            Err(_) => {
                *slot = None;
                return Err(StoreError::Timeout(self.timeout));
            }
        };

        handles.key_values.insert(bucket.to_string(), store.clone());
        Ok(store)
    }

    /// Get (or open, creating if missing) an object-store bucket.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Unavailable` if the server cannot be reached.
    #[instrument(skip(self))]
    pub async fn object_store(
        &self,
        bucket: &str,
    ) -> Result<object_store::ObjectStore, StoreError> {
        let mut slot = self.handles.lock().await;
        if slot.is_none() {
            *slot = Some(self.connect().await?);
        }
        let handles = slot
            .as_mut()
            .ok_or_else(|| StoreError::Unavailable("connection not established".to_string()))?;

        if let Some(store) = handles.object_stores.get(bucket) {
            return Ok(store.clone());
        }

        let opened =
            tokio::time::timeout(self.timeout, handles.jetstream.get_object_store(bucket)).await;
        let store = match opened {
            Ok(Ok(store)) => store,
            Ok(Err(e)) if handles.client.connection_state() != State::Connected => {
                return Err(StoreError::Unavailable(format!("object store {bucket}: {e}")));
            }
            Ok(Err(e)) => {
                debug!(error = %e, "Object store bucket missing, creating it");
                let config = object_store::Config {
                    bucket: bucket.to_string(),
                    description: Some(IMAGE_BUCKET_DESCRIPTION.to_string()),
                    ..Default::default()
                };
                tokio::time::timeout(self.timeout, handles.jetstream.create_object_store(config))
                    .await
                    .map_err(|_| StoreError::Timeout(self.timeout))?
                    .map_err(|e| {
                        classify(
                            Some(handles.client.connection_state()),
                            format!("object store {bucket}: {e}"),
                        )
                    })?
            }
            Err(_) => {
                *slot = None;
                return Err(StoreError::Timeout(self.timeout));
            }
        };

        handles
            .object_stores
            .insert(bucket.to_string(), store.clone());
        Ok(store)
    }

    /// Drop the cached connection and bucket handles.
    ///
    /// The next store call dials the server again.
    pub async fn invalidate(&self) {
        if self.handles.lock().await.take().is_some() {
            warn!(url = %self.url, "NATS connection invalidated");
        }
    }

    /// Drain and close the connection, if one is open.
    pub async fn close(&self) {
        let Some(handles) = self.handles.lock().await.take() else {
            return;
        };
        match handles.client.drain().await {
            Ok(()) => info!("NATS connection closed"),
            Err(e) => warn!(error = %e, "NATS connection closed with error"),
        }
    }

    /// Classify a failed store call by the state of the live connection.
    async fn failure(&self, context: String) -> StoreError {
        let state = self
            .handles
            .lock()
            .await
            .as_ref()
            .map(|handles| handles.client.connection_state());
        classify(state, context)
    }

    /// Invalidate the connection when an error means the server is unreachable.
    async fn observe<T>(&self, result: Result<T, StoreError>) -> Result<T, StoreError> {
        if let Err(e) = &result
            && e.is_unavailable()
        {
            self.invalidate().await;
        }
        result
    }
}

/// A failure while connected is the server refusing the call. Anything else
/// means the server cannot be reached.
fn classify(state: Option<State>, context: String) -> StoreError {
    match state {
        Some(State::Connected) => StoreError::Backend(context),
        _ => StoreError::Unavailable(context),
    }
}

/// A key-value bucket on a shared [`NatsConnection`].
#[derive(Clone)]
pub struct NatsKeyValue {
    connection: Arc<NatsConnection>,
    bucket: String,
}

impl NatsKeyValue {
    #[must_use]
    pub fn new(connection: Arc<NatsConnection>, bucket: impl Into<String>) -> Self {
        Self {
            connection,
            bucket: bucket.into(),
        }
    }
}

#[async_trait]
impl KeyValueStore for NatsKeyValue {
    #[instrument(skip(self), fields(bucket = %self.bucket))]
    async fn keys(&self, limit: usize) -> Result<Vec<String>, StoreError> {
        let call = async {
            let store = self.connection.key_value(&self.bucket).await?;
            let keys = match store.keys().await {
                Ok(keys) => keys,
                Err(e) => return Err(self.connection.failure(format!("listing keys: {e}")).await),
            };
            let mut keys = pin!(keys);

            let mut collected = Vec::with_capacity(limit);
            while collected.len() < limit {
                match keys.next().await {
                    Some(Ok(key)) => collected.push(key),
                    Some(Err(e)) => {
                        return Err(self.connection.failure(format!("listing keys: {e}")).await);
                    }
                    None => break,
                }
            }
            Ok(collected)
        };

        let result = with_timeout(self.connection.timeout(), call).await;
        self.connection.observe(result).await
    }

    #[instrument(skip(self), fields(bucket = %self.bucket))]
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let call = async {
            let store = self.connection.key_value(&self.bucket).await?;
            match store.get(key).await {
                Ok(entry) => Ok(entry.map(|bytes| bytes.to_vec())),
                Err(e) => Err(self.connection.failure(format!("get {key}: {e}")).await),
            }
        };

        let result = with_timeout(self.connection.timeout(), call).await;
        self.connection.observe(result).await
    }
}

/// An object-store bucket on a shared [`NatsConnection`].
#[derive(Clone)]
pub struct NatsObjectStore {
    connection: Arc<NatsConnection>,
    bucket: String,
}

impl NatsObjectStore {
    #[must_use]
    pub fn new(connection: Arc<NatsConnection>, bucket: impl Into<String>) -> Self {
        Self {
            connection,
            bucket: bucket.into(),
        }
    }
}

#[async_trait]
impl ObjectStore for NatsObjectStore {
    #[instrument(skip(self), fields(bucket = %self.bucket))]
    async fn get(&self, key: &str) -> Result<Option<StoredObject>, StoreError> {
        let call = async {
            let store = self.connection.object_store(&self.bucket).await?;
            let mut object = match store.get(key).await {
                Ok(object) => object,
                Err(e) if e.kind() == object_store::GetErrorKind::NotFound => return Ok(None),
                Err(e) => return Err(self.connection.failure(format!("get {key}: {e}")).await),
            };

            let content_type = object
                .info
                .headers
                .as_ref()
                .and_then(|headers| headers.get(CONTENT_TYPE_HEADER))
                .map(|value| value.as_str().to_string());

            let mut data = Vec::new();
            object
                .read_to_end(&mut data)
                .await
                .map_err(|e| StoreError::Backend(format!("reading {key}: {e}")))?;

            Ok(Some(StoredObject { data, content_type }))
        };

        let result = with_timeout(self.connection.timeout(), call).await;
        self.connection.observe(result).await
    }
}
