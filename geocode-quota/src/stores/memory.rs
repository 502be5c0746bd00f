use std::sync::Arc;

use tokio::sync::Mutex;

use crate::{stores::decode_record, Result, StateRecord, StateStore};

/// Implements [`StateStore`] in memory, holding the encoded record text.
///
/// Clones share the same storage, so a handle kept by the caller observes
/// every save made through a client.
#[derive(Debug, Clone, Default)]
pub struct MemoryStateStore {
    text: Arc<Mutex<Option<String>>>,
}

impl MemoryStateStore {
    /// Creates a store that starts out holding `text`
    pub fn with_text(text: impl Into<String>) -> Self {
        Self { text: Arc::new(Mutex::new(Some(text.into()))) }
    }

    /// The last saved text, if any
    pub async fn contents(&self) -> Option<String> {
        self.text.lock().await.clone()
    }
}

#[async_trait::async_trait]
impl StateStore for MemoryStateStore {
    async fn load(&self) -> Result<StateRecord> {
        let text = self.text.lock().await;
        Ok(text.as_deref().map(decode_record).unwrap_or_default())
    }

    async fn save(&self, record: &StateRecord) -> Result<()> {
        *self.text.lock().await = Some(record.encode());
        Ok(())
    }
}
