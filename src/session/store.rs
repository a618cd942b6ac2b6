use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use storefront_api_types::SessionRecord;
use tracing::{info, warn};

use super::mirror::SessionMirror;
use super::USER_INFO_KEY;
use crate::infra::storage::{KeyValueStore, StorageError};

/// Read a JSON slice, treating missing and corrupt values as absent.
pub(crate) async fn read_slice<T: DeserializeOwned>(
    storage: &dyn KeyValueStore,
    key: &str,
) -> Option<T> {
    let raw = match storage.get(key).await {
        Ok(Some(raw)) => raw,
        Ok(None) => return None,
        Err(err) => {
            warn!(key, error = %err, "Persisted slice unreadable; starting empty");
            return None;
        }
    };
    match serde_json::from_str(&raw) {
        Ok(value) => Some(value),
        Err(err) => {
            warn!(key, error = %err, "Persisted slice corrupt; starting empty");
            None
        }
    }
}

pub(crate) async fn write_slice<T: Serialize + ?Sized>(
    storage: &dyn KeyValueStore,
    key: &str,
    value: &T,
) -> Result<(), StorageError> {
    let encoded = serde_json::to_string(value).map_err(|source| StorageError::Encode {
        key: key.to_string(),
        source,
    })?;
    storage.set(key, encoded).await
}

/// Authenticated-user slice: durable `userInfo` plus its in-memory mirror.
#[derive(Clone)]
pub struct SessionStore {
    storage: Arc<dyn KeyValueStore>,
    mirror: SessionMirror,
}

impl SessionStore {
    /// Rehydrate from storage. A corrupt record loads as signed out.
    pub async fn load(storage: Arc<dyn KeyValueStore>) -> Self {
        let record: Option<SessionRecord> = read_slice(storage.as_ref(), USER_INFO_KEY).await;
        if let Some(record) = &record {
            info!(user_id = %record.id, "Restored persisted session");
        }
        Self {
            storage,
            mirror: SessionMirror::new(record),
        }
    }

    pub fn mirror(&self) -> &SessionMirror {
        &self.mirror
    }

    pub fn current(&self) -> Option<SessionRecord> {
        self.mirror.current()
    }

    pub fn storage(&self) -> &Arc<dyn KeyValueStore> {
        &self.storage
    }

    /// Make `record` the active session, in memory first so requests issued
    /// right after see the new token even if the durable write fails.
    pub async fn replace_session(&self, record: SessionRecord) -> Result<(), StorageError> {
        let user_id = record.id.clone();
        self.mirror.replace(record.clone());
        write_slice(self.storage.as_ref(), USER_INFO_KEY, &record).await?;
        info!(%user_id, "Session stored");
        Ok(())
    }

    pub async fn clear_session(&self) -> Result<Option<SessionRecord>, StorageError> {
        let previous = self.mirror.clear();
        self.storage.remove(USER_INFO_KEY).await?;
        info!(
            user_id = previous.as_ref().map(|r| r.id.as_str()).unwrap_or("-"),
            "Session cleared"
        );
        Ok(previous)
    }
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore")
            .field("mirror", &self.mirror)
            .finish_non_exhaustive()
    }
}
