use std::sync::{Arc, RwLock};

use storefront_api_types::SessionRecord;

use crate::cache::lock::{rw_read, rw_write};

const TARGET: &str = "storefront::session::mirror";

/// In-memory copy of the active session.
///
/// Shared between the request executor (token lookup on every send) and the
/// session store (writes on login and logout). Clones share state.
#[derive(Debug, Clone, Default)]
pub struct SessionMirror {
    inner: Arc<RwLock<Option<SessionRecord>>>,
}

impl SessionMirror {
    pub fn new(initial: Option<SessionRecord>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(initial)),
        }
    }

    pub fn current(&self) -> Option<SessionRecord> {
        rw_read(&self.inner, TARGET, "current").clone()
    }

    pub fn token(&self) -> Option<String> {
        rw_read(&self.inner, TARGET, "token")
            .as_ref()
            .map(|record| record.token.clone())
    }

    pub fn user_id(&self) -> Option<String> {
        rw_read(&self.inner, TARGET, "user_id")
            .as_ref()
            .map(|record| record.id.clone())
    }

    pub fn is_authenticated(&self) -> bool {
        rw_read(&self.inner, TARGET, "is_authenticated").is_some()
    }

    pub fn replace(&self, record: SessionRecord) -> Option<SessionRecord> {
        rw_write(&self.inner, TARGET, "replace").replace(record)
    }

    pub fn clear(&self) -> Option<SessionRecord> {
        rw_write(&self.inner, TARGET, "clear").take()
    }
}
