//! UI-facing handles over the query client.

use std::sync::Arc;

use tokio::sync::{broadcast, watch};

use crate::api::{ApiError, Mutation, Query, Resource};

use super::client::QueryClient;
use super::events::CacheEvent;
use super::keys::CacheKey;
use super::store::{EntryStatus, QueryState};

/// A live interest in one cached read.
///
/// Holding it keeps the entry subscribed: invalidations refetch it in the
/// background. Dropping it releases the subscription.
pub struct Subscription {
    client: QueryClient,
    query: Query,
    key: CacheKey,
    events: broadcast::Receiver<CacheEvent>,
}

impl Subscription {
    pub(crate) fn new(
        client: QueryClient,
        query: Query,
        events: broadcast::Receiver<CacheEvent>,
    ) -> Self {
        let key = query.cache_key();
        Self {
            client,
            query,
            key,
            events,
        }
    }

    pub fn key(&self) -> &CacheKey {
        &self.key
    }

    pub fn query(&self) -> &Query {
        &self.query
    }

    pub fn state(&self) -> QueryState {
        match self.client.peek(&self.key) {
            Some(state) => state,
            // Subscribed entries are never evicted.
            None => QueryState {
                key: self.key.clone(),
                status: EntryStatus::Idle,
                data: None,
                error: None,
            },
        }
    }

    pub async fn refetch(&self) -> QueryState {
        self.client.refetch(&self.query).await
    }

    /// Wait for the next change to this key and return the new state.
    ///
    /// Returns `None` once the client is gone.
    pub async fn changed(&mut self) -> Option<QueryState> {
        loop {
            match self.events.recv().await {
                Ok(event) if event.key() == Some(&self.key) => return Some(self.state()),
                Ok(_) => continue,
                // Missed events may include ours; the current state is what matters.
                Err(broadcast::error::RecvError::Lagged(_)) => return Some(self.state()),
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Wait until the entry is neither idle nor loading.
    pub async fn settled(&mut self) -> Option<QueryState> {
        let current = self.state();
        if !current.is_fetching() && current.status != EntryStatus::Idle {
            return Some(current);
        }
        loop {
            let state = self.changed().await?;
            if !state.is_fetching() && state.status != EntryStatus::Idle {
                return Some(state);
            }
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.client.unsubscribe(&self.key);
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("key", &self.key)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MutationStatus {
    #[default]
    Idle,
    Pending,
    Succeeded,
    Failed,
}

/// Observable outcome of the last trigger of a [`MutationHandle`].
#[derive(Debug, Clone, Default)]
pub struct MutationState {
    pub status: MutationStatus,
    pub data: Option<Arc<Resource>>,
    pub error: Option<ApiError>,
}

impl MutationState {
    pub fn is_loading(&self) -> bool {
        self.status == MutationStatus::Pending
    }

    pub fn is_error(&self) -> bool {
        self.status == MutationStatus::Failed
    }

    pub fn is_success(&self) -> bool {
        self.status == MutationStatus::Succeeded
    }
}

/// Trigger plus observable state for one write endpoint.
pub struct MutationHandle {
    client: QueryClient,
    state: watch::Sender<MutationState>,
}

impl MutationHandle {
    pub fn new(client: QueryClient) -> Self {
        let (state, _) = watch::channel(MutationState::default());
        Self { client, state }
    }

    pub async fn trigger(&self, mutation: &Mutation) -> Result<Arc<Resource>, ApiError> {
        self.state.send_modify(|state| {
            state.status = MutationStatus::Pending;
            state.error = None;
        });

        let result = self.client.mutate(mutation).await;
        self.state.send_modify(|state| match &result {
            Ok(data) => {
                state.status = MutationStatus::Succeeded;
                state.data = Some(Arc::clone(data));
            }
            Err(err) => {
                state.status = MutationStatus::Failed;
                state.error = Some(err.clone());
            }
        });
        result
    }

    pub fn state(&self) -> MutationState {
        self.state.borrow().clone()
    }

    pub fn watch(&self) -> watch::Receiver<MutationState> {
        self.state.subscribe()
    }
}

impl std::fmt::Debug for MutationHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MutationHandle")
            .field("state", &*self.state.borrow())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mutation_state_flags_follow_status() {
        let mut state = MutationState::default();
        assert!(!state.is_loading() && !state.is_error() && !state.is_success());

        state.status = MutationStatus::Pending;
        assert!(state.is_loading());

        state.status = MutationStatus::Failed;
        assert!(state.is_error());

        state.status = MutationStatus::Succeeded;
        assert!(state.is_success());
    }
}
