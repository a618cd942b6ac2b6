//! Cart slice: items, shipping address and payment method.

use std::sync::Arc;

use serde::Serialize;
use storefront_api_types::{CartItem, ShippingAddress};
use tokio::sync::Mutex;
use tracing::debug;

use super::store::{read_slice, write_slice};
use super::{CART_ITEMS_KEY, PAYMENT_METHOD_KEY, SHIPPING_ADDRESS_KEY};
use crate::infra::storage::{KeyValueStore, StorageError};

/// In-memory cart. Pure state transitions; persistence lives in [`CartStore`].
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartState {
    pub cart_items: Vec<CartItem>,
    pub shipping_address: Option<ShippingAddress>,
    pub payment_method: Option<String>,
}

impl CartState {
    /// Insert `item`, replacing any line for the same product in place.
    pub fn upsert(&mut self, item: CartItem) {
        match self
            .cart_items
            .iter_mut()
            .find(|existing| existing.product == item.product)
        {
            Some(existing) => *existing = item,
            None => self.cart_items.push(item),
        }
    }

    /// Returns true if a line was removed.
    pub fn remove(&mut self, product_id: &str) -> bool {
        let before = self.cart_items.len();
        self.cart_items.retain(|item| item.product != product_id);
        self.cart_items.len() != before
    }

    pub fn item_count(&self) -> u32 {
        self.cart_items.iter().map(|item| item.qty).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.cart_items.is_empty()
    }
}

/// Cart state with write-through persistence.
///
/// Every change is written to storage before the call returns; the lock is
/// held across the write so concurrent edits persist in order.
pub struct CartStore {
    storage: Arc<dyn KeyValueStore>,
    state: Mutex<CartState>,
}

impl CartStore {
    pub async fn load(storage: Arc<dyn KeyValueStore>) -> Self {
        let cart_items: Vec<CartItem> = read_slice(storage.as_ref(), CART_ITEMS_KEY)
            .await
            .unwrap_or_default();
        let shipping_address = read_slice(storage.as_ref(), SHIPPING_ADDRESS_KEY).await;
        let payment_method = read_slice(storage.as_ref(), PAYMENT_METHOD_KEY).await;
        debug!(items = cart_items.len(), "Restored cart");

        Self {
            storage,
            state: Mutex::new(CartState {
                cart_items,
                shipping_address,
                payment_method,
            }),
        }
    }

    pub async fn snapshot(&self) -> CartState {
        self.state.lock().await.clone()
    }

    pub async fn add_item(&self, item: CartItem) -> Result<CartState, StorageError> {
        self.update_items(|state| state.upsert(item)).await
    }

    pub async fn remove_item(&self, product_id: &str) -> Result<CartState, StorageError> {
        self.update_items(|state| {
            state.remove(product_id);
        })
        .await
    }

    pub async fn save_shipping_address(
        &self,
        address: ShippingAddress,
    ) -> Result<CartState, StorageError> {
        let mut state = self.state.lock().await;
        write_slice(self.storage.as_ref(), SHIPPING_ADDRESS_KEY, &address).await?;
        state.shipping_address = Some(address);
        Ok(state.clone())
    }

    pub async fn save_payment_method(
        &self,
        method: impl Into<String>,
    ) -> Result<CartState, StorageError> {
        let method = method.into();
        let mut state = self.state.lock().await;
        write_slice(self.storage.as_ref(), PAYMENT_METHOD_KEY, &method).await?;
        state.payment_method = Some(method);
        Ok(state.clone())
    }

    /// Empty the item list. Shipping address and payment method are kept.
    pub async fn reset(&self) -> Result<CartState, StorageError> {
        self.update_items(|state| state.cart_items.clear()).await
    }

    /// Apply `change` to a copy, persist the copy's items, then commit.
    /// A failed write leaves the in-memory cart untouched.
    async fn update_items(
        &self,
        change: impl FnOnce(&mut CartState),
    ) -> Result<CartState, StorageError> {
        let mut state = self.state.lock().await;
        let mut next = state.clone();
        change(&mut next);
        write_slice(self.storage.as_ref(), CART_ITEMS_KEY, &next.cart_items).await?;
        *state = next;
        Ok(state.clone())
    }
}

impl std::fmt::Debug for CartStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CartStore").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::*;
    use crate::infra::storage::MemoryStore;

    /// Reads fine, refuses every write.
    struct ReadOnlyStore;

    #[async_trait]
    impl KeyValueStore for ReadOnlyStore {
        async fn get(&self, _key: &str) -> Result<Option<String>, StorageError> {
            Ok(None)
        }

        async fn set(&self, key: &str, _value: String) -> Result<(), StorageError> {
            Err(StorageError::InvalidKey(key.to_string()))
        }

        async fn remove(&self, _key: &str) -> Result<(), StorageError> {
            Ok(())
        }
    }

    fn item(product: &str, qty: u32) -> CartItem {
        CartItem {
            product: product.into(),
            name: format!("Item {product}"),
            image: String::new(),
            price: 10.0,
            count_in_stock: 5,
            qty,
        }
    }

    #[test]
    fn upsert_replaces_instead_of_summing() {
        let mut cart = CartState::default();
        cart.upsert(item("p", 1));
        cart.upsert(item("q", 1));
        cart.upsert(item("p", 3));

        assert_eq!(cart.cart_items.len(), 2);
        assert_eq!(cart.cart_items[0].product, "p");
        assert_eq!(cart.cart_items[0].qty, 3);
        assert_eq!(cart.item_count(), 4);
    }

    #[test]
    fn remove_reports_whether_anything_changed() {
        let mut cart = CartState::default();
        cart.upsert(item("p", 1));
        assert!(!cart.remove("missing"));
        assert!(cart.remove("p"));
        assert!(cart.is_empty());
    }

    #[tokio::test]
    async fn changes_persist_immediately() {
        let memory = MemoryStore::new();
        let store = CartStore::load(Arc::new(memory.clone())).await;

        store.add_item(item("p", 2)).await.expect("added");
        store.save_payment_method("PayPal").await.expect("saved");

        let raw = memory.snapshot(CART_ITEMS_KEY).expect("persisted");
        let items: Vec<CartItem> = serde_json::from_str(&raw).expect("json");
        assert_eq!(items, vec![item("p", 2)]);
        assert_eq!(memory.snapshot(PAYMENT_METHOD_KEY).as_deref(), Some("\"PayPal\""));

        let reloaded = CartStore::load(Arc::new(memory)).await.snapshot().await;
        assert_eq!(reloaded.cart_items.len(), 1);
        assert_eq!(reloaded.payment_method.as_deref(), Some("PayPal"));
    }

    #[tokio::test]
    async fn reset_keeps_shipping_details() {
        let store = CartStore::load(Arc::new(MemoryStore::new())).await;
        store.add_item(item("p", 1)).await.expect("added");
        store
            .save_shipping_address(ShippingAddress {
                address: "1 Main St".into(),
                city: "Springfield".into(),
                postal_code: "12345".into(),
                country: "US".into(),
            })
            .await
            .expect("saved");

        let state = store.reset().await.expect("reset");
        assert!(state.is_empty());
        assert!(state.shipping_address.is_some());
    }

    #[tokio::test]
    async fn corrupt_items_slice_loads_empty() {
        let memory = MemoryStore::new();
        memory
            .set(CART_ITEMS_KEY, "[{oops".to_string())
            .await
            .expect("set");
        memory
            .set(PAYMENT_METHOD_KEY, "\"Stripe\"".to_string())
            .await
            .expect("set");

        let state = CartStore::load(Arc::new(memory)).await.snapshot().await;
        assert!(state.is_empty());
        assert_eq!(state.payment_method.as_deref(), Some("Stripe"));
    }

    #[tokio::test]
    async fn failed_write_leaves_memory_unchanged() {
        let store = CartStore::load(Arc::new(ReadOnlyStore)).await;

        assert!(store.add_item(item("p", 1)).await.is_err());
        assert!(store.snapshot().await.is_empty());

        assert!(store.reset().await.is_err());
        assert!(store.remove_item("p").await.is_err());
        assert!(store.save_payment_method("Stripe").await.is_err());
        assert_eq!(store.snapshot().await, CartState::default());
    }
}
