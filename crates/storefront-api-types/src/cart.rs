use serde::{Deserialize, Serialize};

use crate::orders::OrderItem;

/// A line in the shopping cart, persisted under `cartItems`.
///
/// `count_in_stock` is captured when the item is added and is not refreshed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    pub product: String,
    pub name: String,
    #[serde(default)]
    pub image: String,
    pub price: f64,
    #[serde(default)]
    pub count_in_stock: u32,
    pub qty: u32,
}

impl From<&CartItem> for OrderItem {
    fn from(item: &CartItem) -> Self {
        Self {
            name: item.name.clone(),
            qty: item.qty,
            image: item.image.clone(),
            price: item.price,
            product: item.product.clone(),
        }
    }
}
