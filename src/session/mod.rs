//! Persisted client state: the signed-in user and the cart.
//!
//! Each slice lives under its own storage key and is read once at startup.

mod cart;
mod mirror;
mod store;
mod summary;

pub use cart::{CartState, CartStore};
pub use mirror::SessionMirror;
pub use store::SessionStore;
pub use summary::OrderSummary;

pub const USER_INFO_KEY: &str = "userInfo";
pub const CART_ITEMS_KEY: &str = "cartItems";
pub const SHIPPING_ADDRESS_KEY: &str = "shippingAddress";
pub const PAYMENT_METHOD_KEY: &str = "paymentMethod";

/// Used at checkout when no payment method was chosen.
pub const DEFAULT_PAYMENT_METHOD: &str = "PayPal";
