//! Wire types shared by the storefront client and its test stubs.
//!
//! Field names follow the backend's JSON (`_id`, camelCase) so payloads can
//! be stored and replayed verbatim.

mod cart;
mod orders;
mod products;
mod users;

pub use cart::CartItem;
pub use orders::{
    NewOrder, Order, OrderItem, OrderOwner, PayerInfo, PaymentResult, ShippingAddress,
};
pub use products::{NewReview, Product, ProductPage, ProductUpdate, Review};
pub use users::{Credentials, ProfileUpdate, Registration, SessionRecord, UserProfile, UserUpdate};

use serde::{Deserialize, Serialize};

/// Error body returned by the backend on non-2xx responses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
}
