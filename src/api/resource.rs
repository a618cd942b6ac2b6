//! Decoded response payloads.

use serde::Serialize;
use storefront_api_types::{Order, Product, ProductPage, SessionRecord, UserProfile};

/// Expected body of an endpoint's successful response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseShape {
    ProductPage,
    Product,
    Products,
    Order,
    Orders,
    User,
    Users,
    Session,
    /// Plain-text body (payment client id).
    Text,
    /// Any JSON (or empty) acknowledgement.
    Ack,
}

/// A decoded response, as stored in the cache and returned from mutations.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Resource {
    ProductPage(ProductPage),
    Product(Product),
    Products(Vec<Product>),
    Order(Order),
    Orders(Vec<Order>),
    User(UserProfile),
    Users(Vec<UserProfile>),
    Session(SessionRecord),
    Text(String),
    Ack(serde_json::Value),
}

impl Resource {
    /// Decode `bytes` according to `shape`.
    pub fn decode(shape: ResponseShape, bytes: &[u8]) -> Result<Self, serde_json::Error> {
        Ok(match shape {
            ResponseShape::ProductPage => Self::ProductPage(serde_json::from_slice(bytes)?),
            ResponseShape::Product => Self::Product(serde_json::from_slice(bytes)?),
            ResponseShape::Products => Self::Products(serde_json::from_slice(bytes)?),
            ResponseShape::Order => Self::Order(serde_json::from_slice(bytes)?),
            ResponseShape::Orders => Self::Orders(serde_json::from_slice(bytes)?),
            ResponseShape::User => Self::User(serde_json::from_slice(bytes)?),
            ResponseShape::Users => Self::Users(serde_json::from_slice(bytes)?),
            ResponseShape::Session => Self::Session(serde_json::from_slice(bytes)?),
            ResponseShape::Text => Self::Text(String::from_utf8_lossy(bytes).trim().to_string()),
            ResponseShape::Ack if bytes.iter().all(u8::is_ascii_whitespace) => {
                Self::Ack(serde_json::Value::Null)
            }
            ResponseShape::Ack => Self::Ack(serde_json::from_slice(bytes)?),
        })
    }

    pub fn as_product(&self) -> Option<&Product> {
        match self {
            Self::Product(product) => Some(product),
            _ => None,
        }
    }

    pub fn as_product_page(&self) -> Option<&ProductPage> {
        match self {
            Self::ProductPage(page) => Some(page),
            _ => None,
        }
    }

    pub fn as_order(&self) -> Option<&Order> {
        match self {
            Self::Order(order) => Some(order),
            _ => None,
        }
    }

    pub fn as_orders(&self) -> Option<&[Order]> {
        match self {
            Self::Orders(orders) => Some(orders),
            _ => None,
        }
    }

    pub fn as_user(&self) -> Option<&UserProfile> {
        match self {
            Self::User(user) => Some(user),
            _ => None,
        }
    }

    pub fn as_users(&self) -> Option<&[UserProfile]> {
        match self {
            Self::Users(users) => Some(users),
            _ => None,
        }
    }

    pub fn as_session(&self) -> Option<&SessionRecord> {
        match self {
            Self::Session(session) => Some(session),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Entity id carried by a single-entity payload.
    pub fn entity_id(&self) -> Option<&str> {
        match self {
            Self::Product(product) => Some(&product.id),
            Self::Order(order) => Some(&order.id),
            Self::User(user) => Some(&user.id),
            Self::Session(session) => Some(&session.id),
            _ => None,
        }
    }
}
