//! Endpoint registry.
//!
//! Every backend call is a variant of either [`Query`] (cached reads) or
//! [`Mutation`] (writes). Each variant declares its request, its cache key
//! and the tags it provides or invalidates; nothing else in the crate builds
//! paths or keys.

use std::collections::HashSet;

use reqwest::Method;
use serde::Serialize;
use storefront_api_types::{
    Credentials, NewOrder, NewReview, PaymentResult, ProductUpdate, ProfileUpdate, Registration,
    UserUpdate,
};

use super::error::ApiError;
use super::resource::{Resource, ResponseShape};
use crate::cache::{CacheKey, ResourceKind, Tag, TagType};

/// Literal id the backend accepts for "the authenticated user".
pub const PROFILE_ID: &str = "profile";

/// Fully described HTTP request for one endpoint call.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestSpec {
    pub name: &'static str,
    pub method: Method,
    /// Path below the base URL, one entry per segment, e.g.
    /// `["api", "products", "42"]`. Segments are encoded one by one, so an
    /// id can never change which route is hit.
    pub segments: Vec<String>,
    pub query: Vec<(&'static str, String)>,
    pub body: Option<serde_json::Value>,
    pub shape: ResponseShape,
}

impl RequestSpec {
    fn new<S: Into<String>>(
        name: &'static str,
        method: Method,
        segments: impl IntoIterator<Item = S>,
        shape: ResponseShape,
    ) -> Self {
        Self {
            name,
            method,
            segments: segments.into_iter().map(Into::into).collect(),
            query: Vec::new(),
            body: None,
            shape,
        }
    }

    /// Unencoded path, for logs and assertions.
    pub fn path(&self) -> String {
        format!("/{}", self.segments.join("/"))
    }

    fn with_query(mut self, key: &'static str, value: impl Into<String>) -> Self {
        self.query.push((key, value.into()));
        self
    }

    fn with_body<T: Serialize>(mut self, body: &T) -> Result<Self, ApiError> {
        let value = serde_json::to_value(body)
            .map_err(|err| ApiError::decode(format!("failed to encode {} body: {err}", self.name)))?;
        self.body = Some(value);
        Ok(self)
    }
}

/// Anything the request executor can run.
pub trait EndpointSpec {
    fn name(&self) -> &'static str;
    fn request(&self) -> Result<RequestSpec, ApiError>;
}

/// Cached read endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Query {
    ListProducts { keyword: String, page: Option<u32> },
    ProductDetails { id: String },
    TopProducts,
    OrderDetails { id: String },
    MyOrders,
    AllOrders,
    PaymentClientId,
    /// `id` may be [`PROFILE_ID`].
    UserDetails { id: String },
    ListUsers,
}

impl Query {
    pub fn list_products(keyword: impl Into<String>, page: Option<u32>) -> Self {
        Self::ListProducts {
            keyword: keyword.into(),
            page,
        }
    }

    pub fn product(id: impl Into<String>) -> Self {
        Self::ProductDetails { id: id.into() }
    }

    pub fn order(id: impl Into<String>) -> Self {
        Self::OrderDetails { id: id.into() }
    }

    pub fn profile() -> Self {
        Self::UserDetails {
            id: PROFILE_ID.to_string(),
        }
    }

    pub fn cache_key(&self) -> CacheKey {
        match self {
            Self::ListProducts { keyword, page } => CacheKey::new(
                ResourceKind::Product,
                "list",
                [keyword.clone(), page.map(|p| p.to_string()).unwrap_or_default()],
            ),
            Self::ProductDetails { id } => CacheKey::new(ResourceKind::Product, "detail", [id]),
            Self::TopProducts => CacheKey::new(ResourceKind::Product, "top", no_params()),
            Self::OrderDetails { id } => CacheKey::new(ResourceKind::Order, "detail", [id]),
            Self::MyOrders => CacheKey::new(ResourceKind::Order, "mine", no_params()),
            Self::AllOrders => CacheKey::new(ResourceKind::Order, "all", no_params()),
            Self::PaymentClientId => CacheKey::new(ResourceKind::Config, "paypal", no_params()),
            Self::UserDetails { id } => CacheKey::new(ResourceKind::User, "detail", [id]),
            Self::ListUsers => CacheKey::new(ResourceKind::User, "list", no_params()),
        }
    }

    /// Tags this read provides, given its result (`None` on failure).
    pub fn provides_tags(&self, result: Option<&Resource>) -> HashSet<Tag> {
        match self {
            Self::ListProducts { .. } => {
                let mut tags = HashSet::from([Tag::list(TagType::Product)]);
                if let Some(Resource::ProductPage(page)) = result {
                    tags.extend(page.products.iter().map(|p| Tag::id(TagType::Product, &p.id)));
                }
                tags
            }
            Self::ProductDetails { id } => HashSet::from([Tag::id(TagType::Product, id)]),
            Self::TopProducts => HashSet::from([Tag::list(TagType::Product)]),
            Self::OrderDetails { id } => HashSet::from([Tag::id(TagType::Order, id)]),
            Self::MyOrders | Self::AllOrders => {
                let mut tags = HashSet::from([Tag::list(TagType::Order)]);
                if let Some(Resource::Orders(orders)) = result {
                    tags.extend(orders.iter().map(|o| Tag::id(TagType::Order, &o.id)));
                }
                tags
            }
            Self::PaymentClientId => HashSet::new(),
            Self::UserDetails { id } => HashSet::from([Tag::id(TagType::User, id)]),
            Self::ListUsers => {
                let mut tags = HashSet::from([Tag::list(TagType::User)]);
                if let Some(Resource::Users(users)) = result {
                    tags.extend(users.iter().map(|u| Tag::id(TagType::User, &u.id)));
                }
                tags
            }
        }
    }
}

impl EndpointSpec for Query {
    fn name(&self) -> &'static str {
        match self {
            Self::ListProducts { .. } => "listProducts",
            Self::ProductDetails { .. } => "getProductDetails",
            Self::TopProducts => "getTopProducts",
            Self::OrderDetails { .. } => "getOrderDetails",
            Self::MyOrders => "getMyOrders",
            Self::AllOrders => "getOrders",
            Self::PaymentClientId => "getPaypalClientId",
            Self::UserDetails { .. } => "getUserDetails",
            Self::ListUsers => "getUsers",
        }
    }

    fn request(&self) -> Result<RequestSpec, ApiError> {
        let name = self.name();
        let get = |segments: &[&str], shape| {
            RequestSpec::new(name, Method::GET, segments.iter().copied(), shape)
        };
        let spec = match self {
            Self::ListProducts { keyword, page } => {
                get(&["api", "products"], ResponseShape::ProductPage)
                    .with_query("keyword", keyword.as_str())
                    .with_query("pageNumber", page.map(|p| p.to_string()).unwrap_or_default())
            }
            Self::ProductDetails { id } => {
                get(&["api", "products", id.as_str()], ResponseShape::Product)
            }
            Self::TopProducts => get(&["api", "products", "top"], ResponseShape::Products),
            Self::OrderDetails { id } => get(&["api", "orders", id.as_str()], ResponseShape::Order),
            Self::MyOrders => get(&["api", "orders", "myorders"], ResponseShape::Orders),
            Self::AllOrders => get(&["api", "orders"], ResponseShape::Orders),
            Self::PaymentClientId => get(&["api", "config", "paypal"], ResponseShape::Text),
            Self::UserDetails { id } => get(&["api", "users", id.as_str()], ResponseShape::User),
            Self::ListUsers => get(&["api", "users"], ResponseShape::Users),
        };
        Ok(spec)
    }
}

/// Side effect run after a mutation succeeds, before its invalidations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationHook {
    /// Write the returned `SessionRecord` to the mirror and to storage.
    StoreSession,
}

/// Write endpoints.
#[derive(Debug, Clone, PartialEq)]
pub enum Mutation {
    /// Creates a placeholder product the admin then edits.
    CreateProduct,
    UpdateProduct(ProductUpdate),
    DeleteProduct { id: String },
    CreateReview { product_id: String, review: NewReview },
    CreateOrder(NewOrder),
    PayOrder { order_id: String, details: PaymentResult },
    DeliverOrder { order_id: String },
    Login(Credentials),
    Register(Registration),
    UpdateProfile(ProfileUpdate),
    DeleteUser { id: String },
    UpdateUser(UserUpdate),
}

impl Mutation {
    /// Tags made stale by a successful call returning `result`.
    pub fn invalidates_tags(&self, result: &Resource) -> HashSet<Tag> {
        match self {
            Self::CreateProduct => HashSet::from([Tag::list(TagType::Product)]),
            Self::UpdateProduct(update) => product_tags(&update.id),
            Self::DeleteProduct { id } => product_tags(id),
            Self::CreateReview { product_id, .. } => product_tags(product_id),
            Self::CreateOrder(_) => HashSet::from([Tag::list(TagType::Order)]),
            Self::PayOrder { order_id, .. } | Self::DeliverOrder { order_id } => {
                HashSet::from([Tag::id(TagType::Order, order_id)])
            }
            Self::Login(_) => HashSet::new(),
            Self::Register(_) => {
                let mut tags = HashSet::from([Tag::list(TagType::User)]);
                if let Some(id) = result.entity_id() {
                    tags.insert(Tag::id(TagType::User, id));
                }
                tags
            }
            Self::UpdateProfile(update) => HashSet::from([
                Tag::id(TagType::User, &update.id),
                Tag::id(TagType::User, PROFILE_ID),
                Tag::list(TagType::User),
            ]),
            Self::DeleteUser { id } => user_tags(id),
            Self::UpdateUser(update) => user_tags(&update.id),
        }
    }

    pub fn hook(&self) -> Option<MutationHook> {
        match self {
            Self::Login(_) | Self::Register(_) | Self::UpdateProfile(_) => {
                Some(MutationHook::StoreSession)
            }
            _ => None,
        }
    }
}

impl EndpointSpec for Mutation {
    fn name(&self) -> &'static str {
        match self {
            Self::CreateProduct => "createProduct",
            Self::UpdateProduct(_) => "updateProduct",
            Self::DeleteProduct { .. } => "deleteProduct",
            Self::CreateReview { .. } => "createReview",
            Self::CreateOrder(_) => "createOrder",
            Self::PayOrder { .. } => "payOrder",
            Self::DeliverOrder { .. } => "deliverOrder",
            Self::Login(_) => "login",
            Self::Register(_) => "register",
            Self::UpdateProfile(_) => "profile",
            Self::DeleteUser { .. } => "deleteUser",
            Self::UpdateUser(_) => "updateUser",
        }
    }

    fn request(&self) -> Result<RequestSpec, ApiError> {
        let name = self.name();
        let call = |method: Method, segments: &[&str], shape| {
            RequestSpec::new(name, method, segments.iter().copied(), shape)
        };
        match self {
            // The backend fills in a placeholder product from an empty body.
            Self::CreateProduct => call(Method::POST, &["api", "products"], ResponseShape::Product)
                .with_body(&serde_json::json!({})),
            Self::UpdateProduct(update) => call(
                Method::PUT,
                &["api", "products", update.id.as_str()],
                ResponseShape::Product,
            )
            .with_body(update),
            Self::DeleteProduct { id } => Ok(call(
                Method::DELETE,
                &["api", "products", id.as_str()],
                ResponseShape::Ack,
            )),
            Self::CreateReview { product_id, review } => call(
                Method::POST,
                &["api", "products", product_id.as_str(), "reviews"],
                ResponseShape::Ack,
            )
            .with_body(review),
            Self::CreateOrder(order) => {
                call(Method::POST, &["api", "orders"], ResponseShape::Order).with_body(order)
            }
            Self::PayOrder { order_id, details } => call(
                Method::PUT,
                &["api", "orders", order_id.as_str(), "pay"],
                ResponseShape::Order,
            )
            .with_body(details),
            Self::DeliverOrder { order_id } => Ok(call(
                Method::PUT,
                &["api", "orders", order_id.as_str(), "deliver"],
                ResponseShape::Order,
            )),
            Self::Login(credentials) => {
                call(Method::POST, &["api", "users", "login"], ResponseShape::Session)
                    .with_body(credentials)
            }
            Self::Register(registration) => {
                call(Method::POST, &["api", "users"], ResponseShape::Session).with_body(registration)
            }
            Self::UpdateProfile(update) => {
                call(Method::PUT, &["api", "users", PROFILE_ID], ResponseShape::Session)
                    .with_body(update)
            }
            Self::DeleteUser { id } => Ok(call(
                Method::DELETE,
                &["api", "users", id.as_str()],
                ResponseShape::Ack,
            )),
            Self::UpdateUser(update) => {
                call(Method::PUT, &["api", "users", update.id.as_str()], ResponseShape::User)
                    .with_body(update)
            }
        }
    }
}

fn no_params() -> [String; 0] {
    []
}

fn product_tags(id: &str) -> HashSet<Tag> {
    HashSet::from([Tag::id(TagType::Product, id), Tag::list(TagType::Product)])
}

fn user_tags(id: &str) -> HashSet<Tag> {
    HashSet::from([Tag::id(TagType::User, id), Tag::list(TagType::User)])
}
