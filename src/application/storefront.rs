//! Storefront facade: wires storage, session, cart and query client
//! together and exposes the shopper-level operations.

use std::sync::Arc;
use std::time::Duration;

use storefront_api_types::{
    CartItem, Credentials, NewOrder, NewReview, Order, OrderItem, PaymentResult, Product,
    ProductUpdate, ProfileUpdate, Registration, SessionRecord, ShippingAddress, UserProfile,
    UserUpdate,
};
use tokio::task::JoinHandle;
use tracing::{debug, info};
use url::Url;

use crate::api::{Mutation, PROFILE_ID, Query, RequestExecutor, Resource};
use crate::cache::{CacheConfig, QueryClient, QueryState};
use crate::config::Settings;
use crate::infra::storage::{FileStore, KeyValueStore};
use crate::session::{CartState, CartStore, DEFAULT_PAYMENT_METHOD, OrderSummary, SessionStore};

use super::error::AppError;

pub struct Storefront {
    client: QueryClient,
    cart: CartStore,
    sweeper: Option<JoinHandle<()>>,
}

impl Storefront {
    /// Build from resolved settings, persisting under `storage.data_dir`.
    pub async fn bootstrap(settings: &Settings) -> Result<Self, AppError> {
        let storage: Arc<dyn KeyValueStore> =
            Arc::new(FileStore::new(settings.storage.data_dir.clone()));
        Self::with_storage(
            storage,
            settings.api.base_url.clone(),
            settings.api.timeout,
            CacheConfig::from(&settings.cache),
        )
        .await
    }

    /// Rehydrate session and cart from `storage`, then build the client
    /// around that session.
    pub async fn with_storage(
        storage: Arc<dyn KeyValueStore>,
        base_url: Url,
        timeout: Duration,
        cache: CacheConfig,
    ) -> Result<Self, AppError> {
        let session = SessionStore::load(Arc::clone(&storage)).await;
        let cart = CartStore::load(storage).await;
        let executor = RequestExecutor::new(base_url, timeout, session.mirror().clone())?;
        let client = QueryClient::new(executor, session, cache);
        let sweeper = client.spawn_sweeper();

        info!(
            signed_in = client.session().mirror().is_authenticated(),
            "Storefront ready"
        );
        Ok(Self {
            client,
            cart,
            sweeper,
        })
    }

    pub fn client(&self) -> &QueryClient {
        &self.client
    }

    pub fn cart(&self) -> &CartStore {
        &self.cart
    }

    pub fn current_user(&self) -> Option<SessionRecord> {
        self.client.session().current()
    }

    /// Read through the cache, turning a failed fetch into an error.
    ///
    /// A sign-in or sign-out while the read is in flight resets the entry
    /// and discards that fetch; the read is then repeated once under the
    /// new session.
    pub async fn fetch(&self, query: &Query) -> Result<Arc<Resource>, AppError> {
        for attempt in 0..2 {
            let QueryState { data, error, .. } = self.client.read(query).await;
            match (error, data) {
                (Some(err), _) => return Err(err.into()),
                (None, Some(data)) => return Ok(data),
                (None, None) => {
                    debug!(key = %query.cache_key(), attempt, "Read discarded by a session change");
                }
            }
        }
        Err(AppError::unexpected(format!(
            "{} was reset twice while loading",
            query.cache_key()
        )))
    }

    pub async fn login(
        &self,
        email: impl Into<String>,
        password: impl Into<String>,
    ) -> Result<SessionRecord, AppError> {
        let mutation = Mutation::Login(Credentials {
            email: email.into(),
            password: password.into(),
        });
        self.session_mutation(&mutation).await
    }

    pub async fn register(
        &self,
        name: impl Into<String>,
        email: impl Into<String>,
        password: impl Into<String>,
    ) -> Result<SessionRecord, AppError> {
        let mutation = Mutation::Register(Registration {
            name: name.into(),
            email: email.into(),
            password: password.into(),
        });
        self.session_mutation(&mutation).await
    }

    pub async fn update_profile(
        &self,
        name: impl Into<String>,
        email: impl Into<String>,
        password: Option<String>,
    ) -> Result<SessionRecord, AppError> {
        let current = self.require_user("sign in to update the profile")?;
        let mutation = Mutation::UpdateProfile(ProfileUpdate {
            id: current.id,
            name: name.into(),
            email: email.into(),
            password,
        });
        self.session_mutation(&mutation).await
    }

    async fn session_mutation(&self, mutation: &Mutation) -> Result<SessionRecord, AppError> {
        let resource = self.client.mutate(mutation).await?;
        resource
            .as_session()
            .cloned()
            .ok_or_else(|| AppError::unexpected("response carried no session record"))
    }

    pub async fn logout(&self) -> Result<(), AppError> {
        self.client.logout().await?;
        Ok(())
    }

    /// Look the product up and put `qty` of it in the cart, replacing any
    /// existing line for it.
    pub async fn add_to_cart(&self, product_id: &str, qty: u32) -> Result<CartState, AppError> {
        if qty == 0 {
            return Err(AppError::validation("quantity must be at least 1"));
        }
        let resource = self.fetch(&Query::product(product_id)).await?;
        let product = resource
            .as_product()
            .ok_or_else(|| AppError::unexpected("product details returned another shape"))?;
        if qty > product.count_in_stock {
            return Err(AppError::validation(format!(
                "only {} of {} in stock",
                product.count_in_stock, product.name
            )));
        }

        let item = CartItem {
            product: product.id.clone(),
            name: product.name.clone(),
            image: product.image.clone(),
            price: product.price,
            count_in_stock: product.count_in_stock,
            qty,
        };
        Ok(self.cart.add_item(item).await?)
    }

    pub async fn remove_from_cart(&self, product_id: &str) -> Result<CartState, AppError> {
        Ok(self.cart.remove_item(product_id).await?)
    }

    pub async fn save_shipping_address(
        &self,
        address: ShippingAddress,
    ) -> Result<CartState, AppError> {
        Ok(self.cart.save_shipping_address(address).await?)
    }

    pub async fn save_payment_method(&self, method: &str) -> Result<CartState, AppError> {
        if method.trim().is_empty() {
            return Err(AppError::validation("payment method must not be empty"));
        }
        Ok(self.cart.save_payment_method(method.trim()).await?)
    }

    pub async fn clear_cart(&self) -> Result<CartState, AppError> {
        Ok(self.cart.reset().await?)
    }

    pub async fn order_summary(&self) -> (CartState, OrderSummary) {
        let cart = self.cart.snapshot().await;
        let summary = OrderSummary::from_items(&cart.cart_items);
        (cart, summary)
    }

    /// Submit the cart as an order and empty it on success.
    pub async fn place_order(&self) -> Result<Order, AppError> {
        self.require_user("sign in to place an order")?;
        let (cart, summary) = self.order_summary().await;
        if cart.is_empty() {
            return Err(AppError::validation("cart is empty"));
        }
        let shipping_address = cart
            .shipping_address
            .clone()
            .ok_or_else(|| AppError::validation("shipping address is required"))?;

        let (items_price, shipping_price, tax_price, total_price) = summary.formatted();
        let order = NewOrder {
            order_items: cart.cart_items.iter().map(OrderItem::from).collect(),
            shipping_address,
            payment_method: cart
                .payment_method
                .clone()
                .unwrap_or_else(|| DEFAULT_PAYMENT_METHOD.to_string()),
            items_price,
            shipping_price,
            tax_price,
            total_price,
        };

        let resource = self.client.mutate(&Mutation::CreateOrder(order)).await?;
        let created = resource
            .as_order()
            .cloned()
            .ok_or_else(|| AppError::unexpected("create order returned another shape"))?;
        self.cart.reset().await?;
        info!(order_id = %created.id, "Order placed");
        Ok(created)
    }

    /// Client id of the payment provider the backend is configured with.
    pub async fn payment_client_id(&self) -> Result<String, AppError> {
        let resource = self.fetch(&Query::PaymentClientId).await?;
        let client_id = resource
            .as_text()
            .ok_or_else(|| AppError::unexpected("payment client id returned another shape"))?;
        if client_id.is_empty() {
            return Err(AppError::validation("payment provider is not configured"));
        }
        Ok(client_id.to_string())
    }

    /// Record a captured payment against an order.
    ///
    /// The provider must be configured on the backend; the payment result
    /// is what the provider handed back after capture.
    pub async fn pay_order(
        &self,
        order_id: &str,
        details: PaymentResult,
    ) -> Result<Order, AppError> {
        self.require_user("sign in to pay for an order")?;
        let client_id = self.payment_client_id().await?;
        let mutation = Mutation::PayOrder {
            order_id: order_id.to_string(),
            details,
        };
        let order = self.order_mutation(&mutation).await?;
        info!(order_id = %order.id, %client_id, "Order paid");
        Ok(order)
    }

    pub async fn deliver_order(&self, order_id: &str) -> Result<Order, AppError> {
        self.require_admin()?;
        let mutation = Mutation::DeliverOrder {
            order_id: order_id.to_string(),
        };
        self.order_mutation(&mutation).await
    }

    pub async fn all_orders(&self) -> Result<Vec<Order>, AppError> {
        self.require_admin()?;
        let resource = self.fetch(&Query::AllOrders).await?;
        resource
            .as_orders()
            .map(<[Order]>::to_vec)
            .ok_or_else(|| AppError::unexpected("order list returned another shape"))
    }

    async fn order_mutation(&self, mutation: &Mutation) -> Result<Order, AppError> {
        let resource = self.client.mutate(mutation).await?;
        resource
            .as_order()
            .cloned()
            .ok_or_else(|| AppError::unexpected("order update returned another shape"))
    }

    /// Post a 1-5 star review as the signed-in user.
    pub async fn create_review(
        &self,
        product_id: &str,
        rating: u8,
        comment: impl Into<String>,
    ) -> Result<(), AppError> {
        self.require_user("sign in to write a review")?;
        if !(1..=5).contains(&rating) {
            return Err(AppError::validation("rating must be between 1 and 5"));
        }
        let comment = comment.into();
        if comment.trim().is_empty() {
            return Err(AppError::validation("review comment must not be empty"));
        }
        let mutation = Mutation::CreateReview {
            product_id: product_id.to_string(),
            review: NewReview { rating, comment },
        };
        self.client.mutate(&mutation).await?;
        Ok(())
    }

    /// Create a placeholder product to be filled in with [`Self::update_product`].
    pub async fn create_product(&self) -> Result<Product, AppError> {
        self.require_admin()?;
        let resource = self.client.mutate(&Mutation::CreateProduct).await?;
        resource
            .as_product()
            .cloned()
            .ok_or_else(|| AppError::unexpected("create product returned another shape"))
    }

    pub async fn update_product(&self, update: ProductUpdate) -> Result<Product, AppError> {
        self.require_admin()?;
        let resource = self.client.mutate(&Mutation::UpdateProduct(update)).await?;
        resource
            .as_product()
            .cloned()
            .ok_or_else(|| AppError::unexpected("update product returned another shape"))
    }

    pub async fn delete_product(&self, id: &str) -> Result<(), AppError> {
        self.require_admin()?;
        self.client
            .mutate(&Mutation::DeleteProduct { id: id.to_string() })
            .await?;
        Ok(())
    }

    pub async fn list_users(&self) -> Result<Vec<UserProfile>, AppError> {
        self.require_admin()?;
        let resource = self.fetch(&Query::ListUsers).await?;
        resource
            .as_users()
            .map(<[UserProfile]>::to_vec)
            .ok_or_else(|| AppError::unexpected("user list returned another shape"))
    }

    /// One user by id. [`crate::api::PROFILE_ID`] reads the signed-in user.
    pub async fn user(&self, id: &str) -> Result<UserProfile, AppError> {
        if id == PROFILE_ID {
            self.require_user("sign in to view the profile")?;
        } else {
            self.require_admin()?;
        }
        let resource = self
            .fetch(&Query::UserDetails { id: id.to_string() })
            .await?;
        resource
            .as_user()
            .cloned()
            .ok_or_else(|| AppError::unexpected("user details returned another shape"))
    }

    pub async fn update_user(&self, update: UserUpdate) -> Result<UserProfile, AppError> {
        self.require_admin()?;
        let resource = self.client.mutate(&Mutation::UpdateUser(update)).await?;
        resource
            .as_user()
            .cloned()
            .ok_or_else(|| AppError::unexpected("update user returned another shape"))
    }

    pub async fn delete_user(&self, id: &str) -> Result<(), AppError> {
        self.require_admin()?;
        self.client
            .mutate(&Mutation::DeleteUser { id: id.to_string() })
            .await?;
        Ok(())
    }

    fn require_user(&self, message: &str) -> Result<SessionRecord, AppError> {
        self.current_user().ok_or_else(|| AppError::validation(message))
    }

    fn require_admin(&self) -> Result<SessionRecord, AppError> {
        let user = self.require_user("sign in as an admin")?;
        if !user.is_admin {
            return Err(AppError::validation("admin access required"));
        }
        Ok(user)
    }
}

impl Drop for Storefront {
    fn drop(&mut self) {
        if let Some(handle) = self.sweeper.take() {
            handle.abort();
        }
    }
}

impl std::fmt::Debug for Storefront {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Storefront")
            .field("client", &self.client)
            .finish_non_exhaustive()
    }
}
