use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShippingAddress {
    pub address: String,
    pub city: String,
    pub postal_code: String,
    pub country: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderItem {
    pub name: String,
    pub qty: u32,
    #[serde(default)]
    pub image: String,
    pub price: f64,
    pub product: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayerInfo {
    #[serde(default)]
    pub email_address: String,
}

/// Result object handed back by the payment provider after capture.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentResult {
    pub id: String,
    pub status: String,
    #[serde(default)]
    pub update_time: String,
    #[serde(default)]
    pub payer: PayerInfo,
}

/// Order owner: a bare user id, or the populated `{name, email}` view the
/// detail and admin endpoints return.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OrderOwner {
    Id(String),
    Summary {
        #[serde(rename = "_id", default)]
        id: Option<String>,
        name: String,
        email: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<OrderOwner>,
    pub order_items: Vec<OrderItem>,
    #[serde(default)]
    pub shipping_address: ShippingAddress,
    #[serde(default)]
    pub payment_method: String,
    #[serde(default)]
    pub items_price: f64,
    #[serde(default)]
    pub shipping_price: f64,
    #[serde(default)]
    pub tax_price: f64,
    pub total_price: f64,
    #[serde(default)]
    pub is_paid: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paid_at: Option<String>,
    #[serde(default)]
    pub is_delivered: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delivered_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

/// Body of `POST /api/orders`. Prices travel as two-decimal strings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewOrder {
    pub order_items: Vec<OrderItem>,
    pub shipping_address: ShippingAddress,
    pub payment_method: String,
    pub items_price: String,
    pub shipping_price: String,
    pub tax_price: String,
    pub total_price: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_owner_accepts_id_or_populated_user() {
        let bare: Order = serde_json::from_str(
            r#"{"_id":"o1","user":"u1","orderItems":[],"totalPrice":10}"#,
        )
        .expect("bare owner");
        assert_eq!(bare.user, Some(OrderOwner::Id("u1".into())));

        let populated: Order = serde_json::from_str(
            r#"{"_id":"o2","user":{"_id":"u1","name":"Jane","email":"jane@example.com"},
                "orderItems":[],"totalPrice":10,"isPaid":true,"paidAt":"2024-01-01"}"#,
        )
        .expect("populated owner");
        assert!(matches!(populated.user, Some(OrderOwner::Summary { .. })));
        assert!(populated.is_paid);
    }
}
