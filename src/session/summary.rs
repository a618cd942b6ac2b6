use serde::Serialize;
use storefront_api_types::CartItem;

const FREE_SHIPPING_OVER: f64 = 100.0;
const FLAT_SHIPPING: f64 = 10.0;
const TAX_RATE: f64 = 0.15;

/// Checkout price breakdown.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct OrderSummary {
    pub items_price: f64,
    pub shipping_price: f64,
    pub tax_price: f64,
    pub total_price: f64,
}

impl OrderSummary {
    pub fn from_items(items: &[CartItem]) -> Self {
        let items_price = round_cents(items.iter().map(|i| i.price * f64::from(i.qty)).sum());
        let shipping_price = if items_price > FREE_SHIPPING_OVER {
            0.0
        } else {
            FLAT_SHIPPING
        };
        let tax_price = round_cents(TAX_RATE * items_price);
        let total_price = round_cents(items_price + shipping_price + tax_price);

        Self {
            items_price,
            shipping_price,
            tax_price,
            total_price,
        }
    }

    /// `(items, shipping, tax, total)` with two decimals, as the backend
    /// expects them in a new order.
    pub fn formatted(&self) -> (String, String, String, String) {
        (
            format!("{:.2}", self.items_price),
            format!("{:.2}", self.shipping_price),
            format!("{:.2}", self.tax_price),
            format!("{:.2}", self.total_price),
        )
    }
}

fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
