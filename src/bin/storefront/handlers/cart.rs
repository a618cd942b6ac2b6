use serde_json::json;
use storefront::{
    application::{Storefront, error::AppError},
    config::{CartCommand, ShippingArgs},
};
use storefront_api_types::ShippingAddress;

use crate::print::print_json;

pub async fn handle(storefront: &Storefront, cmd: CartCommand) -> Result<(), AppError> {
    let cart = match cmd {
        CartCommand::Show => return show(storefront).await,
        CartCommand::Add { product_id, qty } => storefront.add_to_cart(&product_id, qty).await?,
        CartCommand::Remove { product_id } => storefront.remove_from_cart(&product_id).await?,
        CartCommand::Clear => storefront.clear_cart().await?,
        CartCommand::Shipping(ShippingArgs {
            address,
            city,
            postal_code,
            country,
        }) => {
            storefront
                .save_shipping_address(ShippingAddress {
                    address,
                    city,
                    postal_code,
                    country,
                })
                .await?
        }
        CartCommand::Payment { method } => storefront.save_payment_method(&method).await?,
    };
    print_json(&cart)
}

async fn show(storefront: &Storefront) -> Result<(), AppError> {
    let (cart, summary) = storefront.order_summary().await;
    let (items_price, shipping_price, tax_price, total_price) = summary.formatted();
    print_json(&json!({
        "cart": cart,
        "itemCount": cart.item_count(),
        "itemsPrice": items_price,
        "shippingPrice": shipping_price,
        "taxPrice": tax_price,
        "totalPrice": total_price,
    }))
}
