use serde_json::json;
use storefront::{
    api::Query,
    application::{Storefront, error::AppError},
    config::{ProductUpdateArgs, ProductsCommand},
};
use storefront_api_types::ProductUpdate;

use crate::print::print_json;

pub async fn handle(storefront: &Storefront, cmd: ProductsCommand) -> Result<(), AppError> {
    match cmd {
        ProductsCommand::List { keyword, page } => {
            show(storefront, Query::list_products(keyword, page)).await
        }
        ProductsCommand::Show { id } => show(storefront, Query::product(id)).await,
        ProductsCommand::Top => show(storefront, Query::TopProducts).await,
        ProductsCommand::Review {
            id,
            rating,
            comment,
        } => {
            storefront.create_review(&id, rating, comment).await?;
            print_json(&json!({ "reviewed": id }))
        }
        ProductsCommand::Create => print_json(&storefront.create_product().await?),
        ProductsCommand::Update(args) => update(storefront, args).await,
        ProductsCommand::Delete { id } => {
            storefront.delete_product(&id).await?;
            print_json(&json!({ "deleted": id }))
        }
    }
}

async fn show(storefront: &Storefront, query: Query) -> Result<(), AppError> {
    let resource = storefront.fetch(&query).await?;
    print_json(resource.as_ref())
}

/// Overlay the given fields on the product as currently stored.
async fn update(storefront: &Storefront, args: ProductUpdateArgs) -> Result<(), AppError> {
    let resource = storefront.fetch(&Query::product(args.id.as_str())).await?;
    let current = resource
        .as_product()
        .ok_or_else(|| AppError::unexpected("product details returned another shape"))?;

    let update = ProductUpdate {
        id: current.id.clone(),
        name: args.name.unwrap_or_else(|| current.name.clone()),
        price: args.price.unwrap_or(current.price),
        image: args.image.unwrap_or_else(|| current.image.clone()),
        brand: args.brand.unwrap_or_else(|| current.brand.clone()),
        category: args.category.unwrap_or_else(|| current.category.clone()),
        description: args
            .description
            .unwrap_or_else(|| current.description.clone()),
        count_in_stock: args.count_in_stock.unwrap_or(current.count_in_stock),
    };
    let product = storefront.update_product(update).await?;
    print_json(&product)
}
