use storefront::{
    api::Query,
    application::{Storefront, error::AppError},
    config::{OrdersCommand, PayArgs},
};
use storefront_api_types::{PayerInfo, PaymentResult};
use time::{OffsetDateTime, format_description::well_known::Rfc3339};

use crate::print::print_json;

pub async fn handle(storefront: &Storefront, cmd: OrdersCommand) -> Result<(), AppError> {
    match cmd {
        OrdersCommand::Mine => {
            if storefront.current_user().is_none() {
                return Err(AppError::validation("sign in to list your orders"));
            }
            let resource = storefront.fetch(&Query::MyOrders).await?;
            print_json(resource.as_ref())
        }
        OrdersCommand::Show { id } => {
            let resource = storefront.fetch(&Query::order(id)).await?;
            print_json(resource.as_ref())
        }
        OrdersCommand::Place => print_json(&storefront.place_order().await?),
        OrdersCommand::Pay(args) => pay(storefront, args).await,
        OrdersCommand::Deliver { id } => print_json(&storefront.deliver_order(&id).await?),
        OrdersCommand::All => print_json(&storefront.all_orders().await?),
    }
}

async fn pay(storefront: &Storefront, args: PayArgs) -> Result<(), AppError> {
    let update_time = OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .map_err(|e| AppError::unexpected(format!("failed to format payment time: {e}")))?;
    // Default the payer to the signed-in user.
    let email_address = if args.payer_email.is_empty() {
        storefront
            .current_user()
            .map(|user| user.email)
            .unwrap_or_default()
    } else {
        args.payer_email
    };

    let details = PaymentResult {
        id: args.payment_id,
        status: args.status,
        update_time,
        payer: PayerInfo { email_address },
    };
    let order = storefront.pay_order(&args.id, details).await?;
    print_json(&order)
}
