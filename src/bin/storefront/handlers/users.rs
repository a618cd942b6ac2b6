use serde_json::json;
use storefront::{
    application::{Storefront, error::AppError},
    config::UsersCommand,
};
use storefront_api_types::UserUpdate;

use crate::print::print_json;

pub async fn handle(storefront: &Storefront, cmd: UsersCommand) -> Result<(), AppError> {
    match cmd {
        UsersCommand::List => print_json(&storefront.list_users().await?),
        UsersCommand::Show { id } => print_json(&storefront.user(&id).await?),
        UsersCommand::Update {
            id,
            name,
            email,
            admin,
        } => {
            let current = storefront.user(&id).await?;
            let updated = storefront
                .update_user(UserUpdate {
                    id: current.id,
                    name: name.unwrap_or(current.name),
                    email: email.unwrap_or(current.email),
                    is_admin: admin.unwrap_or(current.is_admin),
                })
                .await?;
            print_json(&updated)
        }
        UsersCommand::Delete { id } => {
            storefront.delete_user(&id).await?;
            print_json(&json!({ "deleted": id }))
        }
    }
}
