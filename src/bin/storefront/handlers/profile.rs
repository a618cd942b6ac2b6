use storefront::{
    api::PROFILE_ID,
    application::{Storefront, error::AppError},
    config::ProfileCommand,
};

use crate::print::print_json;

pub async fn handle(storefront: &Storefront, cmd: ProfileCommand) -> Result<(), AppError> {
    match cmd {
        ProfileCommand::Show => print_json(&storefront.user(PROFILE_ID).await?),
        ProfileCommand::Update {
            name,
            email,
            password,
        } => {
            let current = storefront
                .current_user()
                .ok_or_else(|| AppError::validation("sign in to update the profile"))?;
            let session = storefront
                .update_profile(
                    name.unwrap_or(current.name),
                    email.unwrap_or(current.email),
                    password,
                )
                .await?;
            print_json(&session)
        }
    }
}
