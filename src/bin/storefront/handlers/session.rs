use serde_json::json;
use storefront::{
    application::{Storefront, error::AppError},
    config::{LoginArgs, RegisterArgs},
};

use crate::print::print_json;

pub async fn login(storefront: &Storefront, args: LoginArgs) -> Result<(), AppError> {
    let session = storefront.login(args.email, args.password).await?;
    print_json(&session)
}

pub async fn register(storefront: &Storefront, args: RegisterArgs) -> Result<(), AppError> {
    let session = storefront
        .register(args.name, args.email, args.password)
        .await?;
    print_json(&session)
}

pub async fn logout(storefront: &Storefront) -> Result<(), AppError> {
    storefront.logout().await?;
    print_json(&json!({ "signedIn": false }))
}

pub fn whoami(storefront: &Storefront) -> Result<(), AppError> {
    match storefront.current_user() {
        Some(session) => print_json(&session),
        None => print_json(&json!({ "signedIn": false })),
    }
}
