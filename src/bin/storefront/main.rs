//! storefront: catalog, cart and checkout from the command line.
//! One handler module per resource; all state lives in the library.

mod handlers;
mod print;

use std::process;

use storefront::{
    application::{Storefront, error::AppError},
    config::{self, Command},
    infra::telemetry,
};
use tracing::{Dispatch, Level, dispatcher, error};
use tracing_subscriber::fmt as tracing_fmt;

use handlers::{cart, orders, products, profile, session, users};

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(error.exit_code());
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt()
        .with_writer(std::io::stderr)
        .with_max_level(Level::ERROR)
        .finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()?;

    telemetry::init(&settings.logging)?;

    let storefront = Storefront::bootstrap(&settings).await?;

    match cli_args.command {
        Command::Products(cmd) => products::handle(&storefront, cmd).await,
        Command::Login(args) => session::login(&storefront, args).await,
        Command::Register(args) => session::register(&storefront, args).await,
        Command::Logout => session::logout(&storefront).await,
        Command::Whoami => session::whoami(&storefront),
        Command::Cart(cmd) => cart::handle(&storefront, cmd).await,
        Command::Orders(cmd) => orders::handle(&storefront, cmd).await,
        Command::Profile(cmd) => profile::handle(&storefront, cmd).await,
        Command::Users(cmd) => users::handle(&storefront, cmd).await,
    }
}
