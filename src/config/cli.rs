use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueHint, builder::BoolishValueParser};

/// Command-line arguments for the storefront binary.
#[derive(Debug, Parser)]
#[command(name = "storefront", version, about = "Storefront catalog, cart and checkout client")]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(
        long = "config-file",
        env = "STOREFRONT_CONFIG_FILE",
        value_name = "PATH",
        value_hint = ValueHint::FilePath,
        global = true
    )]
    pub config_file: Option<PathBuf>,

    #[command(flatten)]
    pub overrides: GlobalOverrides,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Args, Default, Clone)]
pub struct GlobalOverrides {
    /// Override the backend base URL.
    #[arg(long = "api-base-url", value_name = "URL", global = true)]
    pub api_base_url: Option<String>,

    /// Override the request timeout.
    #[arg(long = "api-timeout-seconds", value_name = "SECONDS", global = true)]
    pub api_timeout_seconds: Option<u64>,

    /// Override the directory holding the persisted session and cart.
    #[arg(
        long = "data-dir",
        value_name = "PATH",
        value_hint = ValueHint::DirPath,
        global = true
    )]
    pub data_dir: Option<PathBuf>,

    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL", global = true)]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new(),
        global = true
    )]
    pub log_json: Option<bool>,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Browse the product catalog.
    #[command(subcommand)]
    Products(ProductsCommand),
    /// Sign in and store the session.
    Login(LoginArgs),
    /// Create an account and sign in.
    Register(RegisterArgs),
    /// Forget the stored session.
    Logout,
    /// Show the stored session.
    Whoami,
    /// Inspect and edit the cart.
    #[command(subcommand)]
    Cart(CartCommand),
    /// Order history, checkout, payment and delivery.
    #[command(subcommand)]
    Orders(OrdersCommand),
    /// The signed-in user's profile.
    #[command(subcommand)]
    Profile(ProfileCommand),
    /// User administration (admin only).
    #[command(subcommand)]
    Users(UsersCommand),
}

#[derive(Debug, Subcommand, Clone)]
pub enum ProductsCommand {
    /// List one page of products.
    List {
        /// Search keyword.
        #[arg(long, default_value = "")]
        keyword: String,
        /// Page number (1-based).
        #[arg(long)]
        page: Option<u32>,
    },
    /// Show one product with its reviews.
    Show {
        #[arg(value_name = "ID")]
        id: String,
    },
    /// Top-rated products.
    Top,
    /// Review a product as the signed-in user.
    Review {
        #[arg(value_name = "ID")]
        id: String,
        /// Stars, 1 to 5.
        #[arg(long)]
        rating: u8,
        #[arg(long)]
        comment: String,
    },
    /// Create a placeholder product (admin only).
    Create,
    /// Edit a product; omitted fields keep their current value (admin only).
    Update(ProductUpdateArgs),
    /// Delete a product (admin only).
    Delete {
        #[arg(value_name = "ID")]
        id: String,
    },
}

#[derive(Debug, Args, Clone)]
pub struct ProductUpdateArgs {
    #[arg(value_name = "ID")]
    pub id: String,
    #[arg(long)]
    pub name: Option<String>,
    #[arg(long)]
    pub price: Option<f64>,
    #[arg(long)]
    pub image: Option<String>,
    #[arg(long)]
    pub brand: Option<String>,
    #[arg(long)]
    pub category: Option<String>,
    #[arg(long)]
    pub description: Option<String>,
    #[arg(long = "count-in-stock")]
    pub count_in_stock: Option<u32>,
}

#[derive(Debug, Args, Clone)]
pub struct LoginArgs {
    #[arg(long)]
    pub email: String,
    #[arg(long, env = "STOREFRONT_PASSWORD", hide_env_values = true)]
    pub password: String,
}

#[derive(Debug, Args, Clone)]
pub struct RegisterArgs {
    #[arg(long)]
    pub name: String,
    #[arg(long)]
    pub email: String,
    #[arg(long, env = "STOREFRONT_PASSWORD", hide_env_values = true)]
    pub password: String,
}

#[derive(Debug, Subcommand, Clone)]
pub enum CartCommand {
    /// Show cart contents and the order summary.
    Show,
    /// Add a product, replacing its line if already present.
    Add {
        #[arg(value_name = "PRODUCT_ID")]
        product_id: String,
        #[arg(long, default_value_t = 1)]
        qty: u32,
    },
    /// Remove a product.
    Remove {
        #[arg(value_name = "PRODUCT_ID")]
        product_id: String,
    },
    /// Empty the cart.
    Clear,
    /// Save the shipping address.
    Shipping(ShippingArgs),
    /// Save the payment method.
    Payment {
        #[arg(value_name = "METHOD")]
        method: String,
    },
}

#[derive(Debug, Args, Clone)]
pub struct ShippingArgs {
    #[arg(long)]
    pub address: String,
    #[arg(long)]
    pub city: String,
    #[arg(long = "postal-code")]
    pub postal_code: String,
    #[arg(long)]
    pub country: String,
}

#[derive(Debug, Subcommand, Clone)]
pub enum OrdersCommand {
    /// Orders of the signed-in user.
    Mine,
    /// One order.
    Show {
        #[arg(value_name = "ID")]
        id: String,
    },
    /// Place an order from the cart.
    Place,
    /// Record a captured payment for an order.
    Pay(PayArgs),
    /// Mark an order delivered (admin only).
    Deliver {
        #[arg(value_name = "ID")]
        id: String,
    },
    /// Every order (admin only).
    All,
}

#[derive(Debug, Args, Clone)]
pub struct PayArgs {
    #[arg(value_name = "ID")]
    pub id: String,
    /// Transaction id issued by the payment provider.
    #[arg(long = "payment-id")]
    pub payment_id: String,
    #[arg(long, default_value = "COMPLETED")]
    pub status: String,
    #[arg(long = "payer-email", default_value = "")]
    pub payer_email: String,
}

#[derive(Debug, Subcommand, Clone)]
pub enum ProfileCommand {
    /// Show the profile as the backend has it.
    Show,
    /// Change name, email or password.
    Update {
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        password: Option<String>,
    },
}

#[derive(Debug, Subcommand, Clone)]
pub enum UsersCommand {
    /// List every user.
    List,
    /// Show one user.
    Show {
        #[arg(value_name = "ID")]
        id: String,
    },
    /// Edit a user; omitted fields keep their current value.
    Update {
        #[arg(value_name = "ID")]
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        email: Option<String>,
        /// Grant or revoke admin rights.
        #[arg(long, value_name = "BOOL", value_parser = BoolishValueParser::new())]
        admin: Option<bool>,
    },
    /// Delete a user.
    Delete {
        #[arg(value_name = "ID")]
        id: String,
    },
}
