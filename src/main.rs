mod app;
mod modules;
mod types;
mod utils;

use crate::{
    app::App,
    types::{Config, ToContext},
};
use std::sync::Arc;
use tracing_subscriber::prelude::*;

fn init_tracing() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(err) => {
            tracing::error!("Failed to load configuration: {}", err);
            std::process::exit(1);
        }
    };

    let ctx = Arc::new(config.to_context().await);

    if let Err(err) = App::new(ctx).serve().await {
        tracing::error!("Server stopped: {}", err);
        std::process::exit(1);
    }
}
