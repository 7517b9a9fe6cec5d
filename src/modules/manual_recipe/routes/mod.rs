mod confirm;
mod generate;
mod get;
mod update;


use crate::types::Context;
use axum::routing::Router;
use std::sync::Arc;

pub fn get_router() -> Router<Arc<Context>> {
    Router::new()
        .merge(generate::get_router())
        .merge(update::get_router())
        .merge(confirm::get_router())
        .merge(get::get_router())
}
