use super::types::{request, response};
use crate::{
    types::Context,
    utils::{logging::log_operation, request_id::make_request_id},
};
use std::sync::Arc;

pub async fn service(ctx: Arc<Context>, payload: request::Payload) -> response::Response {
    let request_id = make_request_id("get");

    log_operation(
        "get_manual_recipe",
        &request_id,
        ctx.manual_recipe.get_recipe_log(payload.log_id, &request_id),
    )
    .await
    .map(response::Success::Recipe)
}
