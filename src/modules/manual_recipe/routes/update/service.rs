use super::types::{request, response};
use crate::{
    types::Context,
    utils::{logging::log_operation, request_id::make_request_id},
};
use std::sync::Arc;

pub async fn service(ctx: Arc<Context>, payload: request::Payload) -> response::Response {
    let request_id = make_request_id("update");

    log_operation(
        "update_manual_recipe",
        &request_id,
        ctx.manual_recipe
            .update_recipe(payload.log_id, payload.updates, &request_id),
    )
    .await
    .map(response::Success::Recipe)
}
