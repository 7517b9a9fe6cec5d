use super::types::{request, response};
use crate::{
    types::Context,
    utils::{logging::log_operation, request_id::make_request_id},
};
use std::sync::Arc;

pub async fn service(ctx: Arc<Context>, payload: request::Payload) -> response::Response {
    let prompt = payload
        .body
        .map(|body| body.prompt)
        .or(payload.query.prompt)
        .ok_or(response::Error::MissingPrompt)?;

    let request_id = make_request_id("generate");
    let uid = payload.auth.token_data.uid;

    log_operation("generate_manual_recipe", &request_id, async {
        let log = ctx
            .manual_recipe
            .create_recipe_log(uid, prompt, &request_id)
            .await?;

        ctx.manual_recipe
            .generate_initial_recipe(log.log_id, &request_id)
            .await
    })
    .await
    .map(response::Success::Recipe)
    .map_err(response::Error::Service)
}
