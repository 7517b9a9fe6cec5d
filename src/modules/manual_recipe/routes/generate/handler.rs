use super::{service::service, types::request};
use crate::{modules::auth::middleware::Auth, types::Context};
use axum::{
    extract::{Query, State},
    response::IntoResponse,
};
use std::sync::Arc;

pub async fn handler(
    State(ctx): State<Arc<Context>>,
    auth: Auth,
    Query(query): Query<request::Query>,
    request::OptionalBody(body): request::OptionalBody,
) -> impl IntoResponse {
    service(ctx, request::Payload { auth, query, body }).await
}
