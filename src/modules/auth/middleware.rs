use super::service::{self, TokenData};
use crate::types::Context;
use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Response},
    Json, RequestPartsExt,
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use serde_json::json;
use std::sync::Arc;

fn invalid_session() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({"error": "Invalid session token"})),
    )
        .into_response()
}

#[derive(Clone, Debug)]
pub struct Auth {
    pub token_data: TokenData,
}

#[async_trait]
impl FromRequestParts<Arc<Context>> for Auth {
    type Rejection = Response;

    async fn from_request_parts(
        parts: &mut Parts,
        ctx: &Arc<Context>,
    ) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) = parts
            .extract::<TypedHeader<Authorization<Bearer>>>()
            .await
            .map_err(|_| invalid_session())?;

        ctx.auth
            .verify_token(bearer.token())
            .await
            .map(|token_data| Self { token_data })
            .map_err(|err| {
                match err {
                    service::Error::UnexpectedError => {
                        tracing::error!("Failed to verify access token")
                    }
                    _ => tracing::debug!("Rejected access token: {:?}", err),
                }
                invalid_session()
            })
    }
}
