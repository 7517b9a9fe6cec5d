pub mod request {
    use crate::modules::auth::middleware::Auth;
    use axum::{
        async_trait,
        body::Bytes,
        extract::{FromRequest, Request},
        http::{header, StatusCode},
        response::{IntoResponse, Response},
        Json,
    };
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Deserialize)]
    pub struct Body {
        pub prompt: String,
    }

    #[derive(Deserialize)]
    pub struct Query {
        pub prompt: Option<String>,
    }

    /// JSON body that may be left out entirely. A body that is present must
    /// be valid JSON with a JSON content type.
    pub struct OptionalBody(pub Option<Body>);

    #[async_trait]
    impl<S: Send + Sync> FromRequest<S> for OptionalBody {
        type Rejection = Response;

        async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
            if req.headers().contains_key(header::CONTENT_TYPE) {
                let Json(body) = Json::<Body>::from_request(req, state)
                    .await
                    .map_err(IntoResponse::into_response)?;
                return Ok(Self(Some(body)));
            }

            let bytes = Bytes::from_request(req, state)
                .await
                .map_err(IntoResponse::into_response)?;

            if bytes.is_empty() {
                return Ok(Self(None));
            }

            Err((
                StatusCode::UNSUPPORTED_MEDIA_TYPE,
                Json(json!({
                    "error": "Expected request with `Content-Type: application/json`"
                })),
            )
                .into_response())
        }
    }

    pub struct Payload {
        pub auth: Auth,
        pub query: Query,
        pub body: Option<Body>,
    }
}

pub mod response {
    use crate::modules::manual_recipe::{model::ManualRecipeResponse, service};
    use axum::{extract::Json, http::StatusCode, response::IntoResponse};
    use serde_json::json;

    pub enum Success {
        Recipe(ManualRecipeResponse),
    }

    impl IntoResponse for Success {
        fn into_response(self) -> axum::response::Response {
            match self {
                Self::Recipe(recipe) => (StatusCode::OK, Json(json!(recipe))).into_response(),
            }
        }
    }

    pub enum Error {
        MissingPrompt,
        Service(service::Error),
    }

    impl IntoResponse for Error {
        fn into_response(self) -> axum::response::Response {
            match self {
                Self::MissingPrompt => (
                    StatusCode::UNPROCESSABLE_ENTITY,
                    Json(json!({ "error": "Prompt is required" })),
                )
                    .into_response(),
                Self::Service(err) => err.into_response(),
            }
        }
    }

    pub type Response = Result<Success, Error>;
}
