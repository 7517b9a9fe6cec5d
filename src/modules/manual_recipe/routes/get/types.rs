pub mod request {
    pub struct Payload {
        pub log_id: String,
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

    pub type Response = Result<Success, service::Error>;
}
