use super::{
    generator,
    model::{
        CreatedRecipeLog, ManualRecipeData, ManualRecipeResponse, MealImage, RecipeLogStatus,
        RecipeUpdates,
    },
    repository::{self, RecipeLog},
};
use crate::{
    types::{OpenAiContext, StorageContext},
    utils::{database::DatabaseConnection, storage, validation},
};
use async_trait::async_trait;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Map, Value};
use validator::{Validate, ValidationErrors};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Invalid prompt")]
    InvalidPrompt(ValidationErrors),
    #[error("Recipe log not found")]
    RecipeLogNotFound,
    #[error("No recipe or image updates provided")]
    NoUpdates,
    #[error("Invalid updates: {0}")]
    InvalidUpdates(String),
    #[error("Recipe log is {status} and cannot be {action}")]
    InvalidStatus {
        status: RecipeLogStatus,
        action: &'static str,
    },
    #[error("Failed to generate recipe: {0}")]
    GenerationFailed(String),
    #[error("Unexpected error")]
    UnexpectedError,
}

impl From<repository::Error> for Error {
    fn from(_: repository::Error) -> Self {
        Self::UnexpectedError
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::InvalidPrompt(errors) => {
                return validation::into_response(errors.clone()).into_response()
            }
            Self::RecipeLogNotFound => StatusCode::NOT_FOUND,
            Self::NoUpdates | Self::InvalidUpdates(_) => StatusCode::BAD_REQUEST,
            Self::InvalidStatus { .. } => StatusCode::CONFLICT,
            Self::GenerationFailed(_) => StatusCode::BAD_GATEWAY,
            Self::UnexpectedError => StatusCode::INTERNAL_SERVER_ERROR,
        };

        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[async_trait]
pub trait ManualRecipeService: Send + Sync {
    async fn create_recipe_log(
        &self,
        user_id: String,
        prompt: String,
        request_id: &str,
    ) -> Result<CreatedRecipeLog>;

    async fn generate_initial_recipe(
        &self,
        log_id: String,
        request_id: &str,
    ) -> Result<ManualRecipeResponse>;

    async fn update_recipe(
        &self,
        log_id: String,
        updates: Map<String, Value>,
        request_id: &str,
    ) -> Result<ManualRecipeResponse>;

    async fn confirm_recipe(&self, log_id: String, request_id: &str)
        -> Result<ManualRecipeResponse>;

    async fn get_recipe_log(&self, log_id: String, request_id: &str)
        -> Result<ManualRecipeResponse>;
}

#[derive(Validate)]
struct PromptInput {
    #[validate(length(min = 1, max = 1000))]
    prompt: String,
}

pub fn validate_prompt(prompt: &str) -> Result<String> {
    let input = PromptInput {
        prompt: prompt.trim().to_string(),
    };
    input.validate().map_err(Error::InvalidPrompt)?;
    Ok(input.prompt)
}

/// Reads `recipe_updates`/`image_updates` from the update mapping. Blank
/// values count as absent; at least one must remain.
pub fn parse_updates(updates: Map<String, Value>) -> Result<RecipeUpdates> {
    let updates = serde_json::from_value::<RecipeUpdates>(Value::Object(updates))
        .map_err(|err| Error::InvalidUpdates(err.to_string()))?;

    let non_blank = |value: Option<String>| value.filter(|v| !v.trim().is_empty());
    let updates = RecipeUpdates {
        recipe_updates: non_blank(updates.recipe_updates),
        image_updates: non_blank(updates.image_updates),
    };

    if updates.recipe_updates.is_none() && updates.image_updates.is_none() {
        return Err(Error::NoUpdates);
    }

    Ok(updates)
}

pub fn ensure_status(
    status: RecipeLogStatus,
    allowed: &[RecipeLogStatus],
    action: &'static str,
) -> Result<()> {
    if allowed.contains(&status) {
        Ok(())
    } else {
        Err(Error::InvalidStatus { status, action })
    }
}

pub struct RecipeLogService {
    db_conn: DatabaseConnection,
    storage: StorageContext,
    openai: OpenAiContext,
}

impl RecipeLogService {
    pub fn new(db_conn: DatabaseConnection, storage: StorageContext, openai: OpenAiContext) -> Self {
        Self {
            db_conn,
            storage,
            openai,
        }
    }

    async fn find_log(&self, log_id: &str) -> Result<RecipeLog> {
        repository::find_by_id(&self.db_conn.pool, log_id)
            .await?
            .ok_or(Error::RecipeLogNotFound)
    }

    async fn generate(
        &self,
        prompt: &str,
    ) -> std::result::Result<(ManualRecipeData, MealImage), generator::Error> {
        let recipe = generator::generate_recipe(&self.openai, prompt).await?;
        let meal_image = generator::generate_meal_image(
            &self.openai,
            &self.storage,
            generator::meal_image_prompt(&recipe, None),
        )
        .await?;

        Ok((recipe, meal_image))
    }

    /// Stores the failure message on the log and turns it into the error returned to the caller.
    async fn record_failure(
        &self,
        log_id: &str,
        request_id: &str,
        status: Option<RecipeLogStatus>,
        err: &generator::Error,
    ) -> Error {
        tracing::error!(
            "[{}] Generation failed for recipe log {}: {}",
            request_id,
            log_id,
            err
        );

        let recorded = repository::update_by_id(
            &self.db_conn.pool,
            log_id,
            repository::UpdateRecipeLogPayload {
                status,
                recipe: None,
                meal_image: None,
                error: Some(err.to_string()),
                request_id: request_id.to_string(),
                confirm: false,
            },
        )
        .await;

        if recorded.is_err() {
            tracing::error!(
                "[{}] Could not record failure on recipe log {}",
                request_id,
                log_id
            );
        }

        Error::GenerationFailed(err.to_string())
    }
}

#[async_trait]
impl ManualRecipeService for RecipeLogService {
    async fn create_recipe_log(
        &self,
        user_id: String,
        prompt: String,
        request_id: &str,
    ) -> Result<CreatedRecipeLog> {
        let prompt = validate_prompt(&prompt)?;

        let log = repository::create(
            &self.db_conn.pool,
            repository::CreateRecipeLogPayload {
                user_id,
                prompt,
                request_id: request_id.to_string(),
            },
        )
        .await?;

        tracing::info!(
            "[{}] Created recipe log {} for user {}",
            request_id,
            log.id,
            log.user_id
        );

        Ok(CreatedRecipeLog {
            status: log.status()?,
            log_id: log.id,
        })
    }

    async fn generate_initial_recipe(
        &self,
        log_id: String,
        request_id: &str,
    ) -> Result<ManualRecipeResponse> {
        let log = self.find_log(&log_id).await?;
        ensure_status(log.status()?, &[RecipeLogStatus::Pending], "generated")?;

        let (recipe, meal_image) = match self.generate(&log.prompt).await {
            Ok(generated) => generated,
            Err(err) => {
                return Err(self
                    .record_failure(&log_id, request_id, Some(RecipeLogStatus::Failed), &err)
                    .await)
            }
        };

        Ok(repository::update_by_id(
            &self.db_conn.pool,
            &log_id,
            repository::UpdateRecipeLogPayload {
                status: Some(RecipeLogStatus::InitialGenerated),
                recipe: Some(recipe),
                meal_image: Some(meal_image),
                error: None,
                request_id: request_id.to_string(),
                confirm: false,
            },
        )
        .await?
        .into_recipe_response()?)
    }

    async fn update_recipe(
        &self,
        log_id: String,
        updates: Map<String, Value>,
        request_id: &str,
    ) -> Result<ManualRecipeResponse> {
        let updates = parse_updates(updates)?;
        let log = self.find_log(&log_id).await?;
        ensure_status(
            log.status()?,
            &[RecipeLogStatus::InitialGenerated, RecipeLogStatus::Updated],
            "updated",
        )?;

        let current_recipe = log.recipe().cloned().ok_or(Error::UnexpectedError)?;

        let recipe = match &updates.recipe_updates {
            Some(feedback) => {
                match generator::revise_recipe(&self.openai, &current_recipe, feedback).await {
                    Ok(recipe) => recipe,
                    Err(err) => {
                        return Err(self.record_failure(&log_id, request_id, None, &err).await)
                    }
                }
            }
            None => current_recipe,
        };

        let meal_image = match &updates.image_updates {
            Some(feedback) => {
                let prompt = generator::meal_image_prompt(&recipe, Some(feedback));
                match generator::generate_meal_image(&self.openai, &self.storage, prompt).await {
                    Ok(image) => Some(image),
                    Err(err) => {
                        return Err(self.record_failure(&log_id, request_id, None, &err).await)
                    }
                }
            }
            None => None,
        };

        let updated = repository::update_by_id(
            &self.db_conn.pool,
            &log_id,
            repository::UpdateRecipeLogPayload {
                status: Some(RecipeLogStatus::Updated),
                recipe: Some(recipe),
                meal_image: meal_image.clone(),
                error: None,
                request_id: request_id.to_string(),
                confirm: false,
            },
        )
        .await?;

        if let (Some(_), Some(previous)) = (meal_image, log.meal_image()) {
            if storage::delete_file(&self.storage, &previous.media()).await.is_err() {
                tracing::warn!(
                    "[{}] Failed to delete replaced image {} for recipe log {}",
                    request_id,
                    previous.public_id,
                    log_id
                );
            }
        }

        tracing::info!(
            "[{}] Updated recipe log {} for user {}",
            request_id,
            log_id,
            log.user_id
        );

        Ok(updated.into_recipe_response()?)
    }

    async fn confirm_recipe(
        &self,
        log_id: String,
        request_id: &str,
    ) -> Result<ManualRecipeResponse> {
        let log = self.find_log(&log_id).await?;
        let status = log.status()?;

        if status == RecipeLogStatus::Completed {
            return Ok(log.into_recipe_response()?);
        }

        ensure_status(
            status,
            &[RecipeLogStatus::InitialGenerated, RecipeLogStatus::Updated],
            "confirmed",
        )?;

        if log.recipe().is_none() || log.meal_image().is_none() {
            return Err(Error::InvalidStatus {
                status,
                action: "confirmed",
            });
        }

        let confirmed = repository::update_by_id(
            &self.db_conn.pool,
            &log_id,
            repository::UpdateRecipeLogPayload {
                status: Some(RecipeLogStatus::Completed),
                recipe: None,
                meal_image: None,
                error: None,
                request_id: request_id.to_string(),
                confirm: true,
            },
        )
        .await?;

        tracing::info!(
            "[{}] Confirmed recipe log {} for user {}",
            request_id,
            log_id,
            log.user_id
        );

        Ok(confirmed.into_recipe_response()?)
    }

    async fn get_recipe_log(
        &self,
        log_id: String,
        request_id: &str,
    ) -> Result<ManualRecipeResponse> {
        tracing::debug!("[{}] Fetching recipe log {}", request_id, log_id);
        Ok(self.find_log(&log_id).await?.into_recipe_response()?)
    }
}


#[cfg(test)]
mod lifecycle_tests {
    use super::*;
    use sqlx::PgPool;
    use wiremock::{
        matchers::{body_partial_json, method, path},
        Mock, MockServer, ResponseTemplate,
    };

    fn recipe_service(pool: PgPool, server: &MockServer) -> RecipeLogService {
        let client = reqwest::Client::new();

        RecipeLogService::new(
            DatabaseConnection { pool },
            StorageContext {
                api_key: String::from("key"),
                api_secret: String::from("secret"),
                upload_endpoint: format!("{}/image/upload", server.uri()),
                delete_endpoint: format!("{}/image/destroy", server.uri()),
                upload_preset: String::from("meals"),
                client: client.clone(),
            },
            OpenAiContext {
                api_key: String::from("sk-test"),
                api_endpoint: format!("{}/v1", server.uri()),
                recipe_model: String::from("gpt-4o-mini"),
                image_model: String::from("dall-e-3"),
                client,
            },
        )
    }

    /// Answers the next chat completion with a recipe titled `title`.
    async fn mount_recipe(server: &MockServer, title: &str) {
        let recipe = json!({
            "title": title,
            "description": "Spaghetti tossed with lemon and parmesan.",
            "servings": "2",
            "prepTime": "5 minutes",
            "cookTime": "12 minutes",
            "ingredients": [
                { "name": "spaghetti", "amount": 200, "amountDescription": "200 g" }
            ],
            "instructions": [{ "step": 1, "text": "Cook the spaghetti." }],
            "tips": []
        });

        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{
                    "message": { "role": "assistant", "content": recipe.to_string() }
                }]
            })))
            .up_to_n_times(1)
            .mount(server)
            .await;
    }

    async fn mount_images(server: &MockServer, expected_calls: u64) {
        Mock::given(method("POST"))
            .and(path("/v1/images/generations"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [{ "b64_json": "AQID" }]
            })))
            .expect(expected_calls)
            .mount(server)
            .await;
    }

    /// Answers the next upload with `public_id`.
    async fn mount_upload(server: &MockServer, public_id: &str) {
        Mock::given(method("POST"))
            .and(path("/image/upload"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "secure_url": format!("https://res.cloudinary.com/demo/{}.png", public_id),
                "public_id": public_id
            })))
            .up_to_n_times(1)
            .mount(server)
            .await;
    }

    async fn generated_log(service: &RecipeLogService) -> ManualRecipeResponse {
        let created = service
            .create_recipe_log(
                String::from("user-1"),
                String::from("pasta"),
                "generate-recipe-1",
            )
            .await
            .unwrap();
        assert_eq!(created.status, RecipeLogStatus::Pending);

        service
            .generate_initial_recipe(created.log_id, "generate-recipe-1")
            .await
            .unwrap()
    }

    async fn last_request_id(pool: &PgPool, log_id: &str) -> String {
        sqlx::query_scalar::<_, String>("SELECT last_request_id FROM recipe_logs WHERE id = $1")
            .bind(log_id)
            .fetch_one(pool)
            .await
            .unwrap()
    }

    #[sqlx::test]
    async fn generation_stores_the_recipe_and_hosted_image(pool: PgPool) {
        let server = MockServer::start().await;
        mount_recipe(&server, "Lemon Pasta").await;
        mount_images(&server, 1).await;
        mount_upload(&server, "meal-1").await;

        let service = recipe_service(pool.clone(), &server);
        let log = generated_log(&service).await;

        assert_eq!(log.status, RecipeLogStatus::InitialGenerated);
        assert_eq!(log.prompt, "pasta");
        assert_eq!(log.recipe.as_ref().unwrap().title, "Lemon Pasta");
        let image = log.meal_image.as_ref().unwrap();
        assert_eq!(image.public_id, "meal-1");
        assert_eq!(image.url, "https://res.cloudinary.com/demo/meal-1.png");
        assert_eq!(log.error, None);
        assert_eq!(last_request_id(&pool, &log.log_id).await, "generate-recipe-1");

        let fetched = service
            .get_recipe_log(log.log_id.clone(), "get-recipe-1")
            .await
            .unwrap();
        assert_eq!(fetched, log);
    }

    #[sqlx::test]
    async fn confirming_a_completed_log_returns_it_unchanged(pool: PgPool) {
        let server = MockServer::start().await;
        mount_recipe(&server, "Lemon Pasta").await;
        mount_images(&server, 1).await;
        mount_upload(&server, "meal-1").await;

        let service = recipe_service(pool.clone(), &server);
        let log = generated_log(&service).await;

        let confirmed = service
            .confirm_recipe(log.log_id.clone(), "confirm-recipe-2")
            .await
            .unwrap();
        assert_eq!(confirmed.status, RecipeLogStatus::Completed);
        assert_eq!(confirmed.recipe, log.recipe);
        assert_eq!(confirmed.meal_image, log.meal_image);

        let again = service
            .confirm_recipe(log.log_id.clone(), "confirm-recipe-3")
            .await
            .unwrap();
        assert_eq!(again, confirmed);
        assert_eq!(last_request_id(&pool, &log.log_id).await, "confirm-recipe-2");

        let confirmed_at_set = sqlx::query_scalar::<_, bool>(
            "SELECT confirmed_at IS NOT NULL FROM recipe_logs WHERE id = $1",
        )
        .bind(&log.log_id)
        .fetch_one(&pool)
        .await
        .unwrap();
        assert!(confirmed_at_set);
    }

    #[sqlx::test]
    async fn confirming_a_pending_log_conflicts(pool: PgPool) {
        let server = MockServer::start().await;
        let service = recipe_service(pool, &server);

        let created = service
            .create_recipe_log(
                String::from("user-1"),
                String::from("pasta"),
                "generate-recipe-1",
            )
            .await
            .unwrap();

        let err = service
            .confirm_recipe(created.log_id, "confirm-recipe-1")
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            Error::InvalidStatus {
                status: RecipeLogStatus::Pending,
                ..
            }
        ));
        assert_eq!(err.into_response().status(), StatusCode::CONFLICT);
    }

    #[sqlx::test]
    async fn failed_generation_marks_the_log_failed(pool: PgPool) {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(500).set_body_json(json!({
                "error": { "message": "model overloaded" }
            })))
            .mount(&server)
            .await;
        mount_images(&server, 0).await;

        let service = recipe_service(pool, &server);
        let created = service
            .create_recipe_log(
                String::from("user-1"),
                String::from("pasta"),
                "generate-recipe-1",
            )
            .await
            .unwrap();

        let err = service
            .generate_initial_recipe(created.log_id.clone(), "generate-recipe-1")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::GenerationFailed(_)));
        assert_eq!(err.into_response().status(), StatusCode::BAD_GATEWAY);

        let log = service
            .get_recipe_log(created.log_id.clone(), "get-recipe-1")
            .await
            .unwrap();
        assert_eq!(log.status, RecipeLogStatus::Failed);
        assert!(log.error.unwrap().contains("model overloaded"));
        assert_eq!(log.recipe, None);

        let retry = service
            .generate_initial_recipe(created.log_id, "generate-recipe-2")
            .await
            .unwrap_err();
        assert!(matches!(
            retry,
            Error::InvalidStatus {
                status: RecipeLogStatus::Failed,
                ..
            }
        ));
    }

    #[sqlx::test]
    async fn recipe_update_keeps_the_stored_image(pool: PgPool) {
        let server = MockServer::start().await;
        mount_recipe(&server, "Lemon Pasta").await;
        mount_recipe(&server, "Vegan Lemon Pasta").await;
        mount_images(&server, 1).await;
        mount_upload(&server, "meal-1").await;
        Mock::given(method("POST"))
            .and(path("/image/destroy"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "result": "ok" })))
            .expect(0)
            .mount(&server)
            .await;

        let service = recipe_service(pool, &server);
        let log = generated_log(&service).await;

        let updated = service
            .update_recipe(
                log.log_id.clone(),
                mapping(json!({ "recipe_updates": "make it vegan" })),
                "update-recipe-2",
            )
            .await
            .unwrap();

        assert_eq!(updated.status, RecipeLogStatus::Updated);
        assert_eq!(updated.recipe.unwrap().title, "Vegan Lemon Pasta");
        assert_eq!(updated.meal_image, log.meal_image);
    }

    #[sqlx::test]
    async fn image_update_replaces_and_deletes_the_previous_asset(pool: PgPool) {
        let server = MockServer::start().await;
        mount_recipe(&server, "Lemon Pasta").await;
        mount_images(&server, 2).await;
        mount_upload(&server, "meal-1").await;
        mount_upload(&server, "meal-2").await;
        Mock::given(method("POST"))
            .and(path("/image/destroy"))
            .and(body_partial_json(json!({ "public_id": "meal-1" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "result": "ok" })))
            .expect(1)
            .mount(&server)
            .await;

        let service = recipe_service(pool, &server);
        let log = generated_log(&service).await;

        let updated = service
            .update_recipe(
                log.log_id.clone(),
                mapping(json!({ "image_updates": "brighter lighting" })),
                "update-recipe-2",
            )
            .await
            .unwrap();

        assert_eq!(updated.status, RecipeLogStatus::Updated);
        assert_eq!(updated.recipe, log.recipe);
        let image = updated.meal_image.unwrap();
        assert_eq!(image.public_id, "meal-2");
        assert!(image.prompt.ends_with("Adjustments: brighter lighting"));
    }

    #[sqlx::test]
    async fn completed_logs_cannot_be_updated(pool: PgPool) {
        let server = MockServer::start().await;
        mount_recipe(&server, "Lemon Pasta").await;
        mount_images(&server, 1).await;
        mount_upload(&server, "meal-1").await;

        let service = recipe_service(pool, &server);
        let log = generated_log(&service).await;
        service
            .confirm_recipe(log.log_id.clone(), "confirm-recipe-2")
            .await
            .unwrap();

        let err = service
            .update_recipe(
                log.log_id,
                mapping(json!({ "recipe_updates": "less salt" })),
                "update-recipe-3",
            )
            .await
            .unwrap_err();

        assert_eq!(
            err.to_string(),
            "Recipe log is completed and cannot be updated"
        );
    }

    #[sqlx::test]
    async fn unknown_logs_are_not_found(pool: PgPool) {
        let server = MockServer::start().await;
        let service = recipe_service(pool, &server);

        let err = service
            .get_recipe_log(String::from("missing"), "get-recipe-1")
            .await
            .unwrap_err();

        assert!(matches!(err, Error::RecipeLogNotFound));
    }

    fn mapping(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected an object"),
        }
    }
}
