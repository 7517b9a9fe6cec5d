use super::model::{ManualRecipeData, ManualRecipeResponse, MealImage, RecipeLogStatus};
use sqlx::{types::Json, PgExecutor};
use ulid::Ulid;

#[derive(sqlx::FromRow, Clone, Debug)]
pub struct RecipeLog {
    pub id: String,
    pub user_id: String,
    pub prompt: String,
    pub status: String,
    pub recipe: Option<Json<ManualRecipeData>>,
    pub meal_image: Option<Json<MealImage>>,
    pub error: Option<String>,
}

impl RecipeLog {
    pub fn status(&self) -> Result<RecipeLogStatus, Error> {
        self.status.parse().map_err(|err| {
            tracing::error!("Recipe log {} has a corrupt status: {}", self.id, err);
            Error::UnexpectedError
        })
    }

    pub fn recipe(&self) -> Option<&ManualRecipeData> {
        self.recipe.as_ref().map(|recipe| &recipe.0)
    }

    pub fn meal_image(&self) -> Option<&MealImage> {
        self.meal_image.as_ref().map(|image| &image.0)
    }

    pub fn into_recipe_response(self) -> Result<ManualRecipeResponse, Error> {
        Ok(ManualRecipeResponse {
            status: self.status()?,
            log_id: self.id,
            prompt: self.prompt,
            recipe: self.recipe.map(|recipe| recipe.0),
            meal_image: self.meal_image.map(|image| image.0),
            error: self.error,
        })
    }
}

#[derive(Debug)]
pub enum Error {
    UnexpectedError,
}

pub struct CreateRecipeLogPayload {
    pub user_id: String,
    pub prompt: String,
    pub request_id: String,
}

pub async fn create<'e, E: PgExecutor<'e>>(
    e: E,
    payload: CreateRecipeLogPayload,
) -> Result<RecipeLog, Error> {
    sqlx::query_as::<_, RecipeLog>(
        "
        INSERT INTO recipe_logs (
            id,
            user_id,
            prompt,
            status,
            last_request_id
        )
        VALUES ($1, $2, $3, $4, $5)
        RETURNING *
        ",
    )
    .bind(Ulid::new().to_string())
    .bind(payload.user_id)
    .bind(payload.prompt)
    .bind(RecipeLogStatus::Pending.as_str())
    .bind(payload.request_id)
    .fetch_one(e)
    .await
    .map_err(|err| {
        tracing::error!("Error occurred while trying to create a recipe log: {}", err);
        Error::UnexpectedError
    })
}

pub async fn find_by_id<'e, E: PgExecutor<'e>>(
    e: E,
    id: &str,
) -> Result<Option<RecipeLog>, Error> {
    sqlx::query_as::<_, RecipeLog>("SELECT * FROM recipe_logs WHERE id = $1")
        .bind(id)
        .fetch_optional(e)
        .await
        .map_err(|err| {
            tracing::error!(
                "Error occurred while trying to fetch a recipe log by id: {}",
                err
            );
            Error::UnexpectedError
        })
}

/// `None` fields keep their stored value, except `error` which is always
/// overwritten so a successful step clears the previous failure.
pub struct UpdateRecipeLogPayload {
    pub status: Option<RecipeLogStatus>,
    pub recipe: Option<ManualRecipeData>,
    pub meal_image: Option<MealImage>,
    pub error: Option<String>,
    pub request_id: String,
    pub confirm: bool,
}

pub async fn update_by_id<'e, E: PgExecutor<'e>>(
    e: E,
    id: &str,
    payload: UpdateRecipeLogPayload,
) -> Result<RecipeLog, Error> {
    sqlx::query_as::<_, RecipeLog>(
        "
        UPDATE recipe_logs SET
            status = COALESCE($2, status),
            recipe = COALESCE($3, recipe),
            meal_image = COALESCE($4, meal_image),
            error = $5,
            last_request_id = $6,
            confirmed_at = CASE WHEN $7 THEN NOW() ELSE confirmed_at END,
            updated_at = NOW()
        WHERE id = $1
        RETURNING *
        ",
    )
    .bind(id)
    .bind(payload.status.map(|status| status.as_str()))
    .bind(payload.recipe.map(Json))
    .bind(payload.meal_image.map(Json))
    .bind(payload.error)
    .bind(payload.request_id)
    .bind(payload.confirm)
    .fetch_one(e)
    .await
    .map_err(|err| {
        tracing::error!(
            "Error occurred while trying to update recipe log {}: {}",
            id,
            err
        );
        Error::UnexpectedError
    })
}
