//! Prompt construction and parsing around the chat and image models.

use super::model::{ManualRecipeData, MealImage};
use crate::{
    types::{OpenAiContext, StorageContext},
    utils::{openai, storage},
};
use validator::Validate;

const RECIPE_SYSTEM_PROMPT: &str = "You are a recipe developer for a home cooking app. \
Respond with a single JSON object and nothing else, using exactly these keys: \
\"title\" (string), \"description\" (one or two sentences), \"servings\" (string), \
\"prepTime\" (string, e.g. \"15 minutes\"), \"cookTime\" (string), \
\"ingredients\" (array of objects with \"name\" (string), \"amount\" (number) and \
\"amountDescription\" (string, e.g. \"2 cups\")), \
\"instructions\" (array of objects with \"step\" (integer starting at 1) and \"text\" (string)), \
\"tips\" (array of strings).";

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Api(#[from] openai::Error),
    #[error("model returned an unusable recipe: {0}")]
    InvalidRecipe(String),
    #[error("failed to store the generated image")]
    Storage,
}

pub fn initial_recipe_prompt(prompt: &str) -> String {
    format!("Create a recipe for: {}", prompt.trim())
}

pub fn revised_recipe_prompt(recipe: &ManualRecipeData, feedback: &str) -> Result<String, Error> {
    let current = serde_json::to_string(recipe)
        .map_err(|err| Error::InvalidRecipe(err.to_string()))?;

    Ok(format!(
        "Here is the current recipe as JSON:\n{}\n\nRevise it according to this feedback and \
         return the complete updated recipe: {}",
        current,
        feedback.trim()
    ))
}

pub fn meal_image_prompt(recipe: &ManualRecipeData, feedback: Option<&str>) -> String {
    let mut prompt = format!(
        "Appetizing overhead food photograph of {}: {}. Natural light, plated on a simple \
         table, no text.",
        recipe.title, recipe.description
    );

    if let Some(feedback) = feedback {
        prompt.push_str(&format!(" Adjustments: {}", feedback.trim()));
    }

    prompt
}

/// Strips a surrounding Markdown code fence, with or without a language tag.
fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();

    match trimmed.strip_prefix("```") {
        Some(rest) => {
            let body = rest.split_once('\n').map(|(_, body)| body).unwrap_or(rest);
            body.trim_end().trim_end_matches("```").trim()
        }
        None => trimmed,
    }
}

pub fn parse_recipe(raw: &str) -> Result<ManualRecipeData, Error> {
    let recipe = serde_json::from_str::<ManualRecipeData>(strip_code_fence(raw))
        .map_err(|err| Error::InvalidRecipe(err.to_string()))?;

    recipe
        .validate()
        .map_err(|err| Error::InvalidRecipe(err.to_string()))?;

    Ok(recipe)
}

pub async fn generate_recipe(cfg: &OpenAiContext, prompt: &str) -> Result<ManualRecipeData, Error> {
    let raw = openai::chat_json(cfg, RECIPE_SYSTEM_PROMPT, &initial_recipe_prompt(prompt)).await?;
    parse_recipe(&raw)
}

pub async fn revise_recipe(
    cfg: &OpenAiContext,
    recipe: &ManualRecipeData,
    feedback: &str,
) -> Result<ManualRecipeData, Error> {
    let raw = openai::chat_json(
        cfg,
        RECIPE_SYSTEM_PROMPT,
        &revised_recipe_prompt(recipe, feedback)?,
    )
    .await?;
    parse_recipe(&raw)
}

pub async fn generate_meal_image(
    cfg: &OpenAiContext,
    storage_cfg: &StorageContext,
    prompt: String,
) -> Result<MealImage, Error> {
    let bytes = openai::generate_image(cfg, &prompt).await?;

    let media = storage::upload_file(storage_cfg, bytes)
        .await
        .map_err(|_| Error::Storage)?;

    Ok(MealImage::new(prompt, media))
}
