use crate::utils::storage::UploadedMedia;
use serde::{Deserialize, Deserializer, Serialize};
use std::{fmt, str::FromStr};
use validator::Validate;

/// Models are not consistent about quoting servings and times, so accept both.
fn string_or_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Number(serde_json::Number),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Text(text) => text,
        Raw::Number(number) => number.to_string(),
    })
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ManualRecipeIngredient {
    pub name: String,
    pub amount: f64,
    pub amount_description: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ManualRecipeInstruction {
    pub step: u32,
    pub text: String,
}

#[derive(Serialize, Deserialize, Validate, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ManualRecipeData {
    #[validate(length(min = 1))]
    pub title: String,
    pub description: String,
    #[serde(deserialize_with = "string_or_number")]
    pub servings: String,
    #[serde(deserialize_with = "string_or_number")]
    pub prep_time: String,
    #[serde(deserialize_with = "string_or_number")]
    pub cook_time: String,
    #[validate(length(min = 1))]
    pub ingredients: Vec<ManualRecipeIngredient>,
    #[validate(length(min = 1))]
    pub instructions: Vec<ManualRecipeInstruction>,
    #[serde(default)]
    pub tips: Vec<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MealImage {
    pub url: String,
    pub prompt: String,
    pub public_id: String,
    pub timestamp: i64,
}

impl MealImage {
    pub fn new(prompt: String, media: UploadedMedia) -> Self {
        Self {
            url: media.url,
            prompt,
            public_id: media.public_id,
            timestamp: media.timestamp,
        }
    }

    pub fn media(&self) -> UploadedMedia {
        UploadedMedia {
            public_id: self.public_id.clone(),
            url: self.url.clone(),
            timestamp: self.timestamp,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RecipeLogStatus {
    Pending,
    InitialGenerated,
    Updated,
    Completed,
    Failed,
}

impl RecipeLogStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InitialGenerated => "initial_generated",
            Self::Updated => "updated",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for RecipeLogStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RecipeLogStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "initial_generated" => Ok(Self::InitialGenerated),
            "updated" => Ok(Self::Updated),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            other => Err(format!("Unknown recipe log status {}", other)),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CreatedRecipeLog {
    pub log_id: String,
    pub status: RecipeLogStatus,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ManualRecipeResponse {
    pub log_id: String,
    pub prompt: String,
    pub status: RecipeLogStatus,
    pub recipe: Option<ManualRecipeData>,
    pub meal_image: Option<MealImage>,
    pub error: Option<String>,
}

/// Fields read from the free-form update mapping; anything else is ignored.
#[derive(Deserialize, Default, Clone, Debug, PartialEq)]
pub struct RecipeUpdates {
    pub recipe_updates: Option<String>,
    pub image_updates: Option<String>,
}
