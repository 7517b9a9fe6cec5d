pub use crate::utils::database;
use crate::modules::{
    auth::service::{SessionTokenVerifier, TokenVerifier},
    manual_recipe::service::{ManualRecipeService, RecipeLogService},
};
use async_trait::async_trait;
use std::env;
use std::sync::Arc;

#[derive(Clone, Debug, PartialEq)]
pub enum AppEnvironment {
    Production,
    Development,
}

impl AppEnvironment {
    pub fn from(raw_environment: String) -> Self {
        match raw_environment.as_ref() {
            "production" => Self::Production,
            _ => Self::Development,
        }
    }
}

#[derive(Clone)]
pub struct AppContext {
    pub host: String,
    pub environment: AppEnvironment,
    pub port: u16,
    pub url: String,
}

#[derive(Clone)]
pub struct StorageContext {
    pub api_key: String,
    pub api_secret: String,
    pub upload_endpoint: String,
    pub delete_endpoint: String,
    pub upload_preset: String,
    pub client: reqwest::Client,
}

#[derive(Clone)]
pub struct OpenAiContext {
    pub api_key: String,
    pub api_endpoint: String,
    pub recipe_model: String,
    pub image_model: String,
    pub client: reqwest::Client,
}

#[derive(Clone)]
pub struct Context {
    pub app: AppContext,
    pub auth: Arc<dyn TokenVerifier>,
    pub manual_recipe: Arc<dyn ManualRecipeService>,
}

#[derive(Clone, Debug)]
pub struct DatabaseConfig {
    pub url: String,
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub host: String,
    pub environment: AppEnvironment,
    pub port: u16,
    pub url: String,
}

#[derive(Clone, Debug)]
pub struct StorageConfig {
    pub api_key: String,
    pub api_secret: String,
    pub upload_endpoint: String,
    pub delete_endpoint: String,
    pub upload_preset: String,
}

#[derive(Clone, Debug)]
pub struct OpenAiConfig {
    pub api_key: String,
    pub api_endpoint: String,
    pub recipe_model: String,
    pub image_model: String,
}

#[derive(Clone, Debug)]
pub struct Config {
    pub database: DatabaseConfig,
    pub app: AppConfig,
    pub storage: StorageConfig,
    pub openai: OpenAiConfig,
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ConfigError {
    #[error("{0} not set")]
    MissingVariable(&'static str),
    #[error("Invalid {0} value: {1}")]
    InvalidVariable(&'static str, String),
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &'static str| lookup(key).ok_or(ConfigError::MissingVariable(key));
        let optional = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let host = optional("HOST", "0.0.0.0");
        let raw_port = optional("PORT", "8001");
        let port = raw_port
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidVariable("PORT", raw_port.clone()))?;
        let url = lookup("URL").unwrap_or_else(|| format!("http://{}:{}", host, port));

        Ok(Self {
            database: DatabaseConfig {
                url: required("DATABASE_URL")?,
            },
            app: AppConfig {
                environment: AppEnvironment::from(optional("APP_ENV", "development")),
                host,
                port,
                url,
            },
            storage: StorageConfig {
                api_key: required("CLOUDINARY_API_KEY")?,
                api_secret: required("CLOUDINARY_API_SECRET")?,
                upload_endpoint: required("CLOUDINARY_UPLOAD_ENDPOINT")?,
                delete_endpoint: required("CLOUDINARY_DELETE_ENDPOINT")?,
                upload_preset: required("CLOUDINARY_UPLOAD_PRESET")?,
            },
            openai: OpenAiConfig {
                api_key: required("OPENAI_API_KEY")?,
                api_endpoint: optional("OPENAI_API_ENDPOINT", "https://api.openai.com/v1"),
                recipe_model: optional("OPENAI_RECIPE_MODEL", "gpt-4o-mini"),
                image_model: optional("OPENAI_IMAGE_MODEL", "dall-e-3"),
            },
        })
    }
}

#[async_trait]
pub trait ToContext {
    async fn to_context(self) -> Context;
}

#[async_trait]
impl ToContext for Config {
    async fn to_context(self) -> Context {
        let db_conn = database::connect(self.database.url.as_str()).await;
        database::migrate(&db_conn).await;

        let client = reqwest::Client::new();

        let storage = StorageContext {
            api_key: self.storage.api_key,
            api_secret: self.storage.api_secret,
            upload_endpoint: self.storage.upload_endpoint,
            delete_endpoint: self.storage.delete_endpoint,
            upload_preset: self.storage.upload_preset,
            client: client.clone(),
        };

        let openai = OpenAiContext {
            api_key: self.openai.api_key,
            api_endpoint: self.openai.api_endpoint,
            recipe_model: self.openai.recipe_model,
            image_model: self.openai.image_model,
            client,
        };

        Context {
            app: AppContext {
                host: self.app.host,
                environment: self.app.environment,
                port: self.app.port,
                url: self.app.url,
            },
            auth: Arc::new(SessionTokenVerifier::new(db_conn.clone())),
            manual_recipe: Arc::new(RecipeLogService::new(db_conn, storage, openai)),
        }
    }
}
