use super::super::repository;
use crate::utils::database::DatabaseConnection;
use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};

#[derive(Debug, PartialEq)]
pub enum Error {
    UnexpectedError,
    InvalidSession,
    ExpiredToken,
}

/// Identity resolved from a bearer token.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct TokenData {
    pub uid: String,
}

#[async_trait]
pub trait TokenVerifier: Send + Sync {
    async fn verify_token(&self, token: &str) -> Result<TokenData, Error>;
}

pub struct SessionTokenVerifier {
    db_conn: DatabaseConnection,
}

impl SessionTokenVerifier {
    pub fn new(db_conn: DatabaseConnection) -> Self {
        Self { db_conn }
    }
}

#[async_trait]
impl TokenVerifier for SessionTokenVerifier {
    async fn verify_token(&self, token: &str) -> Result<TokenData, Error> {
        let session = repository::session::find_by_access_token(&self.db_conn.pool, token)
            .await
            .map_err(|_| Error::UnexpectedError)?
            .ok_or(Error::InvalidSession)?;

        if session.access_token_expires_at < Utc::now().naive_utc() {
            return Err(Error::ExpiredToken);
        };

        Ok(TokenData {
            uid: session.user_id,
        })
    }
}
