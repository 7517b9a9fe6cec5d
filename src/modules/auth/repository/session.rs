use chrono::NaiveDateTime;
use sqlx::PgExecutor;

#[derive(sqlx::FromRow, Clone, Debug)]
pub struct Session {
    pub user_id: String,
    pub access_token_expires_at: NaiveDateTime,
}

#[derive(Debug)]
pub enum Error {
    UnexpectedError,
}

pub async fn find_by_access_token<'e, E: PgExecutor<'e>>(
    e: E,
    access_token: &str,
) -> Result<Option<Session>, Error> {
    sqlx::query_as::<_, Session>("SELECT * FROM sessions WHERE access_token = $1")
        .bind(access_token)
        .fetch_optional(e)
        .await
        .map_err(|err| {
            tracing::error!(
                "Error occurred while trying to fetch a session by access token: {}",
                err
            );
            Error::UnexpectedError
        })
}
