use base64::Engine;
use chrono::{TimeDelta, Utc};
use rand::RngCore;
use rand::rngs::OsRng;
use sqlx::SqlitePool;
use uuid::Uuid;

use super::credentials::{hash_secret, verify_secret};
use super::models::ApiToken;
use crate::error::{AppError, AppResult};

pub const TOKEN_PREFIX: &str = "stm_";

/// Create a bearer token for a user. Returns the raw token (shown once) and
/// the stored record. With `expires_in_days` the token stops validating after
/// that many days.
pub async fn create_token(
    pool: &SqlitePool,
    user_id: &str,
    name: &str,
    expires_in_days: Option<u32>,
) -> AppResult<(String, ApiToken)> {
    let id = Uuid::now_v7().to_string();
    let raw_token = generate_raw_token();
    let token_hash = hash_secret(&raw_token)?;
    let expires_at = expires_in_days
        .map(|days| Utc::now().naive_utc() + TimeDelta::days(i64::from(days)));

    sqlx::query(
        "INSERT INTO api_tokens (id, user_id, token_hash, name, expires_at) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(&id)
    .bind(user_id)
    .bind(&token_hash)
    .bind(name)
    .bind(expires_at)
    .execute(pool)
    .await?;

    let record = sqlx::query_as::<_, ApiToken>("SELECT * FROM api_tokens WHERE id = ?")
        .bind(&id)
        .fetch_one(pool)
        .await?;

    tracing::info!(token_id = %record.id, user_id, "api token created");
    Ok((raw_token, record))
}

/// Validate a raw token and return the owning user ID. Expired tokens and
/// strings without the token prefix never validate.
pub async fn validate_token(pool: &SqlitePool, raw_token: &str) -> AppResult<Option<String>> {
    if !raw_token.starts_with(TOKEN_PREFIX) {
        return Ok(None);
    }

    let tokens = sqlx::query_as::<_, ApiToken>("SELECT * FROM api_tokens")
        .fetch_all(pool)
        .await?;

    let now = Utc::now().naive_utc();
    for token in tokens.iter().filter(|t| !t.is_expired(now)) {
        if verify_secret(raw_token, &token.token_hash)? {
            return Ok(Some(token.user_id.clone()));
        }
    }

    Ok(None)
}

/// Delete a token by ID.
pub async fn delete_token(pool: &SqlitePool, token_id: &str) -> AppResult<()> {
    let result = sqlx::query("DELETE FROM api_tokens WHERE id = ?")
        .bind(token_id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Token not found".to_string()));
    }
    Ok(())
}

/// All tokens for a user, oldest first. Raw values are never stored.
pub async fn list_tokens_for_user(pool: &SqlitePool, user_id: &str) -> AppResult<Vec<ApiToken>> {
    let tokens = sqlx::query_as::<_, ApiToken>(
        "SELECT * FROM api_tokens WHERE user_id = ? ORDER BY created_at, id",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;
    Ok(tokens)
}

fn generate_raw_token() -> String {
    let mut bytes = [0u8; 32];
    OsRng.fill_bytes(&mut bytes);
    format!(
        "{TOKEN_PREFIX}{}",
        base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::db::users;

    async fn setup() -> (SqlitePool, String) {
        let pool = db::test_pool().await;
        let user = users::create_user(&pool, "alice", None, "pass").await.unwrap();
        (pool, user.id)
    }

    #[tokio::test]
    async fn test_create_and_validate_token() {
        let (pool, user_id) = setup().await;

        let (raw_token, record) = create_token(&pool, &user_id, "laptop", None).await.unwrap();

        assert!(raw_token.starts_with("stm_"));
        assert_eq!(record.name, "laptop");
        assert_eq!(record.user_id, user_id);
        assert!(record.expires_at.is_none());

        let validated = validate_token(&pool, &raw_token).await.unwrap();
        assert_eq!(validated, Some(user_id));
    }

    #[tokio::test]
    async fn test_invalid_token() {
        let (pool, user_id) = setup().await;
        create_token(&pool, &user_id, "test", None).await.unwrap();

        assert_eq!(validate_token(&pool, "stm_invalid").await.unwrap(), None);
        assert_eq!(validate_token(&pool, "no-prefix").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_token_with_future_expiry_validates() {
        let (pool, user_id) = setup().await;
        let (raw, record) = create_token(&pool, &user_id, "ci", Some(30)).await.unwrap();

        assert!(record.expires_at.is_some());
        assert_eq!(validate_token(&pool, &raw).await.unwrap(), Some(user_id));
    }

    #[tokio::test]
    async fn test_expired_token_rejected() {
        let (pool, user_id) = setup().await;
        let (raw, record) = create_token(&pool, &user_id, "old", Some(1)).await.unwrap();

        sqlx::query("UPDATE api_tokens SET expires_at = '2000-01-01 00:00:00' WHERE id = ?")
            .bind(&record.id)
            .execute(&pool)
            .await
            .unwrap();

        assert_eq!(validate_token(&pool, &raw).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_delete_token() {
        let (pool, user_id) = setup().await;

        let (raw_token, record) = create_token(&pool, &user_id, "test", None).await.unwrap();
        delete_token(&pool, &record.id).await.unwrap();

        assert_eq!(validate_token(&pool, &raw_token).await.unwrap(), None);
        assert!(matches!(
            delete_token(&pool, &record.id).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_list_tokens() {
        let (pool, user_id) = setup().await;

        create_token(&pool, &user_id, "token-1", None).await.unwrap();
        create_token(&pool, &user_id, "token-2", None).await.unwrap();

        let tokens = list_tokens_for_user(&pool, &user_id).await.unwrap();
        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[0].name, "token-1");
        assert_eq!(tokens[1].name, "token-2");
    }
}
