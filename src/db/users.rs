use sqlx::SqlitePool;
use uuid::Uuid;

use super::credentials::{hash_secret, verify_secret};
use super::models::User;
use crate::error::{AppError, AppResult};

/// Create a new user with a hashed password. Returns the created user.
pub async fn create_user(
    pool: &SqlitePool,
    username: &str,
    email: Option<&str>,
    password: &str,
) -> AppResult<User> {
    let id = Uuid::now_v7().to_string();
    let password_hash = hash_secret(password)?;

    sqlx::query("INSERT INTO users (id, username, email, password_hash) VALUES (?, ?, ?, ?)")
        .bind(&id)
        .bind(username)
        .bind(email)
        .bind(&password_hash)
        .execute(pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db_err) if db_err.message().contains("UNIQUE") => {
                AppError::Conflict(format!("User '{username}' already exists"))
            }
            _ => AppError::Database(e),
        })?;

    tracing::info!(user_id = %id, username, "user created");

    get_user_by_id(pool, &id)
        .await?
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("User created but not found")))
}

/// Look up a user by username.
pub async fn get_user_by_username(pool: &SqlitePool, username: &str) -> AppResult<Option<User>> {
    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE username = ?")
        .bind(username)
        .fetch_optional(pool)
        .await?;
    Ok(user)
}

/// Look up a user by ID.
pub async fn get_user_by_id(pool: &SqlitePool, id: &str) -> AppResult<Option<User>> {
    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(user)
}

async fn get_user_by_email(pool: &SqlitePool, email: &str) -> AppResult<Option<User>> {
    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = ?")
        .bind(email)
        .fetch_optional(pool)
        .await?;
    Ok(user)
}

/// All users, ordered by username.
pub async fn list_users(pool: &SqlitePool) -> AppResult<Vec<User>> {
    let users = sqlx::query_as::<_, User>("SELECT * FROM users ORDER BY username")
        .fetch_all(pool)
        .await?;
    Ok(users)
}

/// Replace a user's password hash.
pub async fn reset_password(pool: &SqlitePool, username: &str, new_password: &str) -> AppResult<()> {
    let hash = hash_secret(new_password)?;
    let rows = sqlx::query("UPDATE users SET password_hash = ? WHERE username = ?")
        .bind(&hash)
        .bind(username)
        .execute(pool)
        .await?
        .rows_affected();
    if rows == 0 {
        return Err(AppError::NotFound(format!("User '{username}' not found")));
    }
    Ok(())
}

/// Check a login. `login` may be a username or an email address. Returns the
/// user when the password matches.
pub async fn authenticate(pool: &SqlitePool, login: &str, password: &str) -> AppResult<Option<User>> {
    let user = match get_user_by_username(pool, login).await? {
        Some(u) => u,
        None => match get_user_by_email(pool, login).await? {
            Some(u) => u,
            None => return Ok(None),
        },
    };

    if verify_secret(password, &user.password_hash)? {
        Ok(Some(user))
    } else {
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;

    #[tokio::test]
    async fn test_create_and_get_user() {
        let pool = db::test_pool().await;

        let user = create_user(&pool, "alice", Some("alice@example.com"), "password123")
            .await
            .unwrap();

        assert_eq!(user.username, "alice");
        assert_eq!(user.email.as_deref(), Some("alice@example.com"));
        assert_ne!(user.password_hash, "password123");

        let fetched = get_user_by_username(&pool, "alice").await.unwrap().unwrap();
        assert_eq!(fetched.id, user.id);
    }

    #[tokio::test]
    async fn test_duplicate_username_conflicts() {
        let pool = db::test_pool().await;

        create_user(&pool, "alice", None, "pass1").await.unwrap();
        let result = create_user(&pool, "alice", None, "pass2").await;

        assert!(matches!(result, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_authenticate_by_username_or_email() {
        let pool = db::test_pool().await;
        create_user(&pool, "alice", Some("a@example.com"), "secret123")
            .await
            .unwrap();

        let by_name = authenticate(&pool, "alice", "secret123").await.unwrap();
        assert_eq!(by_name.unwrap().username, "alice");

        let by_email = authenticate(&pool, "a@example.com", "secret123").await.unwrap();
        assert_eq!(by_email.unwrap().username, "alice");

        assert!(authenticate(&pool, "alice", "wrong").await.unwrap().is_none());
        assert!(authenticate(&pool, "nobody", "secret123").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_reset_password() {
        let pool = db::test_pool().await;
        create_user(&pool, "alice", None, "old").await.unwrap();

        reset_password(&pool, "alice", "new").await.unwrap();

        assert!(authenticate(&pool, "alice", "old").await.unwrap().is_none());
        assert!(authenticate(&pool, "alice", "new").await.unwrap().is_some());
        assert!(matches!(
            reset_password(&pool, "ghost", "x").await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_list_users_sorted() {
        let pool = db::test_pool().await;
        create_user(&pool, "zed", None, "p").await.unwrap();
        create_user(&pool, "amy", None, "p").await.unwrap();

        let names: Vec<String> = list_users(&pool)
            .await
            .unwrap()
            .into_iter()
            .map(|u| u.username)
            .collect();
        assert_eq!(names, ["amy", "zed"]);
    }
}
