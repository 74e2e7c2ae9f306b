//! SQLite user repository implementation.

use sqlx::Row;
use uuid::Uuid;

use medconsult_core::repository::user::UserRepository;
use medconsult_types::error::RepositoryError;
use medconsult_types::user::{UpdateUserRequest, User};

use super::codec::{format_datetime, map_write_error, parse_datetime, parse_uuid, query_error, truncate_micros};
use super::pool::DatabasePool;

/// SQLite-backed implementation of `UserRepository`.
#[derive(Clone)]
pub struct SqliteUserRepository {
    pool: DatabasePool,
}

impl SqliteUserRepository {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

fn row_to_user(row: &sqlx::sqlite::SqliteRow) -> Result<User, RepositoryError> {
    let id: String = row.try_get("id").map_err(query_error)?;
    let created_at: String = row.try_get("created_at").map_err(query_error)?;
    Ok(User {
        id: parse_uuid(&id, "user id")?,
        name: row.try_get("name").map_err(query_error)?,
        email: row.try_get("email").map_err(query_error)?,
        created_at: parse_datetime(&created_at)?,
    })
}

impl UserRepository for SqliteUserRepository {
    async fn create_user(&self, user: &User) -> Result<User, RepositoryError> {
        let mut stored = user.clone();
        stored.created_at = truncate_micros(user.created_at);

        sqlx::query("INSERT INTO users (id, name, email, created_at) VALUES (?, ?, ?, ?)")
            .bind(stored.id.to_string())
            .bind(&stored.name)
            .bind(&stored.email)
            .bind(format_datetime(&stored.created_at))
            .execute(&self.pool.writer)
            .await
            .map_err(|e| map_write_error(e, || format!("email '{}' already registered", user.email)))?;

        Ok(stored)
    }

    async fn get_user(&self, id: &Uuid) -> Result<Option<User>, RepositoryError> {
        let row = sqlx::query("SELECT * FROM users WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(query_error)?;

        row.as_ref().map(row_to_user).transpose()
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, RepositoryError> {
        let row = sqlx::query("SELECT * FROM users WHERE email = ?")
            .bind(email)
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(query_error)?;

        row.as_ref().map(row_to_user).transpose()
    }

    async fn update_user(
        &self,
        id: &Uuid,
        update: &UpdateUserRequest,
    ) -> Result<User, RepositoryError> {
        let mut user = self.get_user(id).await?.ok_or(RepositoryError::NotFound)?;
        user.apply(update.clone());

        let result = sqlx::query("UPDATE users SET name = ?, email = ? WHERE id = ?")
            .bind(&user.name)
            .bind(&user.email)
            .bind(id.to_string())
            .execute(&self.pool.writer)
            .await
            .map_err(|e| map_write_error(e, || format!("email '{}' already registered", user.email)))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(user)
    }

    async fn delete_user(&self, id: &Uuid) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool.writer)
            .await
            .map_err(query_error)?;

        Ok(result.rows_affected() > 0)
    }
}
