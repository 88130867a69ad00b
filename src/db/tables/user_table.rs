//! User table operations

use sqlx::{FromRow, SqliteConnection};
use super::{first_row, single_row};

use crate::error::{Error, Result};
use crate::models::User;

/// Database row for user table
#[derive(Debug, FromRow)]
struct UserRow {
    id: i64,
    name: String,
    username: String,
    password: String,
    privs: i64,
}

impl UserRow {
    fn into_user(self) -> User {
        User {
            id: self.id,
            name: self.name,
            username: self.username,
            password: self.password,
            privs: self.privs,
        }
    }
}

/// User table operations
pub struct UserTable;

impl UserTable {
    /// Get all users
    pub async fn all(conn: &mut SqliteConnection) -> Result<Vec<User>> {
        let rows: Vec<UserRow> = sqlx::query_as("SELECT * FROM user ORDER BY id")
            .fetch_all(&mut *conn)
            .await?;

        Ok(rows.into_iter().map(|r| r.into_user()).collect())
    }

    /// Get user by ID
    pub async fn get_by_id(conn: &mut SqliteConnection, id: i64) -> Result<Option<User>> {
        let row: Option<UserRow> = sqlx::query_as("SELECT * FROM user WHERE id = ?")
            .bind(id)
            .fetch_all(&mut *conn)
            .await
            .map(first_row)?;

        Ok(row.map(|r| r.into_user()))
    }

    /// Get user by username
    pub async fn get_by_username(
        conn: &mut SqliteConnection,
        username: &str,
    ) -> Result<Option<User>> {
        let row: Option<UserRow> = sqlx::query_as("SELECT * FROM user WHERE username = ?")
            .bind(username)
            .fetch_all(&mut *conn)
            .await
            .map(first_row)?;

        Ok(row.map(|r| r.into_user()))
    }

    /// Insert a user with privileges cleared.
    ///
    /// Fails with `DuplicateKey` if the username is taken.
    pub async fn insert(
        conn: &mut SqliteConnection,
        name: &str,
        username: &str,
        password_hash: &str,
    ) -> Result<User> {
        let row: UserRow = sqlx::query_as(
            "INSERT INTO user (name, username, password, privs) VALUES (?, ?, ?, 0) RETURNING *",
        )
        .bind(name)
        .bind(username)
        .bind(password_hash)
        .fetch_all(&mut *conn)
        .await
        .and_then(single_row)
        .map_err(|e| Error::from_write(e, "user", username))?;

        Ok(row.into_user())
    }

    /// Replace the privilege bitfield
    pub async fn update_privs(conn: &mut SqliteConnection, id: i64, privs: i64) -> Result<bool> {
        let result = sqlx::query("UPDATE user SET privs = ? WHERE id = ?")
            .bind(privs)
            .bind(id)
            .execute(&mut *conn)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Update only the password for a user
    pub async fn update_password(
        conn: &mut SqliteConnection,
        id: i64,
        password_hash: &str,
    ) -> Result<bool> {
        let result = sqlx::query("UPDATE user SET password = ? WHERE id = ?")
            .bind(password_hash)
            .bind(id)
            .execute(&mut *conn)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Get user count
    pub async fn count(conn: &mut SqliteConnection) -> Result<i64> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM user")
            .fetch_all(&mut *conn)
            .await
            .and_then(single_row)?;

        Ok(row.0)
    }
}
