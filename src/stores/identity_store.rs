//! Identity store - user accounts, credentials and privilege bits

use sqlx::SqlitePool;
use tracing::{info, warn};

use crate::db::tables::UserTable;
use crate::error::{Error, Result};
use crate::models::User;
use crate::utils::auth::{hash_password, verify_password, PBKDF2_ITERATIONS};

/// User accounts. Passwords only ever leave this type as salted hashes.
#[derive(Debug, Clone)]
pub struct IdentityStore {
    pool: SqlitePool,
    iterations: u32,
}

impl IdentityStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            iterations: PBKDF2_ITERATIONS,
        }
    }

    /// Use a different PBKDF2 work factor for newly created hashes.
    /// Existing hashes carry their own count and still verify.
    pub fn with_iterations(mut self, iterations: u32) -> Self {
        self.iterations = iterations;
        self
    }

    /// Register a user with no privileges.
    ///
    /// Fails with `DuplicateKey` if the username is taken.
    pub async fn create_user(&self, name: &str, username: &str, password: &str) -> Result<User> {
        let password_hash = hash_password(password, self.iterations);

        let mut conn = self.pool.acquire().await?;
        let user = UserTable::insert(&mut conn, name, username, &password_hash).await?;

        info!("Created user {} ({})", user.username, user.id);
        Ok(user)
    }

    /// Check a username/password pair. Unknown users and wrong passwords
    /// both come back as `false`.
    pub async fn verify_credential(&self, username: &str, password: &str) -> Result<bool> {
        let mut conn = self.pool.acquire().await?;

        let Some(user) = UserTable::get_by_username(&mut conn, username).await? else {
            return Ok(false);
        };

        match verify_password(password, &user.password) {
            Ok(valid) => Ok(valid),
            Err(e) => {
                warn!("Stored credential for {} is unreadable: {}", username, e);
                Ok(false)
            }
        }
    }

    /// Replace a user's password
    pub async fn set_password(&self, user_id: i64, password: &str) -> Result<()> {
        let password_hash = hash_password(password, self.iterations);

        let mut conn = self.pool.acquire().await?;
        if !UserTable::update_password(&mut conn, user_id, &password_hash).await? {
            return Err(Error::NotFound(format!("user {}", user_id)));
        }
        Ok(())
    }

    /// Replace a user's privilege bitfield
    pub async fn set_privileges(&self, user_id: i64, privs: i64) -> Result<()> {
        let mut conn = self.pool.acquire().await?;
        if !UserTable::update_privs(&mut conn, user_id, privs).await? {
            return Err(Error::NotFound(format!("user {}", user_id)));
        }
        Ok(())
    }

    /// True if the user exists and holds every bit in `mask`
    pub async fn has_privileges(&self, user_id: i64, mask: i64) -> Result<bool> {
        Ok(self
            .get_by_id(user_id)
            .await?
            .map(|u| u.has_privileges(mask))
            .unwrap_or(false))
    }

    pub async fn get_by_id(&self, id: i64) -> Result<Option<User>> {
        let mut conn = self.pool.acquire().await?;
        UserTable::get_by_id(&mut conn, id).await
    }

    pub async fn get_by_username(&self, username: &str) -> Result<Option<User>> {
        let mut conn = self.pool.acquire().await?;
        UserTable::get_by_username(&mut conn, username).await
    }

    pub async fn all(&self) -> Result<Vec<User>> {
        let mut conn = self.pool.acquire().await?;
        UserTable::all(&mut conn).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::testing::temp_engine;

    fn store(pool: &SqlitePool) -> IdentityStore {
        IdentityStore::new(pool.clone()).with_iterations(1_000)
    }

    #[tokio::test]
    async fn test_create_user_hashes_password() {
        let (_dir, engine) = temp_engine().await;
        let identity = store(engine.pool());

        let user = identity.create_user("Alice", "alice", "s3cret").await.unwrap();
        assert_eq!(user.privs, 0);
        assert_ne!(user.password, "s3cret");
        assert!(user.password.starts_with("pbkdf2:sha256:"));
    }

    #[tokio::test]
    async fn test_duplicate_username() {
        let (_dir, engine) = temp_engine().await;
        let identity = store(engine.pool());

        identity.create_user("Alice", "alice", "a").await.unwrap();
        let err = identity
            .create_user("Other Alice", "alice", "b")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::DuplicateKey { entity: "user", .. }));
    }

    #[tokio::test]
    async fn test_verify_credential_is_uniform() {
        let (_dir, engine) = temp_engine().await;
        let identity = store(engine.pool());
        identity.create_user("Alice", "alice", "s3cret").await.unwrap();

        assert!(identity.verify_credential("alice", "s3cret").await.unwrap());
        assert!(!identity.verify_credential("alice", "wrong").await.unwrap());
        assert!(!identity.verify_credential("nobody", "s3cret").await.unwrap());
    }

    #[tokio::test]
    async fn test_set_password() {
        let (_dir, engine) = temp_engine().await;
        let identity = store(engine.pool());
        let user = identity.create_user("Alice", "alice", "old").await.unwrap();

        identity.set_password(user.id, "new").await.unwrap();
        assert!(identity.verify_credential("alice", "new").await.unwrap());
        assert!(!identity.verify_credential("alice", "old").await.unwrap());
        assert!(matches!(
            identity.set_password(999, "x").await,
            Err(Error::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_privileges() {
        let (_dir, engine) = temp_engine().await;
        let identity = store(engine.pool());
        let user = identity.create_user("Alice", "alice", "pw").await.unwrap();

        assert!(!identity.has_privileges(user.id, 0b10).await.unwrap());
        identity.set_privileges(user.id, 0b11).await.unwrap();
        assert!(identity.has_privileges(user.id, 0b10).await.unwrap());
        assert!(!identity.has_privileges(user.id, 0b100).await.unwrap());
        assert!(!identity.has_privileges(999, 0).await.unwrap());
        assert!(matches!(
            identity.set_privileges(999, 1).await,
            Err(Error::NotFound(_))
        ));
    }
}
