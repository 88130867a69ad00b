//! User model

use serde::{Deserialize, Serialize};

/// Display name used when a queue or history entry has no user
pub const ANONYMOUS_NAME: &str = "Anonymous";
/// Username used when a queue or history entry has no user
pub const ANONYMOUS_USERNAME: &str = "anonymous";

/// A user account
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Database ID
    pub id: i64,
    /// Display name
    pub name: String,
    /// Username
    pub username: String,
    /// Password hash (not serialized to JSON)
    #[serde(skip_serializing)]
    pub password: String,
    /// Privilege bitfield, flag meanings are defined by the caller
    pub privs: i64,
}

impl User {
    /// Check that every bit in `mask` is set
    pub fn has_privileges(&self, mask: i64) -> bool {
        self.privs & mask == mask
    }

    /// Serialize minimal info
    pub fn to_minimal(&self) -> MinimalUser {
        MinimalUser {
            id: self.id,
            name: self.name.clone(),
            username: self.username.clone(),
        }
    }
}

/// Minimal user info
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MinimalUser {
    pub id: i64,
    pub name: String,
    pub username: String,
}

/// Display name and username for an optional user, falling back to the
/// anonymous literals.
pub fn display_fields(user: Option<&User>) -> (String, String) {
    match user {
        Some(u) => (u.name.clone(), u.username.clone()),
        None => (ANONYMOUS_NAME.to_string(), ANONYMOUS_USERNAME.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(privs: i64) -> User {
        User {
            id: 1,
            name: "Alice".into(),
            username: "alice".into(),
            password: String::new(),
            privs,
        }
    }

    #[test]
    fn test_has_privileges() {
        let u = user(0b101);
        assert!(u.has_privileges(0b001));
        assert!(u.has_privileges(0b101));
        assert!(!u.has_privileges(0b010));
        assert!(user(0).has_privileges(0));
    }

    #[test]
    fn test_password_not_serialized() {
        let mut u = user(0);
        u.password = "pbkdf2:sha256:1$salt$abcd".into();
        let json = serde_json::to_string(&u).unwrap();
        assert!(!json.contains("pbkdf2"));
    }

    #[test]
    fn test_display_fields() {
        assert_eq!(
            display_fields(None),
            ("Anonymous".to_string(), "anonymous".to_string())
        );
        let u = user(0);
        assert_eq!(
            display_fields(Some(&u)),
            ("Alice".to_string(), "alice".to_string())
        );
    }
}
