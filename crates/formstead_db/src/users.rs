//! Users: owners of forms. Only as much as ownership needs.

use crate::error::{is_unique_violation, FormError, Result};
use crate::types::User;
use crate::SqliteStore;
use formstead_ids::UserId;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use tracing::info;

impl SqliteStore {
    pub async fn create_user(&self, name: &str, email: &str) -> Result<UserId> {
        if name.trim().is_empty() {
            return Err(FormError::invalid_input("user name is empty"));
        }
        if !email.contains('@') {
            return Err(FormError::invalid_input(format!("'{}' is not an email address", email)));
        }

        let result = sqlx::query("INSERT INTO users (name, email, created_at) VALUES (?, ?, ?)")
            .bind(name)
            .bind(email)
            .bind(Self::now_millis())
            .execute(&self.pool)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    FormError::invalid_input(format!("email already registered: {}", email))
                } else {
                    e.into()
                }
            })?;

        let id = UserId::new(result.last_insert_rowid());
        info!(user_id = %id, "Created user");
        Ok(id)
    }

    pub async fn get_user(&self, user_id: UserId) -> Result<User> {
        let row = sqlx::query("SELECT id, name, email, created_at FROM users WHERE id = ?")
            .bind(user_id.get())
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => Ok(Self::row_to_user(&row)),
            None => Err(FormError::InvalidUserId(user_id)),
        }
    }

    pub async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let row = sqlx::query("SELECT id, name, email, created_at FROM users WHERE email = ?")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(Self::row_to_user))
    }

    fn row_to_user(row: &SqliteRow) -> User {
        User {
            id: UserId::new(row.get("id")),
            name: row.get("name"),
            email: row.get("email"),
            created_at: Self::millis_to_datetime(row.get("created_at")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::StoreConfig;

    #[tokio::test]
    async fn test_create_and_get_user() {
        let store = SqliteStore::open_in_memory(StoreConfig::default()).await.unwrap();
        let id = store.create_user("Alice", "alice@example.com").await.unwrap();

        let user = store.get_user(id).await.unwrap();
        assert_eq!(user.name, "Alice");
        assert_eq!(user.email, "alice@example.com");

        let found = store.find_user_by_email("alice@example.com").await.unwrap();
        assert_eq!(found.map(|u| u.id), Some(id));
        assert!(store.find_user_by_email("bob@example.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_email_rejected() {
        let store = SqliteStore::open_in_memory(StoreConfig::default()).await.unwrap();
        store.create_user("Alice", "alice@example.com").await.unwrap();

        let err = store.create_user("Alice Again", "alice@example.com").await.unwrap_err();
        assert!(matches!(err, FormError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_unknown_user() {
        let store = SqliteStore::open_in_memory(StoreConfig::default()).await.unwrap();
        let err = store.get_user(UserId::new(99)).await.unwrap_err();
        assert!(matches!(err, FormError::InvalidUserId(id) if id == UserId::new(99)));
    }
}
