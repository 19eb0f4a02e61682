use sqlx::sqlite::SqlitePool;

#[derive(Clone)]
pub struct UserStore {
    pool: SqlitePool,
}

/// A persisted identity.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct User {
    pub id: i64,
    pub uuid: String,
    pub email: String,
    pub user_name: String,
    /// Argon2 PHC string, absent for federation-only accounts
    pub password_hash: Option<String>,
    pub profile_picture_url: Option<String>,
    /// Federated provider subject id
    pub google_id: Option<String>,
}

/// Fields for inserting a new identity.
#[derive(Debug, Clone)]
pub struct NewUser<'a> {
    pub uuid: &'a str,
    pub email: &'a str,
    pub user_name: &'a str,
    pub password_hash: Option<&'a str>,
    pub profile_picture_url: Option<&'a str>,
    pub google_id: Option<&'a str>,
}

impl UserStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a new identity. Fails with a unique violation if the email is taken.
    pub async fn create(&self, user: &NewUser<'_>) -> Result<i64, sqlx::Error> {
        let result = sqlx::query(
            "INSERT INTO users (uuid, email, user_name, password_hash, profile_picture_url, google_id) VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(user.uuid)
        .bind(user.email)
        .bind(user.user_name)
        .bind(user.password_hash)
        .bind(user.profile_picture_url)
        .bind(user.google_id)
        .execute(&self.pool)
        .await?;
        Ok(result.last_insert_rowid())
    }

    /// Return the identity owning `user.email`, creating it from `user` if none exists.
    /// Concurrent calls for the same email resolve to the same row.
    pub async fn find_or_create_by_email(&self, user: &NewUser<'_>) -> Result<User, sqlx::Error> {
        sqlx::query(
            "INSERT INTO users (uuid, email, user_name, password_hash, profile_picture_url, google_id) VALUES (?, ?, ?, ?, ?, ?) ON CONFLICT(email) DO NOTHING",
        )
        .bind(user.uuid)
        .bind(user.email)
        .bind(user.user_name)
        .bind(user.password_hash)
        .bind(user.profile_picture_url)
        .bind(user.google_id)
        .execute(&self.pool)
        .await?;

        self.get_by_email(user.email)
            .await?
            .ok_or(sqlx::Error::RowNotFound)
    }

    /// Get an identity by email.
    pub async fn get_by_email(&self, email: &str) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as(
            "SELECT id, uuid, email, user_name, password_hash, profile_picture_url, google_id FROM users WHERE email = ?",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
    }

    /// Get an identity by its public UUID.
    pub async fn get_by_uuid(&self, uuid: &str) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as(
            "SELECT id, uuid, email, user_name, password_hash, profile_picture_url, google_id FROM users WHERE uuid = ?",
        )
        .bind(uuid)
        .fetch_optional(&self.pool)
        .await
    }

    /// Delete an identity by ID. Its refresh tokens go with it.
    pub async fn delete(&self, id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

/// Whether a database error is a UNIQUE constraint violation.
pub fn is_unique_violation(e: &sqlx::Error) -> bool {
    e.as_database_error()
        .is_some_and(|db_err| db_err.is_unique_violation())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;

    fn federated(uuid: &'static str) -> NewUser<'static> {
        NewUser {
            uuid,
            email: "g@x.com",
            user_name: "g",
            password_hash: None,
            profile_picture_url: Some("https://example.com/g.png"),
            google_id: Some("sub-1"),
        }
    }

    #[tokio::test]
    async fn test_find_or_create_is_idempotent() {
        let db = Database::open(":memory:").await.unwrap();

        let first = db
            .users()
            .find_or_create_by_email(&federated("uuid-1"))
            .await
            .unwrap();
        let second = db
            .users()
            .find_or_create_by_email(&federated("uuid-2"))
            .await
            .unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(second.uuid, "uuid-1");
        assert_eq!(second.password_hash, None);
        assert_eq!(second.google_id.as_deref(), Some("sub-1"));

        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(count.0, 1);
    }

    #[tokio::test]
    async fn test_unique_violation_detected() {
        let db = Database::open(":memory:").await.unwrap();
        db.users().create(&federated("uuid-1")).await.unwrap();

        let err = db.users().create(&federated("uuid-2")).await.unwrap_err();
        assert!(is_unique_violation(&err));
    }

    #[tokio::test]
    async fn test_delete_user() {
        let db = Database::open(":memory:").await.unwrap();
        let id = db.users().create(&federated("uuid-1")).await.unwrap();

        assert!(db.users().delete(id).await.unwrap());
        assert!(db.users().get_by_uuid("uuid-1").await.unwrap().is_none());
    }
}
