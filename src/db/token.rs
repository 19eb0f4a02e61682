//! Refresh token sets, one row per active session.
//!
//! Every mutation is a single statement or a single transaction scoped to one
//! identity, so concurrent rotations of the same token cannot both succeed and
//! an issued token is never silently overwritten. Entries are compared after
//! trimming surrounding whitespace.

use sqlx::sqlite::SqlitePool;

/// Outcome of an atomic rotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rotation {
    /// The presented token was removed and the replacement appended.
    Rotated,
    /// The presented token was not in the set. The whole set was cleared.
    ReplayDetected { revoked: u64 },
}

/// Store for an identity's live refresh tokens.
pub struct TokenStore {
    pool: SqlitePool,
}

impl TokenStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Append a token to the identity's set.
    pub async fn append(&self, user_id: i64, token: &str) -> Result<(), sqlx::Error> {
        sqlx::query("INSERT INTO refresh_tokens (user_id, token) VALUES (?, ?)")
            .bind(user_id)
            .bind(token)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// List the identity's tokens in insertion order.
    pub async fn list(&self, user_id: i64) -> Result<Vec<String>, sqlx::Error> {
        let rows: Vec<(String,)> =
            sqlx::query_as("SELECT token FROM refresh_tokens WHERE user_id = ? ORDER BY id")
                .bind(user_id)
                .fetch_all(&self.pool)
                .await?;
        Ok(rows.into_iter().map(|(token,)| token).collect())
    }

    /// Remove one occurrence of `presented` and append `replacement`, or, if
    /// `presented` is not in the set, clear the set entirely.
    pub async fn rotate(
        &self,
        user_id: i64,
        presented: &str,
        replacement: &str,
    ) -> Result<Rotation, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        let removed = sqlx::query(
            "DELETE FROM refresh_tokens WHERE id = (SELECT id FROM refresh_tokens WHERE user_id = ? AND trim(token) = ? ORDER BY id LIMIT 1)",
        )
        .bind(user_id)
        .bind(presented.trim())
        .execute(&mut *tx)
        .await?
        .rows_affected();

        let outcome = if removed == 1 {
            sqlx::query("INSERT INTO refresh_tokens (user_id, token) VALUES (?, ?)")
                .bind(user_id)
                .bind(replacement)
                .execute(&mut *tx)
                .await?;
            Rotation::Rotated
        } else {
            let revoked = sqlx::query("DELETE FROM refresh_tokens WHERE user_id = ?")
                .bind(user_id)
                .execute(&mut *tx)
                .await?
                .rows_affected();
            Rotation::ReplayDetected { revoked }
        };

        tx.commit().await?;
        Ok(outcome)
    }

    /// Remove one occurrence of `token`. Returns whether anything was removed.
    pub async fn remove(&self, user_id: i64, token: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "DELETE FROM refresh_tokens WHERE id = (SELECT id FROM refresh_tokens WHERE user_id = ? AND trim(token) = ? ORDER BY id LIMIT 1)",
        )
        .bind(user_id)
        .bind(token.trim())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
