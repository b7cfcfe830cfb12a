use async_trait::async_trait;
use chrono::Utc;

use super::{MySqlStore, placeholders};
use crate::store::{StoreResult, UserStore};

#[async_trait]
impl UserStore for MySqlStore {
    async fn touch_user(&self, user_id: &str, email: Option<&str>) -> StoreResult<()> {
        let query = sqlx::query(
            r#"
            INSERT INTO users (id, email, last_seen_at)
            VALUES (?, ?, ?)
            ON DUPLICATE KEY UPDATE
                email = COALESCE(VALUES(email), email),
                last_seen_at = VALUES(last_seen_at)
            "#,
        )
        .bind(user_id)
        .bind(email)
        .bind(Utc::now());

        self.run(query.execute(&self.pool)).await?;
        Ok(())
    }

    async fn known_users(&self, ids: &[String]) -> StoreResult<Vec<String>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let sql = format!(
            "SELECT id FROM users WHERE id IN ({})",
            placeholders(ids.len())
        );
        let mut query = sqlx::query_scalar::<_, String>(&sql);
        for id in ids {
            query = query.bind(id);
        }

        self.run(query.fetch_all(&self.pool)).await
    }
}
