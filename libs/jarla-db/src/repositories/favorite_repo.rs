use anyhow::{Context, Result};
use sqlx::PgPool;

#[derive(Clone, Debug)]
pub struct FavoriteRepository {
    pool: PgPool,
}

impl FavoriteRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Favorited listing ids, most recently favorited first.
    pub async fn list_ids(&self, user_id: &str) -> Result<Vec<String>> {
        sqlx::query_scalar(
            "SELECT listing_id FROM favorites WHERE user_id = $1 ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .context("Failed to fetch favorites")
    }

    pub async fn add(&self, user_id: &str, listing_id: &str) -> Result<()> {
        sqlx::query(
            "INSERT INTO favorites (user_id, listing_id) VALUES ($1, $2) ON CONFLICT (user_id, listing_id) DO NOTHING",
        )
        .bind(user_id)
        .bind(listing_id)
        .execute(&self.pool)
        .await
        .context("Failed to add favorite")?;

        Ok(())
    }

    pub async fn remove(&self, user_id: &str, listing_id: &str) -> Result<()> {
        sqlx::query("DELETE FROM favorites WHERE user_id = $1 AND listing_id = $2")
            .bind(user_id)
            .bind(listing_id)
            .execute(&self.pool)
            .await
            .context("Failed to remove favorite")?;

        Ok(())
    }
}
