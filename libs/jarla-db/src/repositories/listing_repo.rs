use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::PgPool;
use tracing::debug;

use crate::models::listing::RawListingRow;
use crate::models::tier::RawTierRow;
use crate::source::{Collection, ListingSource, PageRequest};

const CAMPAIGN_COLUMNS: &str = r#"
    id::text AS id, brand_name, title, description, max_earnings::float8 AS max_earnings,
    logo_url, image_url, content_type, product_visibility, video_length,
    guidelines, example_images, NULL::float8 AS rate_per_view, NULL::text AS "type",
    is_active, created_at
"#;

const DEAL_COLUMNS: &str = r#"
    id::text AS id, brand_name, title, description, max_earnings::float8 AS max_earnings,
    logo_url, image_url, content_type, product_visibility, video_length,
    guidelines, example_images, rate_per_view::float8 AS rate_per_view, "type",
    is_active, created_at
"#;

/// Reads campaigns, deals and campaign tiers straight from Postgres.
#[derive(Clone, Debug)]
pub struct PgListingRepository {
    pool: PgPool,
}

impl PgListingRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn select(collection: Collection) -> String {
        let columns = match collection {
            Collection::Campaigns => CAMPAIGN_COLUMNS,
            Collection::Deals => DEAL_COLUMNS,
        };
        format!("SELECT {} FROM {}", columns, collection.table())
    }

    /// Rows sharing a `created_at` are tie-broken by id so that consecutive
    /// offset pages never overlap.
    fn page_query(collection: Collection) -> String {
        format!(
            "{} WHERE ($1 = FALSE OR is_active = TRUE) ORDER BY created_at DESC, id DESC LIMIT $2 OFFSET $3",
            Self::select(collection)
        )
    }
}

#[async_trait]
impl ListingSource for PgListingRepository {
    async fn fetch_page(
        &self,
        collection: Collection,
        page: PageRequest,
    ) -> Result<Vec<RawListingRow>> {
        let query = Self::page_query(collection);

        let rows = sqlx::query_as::<_, RawListingRow>(&query)
            .bind(page.active_only)
            .bind(page.limit as i64)
            .bind(page.offset as i64)
            .fetch_all(&self.pool)
            .await
            .with_context(|| format!("Failed to fetch {} page at offset {}", collection, page.offset))?;

        debug!(
            "Fetched {} {} rows for range {}..={}",
            rows.len(),
            collection,
            page.offset,
            page.range_end()
        );
        Ok(rows)
    }

    async fn fetch_tiers_for(&self, ids: &[String]) -> Result<Vec<RawTierRow>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        sqlx::query_as::<_, RawTierRow>(
            r#"
            SELECT id::text AS id, campaign_id::text AS campaign_id,
                   min_views, max_views, rate_per_view::float8 AS rate_per_view
            FROM campaign_tiers
            WHERE campaign_id::text = ANY($1)
            ORDER BY min_views ASC
            "#,
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await
        .context("Failed to fetch campaign tiers")
    }

    async fn fetch_by_ids(
        &self,
        collection: Collection,
        ids: &[String],
    ) -> Result<Vec<RawListingRow>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let query = format!("{} WHERE id::text = ANY($1)", Self::select(collection));
        sqlx::query_as::<_, RawListingRow>(&query)
            .bind(ids)
            .fetch_all(&self.pool)
            .await
            .with_context(|| format!("Failed to fetch {} by id", collection))
    }
}
