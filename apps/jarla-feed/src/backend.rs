use anyhow::{Context, Result};
use std::sync::Arc;

use jarla_db::db::init_db;
use jarla_db::repositories::{FavoriteRepository, PgListingRepository};
use jarla_db::{ListingSource, sqlx::PgPool};

use crate::config::{BackendKind, FeedConfig};
use crate::rest_source::RestListingSource;

/// The configured data-access collaborator plus favorites access.
pub enum Backend {
    Rest(Arc<RestListingSource>),
    Postgres {
        pool: PgPool,
        listings: Arc<PgListingRepository>,
        favorites: FavoriteRepository,
    },
}

impl Backend {
    pub async fn connect(config: &FeedConfig) -> Result<Self> {
        match config.backend {
            BackendKind::Rest => {
                let url = config
                    .rest_url
                    .clone()
                    .context("rest_url is required for the rest backend")?;
                let key = config.api_key.clone().unwrap_or_default();
                Ok(Backend::Rest(Arc::new(RestListingSource::new(url, key))))
            }
            BackendKind::Postgres => {
                let url = config
                    .database_url
                    .as_deref()
                    .context("database_url is required for the postgres backend")?;
                let pool = init_db(url).await?;
                Ok(Backend::Postgres {
                    listings: Arc::new(PgListingRepository::new(pool.clone())),
                    favorites: FavoriteRepository::new(pool.clone()),
                    pool,
                })
            }
        }
    }

    pub fn source(&self) -> Arc<dyn ListingSource> {
        match self {
            Backend::Rest(rest) => rest.clone(),
            Backend::Postgres { listings, .. } => listings.clone(),
        }
    }

    pub fn pool(&self) -> Option<&PgPool> {
        match self {
            Backend::Rest(_) => None,
            Backend::Postgres { pool, .. } => Some(pool),
        }
    }

    pub async fn favorite_ids(&self, user_id: &str) -> Result<Vec<String>> {
        match self {
            Backend::Rest(rest) => rest.favorite_ids(user_id).await,
            Backend::Postgres { favorites, .. } => favorites.list_ids(user_id).await,
        }
    }

    pub async fn add_favorite(&self, user_id: &str, listing_id: &str) -> Result<()> {
        match self {
            Backend::Rest(rest) => rest.add_favorite(user_id, listing_id).await,
            Backend::Postgres { favorites, .. } => favorites.add(user_id, listing_id).await,
        }
    }

    pub async fn remove_favorite(&self, user_id: &str, listing_id: &str) -> Result<()> {
        match self {
            Backend::Rest(rest) => rest.remove_favorite(user_id, listing_id).await,
            Backend::Postgres { favorites, .. } => favorites.remove(user_id, listing_id).await,
        }
    }
}
