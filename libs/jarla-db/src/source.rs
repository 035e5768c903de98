use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::models::listing::RawListingRow;
use crate::models::tier::RawTierRow;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Collection {
    Campaigns,
    Deals,
}

impl Collection {
    pub fn table(&self) -> &'static str {
        match self {
            Collection::Campaigns => "campaigns",
            Collection::Deals => "deals",
        }
    }

    /// Deals carry a flat rate and have no tier rows.
    pub fn has_tiers(&self) -> bool {
        matches!(self, Collection::Campaigns)
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.table())
    }
}

impl std::str::FromStr for Collection {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "campaigns" | "campaign" => Ok(Collection::Campaigns),
            "deals" | "deal" => Ok(Collection::Deals),
            other => Err(anyhow::anyhow!("Unknown collection '{}'", other)),
        }
    }
}

/// Rows `[offset, offset + limit - 1]`, newest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub active_only: bool,
    pub offset: u64,
    pub limit: u64,
}

impl PageRequest {
    pub fn range_end(&self) -> u64 {
        self.offset + self.limit.saturating_sub(1)
    }
}

/// Row-level read access to the hosted backend.
#[async_trait]
pub trait ListingSource: Send + Sync {
    async fn fetch_page(&self, collection: Collection, page: PageRequest)
    -> Result<Vec<RawListingRow>>;

    async fn fetch_tiers_for(&self, ids: &[String]) -> Result<Vec<RawTierRow>>;

    /// Matching rows in no particular order; unknown ids are simply absent.
    async fn fetch_by_ids(&self, collection: Collection, ids: &[String])
    -> Result<Vec<RawListingRow>>;
}

#[async_trait]
impl<S: ListingSource + ?Sized> ListingSource for std::sync::Arc<S> {
    async fn fetch_page(
        &self,
        collection: Collection,
        page: PageRequest,
    ) -> Result<Vec<RawListingRow>> {
        (**self).fetch_page(collection, page).await
    }

    async fn fetch_tiers_for(&self, ids: &[String]) -> Result<Vec<RawTierRow>> {
        (**self).fetch_tiers_for(ids).await
    }

    async fn fetch_by_ids(
        &self,
        collection: Collection,
        ids: &[String],
    ) -> Result<Vec<RawListingRow>> {
        (**self).fetch_by_ids(collection, ids).await
    }
}
