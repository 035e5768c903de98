use anyhow::Result;
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use jarla_db::models::listing::RawListingRow;
use jarla_db::models::tier::RawTierRow;
use jarla_db::{Collection, ListingSource, PageRequest};

/// `ListingSource` over the hosted backend's REST interface (PostgREST).
#[derive(Clone)]
pub struct RestListingSource {
    client: Client,
    base_url: String,
    api_key: String,
}

#[derive(Debug, Deserialize)]
struct FavoriteIdRow {
    listing_id: String,
}

#[derive(Debug, Serialize)]
struct NewFavorite<'a> {
    user_id: &'a str,
    listing_id: &'a str,
}

impl RestListingSource {
    pub fn new(base_url: String, api_key: String) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        }
    }

    fn table_url(&self, table: &str, query: &str) -> String {
        format!("{}/rest/v1/{}?{}", self.base_url, table, query)
    }

    fn page_url(&self, collection: Collection, page: PageRequest) -> String {
        let mut query = format!(
            "select=*&order=created_at.desc,id.desc&offset={}&limit={}",
            page.offset, page.limit
        );
        if page.active_only {
            query.push_str("&is_active=eq.true");
        }
        self.table_url(collection.table(), &query)
    }

    async fn get_rows<T: DeserializeOwned>(&self, url: &str) -> Result<Vec<T>> {
        let response = self
            .client
            .get(url)
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
            .send()
            .await?
            .error_for_status()?;

        Ok(response.json().await?)
    }

    pub async fn favorite_ids(&self, user_id: &str) -> Result<Vec<String>> {
        let url = self.table_url(
            "favorites",
            &format!(
                "select=listing_id&user_id=eq.{}&order=created_at.desc",
                urlencoding::encode(user_id)
            ),
        );
        let rows: Vec<FavoriteIdRow> = self.get_rows(&url).await?;
        Ok(rows.into_iter().map(|r| r.listing_id).collect())
    }

    pub async fn add_favorite(&self, user_id: &str, listing_id: &str) -> Result<()> {
        self.client
            .post(self.table_url("favorites", "on_conflict=user_id,listing_id"))
            .header("apikey", &self.api_key)
            .header("Prefer", "resolution=ignore-duplicates")
            .bearer_auth(&self.api_key)
            .json(&NewFavorite {
                user_id,
                listing_id,
            })
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    pub async fn remove_favorite(&self, user_id: &str, listing_id: &str) -> Result<()> {
        let query = format!(
            "user_id=eq.{}&listing_id=eq.{}",
            urlencoding::encode(user_id),
            urlencoding::encode(listing_id)
        );
        self.client
            .delete(self.table_url("favorites", &query))
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}

/// PostgREST `in.(...)` filter value with every id quoted and the whole value
/// percent-encoded.
fn in_filter(ids: &[String]) -> String {
    let quoted: Vec<String> = ids
        .iter()
        .map(|id| format!("\"{}\"", id.replace('"', "\\\"")))
        .collect();
    urlencoding::encode(&format!("in.({})", quoted.join(","))).into_owned()
}

#[async_trait]
impl ListingSource for RestListingSource {
    async fn fetch_page(
        &self,
        collection: Collection,
        page: PageRequest,
    ) -> Result<Vec<RawListingRow>> {
        let url = self.page_url(collection, page);
        tracing::debug!("GET {}", url);
        self.get_rows(&url).await
    }

    async fn fetch_tiers_for(&self, ids: &[String]) -> Result<Vec<RawTierRow>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let url = self.table_url(
            "campaign_tiers",
            &format!("select=*&campaign_id={}&order=min_views.asc", in_filter(ids)),
        );
        self.get_rows(&url).await
    }

    async fn fetch_by_ids(
        &self,
        collection: Collection,
        ids: &[String],
    ) -> Result<Vec<RawListingRow>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let url = self.table_url(collection.table(), &format!("select=*&id={}", in_filter(ids)));
        self.get_rows(&url).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source() -> RestListingSource {
        // Same provider setup as main(); reqwest has no bundled provider.
        let _ = rustls::crypto::ring::default_provider().install_default();
        RestListingSource::new("https://abc.backend.example/".to_string(), "anon".to_string())
    }

    #[test]
    fn page_url_orders_newest_first_with_range() {
        let url = source().page_url(
            Collection::Campaigns,
            PageRequest {
                active_only: true,
                offset: 24,
                limit: 12,
            },
        );
        assert_eq!(
            url,
            "https://abc.backend.example/rest/v1/campaigns?select=*&order=created_at.desc,id.desc&offset=24&limit=12&is_active=eq.true"
        );
    }

    #[test]
    fn page_url_without_active_filter() {
        let url = source().page_url(
            Collection::Deals,
            PageRequest {
                active_only: false,
                offset: 0,
                limit: 5,
            },
        );
        assert!(url.starts_with("https://abc.backend.example/rest/v1/deals?"));
        assert!(!url.contains("is_active"));
    }

    #[test]
    fn in_filter_quotes_and_encodes() {
        let ids = vec!["a1".to_string(), "b 2".to_string()];
        assert_eq!(in_filter(&ids), "in.%28%22a1%22%2C%22b%202%22%29");
    }
}
