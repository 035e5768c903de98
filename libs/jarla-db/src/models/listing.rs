use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Campaign or deal row exactly as the backend returns it. Only `id` is
/// guaranteed; every other column is nullable.
#[derive(Debug, Clone, Default, Serialize, Deserialize, FromRow)]
pub struct RawListingRow {
    pub id: String,
    pub brand_name: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub max_earnings: Option<f64>,
    pub logo_url: Option<String>,
    pub image_url: Option<String>,
    pub content_type: Option<String>,
    pub product_visibility: Option<String>,
    pub video_length: Option<String>,
    pub guidelines: Option<Vec<String>>,
    pub example_images: Option<Vec<String>>,
    pub rate_per_view: Option<f64>, // deals only
    #[serde(rename = "type")]
    #[sqlx(rename = "type")]
    pub deal_type: Option<String>, // deals only
    pub is_active: Option<bool>,
    pub created_at: Option<DateTime<Utc>>,
}
