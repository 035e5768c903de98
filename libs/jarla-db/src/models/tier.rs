use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Default, Serialize, Deserialize, FromRow)]
pub struct RawTierRow {
    pub id: String,
    pub campaign_id: String,
    pub min_views: Option<i64>,
    pub max_views: Option<i64>,
    pub rate_per_view: Option<f64>, // per 1000 views
}
