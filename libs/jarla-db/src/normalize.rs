use jarla_shared::{Listing, ListingKind, Tier};
use tracing::warn;

use crate::models::listing::RawListingRow;
use crate::models::tier::RawTierRow;
use crate::source::Collection;

/// Maps a backend row and the tier rows fetched alongside it into a `Listing`.
///
/// Never fails: nullable columns fall back to empty values and tier rows that
/// cannot form a valid tier are dropped. Tier rows belonging to other listings
/// are ignored, so the whole batch of tier rows can be passed for every row.
/// The collection the row was read from decides whether it is a campaign or a
/// deal; a deal with no rate pays nothing.
pub fn normalize(
    collection: Collection,
    row: &RawListingRow,
    all_tiers: &[RawTierRow],
) -> Listing {
    let mut tiers: Vec<Tier> = all_tiers
        .iter()
        .filter(|t| t.campaign_id == row.id)
        .filter_map(to_tier)
        .collect();
    tiers.sort_by_key(|t| t.min_views);

    let kind = match collection {
        Collection::Campaigns => ListingKind::Campaign,
        Collection::Deals => ListingKind::Deal {
            rate_per_view: row.rate_per_view.unwrap_or(0.0),
            deal_type: text(&row.deal_type),
        },
    };

    Listing {
        id: row.id.clone(),
        brand: text(&row.brand_name),
        title: text(&row.title),
        description: text(&row.description),
        max_earnings: row.max_earnings.unwrap_or(0.0),
        logo: text(&row.logo_url),
        image: text(&row.image_url),
        content_type: text(&row.content_type),
        product_visibility: text(&row.product_visibility),
        video_length: text(&row.video_length),
        guidelines: row.guidelines.clone().unwrap_or_default(),
        tiers,
        example_images: row.example_images.clone().unwrap_or_default(),
        kind,
    }
}

pub fn normalize_all(
    collection: Collection,
    rows: &[RawListingRow],
    all_tiers: &[RawTierRow],
) -> Vec<Listing> {
    rows.iter().map(|row| normalize(collection, row, all_tiers)).collect()
}

fn text(value: &Option<String>) -> String {
    value.clone().unwrap_or_default()
}

fn to_tier(raw: &RawTierRow) -> Option<Tier> {
    let min = raw.min_views.unwrap_or(0);
    if min < 0 || raw.max_views.is_some_and(|max| max < 0) {
        warn!(
            "Dropping tier {} of {}: negative view bound",
            raw.id, raw.campaign_id
        );
        return None;
    }

    match Tier::new(
        min as u64,
        raw.max_views.map(|max| max as u64),
        raw.rate_per_view.unwrap_or(0.0),
    ) {
        Ok(tier) => Some(tier),
        Err(e) => {
            warn!("Dropping tier {} of {}: {}", raw.id, raw.campaign_id, e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw_tier(id: &str, campaign: &str, min: i64, max: Option<i64>, rate: f64) -> RawTierRow {
        RawTierRow {
            id: id.to_string(),
            campaign_id: campaign.to_string(),
            min_views: Some(min),
            max_views: max,
            rate_per_view: Some(rate),
        }
    }

    #[test]
    fn missing_columns_become_empty_defaults() {
        let row = RawListingRow {
            id: "c1".to_string(),
            ..Default::default()
        };

        let listing = normalize(Collection::Campaigns, &row, &[]);

        assert_eq!(listing.id, "c1");
        assert_eq!(listing.brand, "");
        assert!(listing.guidelines.is_empty());
        assert!(listing.example_images.is_empty());
        assert!(listing.tiers.is_empty());
        assert_eq!(listing.max_earnings, 0.0);
        assert_eq!(listing.kind, ListingKind::Campaign);
    }

    #[test]
    fn maps_backend_names() {
        let row = RawListingRow {
            id: "c1".to_string(),
            brand_name: Some("Oatly".to_string()),
            logo_url: Some("https://cdn/logo.png".to_string()),
            image_url: Some("https://cdn/cover.png".to_string()),
            guidelines: Some(vec!["Show the carton".to_string()]),
            max_earnings: Some(420.0),
            ..Default::default()
        };

        let listing = normalize(Collection::Campaigns, &row, &[]);

        assert_eq!(listing.brand, "Oatly");
        assert_eq!(listing.logo, "https://cdn/logo.png");
        assert_eq!(listing.image, "https://cdn/cover.png");
        assert_eq!(listing.guidelines, vec!["Show the carton".to_string()]);
        assert_eq!(listing.max_earnings, 420.0);
    }

    #[test]
    fn keeps_only_own_tiers_sorted_by_min_views() {
        let row = RawListingRow {
            id: "c1".to_string(),
            ..Default::default()
        };
        let tiers = vec![
            raw_tier("t3", "c1", 20000, None, 2.0),
            raw_tier("x1", "c2", 0, Some(100), 99.0),
            raw_tier("t1", "c1", 0, Some(5000), 8.0),
            raw_tier("t2", "c1", 5000, Some(20000), 4.0),
        ];

        let listing = normalize(Collection::Campaigns, &row, &tiers);

        let mins: Vec<u64> = listing.tiers.iter().map(|t| t.min_views).collect();
        assert_eq!(mins, vec![0, 5000, 20000]);
        assert_eq!(listing.tiers[0].rate, 8.0);
        assert!(listing.projection().is_ok());
    }

    #[test]
    fn drops_invalid_tier_rows() {
        let row = RawListingRow {
            id: "c1".to_string(),
            ..Default::default()
        };
        let tiers = vec![
            raw_tier("t1", "c1", 0, Some(1000), -3.0),
            raw_tier("t2", "c1", -5, Some(1000), 1.0),
            raw_tier("t3", "c1", 1000, Some(1000), 1.0),
            raw_tier("t4", "c1", 0, None, 1.0),
        ];

        let listing = normalize(Collection::Campaigns, &row, &tiers);

        assert_eq!(listing.tiers.len(), 1);
        assert_eq!(listing.tiers[0].max_views, None);
    }

    #[test]
    fn deal_rows_carry_their_flat_rate() {
        let row = RawListingRow {
            id: "d1".to_string(),
            rate_per_view: Some(0.02),
            deal_type: Some("fixed".to_string()),
            ..Default::default()
        };

        let listing = normalize(Collection::Deals, &row, &[]);

        assert_eq!(
            listing.kind,
            ListingKind::Deal {
                rate_per_view: 0.02,
                deal_type: "fixed".to_string()
            }
        );
    }

    #[test]
    fn deal_row_without_rate_is_still_a_deal() {
        let row = RawListingRow {
            id: "d1".to_string(),
            max_earnings: Some(100.0),
            ..Default::default()
        };

        let listing = normalize(Collection::Deals, &row, &[]);

        assert!(listing.is_deal());
        assert_eq!(
            listing.kind,
            ListingKind::Deal {
                rate_per_view: 0.0,
                deal_type: String::new()
            }
        );
        assert!(listing.projection().is_ok());
    }

    #[test]
    fn campaign_row_ignores_stray_deal_columns() {
        let row = RawListingRow {
            id: "c1".to_string(),
            rate_per_view: Some(0.5),
            ..Default::default()
        };

        let listing = normalize(Collection::Campaigns, &row, &[]);
        assert_eq!(listing.kind, ListingKind::Campaign);
    }

    #[test]
    fn rest_json_row_deserializes_with_gaps() {
        let row: RawListingRow = serde_json::from_str(
            r#"{"id":"c9","brand_name":"Lyko","guidelines":null,"max_earnings":250.0}"#,
        )
        .unwrap();

        let listing = normalize(Collection::Campaigns, &row, &[]);
        assert_eq!(listing.brand, "Lyko");
        assert!(listing.guidelines.is_empty());
        assert_eq!(listing.max_earnings, 250.0);
    }
}
