use serde::{Deserialize, Serialize};

use crate::earnings::{EarningsError, EarningsProjection, compute_earnings_projection};
use crate::tier::{Tier, TierSchedule};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ListingKind {
    Campaign,
    Deal { rate_per_view: f64, deal_type: String },
}

/// Campaign or deal as the feed holds it in memory. Never contains nulls:
/// missing backend values are already replaced by empty defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Listing {
    pub id: String,
    pub brand: String,
    pub title: String,
    pub description: String,
    pub max_earnings: f64,
    pub logo: String,
    pub image: String,
    pub content_type: String,
    pub product_visibility: String,
    pub video_length: String,
    pub guidelines: Vec<String>,
    pub tiers: Vec<Tier>,
    pub example_images: Vec<String>,
    #[serde(flatten)]
    pub kind: ListingKind,
}

impl Listing {
    pub fn is_deal(&self) -> bool {
        matches!(self.kind, ListingKind::Deal { .. })
    }

    pub fn schedule(&self) -> Result<TierSchedule, EarningsError> {
        match &self.kind {
            ListingKind::Campaign => TierSchedule::new(self.tiers.clone()),
            ListingKind::Deal { rate_per_view, .. } => TierSchedule::flat(*rate_per_view),
        }
    }

    pub fn projection(&self) -> Result<EarningsProjection, EarningsError> {
        compute_earnings_projection(&self.schedule()?, self.max_earnings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::earnings::{CapPoint, ProjectionPoint};

    fn listing(kind: ListingKind, tiers: Vec<Tier>) -> Listing {
        Listing {
            id: "c1".to_string(),
            brand: "Oatly".to_string(),
            title: "Morning routine".to_string(),
            description: String::new(),
            max_earnings: 100.0,
            logo: String::new(),
            image: String::new(),
            content_type: "video".to_string(),
            product_visibility: String::new(),
            video_length: "30s".to_string(),
            guidelines: vec![],
            tiers,
            example_images: vec![],
            kind,
        }
    }

    #[test]
    fn campaign_projection_uses_tiers() {
        let tiers = vec![
            Tier::new(0, Some(10000), 10.0).unwrap(),
            Tier::new(10000, None, 5.0).unwrap(),
        ];
        let p = listing(ListingKind::Campaign, tiers).projection().unwrap();
        assert_eq!(
            p.max,
            CapPoint::Reached(ProjectionPoint { views: 10000.0, earnings: 100.0 })
        );
    }

    #[test]
    fn campaign_without_tiers_fails() {
        let err = listing(ListingKind::Campaign, vec![]).projection().unwrap_err();
        assert_eq!(err, EarningsError::EmptyTierList);
    }

    #[test]
    fn deal_projection_uses_flat_rate() {
        let deal = listing(
            ListingKind::Deal {
                rate_per_view: 0.5,
                deal_type: "fixed".to_string(),
            },
            vec![],
        );
        let p = deal.projection().unwrap();
        assert_eq!(p.first, ProjectionPoint::ORIGIN);
        assert_eq!(p.max.reached().unwrap().views, 200.0);
        assert!(deal.is_deal());
    }

    #[test]
    fn kind_is_flattened_in_json() {
        let deal = listing(
            ListingKind::Deal {
                rate_per_view: 0.5,
                deal_type: "fixed".to_string(),
            },
            vec![],
        );
        let value = serde_json::to_value(&deal).unwrap();
        assert_eq!(value["kind"], "deal");
        assert_eq!(value["deal_type"], "fixed");

        let back: Listing = serde_json::from_value(value).unwrap();
        assert_eq!(back, deal);
    }
}
