use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::earnings::EarningsError;

/// Payout rate (currency units per 1000 views) over `[min_views, max_views)`.
/// `max_views = None` means the tier is open-ended.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Tier {
    pub min_views: u64,
    pub max_views: Option<u64>,
    pub rate: f64,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum TierError {
    #[error("rate must be a finite, non-negative number (got {0})")]
    InvalidRate(f64),
    #[error("tier upper bound {max} must be greater than lower bound {min}")]
    EmptyRange { min: u64, max: u64 },
}

impl Tier {
    pub fn new(min_views: u64, max_views: Option<u64>, rate: f64) -> Result<Self, TierError> {
        let tier = Self {
            min_views,
            max_views,
            rate,
        };
        tier.validate()?;
        Ok(tier)
    }

    pub fn validate(&self) -> Result<(), TierError> {
        if !self.rate.is_finite() || self.rate < 0.0 {
            return Err(TierError::InvalidRate(self.rate));
        }
        if let Some(max) = self.max_views {
            if max <= self.min_views {
                return Err(TierError::EmptyRange {
                    min: self.min_views,
                    max,
                });
            }
        }
        Ok(())
    }

    pub fn is_bounded(&self) -> bool {
        self.max_views.is_some()
    }

    /// Full payout of a bounded tier, `None` for the open-ended one.
    pub fn full_earnings(&self) -> Option<f64> {
        self.max_views
            .map(|max| max.saturating_sub(self.min_views) as f64 / 1000.0 * self.rate)
    }

    /// Views needed inside this tier to earn `amount`.
    pub fn views_for(&self, amount: f64) -> f64 {
        if self.rate <= 0.0 {
            return 0.0;
        }
        amount / self.rate * 1000.0
    }
}

/// A non-empty, ascending and gapless list of tiers. Only the last tier may be
/// open-ended.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TierSchedule {
    tiers: Vec<Tier>,
}

impl TierSchedule {
    pub fn new(tiers: Vec<Tier>) -> Result<Self, EarningsError> {
        if tiers.is_empty() {
            return Err(EarningsError::EmptyTierList);
        }

        for (idx, tier) in tiers.iter().enumerate() {
            tier.validate().map_err(|e| EarningsError::MalformedTierSet {
                reason: format!("tier {}: {}", idx, e),
            })?;
        }

        for (idx, pair) in tiers.windows(2).enumerate() {
            let (prev, next) = (&pair[0], &pair[1]);
            match prev.max_views {
                None => {
                    return Err(EarningsError::MalformedTierSet {
                        reason: format!("tier {} is open-ended but is not the last tier", idx),
                    });
                }
                Some(max) if max != next.min_views => {
                    return Err(EarningsError::MalformedTierSet {
                        reason: format!(
                            "tier {} ends at {} views but tier {} starts at {}",
                            idx,
                            max,
                            idx + 1,
                            next.min_views
                        ),
                    });
                }
                Some(_) => {}
            }
        }

        Ok(Self { tiers })
    }

    /// One open-ended tier paying `rate_per_view` for every view (deals).
    pub fn flat(rate_per_view: f64) -> Result<Self, EarningsError> {
        let tier = Tier::new(0, None, rate_per_view * 1000.0).map_err(|e| {
            EarningsError::MalformedTierSet {
                reason: e.to_string(),
            }
        })?;
        Self::new(vec![tier])
    }

    pub fn tiers(&self) -> &[Tier] {
        &self.tiers
    }

    pub fn first(&self) -> &Tier {
        // non-empty by construction
        &self.tiers[0]
    }

    /// Uncapped cumulative payout after `views` views.
    pub fn earnings_at(&self, views: f64) -> f64 {
        let mut total = 0.0;
        for tier in &self.tiers {
            let start = tier.min_views as f64;
            if views <= start {
                break;
            }
            let end = match tier.max_views {
                Some(max) => views.min(max as f64),
                None => views,
            };
            total += (end - start) / 1000.0 * tier.rate;
        }
        total
    }
}

impl<'de> Deserialize<'de> for TierSchedule {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let tiers = Vec::<Tier>::deserialize(deserializer)?;
        TierSchedule::new(tiers).map_err(serde::de::Error::custom)
    }
}
