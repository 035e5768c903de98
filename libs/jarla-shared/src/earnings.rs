use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::tier::{Tier, TierSchedule};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EarningsError {
    #[error("tier list is empty; no projection can be computed")]
    EmptyTierList,
    #[error("malformed tier set: {reason}")]
    MalformedTierSet { reason: String },
    #[error("max earnings must be a positive finite amount (got {0})")]
    InvalidCap(f64),
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProjectionPoint {
    pub views: f64,
    pub earnings: f64,
}

impl ProjectionPoint {
    pub const ORIGIN: ProjectionPoint = ProjectionPoint {
        views: 0.0,
        earnings: 0.0,
    };
}

/// Where cumulative payout meets the campaign's max earnings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CapPoint {
    Reached(ProjectionPoint),
    /// Payout stops growing before the cap; `ceiling` is where it stops.
    Unreachable { ceiling: ProjectionPoint },
}

impl CapPoint {
    pub fn reached(&self) -> Option<ProjectionPoint> {
        match self {
            CapPoint::Reached(point) => Some(*point),
            CapPoint::Unreachable { .. } => None,
        }
    }

    /// Last point of the earnings curve, whether or not the cap is met.
    pub fn point(&self) -> ProjectionPoint {
        match self {
            CapPoint::Reached(point) => *point,
            CapPoint::Unreachable { ceiling } => *ceiling,
        }
    }
}

/// The two points of the earnings-vs-views chart.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EarningsProjection {
    pub first: ProjectionPoint,
    pub max: CapPoint,
}

impl EarningsProjection {
    pub fn from_tiers(tiers: &[Tier], max_earnings: f64) -> Result<Self, EarningsError> {
        let schedule = TierSchedule::new(tiers.to_vec())?;
        compute_earnings_projection(&schedule, max_earnings)
    }
}

pub fn compute_earnings_projection(
    schedule: &TierSchedule,
    max_earnings: f64,
) -> Result<EarningsProjection, EarningsError> {
    if !max_earnings.is_finite() || max_earnings <= 0.0 {
        return Err(EarningsError::InvalidCap(max_earnings));
    }

    let first_tier = schedule.first();
    let first = match (first_tier.max_views, first_tier.full_earnings()) {
        (Some(max_views), Some(earned)) => ProjectionPoint {
            views: max_views as f64,
            earnings: earned.min(max_earnings),
        },
        _ => ProjectionPoint::ORIGIN,
    };

    Ok(EarningsProjection {
        first,
        max: cap_point(schedule, max_earnings),
    })
}

fn cap_point(schedule: &TierSchedule, max_earnings: f64) -> CapPoint {
    let mut cumulative = 0.0;
    let mut views_so_far = schedule.first().min_views as f64;

    for tier in schedule.tiers() {
        let remaining = max_earnings - cumulative;
        let start = tier.min_views as f64;

        match (tier.max_views, tier.full_earnings()) {
            (Some(max_views), Some(contribution)) => {
                if cumulative + contribution >= max_earnings {
                    let views = (start + tier.views_for(remaining)).min(max_views as f64);
                    return CapPoint::Reached(ProjectionPoint {
                        views,
                        earnings: max_earnings,
                    });
                }
                cumulative += contribution;
                views_so_far = max_views as f64;
            }
            _ => {
                if tier.rate > 0.0 {
                    return CapPoint::Reached(ProjectionPoint {
                        views: start + tier.views_for(remaining),
                        earnings: max_earnings,
                    });
                }
                return CapPoint::Unreachable {
                    ceiling: ProjectionPoint {
                        views: start,
                        earnings: cumulative,
                    },
                };
            }
        }
    }

    CapPoint::Unreachable {
        ceiling: ProjectionPoint {
            views: views_so_far,
            earnings: cumulative,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tier(min: u64, max: Option<u64>, rate: f64) -> Tier {
        Tier::new(min, max, rate).unwrap()
    }

    fn projection(tiers: Vec<Tier>, cap: f64) -> EarningsProjection {
        EarningsProjection::from_tiers(&tiers, cap).unwrap()
    }

    #[test]
    fn cap_met_at_first_tier_boundary() {
        let p = projection(vec![tier(0, Some(10000), 10.0), tier(10000, None, 5.0)], 100.0);

        assert_eq!(p.first, ProjectionPoint { views: 10000.0, earnings: 100.0 });
        assert_eq!(
            p.max,
            CapPoint::Reached(ProjectionPoint { views: 10000.0, earnings: 100.0 })
        );
    }

    #[test]
    fn cap_met_at_second_tier_boundary() {
        let p = projection(
            vec![
                tier(0, Some(5000), 8.0),
                tier(5000, Some(20000), 4.0),
                tier(20000, None, 2.0),
            ],
            100.0,
        );

        assert_eq!(p.first, ProjectionPoint { views: 5000.0, earnings: 40.0 });
        assert_eq!(
            p.max,
            CapPoint::Reached(ProjectionPoint { views: 20000.0, earnings: 100.0 })
        );
    }

    #[test]
    fn cap_inside_a_tier_uses_fractional_views() {
        // 40 from the first tier, the remaining 20 at 4 per 1000 views
        let p = projection(vec![tier(0, Some(5000), 8.0), tier(5000, None, 4.0)], 60.0);
        assert_eq!(p.max.reached().unwrap().views, 10000.0);
        assert_eq!(p.max.reached().unwrap().earnings, 60.0);
    }

    #[test]
    fn first_point_is_clamped_to_cap() {
        let p = projection(vec![tier(0, Some(10000), 10.0), tier(10000, None, 5.0)], 30.0);

        assert_eq!(p.first.earnings, 30.0);
        assert_eq!(p.first.views, 10000.0);
        assert_eq!(p.max.reached().unwrap().views, 3000.0);
    }

    #[test]
    fn open_first_tier_has_no_first_point() {
        let p = projection(vec![tier(0, None, 2.0)], 50.0);

        assert_eq!(p.first, ProjectionPoint::ORIGIN);
        assert_eq!(
            p.max,
            CapPoint::Reached(ProjectionPoint { views: 25000.0, earnings: 50.0 })
        );
    }

    #[test]
    fn open_final_tier_reached_after_bounded_tiers() {
        let p = projection(vec![tier(0, Some(1000), 10.0), tier(1000, None, 1.0)], 1010.0);
        // 10 from the first tier, 1000 more at 1 per 1000 views
        assert_eq!(
            p.max,
            CapPoint::Reached(ProjectionPoint { views: 1_001_000.0, earnings: 1010.0 })
        );
    }

    #[test]
    fn zero_rate_open_final_tier_never_reaches_cap() {
        let p = projection(vec![tier(0, Some(1000), 10.0), tier(1000, None, 0.0)], 100.0);
        assert_eq!(
            p.max,
            CapPoint::Unreachable {
                ceiling: ProjectionPoint { views: 1000.0, earnings: 10.0 }
            }
        );
        assert!(p.max.point().views.is_finite());
    }

    #[test]
    fn bounded_tiers_exhausted_before_cap() {
        let p = projection(vec![tier(0, Some(1000), 10.0), tier(1000, Some(3000), 5.0)], 100.0);
        assert_eq!(p.max.reached(), None);
        assert_eq!(p.max.point(), ProjectionPoint { views: 3000.0, earnings: 20.0 });
    }

    #[test]
    fn empty_tier_list_fails_loudly() {
        assert_eq!(
            EarningsProjection::from_tiers(&[], 100.0),
            Err(EarningsError::EmptyTierList)
        );
    }

    #[test]
    fn non_positive_cap_is_rejected() {
        let tiers = [tier(0, None, 1.0)];
        assert_eq!(
            EarningsProjection::from_tiers(&tiers, 0.0),
            Err(EarningsError::InvalidCap(0.0))
        );
        assert!(EarningsProjection::from_tiers(&tiers, f64::INFINITY).is_err());
    }

    #[test]
    fn first_point_matches_formula() {
        let cases = [(0, 2000, 3.0, 100.0), (0, 50000, 4.0, 100.0), (100, 1100, 7.5, 5.0)];
        for (min, max, rate, cap) in cases {
            let p = projection(vec![tier(min, Some(max), rate), tier(max, None, 1.0)], cap);
            let expected = ((max - min) as f64 / 1000.0 * rate).min(cap);
            assert_eq!(p.first.earnings, expected);
            assert_eq!(p.first.views, max as f64);
        }
    }

    #[test]
    fn raising_a_rate_never_delays_the_cap() {
        let base = vec![
            tier(0, Some(5000), 8.0),
            tier(5000, Some(20000), 4.0),
            tier(20000, None, 2.0),
        ];
        let caps = [10.0, 40.0, 75.0, 100.0, 250.0];

        for idx in 0..base.len() {
            for bump in [0.5, 1.0, 10.0] {
                let mut raised = base.clone();
                raised[idx].rate += bump;

                for cap in caps {
                    let before = projection(base.clone(), cap).max.reached().unwrap().views;
                    let after = projection(raised.clone(), cap).max.reached().unwrap().views;
                    assert!(
                        after <= before,
                        "tier {} +{} cap {}: {} > {}",
                        idx,
                        bump,
                        cap,
                        after,
                        before
                    );
                }
            }
        }
    }

    #[test]
    fn cap_earnings_equal_max_earnings() {
        for cap in [1.0, 33.3, 99.99, 1234.5] {
            let p = projection(vec![tier(0, Some(1000), 3.0), tier(1000, None, 1.5)], cap);
            assert_eq!(p.max.reached().unwrap().earnings, cap);
        }
    }
}
