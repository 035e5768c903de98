pub mod earnings;
pub mod format;
pub mod listing;
pub mod tier;

pub use earnings::{
    CapPoint, EarningsError, EarningsProjection, ProjectionPoint, compute_earnings_projection,
};
pub use listing::{Listing, ListingKind};
pub use tier::{Tier, TierError, TierSchedule};
