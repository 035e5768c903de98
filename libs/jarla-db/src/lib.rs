pub mod db;
pub mod loader;
pub mod models;
pub mod normalize;
pub mod recent;
pub mod repositories;
pub mod source;

pub use loader::{ListingLoader, LoadOutcome, LoadState, LoaderConfig, SessionEvent};
pub use source::{Collection, ListingSource, PageRequest};
pub use sqlx;
