pub mod listing;
pub mod tier;
