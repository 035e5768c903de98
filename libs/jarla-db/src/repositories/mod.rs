pub mod favorite_repo;
pub mod listing_repo;

pub use favorite_repo::FavoriteRepository;
pub use listing_repo::PgListingRepository;
