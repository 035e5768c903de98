use anyhow::{Context, Result};
use std::sync::Arc;

use jarla_db::recent::{JsonFileRecentStore, RecentlyViewed};
use jarla_db::{Collection, ListingLoader, ListingSource, LoaderConfig};
use jarla_shared::format::{format_money, format_views};
use jarla_shared::{CapPoint, EarningsProjection, Listing, Tier};

use crate::backend::Backend;
use crate::config::FeedConfig;

const EMPTY_STATE: &str = "Nothing here yet.";

/// Parses `min-max:rate` tiers separated by commas, e.g. `0-10000:10,10000-:5`.
/// An empty upper bound makes the tier open-ended.
pub fn parse_tiers(input: &str) -> Result<Vec<Tier>> {
    input
        .split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| -> Result<Tier> {
            let (range, rate) = part
                .split_once(':')
                .with_context(|| format!("Tier '{}' is missing ':rate'", part))?;
            let (min, max) = range
                .split_once('-')
                .with_context(|| format!("Tier '{}' is missing 'min-max'", part))?;

            let min: u64 = min
                .trim()
                .parse()
                .with_context(|| format!("Invalid min views in '{}'", part))?;
            let max = match max.trim() {
                "" => None,
                value => Some(
                    value
                        .parse::<u64>()
                        .with_context(|| format!("Invalid max views in '{}'", part))?,
                ),
            };
            let rate: f64 = rate
                .trim()
                .parse()
                .with_context(|| format!("Invalid rate in '{}'", part))?;

            Ok(Tier::new(min, max, rate)?)
        })
        .collect()
}

pub fn describe_projection(projection: &EarningsProjection, currency: &str) -> Vec<String> {
    let mut lines = Vec::new();
    if projection.first.views > 0.0 {
        lines.push(format!(
            "First tier: {} at {}",
            format_money(projection.first.earnings, currency),
            format_views(projection.first.views)
        ));
    }
    match projection.max {
        CapPoint::Reached(point) => lines.push(format!(
            "Max payout: {} at {}",
            format_money(point.earnings, currency),
            format_views(point.views)
        )),
        CapPoint::Unreachable { ceiling } => lines.push(format!(
            "Max payout not reachable: earnings stop at {} after {}",
            format_money(ceiling.earnings, currency),
            format_views(ceiling.views)
        )),
    }
    lines
}

pub fn describe_listing(listing: &Listing, currency: &str) -> String {
    let header = format!(
        "[{}] {} - {} (up to {})",
        listing.id,
        if listing.brand.is_empty() {
            "Unknown brand"
        } else {
            listing.brand.as_str()
        },
        listing.title,
        format_money(listing.max_earnings, currency)
    );

    match listing.projection() {
        Ok(projection) => format!(
            "{}\n    {}",
            header,
            describe_projection(&projection, currency).join("\n    ")
        ),
        Err(e) => format!("{}\n    No projection: {}", header, e),
    }
}

fn print_listings(listings: &[Listing], currency: &str) {
    if listings.is_empty() {
        println!("{}", EMPTY_STATE);
        return;
    }
    for listing in listings {
        println!("{}", describe_listing(listing, currency));
    }
}

fn recent_list(config: &FeedConfig) -> RecentlyViewed<JsonFileRecentStore> {
    RecentlyViewed::new(
        JsonFileRecentStore::new(&config.recent_path),
        config.recent_capacity,
    )
}

pub fn projection(tiers: &str, max_earnings: f64, currency: &str) -> Result<()> {
    let tiers = parse_tiers(tiers)?;
    let projection = EarningsProjection::from_tiers(&tiers, max_earnings)?;
    for line in describe_projection(&projection, currency) {
        println!("{}", line);
    }
    Ok(())
}

pub async fn feed(
    backend: &Backend,
    config: &FeedConfig,
    collection: Collection,
    pages: usize,
) -> Result<()> {
    let loader = ListingLoader::new(
        backend.source(),
        LoaderConfig::new(collection)
            .with_batch_size(config.batch_size)
            .with_active_only(config.active_only),
    );

    loader.start().await;
    for _ in 1..pages {
        if !loader.has_more().await {
            break;
        }
        loader.load_more().await;
    }

    print_listings(&loader.items().await, &config.currency);
    if let Some(failure) = loader.last_failure().await {
        eprintln!("Feed ended early: {}", failure);
    } else if loader.has_more().await {
        println!("(more available, offset {})", loader.cursor().await.offset);
    }
    Ok(())
}

pub fn view(config: &FeedConfig, id: &str) -> Result<()> {
    let ids = recent_list(config).record(id)?;
    println!("Recorded {} ({} recently viewed)", id, ids.len());
    Ok(())
}

pub async fn recent(
    source: Arc<dyn ListingSource>,
    config: &FeedConfig,
    collection: Collection,
    clear: bool,
) -> Result<()> {
    let recent = recent_list(config);
    if clear {
        recent.clear()?;
        println!("Recently viewed list cleared.");
        return Ok(());
    }

    let listings = jarla_db::loader::fetch_ordered(&source, collection, &recent.ids()?).await?;
    print_listings(&listings, &config.currency);
    Ok(())
}

pub async fn favorites(
    backend: &Backend,
    config: &FeedConfig,
    user_id: &str,
    collection: Collection,
) -> Result<()> {
    let ids = backend.favorite_ids(user_id).await?;
    let listings = jarla_db::loader::fetch_ordered(&backend.source(), collection, &ids).await?;
    print_listings(&listings, &config.currency);
    Ok(())
}
