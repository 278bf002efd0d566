//! Starter outdoor-gear catalog.
//!
//! Used to populate an empty store so the search pipeline has something to
//! index on first run.

use crate::error::Result;
use crate::model::{NewCatalogItem, Price};
use crate::schema::Database;

const SEED_ITEMS: &[(&str, &str, i64, &str)] = &[
    (
        "Solar Powered Flashlight",
        "A fantastic product for outdoor enthusiasts. Charges in daylight and runs all night.",
        1999,
        "images/flashlight.png",
    ),
    (
        "Hiking Poles",
        "Ideal for camping and hiking trips. Lightweight aluminium with cork grips.",
        2499,
        "images/hiking-poles.png",
    ),
    (
        "Outdoor Rain Jacket",
        "This product will keep you warm and dry in all weathers.",
        4999,
        "images/rain-jacket.png",
    ),
    (
        "Survival Kit",
        "A must-have for any outdoor adventurer: fire starter, whistle, compass and first aid.",
        9999,
        "images/survival-kit.png",
    ),
    (
        "Outdoor Backpack",
        "This backpack is perfect for carrying all your outdoor essentials on multi-day hikes.",
        3999,
        "images/backpack.png",
    ),
    (
        "Camping Cookware",
        "This cookware set is ideal for cooking outdoors over a stove or open fire.",
        2999,
        "images/cookware.png",
    ),
    (
        "Camping Stove",
        "This stove is perfect for cooking outdoors. Compact single burner, runs on isobutane.",
        4999,
        "images/stove.png",
    ),
    (
        "Camping Lantern",
        "This lantern is perfect for lighting up your campsite. Dimmable LED, 40 hour runtime.",
        1999,
        "images/lantern.png",
    ),
    (
        "Camping Tent",
        "This tent is perfect for camping trips. Sleeps two people, weighs under two kilos.",
        9999,
        "images/tent.png",
    ),
    (
        "Sleeping Bag",
        "Mummy bag rated to minus five degrees, packs down small for backpacking.",
        7499,
        "images/sleeping-bag.png",
    ),
];

/// The starter catalog as insertable items.
pub fn default_items() -> Result<Vec<NewCatalogItem>> {
    SEED_ITEMS
        .iter()
        .map(|(name, description, cents, image)| {
            Ok(NewCatalogItem::new(
                *name,
                *description,
                Price::from_cents(*cents)?,
                *image,
            ))
        })
        .collect()
}

/// Insert the starter catalog when the store holds no items.
///
/// Returns the number of items inserted (0 when the store was not empty).
pub fn seed_if_empty(db: &Database) -> Result<usize> {
    if db.count_items()? > 0 {
        log::debug!("Catalog already populated, skipping seed");
        return Ok(0);
    }

    let items = default_items()?;
    for item in &items {
        db.insert_item(item)?;
    }
    log::info!("Seeded catalog with {} items", items.len());
    Ok(items.len())
}
