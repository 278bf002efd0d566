pub mod ids;
pub mod item;
pub mod price;

pub use ids::ItemId;
pub use item::{CatalogItem, NewCatalogItem};
pub use price::Price;
