//! The fixed album catalog and the asset paths derived from it.

use serde::Serialize;
use std::ops::RangeInclusive;

/// Number of items in the album.
pub const TOTAL: u32 = 468;

pub const DEFAULT_PAGE_SIZE: usize = 10;

pub const PLACEHOLDER_IMAGE_PATH: &str = "img/placeholder.jpg";

const APP_SHELL_ASSETS: &[&str] = &[
    "./",
    "./index.html",
    "./style.css",
    "./script.js",
    "./manifest.json",
    "./img/placeholder.jpg",
    "./img/icon-192.png",
    "./img/icon-512.png",
];

pub type ItemId = u32;

/// All the item identifiers, in ascending order.
pub fn catalog_ids() -> RangeInclusive<ItemId> {
    1..=TOTAL
}

pub fn is_in_catalog(id: ItemId) -> bool {
    catalog_ids().contains(&id)
}

pub fn default_image_path(id: ItemId) -> String {
    format!("img/{}.jpg", id)
}

/// File name offered when exporting the collection.
pub fn export_file_name() -> String {
    format!("album-{}.json", TOTAL)
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct AssetManifest {
    pub cache_name: String,
    pub assets: Vec<String>,
}

/// Everything an offline cache needs to serve the album without network:
/// the app shell plus the default image of every item.
pub fn asset_manifest() -> AssetManifest {
    let assets = APP_SHELL_ASSETS
        .iter()
        .map(|asset| asset.to_string())
        .chain(catalog_ids().map(|id| format!("./{}", default_image_path(id))))
        .collect();
    AssetManifest {
        cache_name: format!("album-{}-v1", TOTAL),
        assets,
    }
}
