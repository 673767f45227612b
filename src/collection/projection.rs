//! Pure derivations of what to display from the collection state.

use super::catalog::{catalog_ids, ItemId, TOTAL};
use super::models::{CollectionState, ImageRef};
use serde::{Deserialize, Serialize};

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "snake_case")]
pub enum Filter {
    #[default]
    All,
    Owned,
    Missing,
    Duplicates,
}

impl Filter {
    fn keeps(&self, state: &CollectionState, id: ItemId) -> bool {
        match self {
            Filter::All => true,
            Filter::Owned => state.is_owned(id),
            Filter::Missing => !state.is_owned(id),
            Filter::Duplicates => state.duplicate_count(id) > 0,
        }
    }
}

impl std::fmt::Display for Filter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Filter::All => "all",
            Filter::Owned => "owned",
            Filter::Missing => "missing",
            Filter::Duplicates => "duplicates",
        };
        f.write_str(name)
    }
}

/// Catalog ids kept by `filter`, always in ascending order.
pub fn filtered_ids(state: &CollectionState, filter: Filter) -> Vec<ItemId> {
    catalog_ids().filter(|id| filter.keeps(state, *id)).collect()
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// The requested page after clamping, 1-based.
    pub page: usize,
    pub total_pages: usize,
}

/// Slices `list` into pages of `page_size` items. There is always at least
/// one page, and `page` is clamped into the valid range.
pub fn paginate<T: Clone>(list: &[T], page: usize, page_size: usize) -> Page<T> {
    let page_size = page_size.max(1);
    let total_pages = list.len().div_ceil(page_size).max(1);
    let page = page.clamp(1, total_pages);
    let start = (page - 1) * page_size;
    let end = (start + page_size).min(list.len());
    Page {
        items: list[start..end].to_vec(),
        page,
        total_pages,
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct Counters {
    pub owned_count: usize,
    pub missing_count: usize,
    /// Total number of extra copies, not the number of items having some.
    pub duplicate_count: u64,
}

pub fn counters(state: &CollectionState) -> Counters {
    let owned_count = catalog_ids().filter(|id| state.is_owned(*id)).count();
    Counters {
        owned_count,
        missing_count: TOTAL as usize - owned_count,
        duplicate_count: state.duplicates().values().map(|count| *count as u64).sum(),
    }
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct CardView {
    pub id: ItemId,
    pub owned: bool,
    pub duplicates: u32,
    pub image: ImageRef,
    /// Photo upload is offered only when the stock image is known to be missing.
    pub photo_upload_allowed: bool,
    pub decrement_allowed: bool,
}

impl CardView {
    fn new(state: &CollectionState, id: ItemId) -> Self {
        let duplicates = state.duplicate_count(id);
        Self {
            id,
            owned: state.is_owned(id),
            duplicates,
            image: state.resolve_image(id),
            photo_upload_allowed: state.is_image_missing(id),
            decrement_allowed: duplicates > 0,
        }
    }
}

/// Everything the display needs to redraw itself.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct Projection {
    pub filter: Filter,
    pub page: usize,
    pub total_pages: usize,
    pub cards: Vec<CardView>,
    pub counters: Counters,
}

pub fn project(
    state: &CollectionState,
    filter: Filter,
    page: usize,
    page_size: usize,
) -> Projection {
    let ids = filtered_ids(state, filter);
    let page = paginate(&ids, page, page_size);
    Projection {
        filter,
        page: page.page,
        total_pages: page.total_pages,
        cards: page
            .items
            .iter()
            .map(|id| CardView::new(state, *id))
            .collect(),
        counters: counters(state),
    }
}
