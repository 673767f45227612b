//! Turns user intents into store mutations and navigation changes, and hands
//! back what the display should do next.

use super::catalog::{export_file_name, is_in_catalog, ItemId};
use super::errors::CollectionError;
use super::models::Snapshot;
use super::photo::encode_data_uri;
use super::projection::{project, Filter, Projection};
use super::store::CollectionStore;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "intent", rename_all = "snake_case")]
pub enum Intent {
    /// Click on a card.
    PrimaryActivate { id: ItemId },
    /// Context click on a card.
    SecondaryActivate { id: ItemId },
    Decrement { id: ItemId },
    ImageLoadFailed { id: ItemId },
    ImageActivate { id: ItemId },
    SetFilter { filter: Filter },
    PrevPage,
    NextPage,
    Export,
    Import { contents: String },
}

/// What the display should do after an intent ran.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Outcome {
    Redraw {
        projection: Projection,
    },
    /// A local file must be picked for the item, then handed to
    /// [`Dispatcher::attach_photo`].
    PhotoRequested {
        id: ItemId,
        projection: Projection,
    },
    /// The content must be offered as a file download.
    Download {
        file_name: String,
        contents: String,
        projection: Projection,
    },
}

impl Outcome {
    pub fn projection(&self) -> &Projection {
        match self {
            Outcome::Redraw { projection }
            | Outcome::PhotoRequested { projection, .. }
            | Outcome::Download { projection, .. } => projection,
        }
    }
}

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewSession {
    pub filter: Filter,
    /// 1-based, clamped on every redraw.
    pub page: usize,
}

impl Default for ViewSession {
    fn default() -> Self {
        Self {
            filter: Filter::All,
            page: 1,
        }
    }
}

pub struct Dispatcher {
    store: CollectionStore,
    session: ViewSession,
    page_size: usize,
}

impl Dispatcher {
    pub fn new(store: CollectionStore, page_size: usize) -> Self {
        Self {
            store,
            session: ViewSession::default(),
            page_size: page_size.max(1),
        }
    }

    pub fn store(&self) -> &CollectionStore {
        &self.store
    }

    pub fn session(&self) -> ViewSession {
        self.session
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Projects the current state and keeps the session page in range.
    pub fn redraw(&mut self) -> Projection {
        let projection = project(
            self.store.state(),
            self.session.filter,
            self.session.page,
            self.page_size,
        );
        self.session.page = projection.page;
        projection
    }

    pub fn dispatch(&mut self, intent: Intent) -> Result<Outcome, CollectionError> {
        debug!("Dispatching {:?}", intent);
        match intent {
            Intent::PrimaryActivate { id } => {
                self.store.toggle_owned(id)?;
            }
            Intent::SecondaryActivate { id } => {
                self.store.increment_duplicate(id)?;
            }
            Intent::Decrement { id } => {
                self.store.decrement_duplicate(id)?;
            }
            Intent::ImageLoadFailed { id } => {
                self.store.mark_image_missing(id)?;
            }
            Intent::ImageActivate { id } => {
                if !is_in_catalog(id) {
                    return Err(CollectionError::UnknownItem(id));
                }
                if self.store.state().is_image_missing(id) {
                    return Ok(Outcome::PhotoRequested {
                        id,
                        projection: self.redraw(),
                    });
                }
            }
            Intent::SetFilter { filter } => {
                self.session = ViewSession { filter, page: 1 };
            }
            Intent::PrevPage => {
                if self.session.page > 1 {
                    self.session.page -= 1;
                }
            }
            Intent::NextPage => {
                self.session.page += 1;
            }
            Intent::Export => {
                let contents = self.store.export_snapshot().to_json()?;
                info!("Exported collection ({} bytes)", contents.len());
                return Ok(Outcome::Download {
                    file_name: export_file_name(),
                    contents,
                    projection: self.redraw(),
                });
            }
            Intent::Import { contents } => {
                let snapshot = Snapshot::parse(&contents)?;
                self.store.import_snapshot(snapshot)?;
            }
        }
        Ok(Outcome::Redraw {
            projection: self.redraw(),
        })
    }

    /// Continuation of [`Intent::ImageActivate`] once the file content is
    /// available. The item must still be flagged missing at this point.
    pub fn attach_photo(&mut self, id: ItemId, bytes: &[u8]) -> Result<Projection, CollectionError> {
        self.store.attach_custom_image(id, encode_data_uri(bytes))?;
        Ok(self.redraw())
    }
}
