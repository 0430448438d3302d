use crate::api::backend_api::ListKind;
use crate::api::{BackendApi, JikanApi};
use crate::error::AnidexError;
use crate::types::community::ListEntry;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddOutcome {
    /// False when the backend stored nothing (already on the list).
    pub added: bool,
    pub entry: ListEntry,
}

/// Per-user wishlist and watchlist, stored by the backend.
#[derive(Clone)]
pub struct ListService {
    backend: BackendApi,
    jikan: JikanApi,
}

impl ListService {
    pub fn new(backend: BackendApi, jikan: JikanApi) -> Self {
        Self { backend, jikan }
    }

    pub async fn list(&self, kind: ListKind, email: &str) -> Result<Vec<ListEntry>, AnidexError> {
        self.backend.list_entries(kind, email).await
    }

    pub async fn add_to_wishlist(&self, anime_id: u64, email: &str) -> Result<AddOutcome, AnidexError> {
        let anime = self.jikan.anime(anime_id).await?;
        let entry = ListEntry::from_anime(&anime, email, Utc::now());
        let reply = self.backend.add_entry(ListKind::Wishlist, &entry).await?;
        let added = reply.inserted();
        if added {
            info!(anime_id, user = email, "added to wishlist");
        } else {
            info!(anime_id, user = email, "already in wishlist");
        }
        Ok(AddOutcome { added, entry })
    }

    pub async fn remove(&self, kind: ListKind, entry_id: &str) -> Result<(), AnidexError> {
        self.backend.delete_entry(kind, entry_id).await?;
        Ok(())
    }

    /// Copy a wishlist entry into the watchlist, then drop it from the wishlist.
    pub async fn mark_watched(&self, entry_id: &str, email: &str) -> Result<ListEntry, AnidexError> {
        let wishlist = self.backend.list_entries(ListKind::Wishlist, email).await?;
        let entry = wishlist
            .into_iter()
            .find(|e| e.id.as_deref() == Some(entry_id))
            .ok_or_else(|| AnidexError::EntryNotFound(format!("wishlist entry {entry_id}")))?;

        let watched = entry.moved(Utc::now());
        let reply = self.backend.add_entry(ListKind::Watchlist, &watched).await?;
        if !reply.inserted() {
            warn!(entry_id, user = email, "watchlist reported no insert; removing from wishlist anyway");
        }
        self.backend.delete_entry(ListKind::Wishlist, entry_id).await?;
        info!(entry_id, anime_id = watched.anime_id, user = email, "moved to watchlist");
        Ok(watched)
    }
}
