//! Typed access to the local store.

use std::sync::Arc;

use crate::error::{Result, StorageError};
use crate::models::Record;
use crate::store::{KeyValueStore, Partition};

/// Record-level view over any [`KeyValueStore`]
#[derive(Clone)]
pub struct DraftStore {
    inner: Arc<dyn KeyValueStore>,
}

impl DraftStore {
    #[must_use]
    pub fn new(inner: Arc<dyn KeyValueStore>) -> Self {
        Self { inner }
    }

    /// Underlying byte-level store
    #[must_use]
    pub fn raw(&self) -> &Arc<dyn KeyValueStore> {
        &self.inner
    }

    /// Persist a record, replacing any record with the same id
    ///
    /// # Errors
    ///
    /// Returns an error if encoding or the underlying write fails
    pub async fn put<R: Record>(&self, record: &R) -> Result<()> {
        let body = serde_json::to_vec(record)?;
        self.inner.put(R::PARTITION, record.id(), &body).await
    }

    /// Load a record by id
    ///
    /// # Errors
    ///
    /// Returns an error if the read fails or the stored body cannot be decoded
    pub async fn get<R: Record>(&self, id: &str) -> Result<Option<R>> {
        match self.inner.get(R::PARTITION, id).await? {
            Some(body) => Ok(Some(serde_json::from_slice(&body)?)),
            None => Ok(None),
        }
    }

    /// Load every record of a kind, in the store's enumeration order
    ///
    /// # Errors
    ///
    /// Returns an error if the read fails or any stored body cannot be decoded
    pub async fn get_all<R: Record>(&self) -> Result<Vec<R>> {
        self.inner
            .get_all(R::PARTITION)
            .await?
            .into_iter()
            .map(|(_, body)| serde_json::from_slice(&body).map_err(StorageError::from))
            .collect()
    }

    /// Delete a record by id; absent ids are ignored
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying delete fails
    pub async fn delete<R: Record>(&self, id: &str) -> Result<()> {
        self.inner.delete(R::PARTITION, id).await
    }

    /// Number of stored records of a kind
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying count fails
    pub async fn count<R: Record>(&self) -> Result<usize> {
        self.inner.count(R::PARTITION).await
    }

    /// Discard a user draft that should never be submitted.
    ///
    /// Returns whether a draft was removed. Discarding a photo also drops its
    /// upload checkpoint.
    ///
    /// # Errors
    ///
    /// Returns an error if `partition` does not hold drafts or the store fails
    pub async fn discard(&self, partition: Partition, id: &str) -> Result<bool> {
        if !partition.is_draft() {
            return Err(StorageError::NotADraft(partition));
        }

        let existed = self.inner.get(partition, id).await?.is_some();
        self.inner.delete(partition, id).await?;
        if partition == Partition::PendingPhotos {
            self.inner.delete(Partition::UploadCheckpoints, id).await?;
        }

        if existed {
            log::info!("Discarded draft {partition}/{id}");
        }
        Ok(existed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::SqliteStore;
    use crate::models::{DraftTimeEntry, GeoPoint, PendingPhoto, UploadCheckpoint};
    use chrono::Utc;

    fn drafts() -> DraftStore {
        DraftStore::new(Arc::new(SqliteStore::open_in_memory().unwrap()))
    }

    #[tokio::test]
    async fn test_typed_round_trip() {
        let drafts = drafts();
        let entry = DraftTimeEntry::new(
            "p-7".to_string(),
            Utc::now(),
            Some("Arrived at gate 3".to_string()),
            Some(GeoPoint::new(30.0, -95.0)),
        );

        drafts.put(&entry).await.unwrap();

        let loaded: DraftTimeEntry = drafts.get(&entry.id).await.unwrap().unwrap();
        assert_eq!(loaded, entry);
        assert_eq!(drafts.count::<DraftTimeEntry>().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_get_all_returns_every_record() {
        let drafts = drafts();
        for project in ["a", "b", "c"] {
            let entry = DraftTimeEntry::new(project.to_string(), Utc::now(), None, None);
            drafts.put(&entry).await.unwrap();
        }

        let mut projects: Vec<String> = drafts
            .get_all::<DraftTimeEntry>()
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.project_id)
            .collect();
        projects.sort();
        assert_eq!(projects, vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_discard_photo_drops_checkpoint() {
        let drafts = drafts();
        let photo = PendingPhoto::new(
            "p-1".to_string(),
            "rebar.jpg".to_string(),
            "image/jpeg".to_string(),
            vec![1, 2, 3],
            Utc::now(),
        );
        drafts.put(&photo).await.unwrap();
        drafts
            .put(&UploadCheckpoint {
                photo_id: photo.id.clone(),
                file_key: "uploads/rebar.jpg".to_string(),
                transferred_at: Utc::now(),
            })
            .await
            .unwrap();

        assert!(drafts
            .discard(Partition::PendingPhotos, &photo.id)
            .await
            .unwrap());
        assert!(drafts.get::<PendingPhoto>(&photo.id).await.unwrap().is_none());
        assert!(drafts
            .get::<UploadCheckpoint>(&photo.id)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_discard_missing_draft_reports_false() {
        let drafts = drafts();
        assert!(!drafts.discard(Partition::Expenses, "nope").await.unwrap());
    }

    #[tokio::test]
    async fn test_discard_rejects_non_draft_partition() {
        let drafts = drafts();
        let err = drafts
            .discard(Partition::SiteCoordinates, "p-1")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            StorageError::NotADraft(Partition::SiteCoordinates)
        ));
    }
}
