//! Reconciles locally queued drafts with the remote system.
//!
//! A drain walks the drainable partitions in a fixed order (time entries,
//! expenses, pending photos), submits each record on its own, and deletes a
//! record only after the remote acknowledged it. A failing record is left in
//! place and retried on the next drain; it never stops the rest of the batch.

mod status;


use fieldsync_remote::{
    ExpenseSubmission, ReceiptUpload, RemoteSubmitter, SyncReport, TimeEntrySubmission,
    UploadCompletion, UploadRequest,
};
use fieldsync_storage::{
    DraftExpense, DraftStore, DraftTimeEntry, Partition, PendingPhoto, Record, StorageError,
    UploadCheckpoint,
};
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::clock::Clock;
use crate::connectivity::ConnectivitySignal;
use status::StatusBroadcaster;

pub use status::{Subscription, SyncStatus};

/// Why a drain did nothing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    Offline,
    AlreadySyncing,
    NothingPending,
}

/// Result of a call to [`SyncOrchestrator::drain`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DrainOutcome {
    Skipped(SkipReason),
    Completed(SyncReport),
}

/// Clears the in-flight flag when a drain ends, however it ends
struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Drains the local queue against the remote and publishes progress
pub struct SyncOrchestrator {
    drafts: DraftStore,
    remote: Arc<dyn RemoteSubmitter>,
    connectivity: Arc<dyn ConnectivitySignal>,
    clock: Arc<dyn Clock>,
    in_flight: AtomicBool,
    status: StatusBroadcaster,
}

impl SyncOrchestrator {
    #[must_use]
    pub fn new(
        drafts: DraftStore,
        remote: Arc<dyn RemoteSubmitter>,
        connectivity: Arc<dyn ConnectivitySignal>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            drafts,
            remote,
            connectivity,
            clock,
            in_flight: AtomicBool::new(false),
            status: StatusBroadcaster::default(),
        }
    }

    /// Current status snapshot
    #[must_use]
    pub fn status(&self) -> SyncStatus {
        self.status.snapshot()
    }

    /// Register a listener; it is called immediately with the current status
    /// and again on every change until the returned handle is dropped.
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&SyncStatus) + Send + Sync + 'static,
    {
        self.status.subscribe(Arc::new(listener))
    }

    /// Number of records waiting in the drainable partitions
    ///
    /// # Errors
    ///
    /// Returns an error if any partition count fails
    pub async fn get_pending_count(&self) -> Result<usize, StorageError> {
        let mut total = 0;
        for partition in Partition::DRAINABLE {
            total += self.drafts.raw().count(partition).await?;
        }
        Ok(total)
    }

    /// Recount pending records and publish the result
    ///
    /// # Errors
    ///
    /// Returns an error if any partition count fails
    pub async fn refresh_pending(&self) -> Result<usize, StorageError> {
        let pending = self.get_pending_count().await?;
        self.status.update(|s| s.pending = pending);
        Ok(pending)
    }

    /// Submit every queued record once.
    ///
    /// Does nothing when offline, when another drain is in flight, or when
    /// nothing is pending. Otherwise runs to completion regardless of how
    /// many records fail.
    pub async fn drain(&self) -> DrainOutcome {
        if !self.connectivity.is_online() {
            log::debug!("Skipping sync: offline");
            return DrainOutcome::Skipped(SkipReason::Offline);
        }

        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            log::debug!("Skipping sync: already syncing");
            return DrainOutcome::Skipped(SkipReason::AlreadySyncing);
        }
        let _in_flight = InFlight(&self.in_flight);

        let pending = match self.get_pending_count().await {
            Ok(0) => return DrainOutcome::Skipped(SkipReason::NothingPending),
            Ok(n) => n,
            Err(e) => {
                log::warn!("Could not count pending records, draining anyway: {e}");
                self.status.snapshot().pending
            }
        };

        log::info!("Sync started: {pending} pending");
        self.status.update(|s| {
            s.syncing = true;
            s.pending = pending;
            s.errors.clear();
        });

        let mut report = SyncReport::default();
        self.drain_time_entries(&mut report).await;
        self.drain_expenses(&mut report).await;
        self.drain_photos(&mut report).await;

        let pending = match self.get_pending_count().await {
            Ok(n) => n,
            Err(e) => {
                report.errors.push(format!("pending count: {e}"));
                pending.saturating_sub(report.successful)
            }
        };
        let finished_at = self.clock.now();

        log::info!(
            "Sync finished: {} submitted, {} failed, {pending} still pending",
            report.successful,
            report.failed
        );
        self.status.update(|s| {
            s.syncing = false;
            s.pending = pending;
            s.last_sync_at = Some(finished_at);
            s.errors.clone_from(&report.errors);
        });

        DrainOutcome::Completed(report)
    }

    /// Drain whenever connectivity comes back, until `shutdown` resolves.
    ///
    /// Drains once up front if already online.
    pub async fn run_auto_sync<F>(&self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        if self.connectivity.is_online() {
            self.drain().await;
        }

        log::info!("Auto-sync waiting for connectivity changes");
        loop {
            tokio::select! {
                () = self.connectivity.online_restored() => {
                    log::info!("Connectivity restored, draining queue");
                    self.drain().await;
                }
                () = &mut shutdown => {
                    log::info!("Auto-sync stopped");
                    break;
                }
            }
        }
    }

    /// Read a partition snapshot, decoding each record on its own
    async fn snapshot<R: Record>(&self, report: &mut SyncReport) -> Vec<R> {
        let rows = match self.drafts.raw().get_all(R::PARTITION).await {
            Ok(rows) => rows,
            Err(e) => {
                log::warn!("Failed to read {}: {e}", R::PARTITION);
                report.errors.push(format!("{}: {e}", R::PARTITION));
                return Vec::new();
            }
        };

        report.total_entries += rows.len();
        rows.into_iter()
            .filter_map(|(id, body)| match serde_json::from_slice(&body) {
                Ok(record) => Some(record),
                Err(e) => {
                    log::warn!("Unreadable record {}/{id}: {e}", R::PARTITION);
                    report.record_failure(format!("{} {id}: unreadable record: {e}", R::PARTITION));
                    None
                }
            })
            .collect()
    }

    /// Delete an acknowledged record, or keep a failed one queued.
    ///
    /// Returns whether the record left the queue.
    async fn settle<R: Record>(
        &self,
        id: &str,
        result: Result<(), String>,
        report: &mut SyncReport,
    ) -> bool {
        match result {
            Ok(()) => match self.drafts.delete::<R>(id).await {
                Ok(()) => {
                    log::debug!("Synced {}/{id}", R::PARTITION);
                    report.record_success();
                    true
                }
                Err(e) => {
                    log::error!("Submitted {}/{id} but could not remove it: {e}", R::PARTITION);
                    report.record_failure(format!(
                        "{} {id}: submitted but not removed locally: {e}",
                        R::PARTITION
                    ));
                    false
                }
            },
            Err(e) => {
                log::warn!("Failed to sync {}/{id}: {e}", R::PARTITION);
                report.record_failure(format!("{} {id}: {e}", R::PARTITION));
                false
            }
        }
    }

    async fn drain_time_entries(&self, report: &mut SyncReport) {
        for entry in self.snapshot::<DraftTimeEntry>(report).await {
            let result = self
                .remote
                .create_time_entry(&time_entry_submission(&entry))
                .await
                .map_err(|e| e.to_string());
            self.settle::<DraftTimeEntry>(&entry.id, result, report).await;
        }
    }

    async fn drain_expenses(&self, report: &mut SyncReport) {
        for expense in self.snapshot::<DraftExpense>(report).await {
            let result = self
                .remote
                .create_expense(&expense_submission(&expense))
                .await
                .map_err(|e| e.to_string());
            self.settle::<DraftExpense>(&expense.id, result, report).await;
        }
    }

    async fn drain_photos(&self, report: &mut SyncReport) {
        for photo in self.snapshot::<PendingPhoto>(report).await {
            let result = self.upload_photo(&photo).await;

            // The checkpoint must outlive a photo that is still queued
            if self.settle::<PendingPhoto>(&photo.id, result, report).await {
                if let Err(e) = self.drafts.delete::<UploadCheckpoint>(&photo.id).await {
                    log::warn!("Failed to clear upload checkpoint for {}: {e}", photo.id);
                }
            }
        }
    }

    /// Two-phase upload: target, transfer, completion.
    ///
    /// A successful transfer is checkpointed with its file key so a later
    /// drain only repeats the completion call instead of uploading again.
    async fn upload_photo(&self, photo: &PendingPhoto) -> Result<(), String> {
        let checkpoint = self
            .drafts
            .get::<UploadCheckpoint>(&photo.id)
            .await
            .map_err(|e| format!("checkpoint: {e}"))?;

        let file_key = if let Some(checkpoint) = checkpoint {
            log::info!(
                "Photo {} already transferred as {}, retrying completion",
                photo.id,
                checkpoint.file_key
            );
            checkpoint.file_key
        } else {
            let request = UploadRequest {
                project_id: photo.project_id.clone(),
                album_id: photo.album_id.clone(),
                file_name: photo.file_name.clone(),
                content_type: photo.content_type.clone(),
                size_bytes: photo.payload.len(),
            };
            let target = self
                .remote
                .request_upload_target(&request)
                .await
                .map_err(|e| format!("upload target: {e}"))?;

            self.remote
                .transfer_payload(&target, &photo.payload, &photo.content_type)
                .await
                .map_err(|e| format!("transfer: {e}"))?;

            let checkpoint = UploadCheckpoint {
                photo_id: photo.id.clone(),
                file_key: target.file_key.clone(),
                transferred_at: self.clock.now(),
            };
            if let Err(e) = self.drafts.put(&checkpoint).await {
                log::warn!("Failed to checkpoint upload of {}: {e}", photo.id);
            }
            target.file_key
        };

        let completion = UploadCompletion {
            file_key,
            project_id: photo.project_id.clone(),
            album_id: photo.album_id.clone(),
            description: photo.caption.clone(),
        };
        self.remote
            .complete_upload(&completion)
            .await
            .map_err(|e| format!("completion: {e}"))
    }
}

fn time_entry_submission(entry: &DraftTimeEntry) -> TimeEntrySubmission {
    TimeEntrySubmission {
        client_id: entry.id.clone(),
        project_id: entry.project_id.clone(),
        clock_in: entry.clock_in,
        notes: entry.notes.clone(),
        latitude: entry.location.map(|p| p.latitude),
        longitude: entry.location.map(|p| p.longitude),
    }
}

fn expense_submission(expense: &DraftExpense) -> ExpenseSubmission {
    ExpenseSubmission {
        client_id: expense.id.clone(),
        project_id: expense.project_id.clone(),
        category: expense.category.clone(),
        amount: expense.amount,
        description: expense.description.clone(),
        cost_code: expense.cost_code.clone(),
        mileage: expense.mileage,
        incurred_at: expense.timestamp,
        receipt: expense.receipt.as_ref().map(|r| ReceiptUpload {
            file_name: r.file_name.clone(),
            content_type: r.content_type.clone(),
            data: r.data.clone(),
        }),
    }
}
