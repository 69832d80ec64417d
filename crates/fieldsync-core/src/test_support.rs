//! Fakes shared by the unit tests of this crate.

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use fieldsync_remote::{
    ExpenseSubmission, NetworkError, RemoteSubmitter, TimeEntrySubmission, UploadCompletion,
    UploadRequest, UploadTarget,
};
use fieldsync_storage::{DraftStore, KeyValueStore, Partition, SqliteStore, StorageError};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;

use crate::clock::Clock;
use crate::geofence::{Position, PositionProvider, PositionRequest, PositionUnavailable};

pub fn memory_drafts() -> DraftStore {
    DraftStore::new(Arc::new(SqliteStore::open_in_memory().unwrap()))
}

/// Clock pinned to 2024-03-18 07:00 UTC unless moved
pub struct FixedClock {
    now: Mutex<DateTime<Utc>>,
}

impl Default for FixedClock {
    fn default() -> Self {
        Self {
            now: Mutex::new(Utc.with_ymd_and_hms(2024, 3, 18, 7, 0, 0).unwrap()),
        }
    }
}

impl FixedClock {
    pub fn advance(&self, by: chrono::Duration) {
        let mut now = self.now.lock().unwrap();
        *now += by;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}

/// Position provider returning a scripted answer
pub struct FakePositions {
    answer: Result<Position, PositionUnavailable>,
    delay: Option<Duration>,
}

impl FakePositions {
    pub fn at(latitude: f64, longitude: f64, timestamp: DateTime<Utc>) -> Self {
        Self {
            answer: Ok(Position {
                latitude,
                longitude,
                accuracy_meters: 8.0,
                timestamp,
            }),
            delay: None,
        }
    }

    pub fn failing(error: PositionUnavailable) -> Self {
        Self {
            answer: Err(error),
            delay: None,
        }
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

#[async_trait]
impl PositionProvider for FakePositions {
    async fn current_position(
        &self,
        _request: &PositionRequest,
    ) -> Result<Position, PositionUnavailable> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.answer.clone()
    }
}

/// Remote operations recorded by [`FakeRemote`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    TimeEntry,
    Expense,
    UploadTarget,
    Transfer,
    Complete,
}

/// In-memory remote that records calls and fails on demand
#[derive(Default)]
pub struct FakeRemote {
    calls: Mutex<Vec<(Op, String)>>,
    fail_times: Mutex<HashMap<Op, usize>>,
    failing_ids: Mutex<HashSet<String>>,
    gate: Option<(Arc<Notify>, Arc<Notify>)>,
    pub unreachable: AtomicBool,
    pub receipts: Mutex<Vec<Option<Vec<u8>>>>,
}

impl FakeRemote {
    /// Remote whose time-entry call parks until released; returns (remote, entered, release)
    pub fn gated() -> (Self, Arc<Notify>, Arc<Notify>) {
        let entered = Arc::new(Notify::new());
        let release = Arc::new(Notify::new());
        let remote = Self {
            gate: Some((entered.clone(), release.clone())),
            ..Self::default()
        };
        (remote, entered, release)
    }

    /// Fail the next `times` calls of `op`
    pub fn fail_next(&self, op: Op, times: usize) {
        self.fail_times.lock().unwrap().insert(op, times);
    }

    /// Always fail submissions carrying this draft id
    pub fn fail_id(&self, client_id: &str) {
        self.failing_ids.lock().unwrap().insert(client_id.to_string());
    }

    pub fn calls(&self) -> Vec<(Op, String)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn ops(&self) -> Vec<Op> {
        self.calls().into_iter().map(|(op, _)| op).collect()
    }

    pub fn count(&self, op: Op) -> usize {
        self.ops().into_iter().filter(|o| *o == op).count()
    }

    fn record(&self, op: Op, key: &str) -> Result<(), NetworkError> {
        self.calls.lock().unwrap().push((op, key.to_string()));

        if self.failing_ids.lock().unwrap().contains(key) {
            return Err(NetworkError::Rejected {
                api: "Fake",
                status: 422,
                body: format!("{key} rejected"),
            });
        }

        let mut fail_times = self.fail_times.lock().unwrap();
        if let Some(remaining) = fail_times.get_mut(&op) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(NetworkError::Unreachable(format!("{op:?} failed")));
            }
        }
        Ok(())
    }
}

#[async_trait]
impl RemoteSubmitter for FakeRemote {
    async fn create_time_entry(&self, entry: &TimeEntrySubmission) -> Result<(), NetworkError> {
        if let Some((entered, release)) = &self.gate {
            entered.notify_one();
            release.notified().await;
        }
        self.record(Op::TimeEntry, &entry.client_id)
    }

    async fn create_expense(&self, expense: &ExpenseSubmission) -> Result<(), NetworkError> {
        self.receipts
            .lock()
            .unwrap()
            .push(expense.receipt.as_ref().map(|r| r.data.clone()));
        self.record(Op::Expense, &expense.client_id)
    }

    async fn request_upload_target(
        &self,
        request: &UploadRequest,
    ) -> Result<UploadTarget, NetworkError> {
        self.record(Op::UploadTarget, &request.file_name)?;
        Ok(UploadTarget {
            upload_url: format!("https://uploads.example.com/{}", request.file_name),
            file_key: format!("photos/{}", request.file_name),
        })
    }

    async fn transfer_payload(
        &self,
        target: &UploadTarget,
        _payload: &[u8],
        _content_type: &str,
    ) -> Result<(), NetworkError> {
        self.record(Op::Transfer, &target.file_key)
    }

    async fn complete_upload(&self, completion: &UploadCompletion) -> Result<(), NetworkError> {
        self.record(Op::Complete, &completion.file_key)
    }

    async fn probe(&self) -> Result<(), NetworkError> {
        if self.unreachable.load(Ordering::SeqCst) {
            Err(NetworkError::Unreachable("no route".to_string()))
        } else {
            Ok(())
        }
    }

    fn system_name(&self) -> &'static str {
        "fake"
    }
}

/// Store wrapper counting reads and failing deletes on demand
pub struct CountingStore {
    inner: SqliteStore,
    pub reads: AtomicUsize,
    failing_deletes: Mutex<HashMap<Partition, usize>>,
}

impl Default for CountingStore {
    fn default() -> Self {
        Self {
            inner: SqliteStore::open_in_memory().unwrap(),
            reads: AtomicUsize::new(0),
            failing_deletes: Mutex::new(HashMap::new()),
        }
    }
}

impl CountingStore {
    /// Fail the next `times` deletes in `partition`
    pub fn fail_deletes(&self, partition: Partition, times: usize) {
        self.failing_deletes.lock().unwrap().insert(partition, times);
    }
}

#[async_trait]
impl KeyValueStore for CountingStore {
    async fn put(&self, partition: Partition, id: &str, value: &[u8]) -> Result<(), StorageError> {
        self.inner.put(partition, id, value).await
    }

    async fn get(&self, partition: Partition, id: &str) -> Result<Option<Vec<u8>>, StorageError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.inner.get(partition, id).await
    }

    async fn get_all(&self, partition: Partition) -> Result<Vec<(String, Vec<u8>)>, StorageError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.inner.get_all(partition).await
    }

    async fn delete(&self, partition: Partition, id: &str) -> Result<(), StorageError> {
        if let Some(remaining) = self.failing_deletes.lock().unwrap().get_mut(&partition) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(StorageError::Poisoned);
            }
        }
        self.inner.delete(partition, id).await
    }

    async fn count(&self, partition: Partition) -> Result<usize, StorageError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.inner.count(partition).await
    }
}
