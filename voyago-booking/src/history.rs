use crate::models::HistoryRecord;
use crate::repository::HistoryRepository;
use async_trait::async_trait;
use std::sync::{PoisonError, RwLock};
use uuid::Uuid;

/// Append-only audit log of booking status transitions, kept in memory.
/// Records are never updated or deleted once written.
#[derive(Default)]
pub struct HistoryRecorder {
    records: RwLock<Vec<HistoryRecord>>,
}

impl HistoryRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Walks a booking's trail ordered by change time ascending. Each call
    /// starts from the beginning, so iteration is restartable.
    pub fn iter_for(&self, booking_id: Uuid) -> impl Iterator<Item = HistoryRecord> {
        let records = self.records.read().unwrap_or_else(PoisonError::into_inner);
        let mut trail: Vec<HistoryRecord> = records
            .iter()
            .filter(|r| r.booking_id == booking_id)
            .cloned()
            .collect();
        trail.sort_by_key(|r| r.changed_at);
        trail.into_iter()
    }
}

#[async_trait]
impl HistoryRepository for HistoryRecorder {
    async fn append(
        &self,
        record: &HistoryRecord,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.records
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(record.clone());
        Ok(())
    }

    async fn history_for(
        &self,
        booking_id: Uuid,
    ) -> Result<Vec<HistoryRecord>, Box<dyn std::error::Error + Send + Sync>> {
        Ok(self.iter_for(booking_id).collect())
    }
}
