use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use uuid::Uuid;

use crate::models::{MoodRecord, NewMoodRecord, UserProfile};

#[async_trait]
pub trait RecordStore: Send + Sync {
    /// First record owned by `owner_id` with `start <= created_at < end`.
    async fn find_in_window(
        &self,
        owner_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> anyhow::Result<Option<MoodRecord>>;

    /// Overwrites an existing record; `created_at` is never changed.
    async fn save(&self, record: &MoodRecord) -> anyhow::Result<()>;

    async fn create(&self, record: NewMoodRecord) -> anyhow::Result<MoodRecord>;

    /// Newest first.
    async fn records_since(
        &self,
        owner_id: &str,
        since: DateTime<Utc>,
    ) -> anyhow::Result<Vec<MoodRecord>>;
}

#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn get_or_create(&self, owner_id: &str) -> anyhow::Result<UserProfile>;

    async fn set_reminder(&self, owner_id: &str, enabled: bool) -> anyhow::Result<UserProfile>;
}

/// Process-local store used for dry runs and tests.
#[derive(Default)]
pub struct MemoryStore {
    records: DashMap<Uuid, MoodRecord>,
    profiles: DashMap<String, UserProfile>,
    writes: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record creates and saves performed so far.
    #[cfg(test)]
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    #[cfg(test)]
    pub fn records(&self) -> Vec<MoodRecord> {
        let mut records: Vec<MoodRecord> = self.records.iter().map(|entry| entry.value().clone()).collect();
        records.sort_by_key(|record| record.created_at);
        records
    }

    #[cfg(test)]
    pub fn profile_count(&self) -> usize {
        self.profiles.len()
    }

    #[cfg(test)]
    pub fn insert(&self, record: MoodRecord) {
        self.records.insert(record.id, record);
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn find_in_window(
        &self,
        owner_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> anyhow::Result<Option<MoodRecord>> {
        Ok(self
            .records
            .iter()
            .filter(|entry| {
                let record = entry.value();
                record.owner_id == owner_id && record.created_at >= start && record.created_at < end
            })
            .map(|entry| entry.value().clone())
            .min_by_key(|record| record.created_at))
    }

    async fn save(&self, record: &MoodRecord) -> anyhow::Result<()> {
        let mut stored = self
            .records
            .get_mut(&record.id)
            .ok_or_else(|| anyhow::anyhow!("mood record {} does not exist", record.id))?;
        stored.owner_id = record.owner_id.clone();
        stored.mood_level = record.mood_level;
        stored.emotions = record.emotions.clone();
        stored.emotion_sources = record.emotion_sources.clone();
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn create(&self, record: NewMoodRecord) -> anyhow::Result<MoodRecord> {
        let created = MoodRecord {
            id: Uuid::new_v4(),
            owner_id: record.owner_id,
            mood_level: record.mood_level,
            emotions: record.emotions,
            emotion_sources: record.emotion_sources,
            created_at: Utc::now(),
        };
        self.records.insert(created.id, created.clone());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(created)
    }

    async fn records_since(
        &self,
        owner_id: &str,
        since: DateTime<Utc>,
    ) -> anyhow::Result<Vec<MoodRecord>> {
        let mut records: Vec<MoodRecord> = self
            .records
            .iter()
            .filter(|entry| entry.value().owner_id == owner_id && entry.value().created_at >= since)
            .map(|entry| entry.value().clone())
            .collect();
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(records)
    }
}

#[async_trait]
impl ProfileStore for MemoryStore {
    async fn get_or_create(&self, owner_id: &str) -> anyhow::Result<UserProfile> {
        Ok(self
            .profiles
            .entry(owner_id.to_string())
            .or_insert_with(|| UserProfile {
                owner_id: owner_id.to_string(),
                reminder_enabled: false,
            })
            .clone())
    }

    async fn set_reminder(&self, owner_id: &str, enabled: bool) -> anyhow::Result<UserProfile> {
        let mut profile = self
            .profiles
            .entry(owner_id.to_string())
            .or_insert_with(|| UserProfile {
                owner_id: owner_id.to_string(),
                reminder_enabled: false,
            });
        profile.reminder_enabled = enabled;
        Ok(profile.clone())
    }
}
