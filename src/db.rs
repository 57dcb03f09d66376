use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::config::Settings;
use crate::models::{MoodRecord, NewMoodRecord, UserProfile};
use crate::store::{ProfileStore, RecordStore};

pub async fn connect(settings: &Settings) -> anyhow::Result<PgPool> {
    let database_url = settings.require_database_url()?;
    PgPoolOptions::new()
        .max_connections(settings.max_connections)
        .connect(database_url)
        .await
        .context("failed to connect to Postgres")
}

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

fn record_from_row(row: &PgRow) -> MoodRecord {
    MoodRecord {
        id: row.get("id"),
        owner_id: row.get("owner_id"),
        mood_level: row.get("mood_level"),
        emotions: row.get("emotions"),
        emotion_sources: row.get("emotion_sources"),
        created_at: row.get("created_at"),
    }
}

fn profile_from_row(row: &PgRow) -> UserProfile {
    UserProfile {
        owner_id: row.get("owner_id"),
        reminder_enabled: row.get("reminder_enabled"),
    }
}

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RecordStore for PgStore {
    async fn find_in_window(
        &self,
        owner_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> anyhow::Result<Option<MoodRecord>> {
        let row = sqlx::query(
            r#"
            SELECT id, owner_id, mood_level, emotions, emotion_sources, created_at
            FROM mood_journal.mood_records
            WHERE owner_id = $1 AND created_at >= $2 AND created_at < $3
            ORDER BY created_at
            LIMIT 1
            "#,
        )
        .bind(owner_id)
        .bind(start)
        .bind(end)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(record_from_row))
    }

    async fn save(&self, record: &MoodRecord) -> anyhow::Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE mood_journal.mood_records
            SET owner_id = $2, mood_level = $3, emotions = $4, emotion_sources = $5
            WHERE id = $1
            "#,
        )
        .bind(record.id)
        .bind(&record.owner_id)
        .bind(record.mood_level)
        .bind(&record.emotions)
        .bind(&record.emotion_sources)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            anyhow::bail!("mood record {} does not exist", record.id);
        }
        Ok(())
    }

    async fn create(&self, record: NewMoodRecord) -> anyhow::Result<MoodRecord> {
        let row = sqlx::query(
            r#"
            INSERT INTO mood_journal.mood_records
            (id, owner_id, mood_level, emotions, emotion_sources)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, owner_id, mood_level, emotions, emotion_sources, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&record.owner_id)
        .bind(record.mood_level)
        .bind(&record.emotions)
        .bind(&record.emotion_sources)
        .fetch_one(&self.pool)
        .await?;

        Ok(record_from_row(&row))
    }

    async fn records_since(
        &self,
        owner_id: &str,
        since: DateTime<Utc>,
    ) -> anyhow::Result<Vec<MoodRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT id, owner_id, mood_level, emotions, emotion_sources, created_at
            FROM mood_journal.mood_records
            WHERE owner_id = $1 AND created_at >= $2
            ORDER BY created_at DESC
            "#,
        )
        .bind(owner_id)
        .bind(since)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(record_from_row).collect())
    }
}

#[async_trait]
impl ProfileStore for PgStore {
    async fn get_or_create(&self, owner_id: &str) -> anyhow::Result<UserProfile> {
        let row = sqlx::query(
            r#"
            INSERT INTO mood_journal.profiles (owner_id)
            VALUES ($1)
            ON CONFLICT (owner_id) DO UPDATE
            SET owner_id = EXCLUDED.owner_id
            RETURNING owner_id, reminder_enabled
            "#,
        )
        .bind(owner_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(profile_from_row(&row))
    }

    async fn set_reminder(&self, owner_id: &str, enabled: bool) -> anyhow::Result<UserProfile> {
        let row = sqlx::query(
            r#"
            INSERT INTO mood_journal.profiles (owner_id, reminder_enabled)
            VALUES ($1, $2)
            ON CONFLICT (owner_id) DO UPDATE
            SET reminder_enabled = EXCLUDED.reminder_enabled
            RETURNING owner_id, reminder_enabled
            "#,
        )
        .bind(owner_id)
        .bind(enabled)
        .fetch_one(&self.pool)
        .await?;

        Ok(profile_from_row(&row))
    }
}
