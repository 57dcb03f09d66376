use std::sync::Arc;

use anyhow::Context;
use chrono::{DateTime, Local, LocalResult, NaiveDate, TimeZone, Utc};
use tracing::{info, warn};

use crate::jobs::ReminderJobs;
use crate::models::{MoodAnswers, MoodRecord, NewMoodRecord};
use crate::store::{ProfileStore, RecordStore};
use crate::transport::Channel;

pub const CREATED_NOTICE: &str = "Mood berhasil tercatat!";
pub const UPDATED_NOTICE: &str =
    "Anda telah mengisi catatan hari ini sehingga catatan lama akan diperbarui.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileKind {
    Created,
    Updated,
}

#[derive(Debug, Clone)]
pub struct Reconciliation {
    pub kind: ReconcileKind,
    pub record: MoodRecord,
    pub reminder_stopped: bool,
}

/// `[start of day, start of next day)` around `now`, in `now`'s time zone.
pub fn day_window<Tz: TimeZone>(now: &DateTime<Tz>) -> (DateTime<Utc>, DateTime<Utc>) {
    let today = now.date_naive();
    let tomorrow = today.succ_opt().unwrap_or(today);
    let zone = now.timezone();
    (midnight(&zone, today), midnight(&zone, tomorrow))
}

fn midnight<Tz: TimeZone>(zone: &Tz, date: NaiveDate) -> DateTime<Utc> {
    let naive = date.and_time(chrono::NaiveTime::MIN);
    match zone.from_local_datetime(&naive) {
        LocalResult::Single(at) | LocalResult::Ambiguous(at, _) => at.with_timezone(&Utc),
        // Midnight skipped by a DST jump; the day starts at the first instant after it.
        LocalResult::None => zone.from_utc_datetime(&naive).with_timezone(&Utc),
    }
}

/// Writes the day's answers as a single record per owner and calendar day.
pub struct Reconciler {
    profiles: Arc<dyn ProfileStore>,
    records: Arc<dyn RecordStore>,
    jobs: Arc<dyn ReminderJobs>,
}

impl Reconciler {
    pub fn new(
        profiles: Arc<dyn ProfileStore>,
        records: Arc<dyn RecordStore>,
        jobs: Arc<dyn ReminderJobs>,
    ) -> Self {
        Self {
            profiles,
            records,
            jobs,
        }
    }

    pub async fn reconcile(
        &self,
        channel: &dyn Channel,
        owner_id: &str,
        answers: &MoodAnswers,
    ) -> anyhow::Result<Reconciliation> {
        self.reconcile_at(channel, owner_id, answers, Local::now()).await
    }

    pub async fn reconcile_at<Tz>(
        &self,
        channel: &dyn Channel,
        owner_id: &str,
        answers: &MoodAnswers,
        now: DateTime<Tz>,
    ) -> anyhow::Result<Reconciliation>
    where
        Tz: TimeZone + Send + Sync,
        Tz::Offset: Send + Sync,
    {
        let profile = self
            .profiles
            .get_or_create(owner_id)
            .await
            .with_context(|| format!("failed to load profile for {owner_id}"))?;

        let (start, end) = day_window(&now);
        let existing = self
            .records
            .find_in_window(&profile.owner_id, start, end)
            .await
            .context("failed to look up today's mood record")?;

        let (kind, record) = match existing {
            Some(mut record) => {
                record.owner_id = profile.owner_id.clone();
                record.emotions = answers.emotions.clone();
                record.emotion_sources = answers.emotion_sources.clone();
                record.mood_level = answers.mood_level;
                self.records
                    .save(&record)
                    .await
                    .context("failed to update today's mood record")?;
                info!(owner_id = %record.owner_id, record_id = %record.id, "mood record updated");
                channel
                    .follow_up(UPDATED_NOTICE, None)
                    .await
                    .context("failed to send update notice")?;
                (ReconcileKind::Updated, record)
            }
            None => {
                let record = self
                    .records
                    .create(NewMoodRecord {
                        owner_id: profile.owner_id.clone(),
                        mood_level: answers.mood_level,
                        emotions: answers.emotions.clone(),
                        emotion_sources: answers.emotion_sources.clone(),
                    })
                    .await
                    .context("failed to create mood record")?;
                info!(owner_id = %record.owner_id, record_id = %record.id, "mood record created");
                channel
                    .follow_up(CREATED_NOTICE, None)
                    .await
                    .context("failed to send create notice")?;
                (ReconcileKind::Created, record)
            }
        };

        let reminder_stopped = profile.reminder_enabled && self.stop_reminder(&profile.owner_id);

        Ok(Reconciliation {
            kind,
            record,
            reminder_stopped,
        })
    }

    fn stop_reminder(&self, owner_id: &str) -> bool {
        if !self.jobs.has(owner_id) {
            return false;
        }
        let Some(job) = self.jobs.get(owner_id) else {
            return false;
        };
        match job.stop() {
            Ok(()) => {
                info!(owner_id, "pending reminder stopped");
                true
            }
            Err(err) => {
                warn!(owner_id, error = %err, "failed to stop reminder job");
                false
            }
        }
    }
}
