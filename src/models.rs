use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoodRecord {
    pub id: Uuid,
    pub owner_id: String,
    pub mood_level: i32,
    pub emotions: Vec<String>,
    pub emotion_sources: Vec<String>,
    pub created_at: DateTime<Utc>,
}

/// Fields supplied when a day has no record yet; `created_at` is set by the store.
#[derive(Debug, Clone, PartialEq)]
pub struct NewMoodRecord {
    pub owner_id: String,
    pub mood_level: i32,
    pub emotions: Vec<String>,
    pub emotion_sources: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub owner_id: String,
    pub reminder_enabled: bool,
}

/// Everything one session collects before it reaches the store.
#[derive(Debug, Clone, PartialEq)]
pub struct MoodAnswers {
    pub mood_level: i32,
    pub emotions: Vec<String>,
    pub emotion_sources: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct LabelCount {
    pub label: String,
    pub count: usize,
}
