use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use tracing::debug;

pub trait JobHandle: Send + Sync {
    fn stop(&self) -> anyhow::Result<()>;
}

/// Lookup side of the reminder scheduler, keyed by owner id.
pub trait ReminderJobs: Send + Sync {
    fn has(&self, owner_id: &str) -> bool;

    fn get(&self, owner_id: &str) -> Option<Arc<dyn JobHandle>>;
}

/// Built by the scheduler that owns reminder delivery.
#[cfg_attr(not(test), allow(dead_code))]
#[derive(Debug)]
pub struct ReminderJob {
    owner_id: String,
    stopped: AtomicBool,
}

impl ReminderJob {
    #[cfg(test)]
    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }
}

impl JobHandle for ReminderJob {
    fn stop(&self) -> anyhow::Result<()> {
        if !self.stopped.swap(true, Ordering::SeqCst) {
            debug!(owner_id = %self.owner_id, "reminder job stopped");
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct JobRegistry {
    jobs: DashMap<String, Arc<ReminderJob>>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub fn register(&self, owner_id: &str) -> Arc<ReminderJob> {
        let job = Arc::new(ReminderJob {
            owner_id: owner_id.to_string(),
            stopped: AtomicBool::new(false),
        });
        self.jobs.insert(owner_id.to_string(), job.clone());
        job
    }
}

impl ReminderJobs for JobRegistry {
    fn has(&self, owner_id: &str) -> bool {
        self.jobs.contains_key(owner_id)
    }

    fn get(&self, owner_id: &str) -> Option<Arc<dyn JobHandle>> {
        self.jobs
            .get(owner_id)
            .map(|entry| entry.value().clone() as Arc<dyn JobHandle>)
    }
}
