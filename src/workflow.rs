use anyhow::Context;
use tracing::{debug, info, warn};

use crate::collect::{
    collect_rating, collect_selection, CollectError, Deadlines, Stage, EMOTION_PROMPT,
    SOURCE_PROMPT,
};
use crate::models::MoodAnswers;
use crate::reconcile::{Reconciler, Reconciliation};
use crate::transport::Interaction;

pub const TIMEOUT_NOTICE: &str = "Input gagal karena batas waktu untuk menjawab telah berakhir";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Start,
    RatingCollected,
    EmotionsCollected,
    SourcesCollected,
    Reconciled,
    Aborted,
}

#[derive(Debug)]
pub enum SessionOutcome {
    Recorded(Reconciliation),
    Aborted { stage: Stage },
}

struct Session<'a> {
    owner_id: &'a str,
    state: SessionState,
}

impl Session<'_> {
    fn advance(&mut self, next: SessionState) {
        debug!(owner_id = %self.owner_id, from = ?self.state, to = ?next, "session transition");
        self.state = next;
    }
}

/// One `/mood` run: rating, emotions, sources, then the daily record.
pub struct MoodWorkflow {
    reconciler: Reconciler,
    deadlines: Deadlines,
}

impl MoodWorkflow {
    pub fn new(reconciler: Reconciler, deadlines: Deadlines) -> Self {
        Self {
            reconciler,
            deadlines,
        }
    }

    pub async fn run(&self, interaction: &Interaction) -> anyhow::Result<SessionOutcome> {
        let mut session = Session {
            owner_id: &interaction.user_id,
            state: SessionState::Start,
        };

        let answers = match self.collect(interaction, &mut session).await {
            Ok(answers) => answers,
            Err(CollectError::Timeout { stage, deadline }) => {
                session.advance(SessionState::Aborted);
                warn!(owner_id = %interaction.user_id, %stage, deadline_secs = deadline.as_secs(), "mood session timed out");
                interaction
                    .channel
                    .follow_up(TIMEOUT_NOTICE, None)
                    .await
                    .context("failed to send timeout notice")?;
                return Ok(SessionOutcome::Aborted { stage });
            }
            Err(CollectError::Other(err)) => return Err(err),
        };

        let reconciliation = self
            .reconciler
            .reconcile(interaction.channel.as_ref(), &interaction.user_id, &answers)
            .await?;
        session.advance(SessionState::Reconciled);
        info!(
            owner_id = %interaction.user_id,
            kind = ?reconciliation.kind,
            reminder_stopped = reconciliation.reminder_stopped,
            "mood session finished"
        );

        Ok(SessionOutcome::Recorded(reconciliation))
    }

    async fn collect(
        &self,
        interaction: &Interaction,
        session: &mut Session<'_>,
    ) -> Result<MoodAnswers, CollectError> {
        let mood_level = collect_rating(interaction, self.deadlines.rating).await?;
        session.advance(SessionState::RatingCollected);

        let emotions = collect_selection(interaction, &EMOTION_PROMPT, self.deadlines.selection).await?;
        session.advance(SessionState::EmotionsCollected);

        let emotion_sources =
            collect_selection(interaction, &SOURCE_PROMPT, self.deadlines.selection).await?;
        session.advance(SessionState::SourcesCollected);

        Ok(MoodAnswers {
            mood_level,
            emotions,
            emotion_sources,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::jobs::{JobRegistry, ReminderJobs};
    use crate::reconcile::{ReconcileKind, CREATED_NOTICE};
    use crate::store::MemoryStore;
    use crate::testing::{Call, ScriptedChannel};
    use crate::vocabulary::RATING_MARKERS;

    fn workflow(store: &Arc<MemoryStore>, jobs: Arc<dyn ReminderJobs>) -> MoodWorkflow {
        MoodWorkflow::new(
            Reconciler::new(store.clone(), store.clone(), jobs),
            Deadlines::default(),
        )
    }

    fn posted_prompts(channel: &ScriptedChannel) -> usize {
        channel
            .calls()
            .iter()
            .filter(|call| {
                matches!(call, Call::Posted { .. } | Call::FollowUp { menu: Some(_), .. })
            })
            .count()
    }

    #[tokio::test(start_paused = true)]
    async fn full_session_records_the_answers() {
        let store = Arc::new(MemoryStore::new());
        let registry = Arc::new(JobRegistry::new());
        let job = registry.register("U1");
        let channel = Arc::new(ScriptedChannel::new());
        channel.react_at(1, 5, "U1", RATING_MARKERS[2]);
        channel.submit_at(2, 10, "U1", &["takjub", "lesu"]);
        channel.submit_at(3, 8, "U1", &["cuaca"]);

        let outcome = workflow(&store, registry)
            .run(&Interaction::new("U1", channel.clone()))
            .await
            .unwrap();

        let SessionOutcome::Recorded(reconciliation) = outcome else {
            panic!("expected a recorded session");
        };
        assert_eq!(reconciliation.kind, ReconcileKind::Created);
        assert!(!reconciliation.reminder_stopped);
        assert!(!job.is_stopped());

        let records = store.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].mood_level, 3);
        assert_eq!(records[0].emotions, vec!["takjub", "lesu"]);
        assert_eq!(records[0].emotion_sources, vec!["cuaca"]);
        assert_eq!(channel.notices(), vec![CREATED_NOTICE.to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn rating_timeout_aborts_before_later_stages() {
        let store = Arc::new(MemoryStore::new());
        let channel = Arc::new(ScriptedChannel::new());
        channel.react_at(1, 25, "U1", RATING_MARKERS[0]);

        let outcome = workflow(&store, Arc::new(JobRegistry::new()))
            .run(&Interaction::new("U1", channel.clone()))
            .await
            .unwrap();

        assert!(matches!(
            outcome,
            SessionOutcome::Aborted {
                stage: Stage::Rating
            }
        ));
        assert_eq!(posted_prompts(&channel), 1);
        assert_eq!(channel.notices(), vec![TIMEOUT_NOTICE.to_string()]);
        assert_eq!(store.write_count(), 0);
        assert_eq!(store.profile_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn source_timeout_discards_earlier_answers() {
        let store = Arc::new(MemoryStore::new());
        let channel = Arc::new(ScriptedChannel::new());
        channel.react_at(1, 1, "U1", RATING_MARKERS[4]);
        channel.submit_at(2, 1, "U1", &["semangat"]);
        channel.submit_at(3, 5, "U2", &["olahraga"]);

        let outcome = workflow(&store, Arc::new(JobRegistry::new()))
            .run(&Interaction::new("U1", channel.clone()))
            .await
            .unwrap();

        assert!(matches!(
            outcome,
            SessionOutcome::Aborted {
                stage: Stage::Sources
            }
        ));
        assert_eq!(posted_prompts(&channel), 3);
        assert_eq!(channel.notices(), vec![TIMEOUT_NOTICE.to_string()]);
        assert_eq!(store.write_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn repeated_sessions_keep_one_record_per_day() {
        let store = Arc::new(MemoryStore::new());
        let registry: Arc<dyn ReminderJobs> = Arc::new(JobRegistry::new());

        for (marker, emotion, source) in [(0, "cemas", "pekerjaan"), (3, "tenang", "ibadah")] {
            let channel = Arc::new(ScriptedChannel::new());
            channel.react_at(1, 2, "U1", RATING_MARKERS[marker]);
            channel.submit_at(2, 2, "U1", &[emotion]);
            channel.submit_at(3, 2, "U1", &[source]);
            workflow(&store, registry.clone())
                .run(&Interaction::new("U1", channel))
                .await
                .unwrap();
        }

        let records = store.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].mood_level, 4);
        assert_eq!(records[0].emotions, vec!["tenang"]);
        assert_eq!(records[0].emotion_sources, vec!["ibadah"]);
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_users_do_not_block_each_other() {
        let store = Arc::new(MemoryStore::new());
        let flow = Arc::new(workflow(&store, Arc::new(JobRegistry::new())));

        let slow = Arc::new(ScriptedChannel::new());
        slow.react_at(1, 19, "U1", RATING_MARKERS[1]);
        slow.submit_at(2, 29, "U1", &["bosan"]);
        slow.submit_at(3, 29, "U1", &["hiburan"]);

        let quick = Arc::new(ScriptedChannel::new());
        quick.react_at(1, 1, "U2", RATING_MARKERS[4]);
        quick.submit_at(2, 1, "U2", &["gembira"]);
        quick.submit_at(3, 1, "U2", &["teman"]);

        let slow_session = Interaction::new("U1", slow.clone());
        let quick_session = Interaction::new("U2", quick.clone());
        let (first, second) = tokio::join!(flow.run(&slow_session), flow.run(&quick_session));
        assert!(matches!(first.unwrap(), SessionOutcome::Recorded(_)));
        assert!(matches!(second.unwrap(), SessionOutcome::Recorded(_)));
        assert_eq!(store.records().len(), 2);
    }
}
