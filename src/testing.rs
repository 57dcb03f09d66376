//! Scripted transport for exercising sessions in virtual time.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;

use crate::transport::{Channel, MessageHandle, Reaction, SelectMenu, Submission};

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Posted { id: u64, content: String },
    FollowUp { id: u64, content: String, menu: Option<SelectMenu> },
    Edited { id: u64, content: String, menu: Option<SelectMenu> },
    Reacted { id: u64, marker: String },
    Cleared { id: u64 },
    Deferred { submission_id: u64, user_id: String },
}

#[derive(Debug)]
enum Event {
    Reaction(Reaction),
    Submission(Submission),
    Closed,
}

#[derive(Debug)]
struct Scripted {
    after: Duration,
    event: Event,
}

/// Messages are numbered from 1 in posting order. Events scripted for a
/// message fire `after` its posting instant; once a message's script runs
/// dry its event stream stays open and silent.
#[derive(Default)]
pub struct ScriptedChannel {
    next_id: AtomicU64,
    posted_at: Mutex<HashMap<u64, Instant>>,
    scripts: Mutex<HashMap<u64, VecDeque<Scripted>>>,
    calls: Mutex<Vec<Call>>,
    next_submission_id: AtomicU64,
}

impl ScriptedChannel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn react_at(&self, message_id: u64, after_secs: u64, user_id: &str, marker: &str) {
        self.script(
            message_id,
            after_secs,
            Event::Reaction(Reaction {
                user_id: user_id.to_string(),
                marker: marker.to_string(),
            }),
        );
    }

    /// The submission carries the menu id of the message it lands on.
    pub fn submit_at(&self, message_id: u64, after_secs: u64, user_id: &str, values: &[&str]) {
        self.submit_from_menu_at(message_id, after_secs, user_id, "", values);
    }

    /// Like `submit_at`, but the submission claims to come from `custom_id`.
    pub fn submit_from_menu_at(
        &self,
        message_id: u64,
        after_secs: u64,
        user_id: &str,
        custom_id: &str,
        values: &[&str],
    ) {
        let id = self.next_submission_id.fetch_add(1, Ordering::SeqCst) + 1;
        self.script(
            message_id,
            after_secs,
            Event::Submission(Submission {
                id,
                user_id: user_id.to_string(),
                custom_id: custom_id.to_string(),
                values: values.iter().map(|value| value.to_string()).collect(),
            }),
        );
    }

    pub fn close_at(&self, message_id: u64, after_secs: u64) {
        self.script(message_id, after_secs, Event::Closed);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    /// Plain follow-ups, i.e. the notices sent after the prompts.
    pub fn notices(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::FollowUp {
                    content,
                    menu: None,
                    ..
                } => Some(content),
                _ => None,
            })
            .collect()
    }

    pub fn menu_for(&self, message_id: u64) -> Option<SelectMenu> {
        self.calls().into_iter().find_map(|call| match call {
            Call::FollowUp { id, menu, .. } if id == message_id => menu,
            _ => None,
        })
    }

    fn script(&self, message_id: u64, after_secs: u64, event: Event) {
        self.scripts
            .lock()
            .unwrap()
            .entry(message_id)
            .or_default()
            .push_back(Scripted {
                after: Duration::from_secs(after_secs),
                event,
            });
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    fn open(&self) -> MessageHandle {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        self.posted_at.lock().unwrap().insert(id, Instant::now());
        MessageHandle { id }
    }

    async fn next_event(&self, message: MessageHandle) -> Option<Event> {
        let next = self
            .scripts
            .lock()
            .unwrap()
            .get_mut(&message.id)
            .and_then(|queue| queue.pop_front());
        let Some(scripted) = next else {
            return std::future::pending().await;
        };
        let posted_at = self.posted_at.lock().unwrap()[&message.id];
        tokio::time::sleep_until(posted_at + scripted.after).await;
        match scripted.event {
            Event::Closed => None,
            event => Some(event),
        }
    }
}

#[async_trait]
impl Channel for ScriptedChannel {
    async fn post_message(&self, content: &str) -> anyhow::Result<MessageHandle> {
        let message = self.open();
        self.record(Call::Posted {
            id: message.id,
            content: content.to_string(),
        });
        Ok(message)
    }

    async fn follow_up(
        &self,
        content: &str,
        menu: Option<&SelectMenu>,
    ) -> anyhow::Result<MessageHandle> {
        let message = self.open();
        self.record(Call::FollowUp {
            id: message.id,
            content: content.to_string(),
            menu: menu.cloned(),
        });
        Ok(message)
    }

    async fn edit_message(
        &self,
        message: MessageHandle,
        content: &str,
        menu: Option<&SelectMenu>,
    ) -> anyhow::Result<()> {
        self.record(Call::Edited {
            id: message.id,
            content: content.to_string(),
            menu: menu.cloned(),
        });
        Ok(())
    }

    async fn react(&self, message: MessageHandle, marker: &str) -> anyhow::Result<()> {
        self.record(Call::Reacted {
            id: message.id,
            marker: marker.to_string(),
        });
        Ok(())
    }

    async fn clear_reactions(&self, message: MessageHandle) -> anyhow::Result<()> {
        self.record(Call::Cleared { id: message.id });
        Ok(())
    }

    async fn next_reaction(&self, message: MessageHandle) -> anyhow::Result<Option<Reaction>> {
        match self.next_event(message).await {
            Some(Event::Reaction(reaction)) => Ok(Some(reaction)),
            Some(other) => anyhow::bail!("expected a reaction on #{}, got {other:?}", message.id),
            None => Ok(None),
        }
    }

    async fn next_submission(
        &self,
        message: MessageHandle,
    ) -> anyhow::Result<Option<Submission>> {
        match self.next_event(message).await {
            Some(Event::Submission(mut submission)) => {
                if submission.custom_id.is_empty() {
                    if let Some(menu) = self.menu_for(message.id) {
                        submission.custom_id = menu.custom_id;
                    }
                }
                Ok(Some(submission))
            }
            Some(other) => anyhow::bail!("expected a submission on #{}, got {other:?}", message.id),
            None => Ok(None),
        }
    }

    async fn defer(&self, submission: &Submission) -> anyhow::Result<()> {
        self.record(Call::Deferred {
            submission_id: submission.id,
            user_id: submission.user_id.clone(),
        });
        Ok(())
    }
}
