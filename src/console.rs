//! Terminal transport: prompts go to stdout and answers are read from stdin,
//! all attributed to the user named on the command line.

use std::io::BufRead;
use std::sync::atomic::{AtomicU64, Ordering};

use anyhow::Context;
use async_trait::async_trait;
use dashmap::DashMap;
use tokio::io::AsyncWriteExt;
use tokio::sync::{mpsc, Mutex};
use tracing::debug;

use crate::transport::{Channel, MessageHandle, Reaction, SelectMenu, Submission};
use crate::vocabulary::{marker_for, RATING_MARKERS};

pub struct ConsoleChannel {
    user_id: String,
    next_id: AtomicU64,
    input: Mutex<mpsc::UnboundedReceiver<String>>,
    menus: DashMap<u64, SelectMenu>,
}

/// Reads stdin on a detached thread so a dropped wait never holds the
/// runtime open on a pending read.
fn spawn_stdin_reader() -> mpsc::UnboundedReceiver<String> {
    let (tx, rx) = mpsc::unbounded_channel();
    std::thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            if tx.send(line).is_err() {
                break;
            }
        }
    });
    rx
}

impl ConsoleChannel {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self::with_input(user_id, spawn_stdin_reader())
    }

    /// Answers come from `input`, one line each; a closed sender is end of input.
    pub fn with_input(user_id: impl Into<String>, input: mpsc::UnboundedReceiver<String>) -> Self {
        Self {
            user_id: user_id.into(),
            next_id: AtomicU64::new(0),
            input: Mutex::new(input),
            menus: DashMap::new(),
        }
    }

    async fn say(&self, text: &str) -> anyhow::Result<()> {
        let mut stdout = tokio::io::stdout();
        stdout
            .write_all(format!("{text}\n").as_bytes())
            .await
            .context("failed to write to stdout")?;
        stdout.flush().await.context("failed to flush stdout")
    }

    async fn read_answer(&self, hint: &str) -> anyhow::Result<Option<String>> {
        self.say(hint).await?;
        let mut input = self.input.lock().await;
        Ok(input.recv().await)
    }

    fn open(&self) -> MessageHandle {
        MessageHandle {
            id: self.next_id.fetch_add(1, Ordering::SeqCst) + 1,
        }
    }
}

/// A keycap marker or its digit.
fn parse_rating(answer: &str) -> String {
    let answer = answer.trim();
    answer
        .parse::<i32>()
        .ok()
        .and_then(marker_for)
        .unwrap_or(answer)
        .to_string()
}

/// Comma separated labels or 1-based positions in the menu.
fn parse_selection(answer: &str, menu: Option<&SelectMenu>) -> Vec<String> {
    answer
        .split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| {
            let by_position = part
                .parse::<usize>()
                .ok()
                .and_then(|position| position.checked_sub(1))
                .and_then(|index| menu.and_then(|menu| menu.options.get(index)));
            match by_position {
                Some(option) => option.value.clone(),
                None => part.to_string(),
            }
        })
        .collect()
}

#[async_trait]
impl Channel for ConsoleChannel {
    async fn post_message(&self, content: &str) -> anyhow::Result<MessageHandle> {
        let message = self.open();
        self.say(content).await?;
        Ok(message)
    }

    async fn follow_up(
        &self,
        content: &str,
        menu: Option<&SelectMenu>,
    ) -> anyhow::Result<MessageHandle> {
        let message = self.open();
        self.say(content).await?;
        if let Some(menu) = menu {
            for (index, option) in menu.options.iter().enumerate() {
                self.say(&format!("  {:>2}. {}", index + 1, option.label)).await?;
            }
            self.menus.insert(message.id, menu.clone());
        }
        Ok(message)
    }

    async fn edit_message(
        &self,
        message: MessageHandle,
        content: &str,
        menu: Option<&SelectMenu>,
    ) -> anyhow::Result<()> {
        match menu {
            Some(menu) => {
                self.menus.insert(message.id, menu.clone());
            }
            None => {
                self.menus.remove(&message.id);
            }
        }
        self.say(content).await
    }

    async fn react(&self, message: MessageHandle, marker: &str) -> anyhow::Result<()> {
        debug!(message_id = message.id, marker, "marker attached");
        Ok(())
    }

    async fn clear_reactions(&self, message: MessageHandle) -> anyhow::Result<()> {
        debug!(message_id = message.id, "markers cleared");
        Ok(())
    }

    async fn next_reaction(&self, _message: MessageHandle) -> anyhow::Result<Option<Reaction>> {
        let hint = format!("> {} (or 1-5)", RATING_MARKERS.join(" "));
        Ok(self.read_answer(&hint).await?.map(|answer| Reaction {
            user_id: self.user_id.clone(),
            marker: parse_rating(&answer),
        }))
    }

    async fn next_submission(
        &self,
        message: MessageHandle,
    ) -> anyhow::Result<Option<Submission>> {
        let Some(answer) = self
            .read_answer("> choose 1 to 5, separated by commas")
            .await?
        else {
            return Ok(None);
        };
        let menu = self.menus.get(&message.id).map(|entry| entry.value().clone());
        Ok(Some(Submission {
            id: message.id,
            user_id: self.user_id.clone(),
            custom_id: menu
                .as_ref()
                .map(|menu| menu.custom_id.clone())
                .unwrap_or_default(),
            values: parse_selection(&answer, menu.as_ref()),
        }))
    }

    async fn defer(&self, submission: &Submission) -> anyhow::Result<()> {
        debug!(submission_id = submission.id, "submission acknowledged");
        Ok(())
    }
}
