//! Collectors: post a prompt, then wait for one qualifying answer from the
//! session's user before the stage deadline.

use std::fmt;
use std::time::Duration;

use anyhow::Context;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::transport::{Interaction, SelectMenu};
use crate::vocabulary::{self, alternate_join, EMOTIONS, EMOTION_SOURCES, RATING_MARKERS};

pub const RATING_PROMPT: &str = "Rate your mood today!";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Rating,
    Emotions,
    Sources,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Rating => "rating",
            Stage::Emotions => "emotions",
            Stage::Sources => "sources",
        };
        f.write_str(name)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CollectError {
    #[error("no answer for the {stage} prompt within {}s", .deadline.as_secs())]
    Timeout { stage: Stage, deadline: Duration },
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deadlines {
    pub rating: Duration,
    pub selection: Duration,
}

impl Default for Deadlines {
    fn default() -> Self {
        Self {
            rating: Duration::from_secs(20),
            selection: Duration::from_secs(30),
        }
    }
}

/// A multi-select stage: which vocabulary it offers and how it talks about it.
#[derive(Debug, Clone, Copy)]
pub struct SelectionPrompt {
    pub stage: Stage,
    pub custom_id: &'static str,
    pub prompt: &'static str,
    pub resolved: &'static str,
    pub vocabulary: &'static [&'static str],
}

pub const EMOTION_PROMPT: SelectionPrompt = SelectionPrompt {
    stage: Stage::Emotions,
    custom_id: "emotion",
    prompt: "Emosi apa saja yang sedang kamu rasakan?",
    resolved: "Emosi anda adalah",
    vocabulary: &EMOTIONS,
};

pub const SOURCE_PROMPT: SelectionPrompt = SelectionPrompt {
    stage: Stage::Sources,
    custom_id: "emotion-cause",
    prompt: "Dari mana datangnya emosi tersebut?",
    resolved: "Sumber emosi anda adalah",
    vocabulary: &EMOTION_SOURCES,
};

pub async fn collect_rating(
    interaction: &Interaction,
    deadline: Duration,
) -> Result<i32, CollectError> {
    let channel = &interaction.channel;
    let message = channel
        .post_message(RATING_PROMPT)
        .await
        .context("failed to post rating prompt")?;

    for marker in RATING_MARKERS {
        channel
            .react(message, marker)
            .await
            .with_context(|| format!("failed to attach rating marker {marker}"))?;
    }

    let wait = async {
        while let Some(reaction) = channel.next_reaction(message).await? {
            if reaction.user_id != interaction.user_id {
                debug!(message_id = message.id, user_id = %reaction.user_id, "ignoring reaction from another user");
                continue;
            }
            match vocabulary::mood_level(&reaction.marker) {
                Some(level) => return Ok(Some(level)),
                None => debug!(message_id = message.id, marker = %reaction.marker, "ignoring non-rating reaction"),
            }
        }
        Ok::<_, anyhow::Error>(None)
    };

    let level = match timeout(deadline, wait).await {
        Ok(Ok(Some(level))) => level,
        Ok(Ok(None)) | Err(_) => {
            return Err(CollectError::Timeout {
                stage: Stage::Rating,
                deadline,
            })
        }
        Ok(Err(err)) => return Err(err.into()),
    };

    info!(owner_id = %interaction.user_id, level, "mood rating collected");
    channel
        .edit_message(message, &format!("Rate mood anda adalah {level}"), None)
        .await
        .context("failed to show resolved rating")?;
    channel
        .clear_reactions(message)
        .await
        .context("failed to clear rating markers")?;

    Ok(level)
}

pub async fn collect_selection(
    interaction: &Interaction,
    prompt: &SelectionPrompt,
    deadline: Duration,
) -> Result<Vec<String>, CollectError> {
    let channel = &interaction.channel;
    let menu = SelectMenu::new(prompt.custom_id, &vocabulary::shuffle(prompt.vocabulary));
    let message = channel
        .follow_up(prompt.prompt, Some(&menu))
        .await
        .with_context(|| format!("failed to post {} prompt", prompt.stage))?;

    let wait = async {
        while let Some(submission) = channel.next_submission(message).await? {
            if let Err(err) = channel.defer(&submission).await {
                warn!(message_id = message.id, error = %err, "failed to acknowledge submission");
            }
            if submission.user_id != interaction.user_id {
                debug!(message_id = message.id, user_id = %submission.user_id, "ignoring submission from another user");
                continue;
            }
            if submission.custom_id != menu.custom_id || !menu.accepts(&submission.values) {
                debug!(message_id = message.id, values = ?submission.values, "ignoring submission outside the menu");
                continue;
            }
            return Ok(Some(submission.values));
        }
        Ok::<_, anyhow::Error>(None)
    };

    let labels = match timeout(deadline, wait).await {
        Ok(Ok(Some(labels))) => labels,
        Ok(Ok(None)) | Err(_) => {
            return Err(CollectError::Timeout {
                stage: prompt.stage,
                deadline,
            })
        }
        Ok(Err(err)) => return Err(err.into()),
    };

    info!(owner_id = %interaction.user_id, stage = %prompt.stage, count = labels.len(), "selection collected");
    channel
        .edit_message(
            message,
            &format!("{} {}", prompt.resolved, alternate_join(&labels)),
            None,
        )
        .await
        .with_context(|| format!("failed to show resolved {}", prompt.stage))?;

    Ok(labels)
}
