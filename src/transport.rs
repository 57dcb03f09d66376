use std::sync::Arc;

use async_trait::async_trait;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MessageHandle {
    pub id: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SelectOption {
    pub label: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SelectMenu {
    pub custom_id: String,
    pub placeholder: String,
    pub min_values: usize,
    pub max_values: usize,
    pub options: Vec<SelectOption>,
}

impl SelectMenu {
    /// One option per label, in the given order, with the value equal to the label.
    pub fn new<S: AsRef<str>>(custom_id: &str, labels: &[S]) -> Self {
        Self {
            custom_id: custom_id.to_string(),
            placeholder: "Nothing selected".to_string(),
            min_values: 1,
            max_values: 5,
            options: labels
                .iter()
                .map(|label| SelectOption {
                    label: label.as_ref().to_string(),
                    value: label.as_ref().to_string(),
                })
                .collect(),
        }
    }

    pub fn accepts(&self, values: &[String]) -> bool {
        (self.min_values..=self.max_values).contains(&values.len())
            && values
                .iter()
                .all(|value| self.options.iter().any(|option| &option.value == value))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Reaction {
    pub user_id: String,
    pub marker: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Submission {
    pub id: u64,
    pub user_id: String,
    pub custom_id: String,
    pub values: Vec<String>,
}

/// Chat surface a session talks through.
///
/// `next_reaction` and `next_submission` yield every event observed on a
/// message, from any user, and return `None` once no further events can
/// arrive. Filtering and deadlines are the caller's concern.
#[async_trait]
pub trait Channel: Send + Sync {
    async fn post_message(&self, content: &str) -> anyhow::Result<MessageHandle>;

    async fn follow_up(
        &self,
        content: &str,
        menu: Option<&SelectMenu>,
    ) -> anyhow::Result<MessageHandle>;

    /// Replaces the content; `None` removes any attached menu.
    async fn edit_message(
        &self,
        message: MessageHandle,
        content: &str,
        menu: Option<&SelectMenu>,
    ) -> anyhow::Result<()>;

    async fn react(&self, message: MessageHandle, marker: &str) -> anyhow::Result<()>;

    async fn clear_reactions(&self, message: MessageHandle) -> anyhow::Result<()>;

    async fn next_reaction(&self, message: MessageHandle) -> anyhow::Result<Option<Reaction>>;

    async fn next_submission(&self, message: MessageHandle)
        -> anyhow::Result<Option<Submission>>;

    /// Acknowledges a submission so the platform stops waiting on it.
    async fn defer(&self, submission: &Submission) -> anyhow::Result<()>;
}

/// The user who started a session and the channel it runs in.
#[derive(Clone)]
pub struct Interaction {
    pub user_id: String,
    pub channel: Arc<dyn Channel>,
}

impl Interaction {
    pub fn new(user_id: impl Into<String>, channel: Arc<dyn Channel>) -> Self {
        Self {
            user_id: user_id.into(),
            channel,
        }
    }
}
