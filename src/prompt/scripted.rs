//! Prompter answering from a script.

use std::collections::VecDeque;

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::Prompter;

/// Answers prompts from a queue of item labels.
///
/// Each prompt consumes one answer. Labels that are not among the offered
/// items are ignored, and an exhausted script cancels. Every prompt title
/// and notification is recorded.
///
/// ```ignore
/// let prompter = ScriptedPrompter::new()
///     .answer(["dbo.books_authors"])
///     .answer(["author_id"]);
/// ```
#[derive(Debug, Default)]
pub struct ScriptedPrompter {
    answers: Mutex<VecDeque<Vec<String>>>,
    prompts: Mutex<Vec<String>>,
    messages: Mutex<Vec<String>>,
}

impl ScriptedPrompter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue the labels to choose at the next prompt.
    pub fn answer<I, S>(mut self, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.answers
            .get_mut()
            .push_back(labels.into_iter().map(Into::into).collect());
        self
    }

    /// Queue a cancellation.
    pub fn cancel(self) -> Self {
        self.answer(Vec::<String>::new())
    }

    /// Titles of the prompts shown so far.
    pub async fn prompts(&self) -> Vec<String> {
        self.prompts.lock().await.clone()
    }

    /// Notifications shown so far.
    pub async fn messages(&self) -> Vec<String> {
        self.messages.lock().await.clone()
    }

    async fn next(&self, title: &str, items: &[String]) -> Vec<usize> {
        self.prompts.lock().await.push(title.to_string());
        let answer = self.answers.lock().await.pop_front().unwrap_or_default();

        let mut chosen = Vec::new();
        for label in &answer {
            if let Some(idx) = items.iter().position(|item| item == label) {
                if !chosen.contains(&idx) {
                    chosen.push(idx);
                }
            }
        }
        chosen
    }
}

#[async_trait]
impl Prompter for ScriptedPrompter {
    async fn select_one(&self, title: &str, items: &[String]) -> Option<usize> {
        self.next(title, items).await.first().copied()
    }

    async fn select_many(&self, title: &str, items: &[String]) -> Vec<usize> {
        self.next(title, items).await
    }

    async fn notify(&self, message: &str) {
        self.messages.lock().await.push(message.to_string());
    }
}
