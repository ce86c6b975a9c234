//! Interactive selection.
//!
//! Workflows ask the user to pick items through a [`Prompter`]. An empty
//! answer always means the user backed out.

mod scripted;
mod terminal;

pub use scripted::ScriptedPrompter;
pub use terminal::TerminalPrompter;

use async_trait::async_trait;

/// Pick-one / pick-many selection from a list.
#[async_trait]
pub trait Prompter: Send + Sync {
    /// Index of the chosen item, or `None` if the user cancelled.
    async fn select_one(&self, title: &str, items: &[String]) -> Option<usize>;

    /// Indices of the chosen items, in the order chosen. Empty if the user
    /// cancelled.
    async fn select_many(&self, title: &str, items: &[String]) -> Vec<usize>;

    /// Show a message.
    async fn notify(&self, message: &str);
}
