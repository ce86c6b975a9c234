//! Line-based prompter on stdin/stdout.

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines, Stdin};
use tokio::sync::Mutex;
use tracing::warn;

use super::Prompter;

/// Numbered-list prompts read from stdin.
///
/// The user answers with item numbers separated by commas or spaces; `*`
/// selects everything in a multi-select. An empty line or end of input
/// cancels.
pub struct TerminalPrompter {
    lines: Mutex<Lines<BufReader<Stdin>>>,
}

impl TerminalPrompter {
    pub fn new() -> Self {
        Self {
            lines: Mutex::new(BufReader::new(tokio::io::stdin()).lines()),
        }
    }

    async fn ask(&self, title: &str, items: &[String], many: bool) -> Vec<usize> {
        let mut listing = format!("\n{title}\n");
        for (idx, item) in items.iter().enumerate() {
            listing.push_str(&format!("  {:>3}) {item}\n", idx + 1));
        }
        let hint = if many {
            "numbers separated by commas, * for all, empty to cancel"
        } else {
            "a number, empty to cancel"
        };

        let mut lines = self.lines.lock().await;
        write_out(&listing).await;

        loop {
            write_out(&format!("[{hint}] > ")).await;

            let line = match lines.next_line().await {
                Ok(Some(line)) => line,
                Ok(None) => return Vec::new(),
                Err(e) => {
                    warn!(error = %e, "failed to read from stdin");
                    return Vec::new();
                }
            };

            match parse_selection(&line, items.len(), many) {
                Ok(selection) => return selection,
                Err(message) => write_out(&format!("{message}\n")).await,
            }
        }
    }
}

impl Default for TerminalPrompter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Prompter for TerminalPrompter {
    async fn select_one(&self, title: &str, items: &[String]) -> Option<usize> {
        self.ask(title, items, false).await.first().copied()
    }

    async fn select_many(&self, title: &str, items: &[String]) -> Vec<usize> {
        self.ask(title, items, true).await
    }

    async fn notify(&self, message: &str) {
        write_out(&format!("{message}\n")).await;
    }
}

async fn write_out(text: &str) {
    let mut stdout = tokio::io::stdout();
    if let Err(e) = stdout.write_all(text.as_bytes()).await {
        warn!(error = %e, "failed to write prompt");
    }
    let _ = stdout.flush().await;
}

/// Parse 1-based item numbers into 0-based indices, keeping input order.
fn parse_selection(line: &str, count: usize, many: bool) -> Result<Vec<usize>, String> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(Vec::new());
    }
    if many && line == "*" {
        return Ok((0..count).collect());
    }

    let mut chosen = Vec::new();
    for token in line.split(|c: char| c == ',' || c.is_whitespace()) {
        if token.is_empty() {
            continue;
        }
        let number: usize = token
            .parse()
            .map_err(|_| format!("`{token}` is not a number"))?;
        if number == 0 || number > count {
            return Err(format!("choose between 1 and {count}"));
        }
        if !chosen.contains(&(number - 1)) {
            chosen.push(number - 1);
        }
    }

    if !many && chosen.len() > 1 {
        return Err("choose a single item".to_string());
    }
    Ok(chosen)
}
