//! 端末から次回刷新時刻を尋ねる PromptProvider

use std::io::{BufRead, Write};

use async_trait::async_trait;
use lifequest_core::domain::{Timestamp, parse_timestamp};
use lifequest_core::ports::{PromptProvider, TaskPrompt};

/// Reads one line from stdin. Empty input or a parse failure declines.
pub struct StdinPrompt;

#[async_trait]
impl PromptProvider for StdinPrompt {
    async fn prompt_for_timestamp(&self, prompt: &TaskPrompt) -> Option<Timestamp> {
        let question = format!(
            "{} の下一次刷新时间 (YYYY-MM-DD HH:MM[:SS], 空欄でスキップ): ",
            prompt.document
        );
        let answer = tokio::task::spawn_blocking(move || {
            let mut stdout = std::io::stdout();
            let _ = write!(stdout, "{question}");
            let _ = stdout.flush();
            let mut line = String::new();
            std::io::stdin().lock().read_line(&mut line).ok()?;
            Some(line)
        })
        .await
        .ok()
        .flatten()?;

        let answer = answer.trim();
        if answer.is_empty() {
            return None;
        }
        let parsed = parse_timestamp(answer);
        if parsed.is_none() {
            tracing::warn!(input = answer, "unrecognized timestamp, leaving task awaiting input");
        }
        parsed
    }
}
