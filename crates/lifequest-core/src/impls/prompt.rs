//! PromptProvider の実装
//!
//! - NoPrompt: 常に答えない（非対話実行。タスクは入力待ちになる）
//! - FixedPrompt: 決まった時刻を答える
//! - OffsetPrompt: 完了時刻 + 一定時間を答える

use async_trait::async_trait;
use chrono::Duration;

use crate::domain::Timestamp;
use crate::ports::{PromptProvider, TaskPrompt};

#[derive(Debug, Clone, Copy, Default)]
pub struct NoPrompt;

#[async_trait]
impl PromptProvider for NoPrompt {
    async fn prompt_for_timestamp(&self, _prompt: &TaskPrompt) -> Option<Timestamp> {
        None
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FixedPrompt {
    at: Timestamp,
}

impl FixedPrompt {
    pub fn new(at: Timestamp) -> Self {
        Self { at }
    }
}

#[async_trait]
impl PromptProvider for FixedPrompt {
    async fn prompt_for_timestamp(&self, _prompt: &TaskPrompt) -> Option<Timestamp> {
        Some(self.at)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct OffsetPrompt {
    offset: Duration,
}

impl OffsetPrompt {
    pub fn new(offset: Duration) -> Self {
        Self { offset }
    }

    pub fn hours(hours: u32) -> Self {
        Self::new(Duration::hours(i64::from(hours)))
    }
}

#[async_trait]
impl PromptProvider for OffsetPrompt {
    async fn prompt_for_timestamp(&self, prompt: &TaskPrompt) -> Option<Timestamp> {
        prompt.completed_at.checked_add_signed(self.offset)
    }
}
