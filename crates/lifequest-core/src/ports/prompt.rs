//! PromptProvider port - 手動指定ポリシーの次回時刻を外部から受け取る
//!
//! `每次指定时间` のタスクは完了のたびに次回刷新時刻を尋ねます。
//! プロバイダが答えない（`None`）場合、タスクは `Completed` のまま入力待ちになります。

use async_trait::async_trait;

use crate::domain::{TaskId, Timestamp};
use crate::ports::document_store::DocumentId;

/// 問い合わせ内容
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskPrompt {
    pub document: DocumentId,
    pub task: TaskId,
    pub completed_at: Timestamp,
}

#[async_trait]
pub trait PromptProvider: Send + Sync {
    /// 次回刷新時刻。答えられない場合は `None`。
    async fn prompt_for_timestamp(&self, prompt: &TaskPrompt) -> Option<Timestamp>;
}
