//! CompletionLog port - 完了記録（append-only）
//!
//! `(task, completion_count)` をキーに、適用済みの報酬を記録します。
//! 同じキーの記録があれば報酬を再適用しない（apply-once）ための正本です。
//!
//! # 書き込み順序
//! 1. `append(CompletionRecord::reserve(..))` で報酬適用前にキーを押さえる
//! 2. 報酬を適用する
//! 3. `finalize` で適用結果を記録する
//!
//! 2 や 3 が失敗しても pending の記録が残るので、再試行で報酬は二重にならない。

use async_trait::async_trait;

use crate::domain::{CompletionRecord, QuestResult, TaskId};

#[async_trait]
pub trait CompletionLog: Send + Sync {
    async fn get(&self, task: TaskId, completion_count: u64) -> QuestResult<Option<CompletionRecord>>;

    /// キーが既にあれば `QuestError::DuplicateRecord`
    async fn append(&self, record: CompletionRecord) -> QuestResult<()>;

    /// pending の記録を確定した記録で置き換える
    ///
    /// 確定済みの記録があれば `QuestError::DuplicateRecord`。記録が無ければ追記する。
    async fn finalize(&self, record: CompletionRecord) -> QuestResult<()>;

    /// タスクの全記録（完了回数順）
    async fn list(&self, task: TaskId) -> QuestResult<Vec<CompletionRecord>>;
}
