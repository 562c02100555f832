//! Status - タスク状態の集計

use serde::{Deserialize, Serialize};

/// TaskCounts は全タスクドキュメントの状態集計
///
/// `due` と `awaiting_input` は `completed` の内数。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskCounts {
    pub in_progress: usize,
    pub completed: usize,
    pub due: usize,
    pub awaiting_input: usize,
    /// タスクフォルダ配下でデコードできなかったドキュメント
    pub unreadable: usize,
}
