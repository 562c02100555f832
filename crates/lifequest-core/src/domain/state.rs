//! State - タスクの状態
//!
//! # 状態遷移
//! - InProgress -> Completed（complete）
//! - Completed -> InProgress（refresh_if_due、期限到来時）
//!
//! 終端状態はありません。アーカイブは扱いません。

use serde::{Deserialize, Serialize};
use std::fmt;

/// TaskStatus はタスクのライフサイクル状態
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaskStatus {
    /// 実行中（完了待ち）
    #[default]
    InProgress,
    /// 完了済み（次の刷新待ち）
    Completed,
}

impl TaskStatus {
    /// frontmatter の `任务状态` に書かれる値
    pub fn as_label(self) -> &'static str {
        match self {
            TaskStatus::InProgress => "进行中",
            TaskStatus::Completed => "已完成",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim() {
            "进行中" | "未完成" => Some(TaskStatus::InProgress),
            "已完成" => Some(TaskStatus::Completed),
            _ => None,
        }
    }

    pub fn can_complete(self) -> bool {
        matches!(self, TaskStatus::InProgress)
    }

    pub fn can_refresh(self) -> bool {
        matches!(self, TaskStatus::Completed)
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_label())
    }
}
