//! Errors - エラー型と分類
//!
//! # 分類
//! - Recoverable: 1 件の評価・1 行の報酬だけが失敗（ParseError / MissingTargetError）。
//!   呼び出し元には非致命的な結果リストとして返す。
//! - Rejected: 呼び出し順序のバグ（InvalidTransitionError など）。状態は変えずに失敗を返す。
//! - Infrastructure: ドキュメントストアの障害。

use thiserror::Error;

use super::ids::TaskId;
use super::reward::TargetKind;
use super::state::TaskStatus;
use super::time::Timestamp;
use crate::ports::document_store::StoreError;

/// ErrorKind は QuestError の運用分類
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Recoverable,
    Rejected,
    Infrastructure,
}

/// 状態機械の遷移名（エラーメッセージ用）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Complete,
    Refresh,
    SupplyDue,
}

impl std::fmt::Display for Transition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Transition::Complete => "complete",
            Transition::Refresh => "refresh",
            Transition::SupplyDue => "supply_next_due",
        };
        f.write_str(name)
    }
}

/// QuestError はドメインエラー
#[derive(Debug, Error)]
pub enum QuestError {
    #[error("parse error in {field}: {message}")]
    Parse { field: String, message: String },

    #[error("reward target {kind:?} '{name}' does not exist")]
    MissingTarget { kind: TargetKind, name: String },

    #[error("cannot {action} task {task} while it is {from}")]
    InvalidTransition {
        task: String,
        from: TaskStatus,
        action: Transition,
    },

    #[error("due time {due} is not later than {now}")]
    InvalidDueTime { due: Timestamp, now: Timestamp },

    #[error("completion #{count} of {task} is already recorded")]
    DuplicateRecord { task: TaskId, count: u64 },

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl QuestError {
    pub fn parse(field: impl Into<String>, message: impl Into<String>) -> Self {
        QuestError::Parse {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn missing_target(kind: TargetKind, name: impl Into<String>) -> Self {
        QuestError::MissingTarget {
            kind,
            name: name.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            QuestError::Parse { .. } | QuestError::MissingTarget { .. } => ErrorKind::Recoverable,
            QuestError::InvalidTransition { .. }
            | QuestError::InvalidDueTime { .. }
            | QuestError::DuplicateRecord { .. } => ErrorKind::Rejected,
            QuestError::Store(_) => ErrorKind::Infrastructure,
        }
    }
}

pub type QuestResult<T> = Result<T, QuestError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification() {
        assert_eq!(
            QuestError::parse("刷新时间", "bad").kind(),
            ErrorKind::Recoverable
        );
        assert_eq!(
            QuestError::missing_target(TargetKind::SkillExperience, "笛子").kind(),
            ErrorKind::Recoverable
        );
        let err = QuestError::InvalidTransition {
            task: "游戏/任务/跑步.md".into(),
            from: TaskStatus::Completed,
            action: Transition::Complete,
        };
        assert_eq!(err.kind(), ErrorKind::Rejected);
        assert_eq!(
            err.to_string(),
            "cannot complete task 游戏/任务/跑步.md while it is 已完成"
        );
    }
}
