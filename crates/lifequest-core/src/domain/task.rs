//! Task - タスクレコード（識別子・状態・刷新ポリシー）
//!
//! 状態の変更はここのメソッドだけが行います。遷移できない場合は
//! `InvalidTransition` を返し、レコードは変わりません。

use serde::{Deserialize, Serialize};

use super::errors::{QuestError, QuestResult, Transition};
use super::ids::TaskId;
use super::policy::RefreshPolicy;
use super::state::TaskStatus;
use super::time::Timestamp;

/// TaskRecord はタスクドキュメントの frontmatter を型付けしたもの
///
/// # 設計
/// - ドキュメントストアの境界で一度だけデコードする（`codec::task`）
/// - `status` / `completion_count` / `next_due_at` を変更するのは
///   TaskRefreshMachine だけで、下のメソッド経由に限る
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskRecord {
    pub uuid: TaskId,
    pub status: TaskStatus,

    /// 通算完了回数。増やすのは `mark_completed` だけ
    pub completion_count: u64,

    pub policy: RefreshPolicy,

    /// 現在のサイクルの開始時刻（本次刷新时间）
    pub current_cycle_start: Timestamp,

    /// 手動指定の入力待ち、または初回完了前は None
    pub next_due_at: Option<Timestamp>,

    pub last_completed_at: Option<Timestamp>,
}

impl TaskRecord {
    /// 初期状態（InProgress、完了 0 回）
    pub fn new(uuid: TaskId, policy: RefreshPolicy, cycle_start: Timestamp) -> Self {
        Self {
            uuid,
            status: TaskStatus::InProgress,
            completion_count: 0,
            policy,
            current_cycle_start: cycle_start,
            next_due_at: None,
            last_completed_at: None,
        }
    }

    fn reject(&self, action: Transition) -> QuestError {
        QuestError::InvalidTransition {
            task: self.uuid.to_string(),
            from: self.status,
            action,
        }
    }

    /// `action` が今の状態で許されなければ `InvalidTransition`
    pub fn ensure_allowed(&self, action: Transition) -> QuestResult<()> {
        let allowed = match action {
            Transition::Complete => self.status.can_complete(),
            Transition::Refresh => self.status.can_refresh(),
            Transition::SupplyDue => self.awaits_input(),
        };
        if allowed {
            Ok(())
        } else {
            Err(self.reject(action))
        }
    }

    /// 次の `complete` で付く完了番号
    ///
    /// `完成次数` が u64::MAX なら ParseError（レコードは変えない）
    pub fn next_completion_count(&self) -> QuestResult<u64> {
        if !self.status.can_complete() {
            return Err(self.reject(Transition::Complete));
        }
        self.completion_count
            .checked_add(1)
            .ok_or_else(|| QuestError::parse("完成次数", "completion count overflow"))
    }

    /// InProgress -> Completed
    pub fn mark_completed(&mut self, at: Timestamp, next_due_at: Option<Timestamp>) -> QuestResult<u64> {
        let count = self.next_completion_count()?;
        self.status = TaskStatus::Completed;
        self.completion_count = count;
        self.last_completed_at = Some(at);
        self.next_due_at = next_due_at;
        Ok(count)
    }

    /// Completed かつ `now >= next_due_at`
    pub fn is_due(&self, now: Timestamp) -> bool {
        self.status == TaskStatus::Completed && self.next_due_at.is_some_and(|due| now >= due)
    }

    pub fn awaits_input(&self) -> bool {
        self.status == TaskStatus::Completed && self.next_due_at.is_none()
    }

    /// Completed -> InProgress。`at` から新しいサイクルを始める
    pub fn mark_refreshed(&mut self, at: Timestamp, next_due_at: Option<Timestamp>) -> QuestResult<()> {
        if !self.status.can_refresh() {
            return Err(self.reject(Transition::Refresh));
        }
        self.status = TaskStatus::InProgress;
        self.current_cycle_start = at;
        self.next_due_at = next_due_at;
        Ok(())
    }

    /// 外部から与えられた次回刷新時刻を記録（手動指定ポリシー）
    pub fn supply_next_due(&mut self, due: Timestamp, now: Timestamp) -> QuestResult<()> {
        if !self.awaits_input() {
            return Err(self.reject(Transition::SupplyDue));
        }
        if due <= now {
            return Err(QuestError::InvalidDueTime { due, now });
        }
        self.next_due_at = Some(due);
        Ok(())
    }
}
