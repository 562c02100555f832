//! Completion - 完了記録
//!
//! `(task, completion_count)` をキーにした監査記録です。
//!
//! # 記録の流れ
//! 1. `reserve`: 報酬を適用する前に pending として書く
//! 2. `finish`: 適用した報酬を載せて確定する
//!
//! pending のまま残った記録も「記録済み」として扱い、報酬は再適用しません。

use serde::{Deserialize, Serialize};

use super::ids::TaskId;
use super::reward::RewardTarget;
use super::time::Timestamp;
use crate::ledger::LevelChange;

/// RewardEffect は 1 件の報酬が実際に何をしたか
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "effect", rename_all = "snake_case")]
pub enum RewardEffect {
    /// 経験値としてレベル曲線を通った
    Leveled(LevelChange),
    /// 属性・資源の値への単純加算
    Flat { before: i64, after: i64 },
}

/// RewardApplication は適用済みの報酬
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardApplication {
    pub target: RewardTarget,
    pub amount: i64,
    #[serde(flatten)]
    pub effect: RewardEffect,
}

/// CompletionRecord は完了 1 回分の記録
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionRecord {
    pub task: TaskId,
    pub completion_count: u64,
    pub completed_at: Timestamp,
    pub rewards: Vec<RewardApplication>,
    /// 報酬の適用前に予約されただけの記録
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub pending: bool,
}

impl CompletionRecord {
    /// 報酬適用前の予約記録
    pub fn reserve(task: TaskId, completion_count: u64, completed_at: Timestamp) -> Self {
        Self {
            task,
            completion_count,
            completed_at,
            rewards: Vec::new(),
            pending: true,
        }
    }

    /// 適用した報酬を載せて確定
    pub fn finish(self, rewards: Vec<RewardApplication>) -> Self {
        Self {
            rewards,
            pending: false,
            ..self
        }
    }

    pub fn key(&self) -> (TaskId, u64) {
        (self.task, self.completion_count)
    }

    /// 人間向けの一行（例: `在 2024/01/01 10:00 完成第1次`）
    pub fn summary(&self) -> String {
        format!(
            "在 {} 完成第{}次",
            self.completed_at.format("%Y/%m/%d %H:%M"),
            self.completion_count
        )
    }
}
