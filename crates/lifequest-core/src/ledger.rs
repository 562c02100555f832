//! Ledger - 経験値の加算とレベルアップの繰り越し

use serde::{Deserialize, Serialize};

use crate::domain::ProgressionEntity;

/// `delta` の経験値を加えて正規化
///
/// レベルアップごとに現在の閾値を引き、クラスごとの増分だけ閾値を上げる。
/// ループは上がるレベルの数だけ回り、終了時は `current < threshold`。
pub fn apply_experience(entity: ProgressionEntity, delta: u64) -> ProgressionEntity {
    let increment = entity.class().threshold_increment();
    let mut level = entity.level();
    let mut exp = entity.current_experience().saturating_add(delta);
    let mut threshold = entity.experience_threshold();

    while exp >= threshold {
        exp -= threshold;
        level = level.saturating_add(1);
        threshold = threshold.saturating_add(increment);
    }

    entity.with_state(level, exp, threshold)
}

/// LevelChange は 1 回の適用の前後
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelChange {
    pub level_before: u32,
    pub level_after: u32,
    pub experience_after: u64,
    pub threshold_after: u64,
}

impl LevelChange {
    pub fn between(before: &ProgressionEntity, after: &ProgressionEntity) -> Self {
        Self {
            level_before: before.level(),
            level_after: after.level(),
            experience_after: after.current_experience(),
            threshold_after: after.experience_threshold(),
        }
    }

    pub fn levels_gained(&self) -> u32 {
        self.level_after - self.level_before
    }
}
