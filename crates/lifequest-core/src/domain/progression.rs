//! Progression - キャラクターと技能のレベル状態

use serde::{Deserialize, Serialize};

use super::errors::{QuestError, QuestResult};

/// EntityClass はレベルごとの閾値の伸びを決める
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityClass {
    Character,
    Skill,
}

impl EntityClass {
    /// レベルアップのたびに閾値へ加える量
    pub fn threshold_increment(self) -> u64 {
        match self {
            EntityClass::Character => 1000,
            EntityClass::Skill => 100,
        }
    }

    /// レベル 1 の閾値
    pub fn initial_threshold(self) -> u64 {
        self.threshold_increment()
    }
}

/// ProgressionEntity はレベル状態（不変条件: `current_experience < experience_threshold`）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressionEntity {
    class: EntityClass,
    level: u32,
    current_experience: u64,
    experience_threshold: u64,
}

impl ProgressionEntity {
    /// レベル 1、経験値 0
    pub fn fresh(class: EntityClass) -> Self {
        Self {
            class,
            level: 1,
            current_experience: 0,
            experience_threshold: class.initial_threshold(),
        }
    }

    /// 保存値から作る。閾値以上の経験値は拒否せず、レベル曲線で正規化する
    pub fn from_parts(
        class: EntityClass,
        level: u32,
        current_experience: u64,
        experience_threshold: u64,
    ) -> QuestResult<Self> {
        if level == 0 {
            return Err(QuestError::parse("等级", "level must be >= 1"));
        }
        if experience_threshold == 0 {
            return Err(QuestError::parse("升级需要经验", "threshold must be >= 1"));
        }
        let entity = Self {
            class,
            level,
            current_experience: 0,
            experience_threshold,
        };
        Ok(crate::ledger::apply_experience(entity, current_experience))
    }

    pub fn class(&self) -> EntityClass {
        self.class
    }

    pub fn level(&self) -> u32 {
        self.level
    }

    pub fn current_experience(&self) -> u64 {
        self.current_experience
    }

    pub fn experience_threshold(&self) -> u64 {
        self.experience_threshold
    }

    pub(crate) fn with_state(mut self, level: u32, current: u64, threshold: u64) -> Self {
        self.level = level;
        self.current_experience = current;
        self.experience_threshold = threshold;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_entities_use_class_thresholds() {
        let character = ProgressionEntity::fresh(EntityClass::Character);
        assert_eq!(character.level(), 1);
        assert_eq!(character.experience_threshold(), 1000);

        let skill = ProgressionEntity::fresh(EntityClass::Skill);
        assert_eq!(skill.experience_threshold(), 100);
    }

    #[test]
    fn stored_overflow_is_normalized() {
        let skill = ProgressionEntity::from_parts(EntityClass::Skill, 1, 250, 100).unwrap();
        // 250 - 100 = 150 (lv2, next 200) -> stays below 200
        assert_eq!(skill.level(), 2);
        assert_eq!(skill.current_experience(), 150);
        assert_eq!(skill.experience_threshold(), 200);
    }

    #[test]
    fn zero_level_or_threshold_is_a_parse_error() {
        assert!(ProgressionEntity::from_parts(EntityClass::Character, 0, 0, 1000).is_err());
        assert!(ProgressionEntity::from_parts(EntityClass::Character, 1, 0, 0).is_err());
    }
}
