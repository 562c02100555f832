//! Reward - 報酬ルール（報酬テーブルの 1 行）

use serde::{Deserialize, Serialize};
use std::fmt;

use super::errors::{QuestError, QuestResult};

/// TargetKind は報酬の行き先の種類
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TargetKind {
    Experience,
    Attribute,
    Resource,
    SkillExperience,
}

/// RewardTarget は報酬の行き先（必要なら名前付き）
///
/// `项目` 列の書式:
/// - `经验值`（キャラクターの経験値）
/// - `属性/<name>`、`资源/<name>`、`技能/<name>`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "name")]
pub enum RewardTarget {
    Experience,
    Attribute(String),
    Resource(String),
    SkillExperience(String),
}

impl RewardTarget {
    pub fn kind(&self) -> TargetKind {
        match self {
            RewardTarget::Experience => TargetKind::Experience,
            RewardTarget::Attribute(_) => TargetKind::Attribute,
            RewardTarget::Resource(_) => TargetKind::Resource,
            RewardTarget::SkillExperience(_) => TargetKind::SkillExperience,
        }
    }

    /// 属性・資源・技能の名前。キャラクター経験値なら None
    pub fn name(&self) -> Option<&str> {
        match self {
            RewardTarget::Experience => None,
            RewardTarget::Attribute(name)
            | RewardTarget::Resource(name)
            | RewardTarget::SkillExperience(name) => Some(name),
        }
    }

    pub fn parse(label: &str) -> QuestResult<Self> {
        let label = label.trim();
        if label == "经验值" {
            return Ok(RewardTarget::Experience);
        }

        let named = |rest: &str, build: fn(String) -> RewardTarget| {
            let name = rest.trim();
            if name.is_empty() {
                Err(QuestError::parse("项目", format!("missing name in {label:?}")))
            } else {
                Ok(build(name.to_string()))
            }
        };

        if let Some(rest) = label.strip_prefix("属性/") {
            return named(rest, RewardTarget::Attribute);
        }
        if let Some(rest) = label.strip_prefix("资源/") {
            return named(rest, RewardTarget::Resource);
        }
        if let Some(rest) = label.strip_prefix("技能/") {
            return named(rest, RewardTarget::SkillExperience);
        }

        Err(QuestError::parse(
            "项目",
            format!("unknown reward target {label:?}"),
        ))
    }
}

impl fmt::Display for RewardTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RewardTarget::Experience => f.write_str("经验值"),
            RewardTarget::Attribute(name) => write!(f, "属性/{name}"),
            RewardTarget::Resource(name) => write!(f, "资源/{name}"),
            RewardTarget::SkillExperience(name) => write!(f, "技能/{name}"),
        }
    }
}

/// RewardRule は `completion_count % trigger_frequency == 0` のときに発火する報酬
///
/// 回数は通算の完了回数で、サイクルごとにリセットしない。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardRule {
    trigger_frequency: u32,
    target: RewardTarget,
    amount: i64,
}

impl RewardRule {
    pub fn new(trigger_frequency: u32, target: RewardTarget, amount: i64) -> QuestResult<Self> {
        if trigger_frequency == 0 {
            return Err(QuestError::parse("次数", "trigger frequency must be >= 1"));
        }
        Ok(Self {
            trigger_frequency,
            target,
            amount,
        })
    }

    pub fn trigger_frequency(&self) -> u32 {
        self.trigger_frequency
    }

    pub fn target(&self) -> &RewardTarget {
        &self.target
    }

    pub fn amount(&self) -> i64 {
        self.amount
    }

    pub fn fires_at(&self, completion_count: u64) -> bool {
        completion_count % u64::from(self.trigger_frequency) == 0
    }
}

/// RewardTable は解析済みのルールと、捨てた行
#[derive(Debug, Default)]
pub struct RewardTable {
    pub rules: Vec<RewardRule>,
    pub rejected: Vec<QuestError>,
}

impl RewardTable {
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}
