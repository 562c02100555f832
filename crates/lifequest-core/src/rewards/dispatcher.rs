//! RewardDispatcher - 報酬テーブルの適用
//!
//! # フロー
//! 1. `completion_count % 次数 == 0` の行だけを選ぶ
//! 2. 行ごとに対象ドキュメントをロックし、メタデータを読む → 計算 → `update_metadata`（1 回）
//! 3. 経験値は Progression Ledger、属性・資源は単純加算
//!
//! 行は互いに独立です。1 行の失敗（対象なし・不正値・ストア障害）は
//! `RewardIssue` として報告し、残りの行は適用を続けます。

use std::sync::Arc;

use serde::Serialize;

use crate::app::locks::DocumentLocks;
use crate::codec::{decode_flat_value, decode_progression, encode_flat_value, encode_progression};
use crate::config::VaultLayout;
use crate::domain::{
    EntityClass, QuestError, QuestResult, RewardApplication, RewardEffect, RewardRule, RewardTable,
    RewardTarget,
};
use crate::ledger::{LevelChange, apply_experience};
use crate::ports::{DocumentId, DocumentStore, Metadata};

/// RewardIssue は適用されなかった報酬
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "issue", rename_all = "snake_case")]
pub enum RewardIssue {
    /// 行を解析できなかった
    RejectedRow { reason: String },
    /// 発火したが適用できなかった
    Skipped {
        target: RewardTarget,
        amount: i64,
        reason: String,
    },
}

/// DispatchReport は 1 回の dispatch の結果
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DispatchReport {
    pub applied: Vec<RewardApplication>,
    pub issues: Vec<RewardIssue>,
}

/// RewardDispatcher は報酬をエンティティドキュメントへ適用
pub struct RewardDispatcher {
    store: Arc<dyn DocumentStore>,
    locks: DocumentLocks,
    layout: VaultLayout,
}

impl RewardDispatcher {
    pub fn new(store: Arc<dyn DocumentStore>, locks: DocumentLocks, layout: VaultLayout) -> Self {
        Self { store, locks, layout }
    }

    /// `completion_count` で発火するルールをすべて適用
    ///
    /// 全体としては失敗しない。行ごとの失敗は `issues` に入る。
    pub async fn dispatch(&self, table: &RewardTable, completion_count: u64) -> DispatchReport {
        let mut report = DispatchReport {
            applied: Vec::new(),
            issues: table
                .rejected
                .iter()
                .map(|err| RewardIssue::RejectedRow {
                    reason: err.to_string(),
                })
                .collect(),
        };

        for rule in table.rules.iter().filter(|rule| rule.fires_at(completion_count)) {
            match self.apply(rule).await {
                Ok(application) => {
                    tracing::info!(
                        target_name = %rule.target(),
                        amount = rule.amount(),
                        completion_count,
                        "reward applied"
                    );
                    report.applied.push(application);
                }
                Err(err) => {
                    tracing::warn!(
                        target_name = %rule.target(),
                        amount = rule.amount(),
                        error = %err,
                        "reward skipped"
                    );
                    report.issues.push(RewardIssue::Skipped {
                        target: rule.target().clone(),
                        amount: rule.amount(),
                        reason: err.to_string(),
                    });
                }
            }
        }

        report
    }

    async fn apply(&self, rule: &RewardRule) -> QuestResult<RewardApplication> {
        let effect = match rule.target() {
            RewardTarget::Experience => {
                let delta = experience_delta(rule)?;
                self.apply_experience(self.layout.character(), EntityClass::Character, rule.target(), delta)
                    .await?
            }
            RewardTarget::SkillExperience(name) => {
                let delta = experience_delta(rule)?;
                self.apply_experience(self.layout.skill(name), EntityClass::Skill, rule.target(), delta)
                    .await?
            }
            RewardTarget::Attribute(name) => {
                self.apply_flat(self.layout.attribute(name), rule.target(), rule.amount())
                    .await?
            }
            RewardTarget::Resource(name) => {
                self.apply_flat(self.layout.resource(name), rule.target(), rule.amount())
                    .await?
            }
        };

        Ok(RewardApplication {
            target: rule.target().clone(),
            amount: rule.amount(),
            effect,
        })
    }

    async fn apply_experience(
        &self,
        id: DocumentId,
        class: EntityClass,
        target: &RewardTarget,
        delta: u64,
    ) -> QuestResult<RewardEffect> {
        let _guard = self.locks.acquire(&id).await;
        let metadata = self.read_target(&id, target).await?;

        let before = decode_progression(class, &metadata)?;
        let after = apply_experience(before.clone(), delta);
        self.store.update_metadata(&id, encode_progression(&after)).await?;

        let change = LevelChange::between(&before, &after);
        if change.levels_gained() > 0 {
            tracing::info!(document = %id, level = change.level_after, "level up");
        }
        Ok(RewardEffect::Leveled(change))
    }

    async fn apply_flat(&self, id: DocumentId, target: &RewardTarget, amount: i64) -> QuestResult<RewardEffect> {
        let _guard = self.locks.acquire(&id).await;
        let metadata = self.read_target(&id, target).await?;

        let before = decode_flat_value(&metadata)?;
        let after = before
            .checked_add(amount)
            .ok_or_else(|| QuestError::parse("当前值", "value overflow"))?;
        self.store.update_metadata(&id, encode_flat_value(after)).await?;

        Ok(RewardEffect::Flat { before, after })
    }

    async fn read_target(&self, id: &DocumentId, target: &RewardTarget) -> QuestResult<Metadata> {
        match self.store.get_metadata(id).await {
            Ok(metadata) => Ok(metadata),
            Err(e) if e.is_not_found() => Err(QuestError::missing_target(
                target.kind(),
                target.name().unwrap_or(id.as_str()),
            )),
            Err(e) => Err(e.into()),
        }
    }
}

fn experience_delta(rule: &RewardRule) -> QuestResult<u64> {
    u64::try_from(rule.amount())
        .map_err(|_| QuestError::parse("值", format!("negative experience {} is not supported", rule.amount())))
}
