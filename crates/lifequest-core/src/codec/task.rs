//! タスクドキュメント ⇄ `TaskRecord`

use serde_json::Value;

use super::fields;
use crate::domain::policy::{FIELD_INTERVAL, FIELD_INTERVAL_BASE, FIELD_POLICY, FIELD_SCHEDULE};
use crate::domain::{QuestError, QuestResult, RefreshPolicy, TaskId, TaskRecord, TaskStatus, Timestamp};
use crate::ports::{IdGenerator, Metadata};

pub const FIELD_UUID: &str = "uuid";
pub const FIELD_STATUS: &str = "任务状态";
pub const FIELD_COUNT: &str = "完成次数";
pub const FIELD_CYCLE_START: &str = "本次刷新时间";
pub const FIELD_NEXT_DUE: &str = "下一次刷新时间";
pub const FIELD_COMPLETED_AT: &str = "完成时间";

/// DecodedTask はデコード結果と、その場で ID を割り当てたかどうか
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedTask {
    pub record: TaskRecord,
    /// `uuid` がなかった。次の書き込みで永続化する
    pub identity_assigned: bool,
}

/// タスクの frontmatter をデコード
///
/// # 既定値
/// - 任务状态: `进行中`
/// - 完成次数: 0
/// - 本次刷新时间: `now`
/// - uuid: `ids` で新規発行
pub fn decode_task(metadata: &Metadata, now: Timestamp, ids: &dyn IdGenerator) -> QuestResult<DecodedTask> {
    let (uuid, identity_assigned) = match fields::text(metadata, FIELD_UUID) {
        Some(raw) => {
            let id: TaskId = raw
                .parse()
                .map_err(|e| QuestError::parse(FIELD_UUID, format!("{e}")))?;
            (id, false)
        }
        None => (ids.generate_task_id(), true),
    };

    let status = match fields::text(metadata, FIELD_STATUS) {
        Some(label) => TaskStatus::from_label(&label)
            .ok_or_else(|| QuestError::parse(FIELD_STATUS, format!("unknown status {label:?}")))?,
        None => TaskStatus::default(),
    };

    let policy = RefreshPolicy::from_fields(
        fields::text(metadata, FIELD_POLICY).as_deref(),
        fields::text(metadata, FIELD_SCHEDULE).as_deref(),
        fields::text(metadata, FIELD_INTERVAL).as_deref(),
        fields::text(metadata, FIELD_INTERVAL_BASE).as_deref(),
    )?;

    let record = TaskRecord {
        uuid,
        status,
        completion_count: fields::unsigned(metadata, FIELD_COUNT)?.unwrap_or(0),
        policy,
        current_cycle_start: fields::timestamp(metadata, FIELD_CYCLE_START)?.unwrap_or(now),
        next_due_at: fields::timestamp(metadata, FIELD_NEXT_DUE)?,
        last_completed_at: fields::timestamp(metadata, FIELD_COMPLETED_AT)?,
    };

    Ok(DecodedTask {
        record,
        identity_assigned,
    })
}

/// 状態機械が所有するフィールドだけを書き出す
///
/// ポリシーのフィールドはユーザーが書くもので、書き戻さない。
pub fn encode_task(record: &TaskRecord) -> Metadata {
    let mut out = Metadata::new();
    out.insert(FIELD_UUID.into(), Value::String(record.uuid.to_stored()));
    out.insert(FIELD_STATUS.into(), Value::String(record.status.as_label().into()));
    out.insert(FIELD_COUNT.into(), Value::from(record.completion_count));
    out.insert(
        FIELD_CYCLE_START.into(),
        fields::timestamp_value(Some(&record.current_cycle_start)),
    );
    out.insert(
        FIELD_NEXT_DUE.into(),
        fields::timestamp_value(record.next_due_at.as_ref()),
    );
    if let Some(at) = &record.last_completed_at {
        out.insert(FIELD_COMPLETED_AT.into(), fields::timestamp_value(Some(at)));
    }
    out
}
