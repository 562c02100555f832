//! Fields - 緩い型の frontmatter 値を型付きで読む
//!
//! 数値と数値文字列（`完成次数: 3` と `完成次数: "3"`）の両方を受け付けます。
//! 空文字列は「なし」として扱います。

use serde_json::Value;

use crate::domain::{QuestError, QuestResult, Timestamp, format_timestamp, parse_timestamp};
use crate::ports::Metadata;

/// スカラー値の trim 済みテキスト。なし・null・空なら None
pub fn text(metadata: &Metadata, key: &str) -> Option<String> {
    let raw = match metadata.get(key)? {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => return None,
    };
    (!raw.is_empty()).then_some(raw)
}

pub fn unsigned(metadata: &Metadata, key: &str) -> QuestResult<Option<u64>> {
    match metadata.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => n
            .as_u64()
            .map(Some)
            .ok_or_else(|| QuestError::parse(key, format!("expected a non-negative integer, got {n}"))),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
        Some(Value::String(s)) => s
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| QuestError::parse(key, format!("expected a non-negative integer, got {s:?}"))),
        Some(other) => Err(QuestError::parse(key, format!("expected a number, got {other}"))),
    }
}

pub fn signed(metadata: &Metadata, key: &str) -> QuestResult<Option<i64>> {
    match metadata.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => n
            .as_i64()
            .map(Some)
            .ok_or_else(|| QuestError::parse(key, format!("expected an integer, got {n}"))),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
        Some(Value::String(s)) => s
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| QuestError::parse(key, format!("expected an integer, got {s:?}"))),
        Some(other) => Err(QuestError::parse(key, format!("expected a number, got {other}"))),
    }
}

pub fn timestamp(metadata: &Metadata, key: &str) -> QuestResult<Option<Timestamp>> {
    match text(metadata, key) {
        None => Ok(None),
        Some(raw) => parse_timestamp(&raw)
            .map(Some)
            .ok_or_else(|| QuestError::parse(key, format!("unrecognized timestamp {raw:?}"))),
    }
}

pub fn timestamp_value(ts: Option<&Timestamp>) -> Value {
    match ts {
        Some(ts) => Value::String(format_timestamp(ts)),
        None => Value::String(String::new()),
    }
}
