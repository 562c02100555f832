//! IDs - 型付き識別子
//!
//! タスクの `uuid` は ULID で表現します。
//! 一度割り当てたら再利用しない（CompletionRecord のキーになるため）。
//!
//! ## Phantom Type パターン
//! `Id<T>` で共通実装を提供しつつ、`T` をマーカー型にして
//! 異なる種類の ID を混同できないようにしています。

use serde::{Deserialize, Serialize};
use std::fmt;
use std::marker::PhantomData;
use std::str::FromStr;
use ulid::Ulid;

/// IdMarker は各 ID 型のマーカー trait
pub trait IdMarker: Send + Sync + 'static {
    /// Display で使うプレフィックス（例: "task-"）
    fn prefix() -> &'static str;
}

/// ジェネリック ID 型
///
/// 永続化（frontmatter の `uuid` フィールド）はプレフィックスなしの ULID 文字列、
/// Display（ログ）はプレフィックス付きです。
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Id<T: IdMarker> {
    ulid: Ulid,
    #[serde(skip)]
    _marker: PhantomData<T>,
}

impl<T: IdMarker> Id<T> {
    /// ULID から Id を作成
    pub fn from_ulid(ulid: Ulid) -> Self {
        Self {
            ulid,
            _marker: PhantomData,
        }
    }

    /// 内部の ULID を取得
    pub fn as_ulid(&self) -> Ulid {
        self.ulid
    }

    /// 永続化用の文字列（プレフィックスなし）
    pub fn to_stored(&self) -> String {
        self.ulid.to_string()
    }
}

impl<T: IdMarker> From<Ulid> for Id<T> {
    fn from(ulid: Ulid) -> Self {
        Self::from_ulid(ulid)
    }
}

impl<T: IdMarker> fmt::Display for Id<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", T::prefix(), self.ulid)
    }
}

/// ID 文字列の解析エラー
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid id: {0:?}")]
pub struct ParseIdError(pub String);

/// 受け付ける形式:
/// - ULID（`01HN...`）、プレフィックス付き（`task-01HN...`）
/// - ハイフン区切りの UUID（既存ドキュメント互換。同じ 128-bit 値として扱う）
impl<T: IdMarker> FromStr for Id<T> {
    type Err = ParseIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.trim();
        let raw = raw.strip_prefix(T::prefix()).unwrap_or(raw);

        if let Ok(ulid) = Ulid::from_string(raw) {
            return Ok(Self::from_ulid(ulid));
        }

        let hex: String = raw.chars().filter(|c| *c != '-').collect();
        if hex.len() == 32
            && let Ok(value) = u128::from_str_radix(&hex, 16)
        {
            return Ok(Self::from_ulid(Ulid::from(value)));
        }

        Err(ParseIdError(s.to_string()))
    }
}

/// Task のマーカー型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Task {}

impl IdMarker for Task {
    fn prefix() -> &'static str {
        "task-"
    }
}

/// 繰り返しタスクの識別子（サイクルをまたいで変わらない）
pub type TaskId = Id<Task>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_has_prefix_but_stored_form_does_not() {
        let ulid = Ulid::new();
        let id = TaskId::from_ulid(ulid);

        assert!(id.to_string().starts_with("task-"));
        assert_eq!(id.to_stored(), ulid.to_string());
    }

    #[test]
    fn parses_stored_and_display_forms() {
        let id = TaskId::from_ulid(Ulid::new());

        let from_stored: TaskId = id.to_stored().parse().unwrap();
        let from_display: TaskId = id.to_string().parse().unwrap();

        assert_eq!(from_stored, id);
        assert_eq!(from_display, id);
    }

    #[test]
    fn parses_hyphenated_uuid() {
        let id: TaskId = "67e55044-10b1-426f-9247-bb680e5fe0c8".parse().unwrap();
        assert_eq!(
            id.as_ulid(),
            Ulid::from(0x67e5504410b1426f9247bb680e5fe0c8_u128)
        );
    }

    #[test]
    fn rejects_garbage() {
        assert!("not-an-id".parse::<TaskId>().is_err());
        assert!("".parse::<TaskId>().is_err());
    }

    #[test]
    fn phantom_data_does_not_consume_memory() {
        use std::mem::size_of;
        assert_eq!(size_of::<TaskId>(), size_of::<Ulid>());
    }

    #[test]
    fn serializes_as_plain_ulid_string() {
        let ulid = Ulid::new();
        let id = TaskId::from_ulid(ulid);
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{ulid}\""));
        let back: TaskId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }
}
