//! Codec - ドキュメントのメタデータと型付きレコードの変換
//!
//! frontmatter は文字列キーの緩い map です。ここで一度だけデコードして
//! 型付きレコードにし、欠落・不正なフィールドは `QuestError::Parse` にします。
//! 書き戻しはコーデックが扱うフィールドだけを含む `Metadata` を返し、
//! `DocumentStore::update_metadata` でマージします（未知のフィールドは保持）。

pub mod entity;
pub mod fields;
pub mod reward_table;
pub mod task;

pub use self::entity::{decode_flat_value, decode_progression, encode_flat_value, encode_progression};
pub use self::reward_table::parse_reward_table;
pub use self::task::{DecodedTask, decode_task, encode_task};
