//! DocumentLocks - ドキュメント単位の排他
//!
//! # 学習ポイント
//! - read-modify-write をクリティカルセクションとして扱う
//! - `Arc<Mutex<()>>` をキーごとに払い出すレジストリ
//! - `OwnedMutexGuard` で await をまたいでロックを保持
//!
//! # ロック順序
//! タスクドキュメント → エンティティドキュメント の順でのみ取得します。
//! エンティティのロックを持ったままタスクのロックを取らないため、デッドロックしません。

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::ports::DocumentId;

/// DocumentLocks はドキュメント ID ごとの非同期 Mutex を管理
#[derive(Debug, Default, Clone)]
pub struct DocumentLocks {
    entries: Arc<Mutex<HashMap<DocumentId, Arc<Mutex<()>>>>>,
}

impl DocumentLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// `id` の排他区間に入る。ガードを drop すると解放。
    pub async fn acquire(&self, id: &DocumentId) -> OwnedMutexGuard<()> {
        let slot = {
            let mut entries = self.entries.lock().await;
            entries
                .entry(id.clone())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };
        slot.lock_owned().await
    }
}
