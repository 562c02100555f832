//! InMemoryDocumentStore - テスト・組み込み用のドキュメントストア
//!
//! # 実装詳細
//! - `BTreeMap<DocumentId, Document>` で保持（prefix 列挙がソート済みになる）
//! - tokio::sync::Mutex で排他制御
//! - `writes()` で書き込み回数を数える（「1 遷移 1 書き込み」のテスト用）

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::ports::{Document, DocumentId, DocumentStore, StoreError};

#[derive(Debug, Default, Clone)]
pub struct InMemoryDocumentStore {
    documents: Arc<Mutex<BTreeMap<DocumentId, Document>>>,
    writes: Arc<AtomicUsize>,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 初期ドキュメント入りのストア
    pub fn with_documents(documents: impl IntoIterator<Item = (DocumentId, Document)>) -> Self {
        Self {
            documents: Arc::new(Mutex::new(documents.into_iter().collect())),
            writes: Arc::default(),
        }
    }

    /// 書き込み回数に数えずにドキュメントを入れる
    pub async fn insert(&self, id: DocumentId, document: Document) {
        self.documents.lock().await.insert(id, document);
    }

    /// これまでの `write` 回数
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn read(&self, id: &DocumentId) -> Result<Document, StoreError> {
        self.documents
            .lock()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(id.clone()))
    }

    async fn write(&self, id: &DocumentId, document: &Document) -> Result<(), StoreError> {
        self.documents.lock().await.insert(id.clone(), document.clone());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn list_by_prefix(&self, prefix: &str) -> Result<Vec<DocumentId>, StoreError> {
        Ok(self
            .documents
            .lock()
            .await
            .keys()
            .filter(|id| id.as_str().starts_with(prefix))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::Metadata;
    use serde_json::json;

    fn doc(value: serde_json::Value) -> Document {
        let metadata: Metadata = match value {
            serde_json::Value::Object(map) => map,
            _ => unreachable!(),
        };
        Document::new(metadata, "body")
    }

    #[tokio::test]
    async fn read_missing_is_not_found() {
        let store = InMemoryDocumentStore::new();
        let err = store.read(&DocumentId::from("nope.md")).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn update_metadata_merges_and_writes_once() {
        let id = DocumentId::from("游戏/角色.md");
        let store = InMemoryDocumentStore::with_documents([(id.clone(), doc(json!({ "等级": 1, "备注": "x" })))]);

        let mut fields = Metadata::new();
        fields.insert("等级".into(), json!(2));
        fields.insert("经验值".into(), json!(10));
        store.update_metadata(&id, fields).await.unwrap();

        let meta = store.get_metadata(&id).await.unwrap();
        assert_eq!(meta["等级"], json!(2));
        assert_eq!(meta["经验值"], json!(10));
        assert_eq!(meta["备注"], json!("x"));
        assert_eq!(store.read(&id).await.unwrap().body, "body");
        assert_eq!(store.writes(), 1);
    }

    #[tokio::test]
    async fn list_by_prefix_is_sorted_and_filtered() {
        let store = InMemoryDocumentStore::new();
        for path in ["游戏/任务/b.md", "游戏/角色.md", "游戏/任务/a.md"] {
            store.insert(DocumentId::from(path), Document::default()).await;
        }
        let ids = store.list_by_prefix("游戏/任务/").await.unwrap();
        let paths: Vec<&str> = ids.iter().map(DocumentId::as_str).collect();
        assert_eq!(paths, vec!["游戏/任务/a.md", "游戏/任务/b.md"]);
    }
}
