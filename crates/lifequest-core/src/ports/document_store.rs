//! DocumentStore port - ドキュメントストア（system of record）
//!
//! タスク・キャラクター・技能・属性・資源の状態は、すべてドキュメントの
//! メタデータ（frontmatter 相当のキー・バリュー）として保存されます。
//! コアはデータベースを前提にしません。
//!
//! # 実装
//! - InMemoryDocumentStore（テスト用）
//! - FsDocumentStore（Markdown + YAML frontmatter）

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// frontmatter 相当のキー・バリュー
pub type Metadata = serde_json::Map<String, Value>;

/// vault からの相対パス（例: `游戏/角色.md`）
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DocumentId(String);

impl DocumentId {
    pub fn new(path: impl Into<String>) -> Self {
        Self(path.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DocumentId {
    fn from(path: &str) -> Self {
        Self::new(path)
    }
}

/// Document はメタデータと自由形式の本文
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Document {
    pub metadata: Metadata,
    pub body: String,
}

impl Document {
    pub fn new(metadata: Metadata, body: impl Into<String>) -> Self {
        Self {
            metadata,
            body: body.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("document not found: {0}")]
    NotFound(DocumentId),

    #[error("I/O error on {id}: {source}")]
    Io {
        id: DocumentId,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed document {id}: {message}")]
    Format { id: DocumentId, message: String },
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound(_))
    }
}

/// DocumentStore は名前付きドキュメントの読み書き・列挙を提供
///
/// # 設計原則
/// - `write` は 1 回の呼び出しでドキュメント全体を置き換える（途中状態を残さない）
/// - read-modify-write の排他は呼び出し側（`app::locks`）が担う
/// - `update_metadata` はフィールド単位の構造化更新。シリアライズはストアの責務
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn read(&self, id: &DocumentId) -> Result<Document, StoreError>;

    async fn write(&self, id: &DocumentId, document: &Document) -> Result<(), StoreError>;

    /// パスが `prefix` で始まる ID（ソート済み）
    async fn list_by_prefix(&self, prefix: &str) -> Result<Vec<DocumentId>, StoreError>;

    async fn get_metadata(&self, id: &DocumentId) -> Result<Metadata, StoreError> {
        Ok(self.read(id).await?.metadata)
    }

    /// `fields` をメタデータにマージして 1 回で書く（キー順・本文・他のフィールドは保つ）
    async fn update_metadata(&self, id: &DocumentId, fields: Metadata) -> Result<(), StoreError> {
        let mut document = self.read(id).await?;
        for (key, value) in fields {
            document.metadata.insert(key, value);
        }
        self.write(id, &document).await
    }
}
