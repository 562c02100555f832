//! FsDocumentStore - Markdown + YAML frontmatter のドキュメントストア
//!
//! ```text
//! ---
//! 任务状态: 进行中
//! 完成次数: 3
//! ---
//! | 次数 | 项目 | 值 |
//! ...
//! ```
//!
//! # 実装詳細
//! - `DocumentId` は vault ルートからの相対パス（`/` 区切り）
//! - 書き込みは一時ファイル + rename で、途中状態のファイルを残さない
//! - frontmatter がないファイルはメタデータ空・本文全体として読む
//! - frontmatter のキー順は書き戻しでも保つ（`serde_json/preserve_order`）
//! - `list_by_prefix` はプレフィックスの最も深いディレクトリから走査する

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use serde_json::Value;

use crate::ports::{Document, DocumentId, DocumentStore, Metadata, StoreError};

const DELIMITER: &str = "---";
const EXTENSION: &str = "md";

/// FsDocumentStore は vault ディレクトリ上の Markdown ファイルを扱う
#[derive(Debug, Clone)]
pub struct FsDocumentStore {
    root: PathBuf,
}

impl FsDocumentStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// `游戏/任务/` や `游戏/任务/跑` なら `<root>/游戏/任务`。vault の外を指すなら root
    fn walk_start(&self, prefix: &str) -> PathBuf {
        let dir = prefix.rsplit_once('/').map_or("", |(dir, _)| dir);
        let inside = Path::new(dir)
            .components()
            .all(|c| matches!(c, Component::Normal(_)));
        if inside {
            self.root.join(dir)
        } else {
            self.root.clone()
        }
    }

    fn path_of(&self, id: &DocumentId) -> Result<PathBuf, StoreError> {
        let relative = Path::new(id.as_str());
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_)));
        if id.as_str().is_empty() || escapes {
            return Err(StoreError::Format {
                id: id.clone(),
                message: "document id must be a relative path inside the vault".into(),
            });
        }
        Ok(self.root.join(relative))
    }

    fn io(id: &DocumentId) -> impl FnOnce(std::io::Error) -> StoreError + '_ {
        move |source| {
            if source.kind() == std::io::ErrorKind::NotFound {
                StoreError::NotFound(id.clone())
            } else {
                StoreError::Io {
                    id: id.clone(),
                    source,
                }
            }
        }
    }
}

#[async_trait]
impl DocumentStore for FsDocumentStore {
    async fn read(&self, id: &DocumentId) -> Result<Document, StoreError> {
        let path = self.path_of(id)?;
        let raw = tokio::fs::read_to_string(&path).await.map_err(Self::io(id))?;
        parse_document(id, &raw)
    }

    async fn write(&self, id: &DocumentId, document: &Document) -> Result<(), StoreError> {
        let path = self.path_of(id)?;
        let rendered = render_document(id, document)?;

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(Self::io(id))?;
        }
        let staging = path.with_extension("md.tmp");
        tokio::fs::write(&staging, rendered).await.map_err(Self::io(id))?;
        tokio::fs::rename(&staging, &path).await.map_err(Self::io(id))?;
        Ok(())
    }

    async fn list_by_prefix(&self, prefix: &str) -> Result<Vec<DocumentId>, StoreError> {
        let mut found = Vec::new();
        let mut pending = vec![self.walk_start(prefix)];

        while let Some(dir) = pending.pop() {
            let dir_id = DocumentId::new(dir.display().to_string());
            let mut entries = match tokio::fs::read_dir(&dir).await {
                Ok(entries) => entries,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(source) => return Err(StoreError::Io { id: dir_id, source }),
            };
            while let Some(entry) = entries
                .next_entry()
                .await
                .map_err(|source| StoreError::Io { id: dir_id.clone(), source })?
            {
                let path = entry.path();
                let file_type = entry
                    .file_type()
                    .await
                    .map_err(|source| StoreError::Io { id: dir_id.clone(), source })?;
                if file_type.is_dir() {
                    pending.push(path);
                    continue;
                }
                if path.extension().and_then(|ext| ext.to_str()) != Some(EXTENSION) {
                    continue;
                }
                if let Some(id) = relative_id(&self.root, &path)
                    && id.as_str().starts_with(prefix)
                {
                    found.push(id);
                }
            }
        }

        found.sort();
        Ok(found)
    }
}

fn relative_id(root: &Path, path: &Path) -> Option<DocumentId> {
    let relative = path.strip_prefix(root).ok()?;
    let parts: Vec<&str> = relative
        .components()
        .map(|c| c.as_os_str().to_str())
        .collect::<Option<_>>()?;
    Some(DocumentId::new(parts.join("/")))
}

/// `---` の frontmatter と本文を分ける
fn split_frontmatter(raw: &str) -> Option<(&str, &str)> {
    let rest = raw.strip_prefix(DELIMITER)?;
    let rest = rest.strip_prefix("\r\n").or_else(|| rest.strip_prefix('\n'))?;

    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        if line.trim_end() == DELIMITER {
            return Some((&rest[..offset], &rest[offset + line.len()..]));
        }
        offset += line.len();
    }
    None
}

fn parse_document(id: &DocumentId, raw: &str) -> Result<Document, StoreError> {
    let Some((yaml, body)) = split_frontmatter(raw) else {
        return Ok(Document::new(Metadata::new(), raw));
    };

    let value: Value = serde_yaml::from_str(yaml).map_err(|e| StoreError::Format {
        id: id.clone(),
        message: format!("frontmatter: {e}"),
    })?;
    let metadata = match value {
        Value::Null => Metadata::new(),
        Value::Object(map) => map,
        other => {
            return Err(StoreError::Format {
                id: id.clone(),
                message: format!("frontmatter must be a mapping, got {other}"),
            });
        }
    };
    Ok(Document::new(metadata, body))
}

fn render_document(id: &DocumentId, document: &Document) -> Result<String, StoreError> {
    if document.metadata.is_empty() {
        return Ok(document.body.clone());
    }
    let yaml = serde_yaml::to_string(&document.metadata).map_err(|e| StoreError::Format {
        id: id.clone(),
        message: format!("frontmatter: {e}"),
    })?;
    Ok(format!("{DELIMITER}\n{yaml}{DELIMITER}\n{}", document.body))
}
