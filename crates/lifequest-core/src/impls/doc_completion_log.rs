//! DocumentCompletionLog - 完了記録をドキュメントとして保存
//!
//! タスクごとに `游戏/完成记录/<uuid>.md` を 1 つ持ちます。
//!
//! - `records`: 記録のリスト（`summary` は人間向けの一行）
//! - `完成次数`: 最新の完了回数
//! - 本文: `# 完成记录（已完成N次）` と各回の一行
//!
//! 追記・確定はどちらも 1 回の write で行います。

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::app::locks::DocumentLocks;
use crate::config::VaultLayout;
use crate::domain::{CompletionRecord, QuestError, QuestResult, TaskId};
use crate::ports::{CompletionLog, Document, DocumentId, DocumentStore, Metadata, StoreError};

const FIELD_RECORDS: &str = "records";
const FIELD_SUMMARY: &str = "summary";
const FIELD_UUID: &str = "uuid";
const FIELD_COUNT: &str = "完成次数";

pub struct DocumentCompletionLog {
    store: Arc<dyn DocumentStore>,
    locks: DocumentLocks,
    layout: VaultLayout,
}

impl DocumentCompletionLog {
    pub fn new(store: Arc<dyn DocumentStore>, locks: DocumentLocks, layout: VaultLayout) -> Self {
        Self { store, locks, layout }
    }

    fn document_id(&self, task: TaskId) -> DocumentId {
        self.layout.completion_log(&task.to_stored())
    }

    /// ロック下で読み、`merge` で書き換えてから 1 回で書き戻す
    async fn modify<F>(&self, task: TaskId, merge: F) -> QuestResult<()>
    where
        F: FnOnce(&mut Vec<CompletionRecord>) -> QuestResult<()> + Send,
    {
        let id = self.document_id(task);
        let _guard = self.locks.acquire(&id).await;

        let mut records = self.load(&id).await?;
        merge(&mut records)?;
        records.sort_by_key(|r| r.completion_count);

        let latest = records.last().map(|r| r.completion_count).unwrap_or(0);
        let mut metadata = Metadata::new();
        metadata.insert(FIELD_UUID.into(), Value::String(task.to_stored()));
        metadata.insert(FIELD_COUNT.into(), Value::from(latest));
        metadata.insert(
            FIELD_RECORDS.into(),
            Value::Array(records.iter().map(encode_record).collect::<QuestResult<_>>()?),
        );

        let body = render_body(&records);
        self.store.write(&id, &Document::new(metadata, body)).await?;
        Ok(())
    }

    async fn load(&self, id: &DocumentId) -> QuestResult<Vec<CompletionRecord>> {
        let metadata = match self.store.get_metadata(id).await {
            Ok(metadata) => metadata,
            Err(e) if e.is_not_found() => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        decode_records(id, &metadata)
    }
}

fn decode_records(id: &DocumentId, metadata: &Metadata) -> QuestResult<Vec<CompletionRecord>> {
    let Some(raw) = metadata.get(FIELD_RECORDS) else {
        return Ok(Vec::new());
    };
    let Value::Array(items) = raw else {
        return Err(malformed(id, "records must be a list"));
    };
    items
        .iter()
        .map(|item| {
            serde_json::from_value::<CompletionRecord>(item.clone())
                .map_err(|e| malformed(id, &format!("bad record: {e}")))
        })
        .collect()
}

fn encode_record(record: &CompletionRecord) -> QuestResult<Value> {
    let mut value = serde_json::to_value(record)
        .map_err(|e| QuestError::parse(FIELD_RECORDS, e.to_string()))?;
    if let Value::Object(map) = &mut value {
        map.insert(FIELD_SUMMARY.into(), Value::String(record.summary()));
    }
    Ok(value)
}

fn render_body(records: &[CompletionRecord]) -> String {
    let mut body = format!("# 完成记录（已完成{}次）\n", records.len());
    for record in records {
        body.push('\n');
        body.push_str(&record.summary());
    }
    body.push('\n');
    body
}

fn malformed(id: &DocumentId, message: &str) -> QuestError {
    QuestError::Store(StoreError::Format {
        id: id.clone(),
        message: message.to_string(),
    })
}

#[async_trait]
impl CompletionLog for DocumentCompletionLog {
    async fn get(&self, task: TaskId, completion_count: u64) -> QuestResult<Option<CompletionRecord>> {
        let id = self.document_id(task);
        Ok(self
            .load(&id)
            .await?
            .into_iter()
            .find(|r| r.completion_count == completion_count))
    }

    async fn append(&self, record: CompletionRecord) -> QuestResult<()> {
        self.modify(record.task, move |records| {
            if records.iter().any(|r| r.completion_count == record.completion_count) {
                return Err(QuestError::DuplicateRecord {
                    task: record.task,
                    count: record.completion_count,
                });
            }
            records.push(record);
            Ok(())
        })
        .await
    }

    async fn finalize(&self, record: CompletionRecord) -> QuestResult<()> {
        self.modify(record.task, move |records| {
            let position = records
                .iter()
                .position(|r| r.completion_count == record.completion_count);
            match position {
                Some(i) if !records[i].pending => Err(QuestError::DuplicateRecord {
                    task: record.task,
                    count: record.completion_count,
                }),
                Some(i) => {
                    records[i] = record;
                    Ok(())
                }
                None => {
                    records.push(record);
                    Ok(())
                }
            }
        })
        .await
    }

    async fn list(&self, task: TaskId) -> QuestResult<Vec<CompletionRecord>> {
        let id = self.document_id(task);
        let mut records = self.load(&id).await?;
        records.sort_by_key(|r| r.completion_count);
        Ok(records)
    }
}
