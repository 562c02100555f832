//! InMemoryCompletionLog - テスト・組み込み用の完了記録

use std::collections::BTreeMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::{CompletionRecord, QuestError, QuestResult, TaskId};
use crate::ports::CompletionLog;

#[derive(Debug, Default)]
pub struct InMemoryCompletionLog {
    records: Mutex<BTreeMap<(TaskId, u64), CompletionRecord>>,
}

impl InMemoryCompletionLog {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CompletionLog for InMemoryCompletionLog {
    async fn get(&self, task: TaskId, completion_count: u64) -> QuestResult<Option<CompletionRecord>> {
        Ok(self.records.lock().await.get(&(task, completion_count)).cloned())
    }

    async fn append(&self, record: CompletionRecord) -> QuestResult<()> {
        let mut records = self.records.lock().await;
        let key = record.key();
        if records.contains_key(&key) {
            return Err(QuestError::DuplicateRecord {
                task: key.0,
                count: key.1,
            });
        }
        records.insert(key, record);
        Ok(())
    }

    async fn finalize(&self, record: CompletionRecord) -> QuestResult<()> {
        let mut records = self.records.lock().await;
        let key = record.key();
        if records.get(&key).is_some_and(|existing| !existing.pending) {
            return Err(QuestError::DuplicateRecord {
                task: key.0,
                count: key.1,
            });
        }
        records.insert(key, record);
        Ok(())
    }

    async fn list(&self, task: TaskId) -> QuestResult<Vec<CompletionRecord>> {
        Ok(self
            .records
            .lock()
            .await
            .range((task, 0)..=(task, u64::MAX))
            .map(|(_, record)| record.clone())
            .collect())
    }
}
