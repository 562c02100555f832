//! TaskRefreshMachine - タスクのライフサイクル（InProgress ⇄ Completed）
//!
//! # 遷移
//! - `complete`: InProgress → Completed。完了回数 +1、報酬を適用、次回刷新時刻を決める
//! - `refresh_if_due`: Completed → InProgress。`now >= 下一次刷新时间` のときだけ
//! - `supply_next_due`: 手動指定ポリシーの入力待ちに時刻を与える
//!
//! # 排他
//! すべての遷移はタスクドキュメントのロック下で read → 計算 → write（1 回）。
//! 報酬適用はタスクのロックを持ったままエンティティのロックを取ります（逆順はない）。
//!
//! # 冪等性
//! `(uuid, 完成次数)` の CompletionRecord が既にあれば報酬は再適用しない。
//! 記録は報酬の適用前に pending として書くので、途中で失敗した完了を
//! 再試行しても報酬は二重にならない。

use std::sync::Arc;

use chrono::Duration;
use serde::Serialize;

use crate::app::locks::DocumentLocks;
use crate::app::status::TaskCounts;
use crate::codec::task::FIELD_NEXT_DUE;
use crate::codec::{DecodedTask, decode_task, encode_task, parse_reward_table};
use crate::config::VaultLayout;
use crate::domain::{
    CompletionRecord, IntervalBase, QuestError, QuestResult, RefreshPolicy, TaskId, TaskRecord,
    TaskStatus, Timestamp, Transition,
};
use crate::ports::{
    CompletionLog, Document, DocumentId, DocumentStore, IdGenerator, PromptProvider, TaskPrompt,
};
use crate::rewards::{DispatchReport, RewardDispatcher};
use crate::schedule::{NextDue, ReferenceTimes, compute_next_due};

/// CompletionReport は `complete` の結果
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompletionReport {
    pub document: DocumentId,
    pub task: TaskId,
    pub completion_count: u64,
    pub completed_at: Timestamp,
    pub next_due_at: Option<Timestamp>,
    /// 手動指定でまだ答えがない
    pub awaiting_input: bool,
    /// この完了の記録が既にあった（報酬は再適用していない）
    pub replayed: bool,
    pub rewards: DispatchReport,
}

/// RefreshOutcome は Completed タスクに対する `refresh_if_due` の結果
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RefreshOutcome {
    Refreshed { next_due_at: Option<Timestamp> },
    NotDue { due_at: Timestamp },
    /// 手動指定で刷新時刻がなく、フォールバックも無効
    AwaitingInput,
    /// フォールバックの刷新時刻を記録した（まだ期限前）
    FallbackScheduled { due_at: Timestamp },
}

/// TaskRefreshMachine はタスクの状態・完了回数・次回刷新時刻の唯一の書き手
pub struct TaskRefreshMachine {
    pub(super) store: Arc<dyn DocumentStore>,
    pub(super) completion_log: Arc<dyn CompletionLog>,
    pub(super) prompt: Arc<dyn PromptProvider>,
    pub(super) ids: Arc<dyn IdGenerator>,
    pub(super) dispatcher: RewardDispatcher,
    pub(super) locks: DocumentLocks,
    pub(super) layout: VaultLayout,
    pub(super) manual_fallback: Option<Duration>,
}

impl TaskRefreshMachine {
    /// タスクフォルダ配下のドキュメント
    pub async fn tracked_tasks(&self) -> QuestResult<Vec<DocumentId>> {
        Ok(self.store.list_by_prefix(&self.layout.task_prefix).await?)
    }

    /// InProgress → Completed
    pub async fn complete(&self, id: &DocumentId, now: Timestamp) -> QuestResult<CompletionReport> {
        let _guard = self.locks.acquire(id).await;
        let (document, decoded) = self.load(id, now).await?;
        let mut task = decoded.record;
        let count = task.next_completion_count()?;

        let next_due_at = self.next_due_on_completion(id, &task, now).await?;

        let (rewards, replayed) = match self.completion_log.get(task.uuid, count).await? {
            Some(existing) => {
                if existing.pending {
                    tracing::warn!(
                        document = %id,
                        task = %task.uuid,
                        completion_count = count,
                        "earlier completion was interrupted, rewards not re-applied"
                    );
                } else {
                    tracing::info!(
                        document = %id,
                        task = %task.uuid,
                        completion_count = count,
                        "completion already recorded, rewards not re-applied"
                    );
                }
                let report = DispatchReport {
                    applied: existing.rewards,
                    issues: Vec::new(),
                };
                (report, true)
            }
            None => {
                let reserved = CompletionRecord::reserve(task.uuid, count, now);
                self.completion_log.append(reserved.clone()).await?;

                let table = parse_reward_table(&document.body);
                let report = self.dispatcher.dispatch(&table, count).await;
                self.completion_log
                    .finalize(reserved.finish(report.applied.clone()))
                    .await?;
                (report, false)
            }
        };

        task.mark_completed(now, next_due_at)?;
        self.persist(id, &task).await?;

        tracing::info!(
            document = %id,
            task = %task.uuid,
            completion_count = count,
            next_due_at = ?next_due_at,
            rewards = rewards.applied.len(),
            "task completed"
        );

        Ok(CompletionReport {
            document: id.clone(),
            task: task.uuid,
            completion_count: count,
            completed_at: now,
            next_due_at,
            awaiting_input: task.awaits_input(),
            replayed,
            rewards,
        })
    }

    /// `now >= next_due_at` なら Completed → InProgress
    ///
    /// InProgress のタスクには `InvalidTransition`。`Parse` エラーではドキュメントを書かない。
    pub async fn refresh_if_due(&self, id: &DocumentId, now: Timestamp) -> QuestResult<RefreshOutcome> {
        let _guard = self.locks.acquire(id).await;
        let (_, decoded) = self.load(id, now).await?;
        let mut task = decoded.record;
        task.ensure_allowed(Transition::Refresh)?;

        let mut dirty = decoded.identity_assigned;
        let mut fallback_applied = false;

        if task.next_due_at.is_none() {
            if task.policy.is_manual() {
                let Some(fallback) = self.manual_fallback else {
                    if dirty {
                        self.persist(id, &task).await?;
                    }
                    tracing::debug!(document = %id, "awaiting manual due time");
                    return Ok(RefreshOutcome::AwaitingInput);
                };
                let anchor = task.last_completed_at.unwrap_or(task.current_cycle_start);
                let due = anchor
                    .checked_add_signed(fallback)
                    .ok_or_else(|| QuestError::parse(FIELD_NEXT_DUE, "fallback due time out of range"))?;
                tracing::info!(document = %id, due_at = %due, "manual fallback due time recorded");
                task.next_due_at = Some(due);
                fallback_applied = true;
            } else {
                // 刷新時刻のない Completed（手で編集された）。計算し直す
                let refs = ReferenceTimes {
                    now,
                    last_completion: task.last_completed_at.or(Some(task.current_cycle_start)),
                    cycle_start: task.current_cycle_start,
                };
                task.next_due_at = compute_next_due(&task.policy, &refs)?.timestamp();
            }
            dirty = true;
        }

        let Some(due_at) = task.next_due_at else {
            return Ok(RefreshOutcome::AwaitingInput);
        };

        if now < due_at {
            if dirty {
                self.persist(id, &task).await?;
            }
            tracing::debug!(document = %id, due_at = %due_at, "not due");
            return Ok(if fallback_applied {
                RefreshOutcome::FallbackScheduled { due_at }
            } else {
                RefreshOutcome::NotDue { due_at }
            });
        }

        let next_due_at = next_due_on_refresh(&task, now)?;
        task.mark_refreshed(now, next_due_at)?;
        self.persist(id, &task).await?;

        tracing::info!(document = %id, task = %task.uuid, next_due_at = ?next_due_at, "task refreshed");
        Ok(RefreshOutcome::Refreshed { next_due_at })
    }

    /// 入力待ちの手動指定タスクに外部からの答えを記録
    pub async fn supply_next_due(
        &self,
        id: &DocumentId,
        due: Timestamp,
        now: Timestamp,
    ) -> QuestResult<TaskRecord> {
        let _guard = self.locks.acquire(id).await;
        let (_, decoded) = self.load(id, now).await?;
        let mut task = decoded.record;

        task.supply_next_due(due, now)?;
        self.persist(id, &task).await?;

        tracing::info!(document = %id, task = %task.uuid, due_at = %due, "manual due time supplied");
        Ok(task)
    }

    /// 全タスクの状態集計
    pub async fn counts(&self, now: Timestamp) -> QuestResult<TaskCounts> {
        let mut counts = TaskCounts::default();
        for id in self.tracked_tasks().await? {
            let task = match self.load(&id, now).await {
                Ok((_, decoded)) => decoded.record,
                Err(err) => {
                    tracing::warn!(document = %id, error = %err, "unreadable task");
                    counts.unreadable += 1;
                    continue;
                }
            };
            match task.status {
                TaskStatus::InProgress => counts.in_progress += 1,
                TaskStatus::Completed => {
                    counts.completed += 1;
                    if task.is_due(now) {
                        counts.due += 1;
                    }
                    if task.awaits_input() {
                        counts.awaiting_input += 1;
                    }
                }
            }
        }
        Ok(counts)
    }

    async fn load(&self, id: &DocumentId, now: Timestamp) -> QuestResult<(Document, DecodedTask)> {
        let document = self.store.read(id).await?;
        let decoded = decode_task(&document.metadata, now, self.ids.as_ref())?;
        if decoded.identity_assigned {
            tracing::debug!(document = %id, task = %decoded.record.uuid, "identity assigned");
        }
        Ok((document, decoded))
    }

    /// 状態フィールドだけをマージして 1 回書く（本文と未知のフィールドはそのまま）
    async fn persist(&self, id: &DocumentId, task: &TaskRecord) -> QuestResult<()> {
        self.store.update_metadata(id, encode_task(task)).await?;
        Ok(())
    }

    async fn next_due_on_completion(
        &self,
        id: &DocumentId,
        task: &TaskRecord,
        now: Timestamp,
    ) -> QuestResult<Option<Timestamp>> {
        let refs = ReferenceTimes {
            now,
            last_completion: Some(now),
            cycle_start: task.current_cycle_start,
        };
        match compute_next_due(&task.policy, &refs)? {
            NextDue::At(due) => Ok(Some(due)),
            NextDue::NeedsInput => {
                let prompt = TaskPrompt {
                    document: id.clone(),
                    task: task.uuid,
                    completed_at: now,
                };
                match self.prompt.prompt_for_timestamp(&prompt).await {
                    Some(due) if due > now => Ok(Some(due)),
                    Some(due) => {
                        tracing::warn!(document = %id, due_at = %due, "prompt answer is not in the future, awaiting input");
                        Ok(None)
                    }
                    None => Ok(None),
                }
            }
        }
    }
}

/// `now` から始まるサイクルの刷新時刻
///
/// 固定間隔（上一次完成时间）と手動指定は次の完了時に決まるので None。
fn next_due_on_refresh(task: &TaskRecord, now: Timestamp) -> QuestResult<Option<Timestamp>> {
    match task.policy {
        RefreshPolicy::Scheduled(_)
        | RefreshPolicy::Interval {
            base: IntervalBase::LastRefresh,
            ..
        } => {
            let refs = ReferenceTimes {
                now,
                last_completion: task.last_completed_at,
                cycle_start: now,
            };
            Ok(compute_next_due(&task.policy, &refs)?.timestamp())
        }
        RefreshPolicy::Interval {
            base: IntervalBase::LastCompletion,
            ..
        }
        | RefreshPolicy::Manual => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::builder::{App, AppBuilder};
    use crate::config::Config;
    use crate::domain::parse_timestamp;
    use crate::impls::{FixedPrompt, InMemoryCompletionLog, InMemoryDocumentStore, NoPrompt};
    use crate::ports::{FixedClock, Metadata, StoreError};
    use serde_json::{Value, json};
    use std::sync::atomic::{AtomicBool, Ordering};
    use ulid::Ulid;

    const TASK: &str = "游戏/任务/跑步.md";
    const UUID: &str = "01HQZX3Y4K5N6P7Q8R9S0T1V2W";

    fn ts(raw: &str) -> Timestamp {
        parse_timestamp(raw).unwrap()
    }

    fn doc(value: Value, body: &str) -> Document {
        let metadata: Metadata = match value {
            Value::Object(map) => map,
            _ => unreachable!(),
        };
        Document::new(metadata, body)
    }

    struct Fixture {
        store: InMemoryDocumentStore,
        log: Arc<InMemoryCompletionLog>,
        app: App,
    }

    impl Fixture {
        fn new(task: Value, body: &str) -> Self {
            Self::with(task, body, Arc::new(NoPrompt), None)
        }

        fn with(task: Value, body: &str, prompt: Arc<dyn PromptProvider>, fallback_hours: Option<u32>) -> Self {
            let store = InMemoryDocumentStore::with_documents([
                (DocumentId::from(TASK), doc(task, body)),
                (
                    DocumentId::from("游戏/角色.md"),
                    doc(json!({ "等级": 1, "经验值": 980, "升级需要经验": 1000 }), ""),
                ),
            ]);
            let log = Arc::new(InMemoryCompletionLog::new());
            let mut config = Config::default();
            config.manual.fallback_hours = fallback_hours;
            let app = AppBuilder::new(config)
                .store(Arc::new(store.clone()))
                .completion_log(log.clone())
                .prompt(prompt)
                .clock(Arc::new(FixedClock::new(ts("2024-01-01 00:00:00"))))
                .build()
                .unwrap();
            Self { store, log, app }
        }

        fn machine(&self) -> &TaskRefreshMachine {
            self.app.machine()
        }

        async fn task_meta(&self) -> Metadata {
            self.store.get_metadata(&DocumentId::from(TASK)).await.unwrap()
        }
    }

    fn id() -> DocumentId {
        DocumentId::from(TASK)
    }

    fn interval_task(interval: &str, base: &str) -> Value {
        json!({
            "uuid": UUID,
            "任务状态": "进行中",
            "完成次数": 0,
            "刷新方式": "固定间隔",
            "刷新间隔": interval,
            "刷新间隔起算时间": base,
            "本次刷新时间": "2024-01-01 08:00:00",
        })
    }

    fn manual_task() -> Value {
        json!({ "uuid": UUID, "刷新方式": "每次指定时间", "本次刷新时间": "2024-01-01 08:00:00" })
    }

    // Scenario A
    #[tokio::test]
    async fn complete_interval_task_sets_next_due_and_writes_once() {
        let f = Fixture::new(interval_task("2小时", "上一次完成时间"), "");

        let report = f.machine().complete(&id(), ts("2024-01-01 10:00:00")).await.unwrap();

        assert_eq!(report.completion_count, 1);
        assert_eq!(report.next_due_at, Some(ts("2024-01-01 12:00:00")));
        assert!(!report.replayed);
        assert!(!report.awaiting_input);

        let meta = f.task_meta().await;
        assert_eq!(meta["任务状态"], json!("已完成"));
        assert_eq!(meta["完成次数"], json!(1));
        assert_eq!(meta["下一次刷新时间"], json!("2024-01-01 12:00:00"));
        assert_eq!(meta["完成时间"], json!("2024-01-01 10:00:00"));
        assert_eq!(meta["刷新间隔"], json!("2小时"));
        assert_eq!(f.store.writes(), 1);

        let task = TaskId::from_ulid(UUID.parse::<Ulid>().unwrap());
        assert!(f.log.get(task, 1).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn completing_a_completed_task_is_rejected_without_writes() {
        let f = Fixture::new(interval_task("2小时", "上一次完成时间"), "");
        f.machine().complete(&id(), ts("2024-01-01 10:00:00")).await.unwrap();
        let before = f.task_meta().await;

        let err = f.machine().complete(&id(), ts("2024-01-01 10:30:00")).await.unwrap_err();

        assert!(matches!(
            err,
            QuestError::InvalidTransition { action: Transition::Complete, from: TaskStatus::Completed, .. }
        ));
        assert_eq!(f.task_meta().await, before);
        assert_eq!(f.store.writes(), 1);
    }

    #[tokio::test]
    async fn refresh_waits_for_due_time() {
        let f = Fixture::new(interval_task("2小时", "上一次完成时间"), "");
        f.machine().complete(&id(), ts("2024-01-01 10:00:00")).await.unwrap();

        let early = f.machine().refresh_if_due(&id(), ts("2024-01-01 11:59:59")).await.unwrap();
        assert_eq!(early, RefreshOutcome::NotDue { due_at: ts("2024-01-01 12:00:00") });

        let due = f.machine().refresh_if_due(&id(), ts("2024-01-01 12:00:00")).await.unwrap();
        assert_eq!(due, RefreshOutcome::Refreshed { next_due_at: None });

        let meta = f.task_meta().await;
        assert_eq!(meta["任务状态"], json!("进行中"));
        assert_eq!(meta["本次刷新时间"], json!("2024-01-01 12:00:00"));
        assert_eq!(meta["下一次刷新时间"], json!(""));
        assert_eq!(meta["完成次数"], json!(1));
    }

    #[tokio::test]
    async fn refreshing_in_progress_task_is_rejected() {
        let f = Fixture::new(interval_task("2小时", "上一次完成时间"), "");
        let err = f.machine().refresh_if_due(&id(), ts("2024-01-01 12:00:00")).await.unwrap_err();
        assert!(matches!(
            err,
            QuestError::InvalidTransition { action: Transition::Refresh, from: TaskStatus::InProgress, .. }
        ));
        assert_eq!(f.store.writes(), 0);
    }

    // Scenario B
    #[tokio::test]
    async fn weekly_task_cycles_on_mondays() {
        let f = Fixture::new(
            json!({ "uuid": UUID, "刷新方式": "定时", "刷新时间": "每周一" }),
            "",
        );
        let report = f.machine().complete(&id(), ts("2024-01-01 10:00:00")).await.unwrap();
        assert_eq!(report.next_due_at, Some(ts("2024-01-08 05:00:00")));

        let outcome = f.machine().refresh_if_due(&id(), ts("2024-01-08 05:00:00")).await.unwrap();
        assert_eq!(
            outcome,
            RefreshOutcome::Refreshed { next_due_at: Some(ts("2024-01-15 05:00:00")) }
        );
    }

    // Scenario C
    #[tokio::test]
    async fn monthly_interval_from_last_refresh_clamps_to_leap_day() {
        let mut task = interval_task("1月", "上一次刷新时间");
        task["本次刷新时间"] = json!("2024-01-31 10:00:00");
        let f = Fixture::new(task, "");

        let report = f.machine().complete(&id(), ts("2024-02-10 09:00:00")).await.unwrap();
        assert_eq!(report.next_due_at, Some(ts("2024-02-29 10:00:00")));

        let outcome = f.machine().refresh_if_due(&id(), ts("2024-02-29 10:00:00")).await.unwrap();
        assert_eq!(
            outcome,
            RefreshOutcome::Refreshed { next_due_at: Some(ts("2024-03-29 10:00:00")) }
        );
    }

    // Scenario D
    #[tokio::test]
    async fn sixth_completion_fires_every_third_reward() {
        let mut task = interval_task("1天", "上一次完成时间");
        task["完成次数"] = json!(5);
        let body = "| 次数 | 项目 | 值 |\n|---|---|---|\n| 3次 | 经验值 | 50 |\n| 4次 | 经验值 | 1000 |\n";
        let f = Fixture::new(task, body);

        let report = f.machine().complete(&id(), ts("2024-01-01 10:00:00")).await.unwrap();

        assert_eq!(report.completion_count, 6);
        assert_eq!(report.rewards.applied.len(), 1);
        let character = f.store.get_metadata(&DocumentId::from("游戏/角色.md")).await.unwrap();
        assert_eq!(character["等级"], json!(2));
        assert_eq!(character["经验值"], json!(30));
        assert_eq!(character["升级需要经验"], json!(2000));
        assert_eq!(f.store.read(&id()).await.unwrap().body, body);
    }

    #[tokio::test]
    async fn recorded_completion_is_not_rewarded_twice() {
        let body = "| 次数 | 项目 | 值 |\n|---|---|---|\n| 1次 | 经验值 | 50 |\n";
        let f = Fixture::new(interval_task("1天", "上一次完成时间"), body);
        let task = TaskId::from_ulid(UUID.parse::<Ulid>().unwrap());
        f.log
            .append(CompletionRecord::reserve(task, 1, ts("2024-01-01 09:59:00")).finish(Vec::new()))
            .await
            .unwrap();

        let report = f.machine().complete(&id(), ts("2024-01-01 10:00:00")).await.unwrap();

        assert!(report.replayed);
        assert!(report.rewards.applied.is_empty());
        let character = f.store.get_metadata(&DocumentId::from("游戏/角色.md")).await.unwrap();
        assert_eq!(character["经验值"], json!(980));
        assert_eq!(f.task_meta().await["完成次数"], json!(1));
        assert_eq!(f.log.list(task).await.unwrap().len(), 1);
    }

    // Scenario E
    #[tokio::test]
    async fn manual_task_waits_for_supplied_due_time() {
        let f = Fixture::new(manual_task(), "");

        let report = f.machine().complete(&id(), ts("2024-01-01 10:00:00")).await.unwrap();
        assert!(report.awaiting_input);
        assert_eq!(report.next_due_at, None);
        assert_eq!(f.task_meta().await["下一次刷新时间"], json!(""));

        let outcome = f.machine().refresh_if_due(&id(), ts("2024-01-05 00:00:00")).await.unwrap();
        assert_eq!(outcome, RefreshOutcome::AwaitingInput);

        let now = ts("2024-01-01 11:00:00");
        assert!(matches!(
            f.machine().supply_next_due(&id(), ts("2024-01-01 10:30:00"), now).await,
            Err(QuestError::InvalidDueTime { .. })
        ));
        let task = f.machine().supply_next_due(&id(), ts("2024-01-03 09:00:00"), now).await.unwrap();
        assert_eq!(task.next_due_at, Some(ts("2024-01-03 09:00:00")));

        let outcome = f.machine().refresh_if_due(&id(), ts("2024-01-03 09:00:00")).await.unwrap();
        assert_eq!(outcome, RefreshOutcome::Refreshed { next_due_at: None });
    }

    #[tokio::test]
    async fn manual_task_uses_prompt_answer() {
        let at = ts("2024-01-04 07:00:00");
        let f = Fixture::with(manual_task(), "", Arc::new(FixedPrompt::new(at)), None);

        let report = f.machine().complete(&id(), ts("2024-01-01 10:00:00")).await.unwrap();

        assert_eq!(report.next_due_at, Some(at));
        assert!(!report.awaiting_input);
    }

    #[tokio::test]
    async fn past_prompt_answer_leaves_task_awaiting_input() {
        let f = Fixture::with(
            manual_task(),
            "",
            Arc::new(FixedPrompt::new(ts("2023-12-31 00:00:00"))),
            None,
        );
        let report = f.machine().complete(&id(), ts("2024-01-01 10:00:00")).await.unwrap();
        assert!(report.awaiting_input);
    }

    #[tokio::test]
    async fn manual_fallback_schedules_then_refreshes() {
        let f = Fixture::with(manual_task(), "", Arc::new(NoPrompt), Some(24));
        f.machine().complete(&id(), ts("2024-01-01 10:00:00")).await.unwrap();

        let outcome = f.machine().refresh_if_due(&id(), ts("2024-01-01 11:00:00")).await.unwrap();
        assert_eq!(
            outcome,
            RefreshOutcome::FallbackScheduled { due_at: ts("2024-01-02 10:00:00") }
        );
        assert_eq!(f.task_meta().await["下一次刷新时间"], json!("2024-01-02 10:00:00"));

        let outcome = f.machine().refresh_if_due(&id(), ts("2024-01-02 10:00:00")).await.unwrap();
        assert_eq!(outcome, RefreshOutcome::Refreshed { next_due_at: None });
    }

    #[tokio::test]
    async fn overdue_fallback_refreshes_in_one_write() {
        let f = Fixture::with(manual_task(), "", Arc::new(NoPrompt), Some(24));
        f.machine().complete(&id(), ts("2024-01-01 10:00:00")).await.unwrap();
        let writes = f.store.writes();

        let outcome = f.machine().refresh_if_due(&id(), ts("2024-01-03 00:00:00")).await.unwrap();

        assert_eq!(outcome, RefreshOutcome::Refreshed { next_due_at: None });
        assert_eq!(f.store.writes(), writes + 1);
    }

    #[tokio::test]
    async fn identity_is_assigned_once_and_kept() {
        let f = Fixture::new(
            json!({ "刷新方式": "定时", "刷新时间": "每天8时", "备注": "晨跑" }),
            "",
        );

        let first = f.machine().complete(&id(), ts("2024-01-01 10:00:00")).await.unwrap();
        let stored = f.task_meta().await["uuid"].clone();
        assert_eq!(stored, json!(first.task.to_stored()));
        assert_eq!(f.task_meta().await["备注"], json!("晨跑"));

        f.machine().refresh_if_due(&id(), ts("2024-01-02 08:00:00")).await.unwrap();
        let second = f.machine().complete(&id(), ts("2024-01-02 09:00:00")).await.unwrap();
        assert_eq!(second.task, first.task);
        assert_eq!(f.task_meta().await["uuid"], stored);
    }

    #[tokio::test]
    async fn malformed_policy_fails_without_side_effects() {
        let f = Fixture::new(
            json!({ "uuid": UUID, "刷新方式": "定时", "刷新时间": "无效时间格式" }),
            "| 次数 | 项目 | 值 |\n|---|---|---|\n| 1次 | 经验值 | 50 |\n",
        );
        let err = f.machine().complete(&id(), ts("2024-01-01 10:00:00")).await.unwrap_err();
        assert!(matches!(err, QuestError::Parse { .. }));
        assert_eq!(f.store.writes(), 0);
    }

    #[tokio::test]
    async fn counts_summarize_every_task() {
        let f = Fixture::new(manual_task(), "");
        f.store
            .insert(
                DocumentId::from("游戏/任务/读书.md"),
                doc(json!({ "刷新方式": "定时", "刷新时间": "每天" }), ""),
            )
            .await;
        f.store
            .insert(DocumentId::from("游戏/任务/坏.md"), doc(json!({ "刷新方式": "???" }), ""))
            .await;
        f.machine().complete(&id(), ts("2024-01-01 10:00:00")).await.unwrap();

        let counts = f.machine().counts(ts("2024-01-01 12:00:00")).await.unwrap();

        assert_eq!(
            counts,
            TaskCounts {
                in_progress: 1,
                completed: 1,
                due: 0,
                awaiting_input: 1,
                unreadable: 1,
            }
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_completions_apply_once() {
        let body = "| 次数 | 项目 | 值 |\n|---|---|---|\n| 1次 | 经验值 | 10 |\n";
        let f = Arc::new(Fixture::new(interval_task("1天", "上一次完成时间"), body));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let f = Arc::clone(&f);
            handles.push(tokio::spawn(async move {
                f.machine().complete(&id(), ts("2024-01-01 10:00:00")).await.is_ok()
            }));
        }
        let mut succeeded = 0;
        for handle in handles {
            if handle.await.unwrap() {
                succeeded += 1;
            }
        }

        assert_eq!(succeeded, 1);
        assert_eq!(f.task_meta().await["完成次数"], json!(1));
        let character = f.store.get_metadata(&DocumentId::from("游戏/角色.md")).await.unwrap();
        assert_eq!(character["经验值"], json!(990));
    }

    #[derive(Clone, Copy, PartialEq, Eq)]
    enum LogStep {
        Append,
        Finalize,
    }

    /// 指定した操作を 1 回だけ失敗させる
    struct FailingOnceLog {
        inner: InMemoryCompletionLog,
        step: LogStep,
        armed: AtomicBool,
    }

    impl FailingOnceLog {
        fn new(step: LogStep) -> Self {
            Self {
                inner: InMemoryCompletionLog::new(),
                step,
                armed: AtomicBool::new(true),
            }
        }

        fn trip(&self, step: LogStep) -> QuestResult<()> {
            if step == self.step && self.armed.swap(false, Ordering::SeqCst) {
                return Err(QuestError::Store(StoreError::Io {
                    id: DocumentId::from("游戏/完成记录/x.md"),
                    source: std::io::Error::other("disk full"),
                }));
            }
            Ok(())
        }
    }

    #[async_trait::async_trait]
    impl CompletionLog for FailingOnceLog {
        async fn get(&self, task: TaskId, completion_count: u64) -> QuestResult<Option<CompletionRecord>> {
            self.inner.get(task, completion_count).await
        }

        async fn append(&self, record: CompletionRecord) -> QuestResult<()> {
            self.trip(LogStep::Append)?;
            self.inner.append(record).await
        }

        async fn finalize(&self, record: CompletionRecord) -> QuestResult<()> {
            self.trip(LogStep::Finalize)?;
            self.inner.finalize(record).await
        }

        async fn list(&self, task: TaskId) -> QuestResult<Vec<CompletionRecord>> {
            self.inner.list(task).await
        }
    }

    fn app_over(store: &InMemoryDocumentStore, log: Arc<dyn CompletionLog>) -> App {
        AppBuilder::new(Config::default())
            .store(Arc::new(store.clone()))
            .completion_log(log)
            .clock(Arc::new(FixedClock::new(ts("2024-01-01 00:00:00"))))
            .build()
            .unwrap()
    }

    async fn character_exp(store: &InMemoryDocumentStore) -> Value {
        store.get_metadata(&DocumentId::from("游戏/角色.md")).await.unwrap()["经验值"].clone()
    }

    #[tokio::test]
    async fn retry_after_failed_finalize_does_not_reward_twice() {
        let body = "| 次数 | 项目 | 值 |\n|---|---|---|\n| 1次 | 经验值 | 10 |\n";
        let f = Fixture::new(interval_task("1天", "上一次完成时间"), body);
        let log = Arc::new(FailingOnceLog::new(LogStep::Finalize));
        let app = app_over(&f.store, log.clone());

        let first = app.machine().complete(&id(), ts("2024-01-01 10:00:00")).await;
        assert!(matches!(first, Err(QuestError::Store(_))));
        assert_eq!(character_exp(&f.store).await, json!(990));
        assert_eq!(f.task_meta().await["完成次数"], json!(0));

        let second = app.machine().complete(&id(), ts("2024-01-01 10:05:00")).await.unwrap();
        assert!(second.replayed);
        assert_eq!(second.completion_count, 1);
        assert_eq!(character_exp(&f.store).await, json!(990));
        assert_eq!(f.task_meta().await["任务状态"], json!("已完成"));

        let task = TaskId::from_ulid(UUID.parse::<Ulid>().unwrap());
        assert!(log.get(task, 1).await.unwrap().unwrap().pending);
    }

    #[tokio::test]
    async fn failed_reservation_applies_nothing_until_retried() {
        let body = "| 次数 | 项目 | 值 |\n|---|---|---|\n| 1次 | 经验值 | 10 |\n";
        let f = Fixture::new(interval_task("1天", "上一次完成时间"), body);
        let log = Arc::new(FailingOnceLog::new(LogStep::Append));
        let app = app_over(&f.store, log.clone());

        let first = app.machine().complete(&id(), ts("2024-01-01 10:00:00")).await;
        assert!(matches!(first, Err(QuestError::Store(_))));
        assert_eq!(character_exp(&f.store).await, json!(980));

        let second = app.machine().complete(&id(), ts("2024-01-01 10:05:00")).await.unwrap();
        assert!(!second.replayed);
        assert_eq!(second.rewards.applied.len(), 1);
        assert_eq!(character_exp(&f.store).await, json!(990));

        let task = TaskId::from_ulid(UUID.parse::<Ulid>().unwrap());
        let record = log.get(task, 1).await.unwrap().unwrap();
        assert!(!record.pending);
        assert_eq!(record.rewards, second.rewards.applied);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn refresh_and_completion_race_leaves_a_consistent_task() {
        let body = "| 次数 | 项目 | 值 |\n|---|---|---|\n| 1次 | 经验值 | 10 |\n";
        let now = ts("2024-01-02 10:00:00");

        for _ in 0..16 {
            let mut task = interval_task("1天", "上一次完成时间");
            task["任务状态"] = json!("已完成");
            task["完成次数"] = json!(1);
            task["完成时间"] = json!("2024-01-01 10:00:00");
            task["下一次刷新时间"] = json!("2024-01-02 10:00:00");
            let f = Arc::new(Fixture::new(task, body));

            let refresher = {
                let f = Arc::clone(&f);
                tokio::spawn(async move { f.machine().refresh_if_due(&id(), now).await })
            };
            let completer = {
                let f = Arc::clone(&f);
                tokio::spawn(async move { f.machine().complete(&id(), now).await })
            };
            let refreshed = refresher.await.unwrap().unwrap();
            let completed = completer.await.unwrap();

            assert_eq!(refreshed, RefreshOutcome::Refreshed { next_due_at: None });
            let meta = f.task_meta().await;
            match completed {
                // refresh ran first
                Ok(report) => {
                    assert_eq!(report.completion_count, 2);
                    assert_eq!(meta["任务状态"], json!("已完成"));
                    assert_eq!(meta["完成次数"], json!(2));
                    assert_eq!(meta["下一次刷新时间"], json!("2024-01-03 10:00:00"));
                    assert_eq!(character_exp(&f.store).await, json!(990));
                }
                Err(err) => {
                    assert!(matches!(
                        err,
                        QuestError::InvalidTransition { action: Transition::Complete, .. }
                    ));
                    assert_eq!(meta["任务状态"], json!("进行中"));
                    assert_eq!(meta["完成次数"], json!(1));
                    assert_eq!(meta["下一次刷新时间"], json!(""));
                    assert_eq!(character_exp(&f.store).await, json!(980));
                }
            }
        }
    }
}
