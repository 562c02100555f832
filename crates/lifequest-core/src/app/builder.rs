//! AppBuilder - アプリケーションの構築とワイヤリング
//!
//! # 学習ポイント
//! - Builder パターンの実装
//! - 起動時検証（Fail-fast 設計）
//! - 省略されたポートにはデフォルト実装を入れる

use std::sync::Arc;

use chrono::Duration;

use crate::app::locks::DocumentLocks;
use crate::app::refresh::{CompletionReport, TaskRefreshMachine};
use crate::app::scheduler_loop::{SchedulerLoop, TickReport, run_tick};
use crate::app::status::TaskCounts;
use crate::config::{Config, ConfigError};
use crate::domain::{QuestResult, TaskRecord, Timestamp};
use crate::impls::{DocumentCompletionLog, NoPrompt};
use crate::ports::{
    Clock, CompletionLog, DocumentId, DocumentStore, IdGenerator, PromptProvider, SystemClock,
    UlidGenerator,
};
use crate::rewards::RewardDispatcher;

/// AppBuilder はアプリケーションを構築
///
/// # 使用例
/// ```ignore
/// let app = AppBuilder::new(config)
///     .store(Arc::new(FsDocumentStore::new(&config.vault.root)))
///     .prompt(Arc::new(NoPrompt))
///     .build()?;
/// ```
///
/// # デフォルト
/// - completion_log: ストア上の `DocumentCompletionLog`
/// - prompt: `NoPrompt`（手動指定タスクは入力待ちになる）
/// - clock: `SystemClock`
/// - ids: clock ベースの `UlidGenerator`
pub struct AppBuilder {
    config: Config,
    store: Option<Arc<dyn DocumentStore>>,
    completion_log: Option<Arc<dyn CompletionLog>>,
    prompt: Option<Arc<dyn PromptProvider>>,
    clock: Option<Arc<dyn Clock>>,
    ids: Option<Arc<dyn IdGenerator>>,
}

/// BuildError はアプリケーション構築時のエラー
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("no document store configured")]
    MissingStore,

    #[error(transparent)]
    InvalidConfig(#[from] ConfigError),
}

impl AppBuilder {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            store: None,
            completion_log: None,
            prompt: None,
            clock: None,
            ids: None,
        }
    }

    pub fn store(mut self, store: Arc<dyn DocumentStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn completion_log(mut self, log: Arc<dyn CompletionLog>) -> Self {
        self.completion_log = Some(log);
        self
    }

    pub fn prompt(mut self, prompt: Arc<dyn PromptProvider>) -> Self {
        self.prompt = Some(prompt);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn ids(mut self, ids: Arc<dyn IdGenerator>) -> Self {
        self.ids = Some(ids);
        self
    }

    /// # 検証
    /// - ストアが設定されているか
    /// - 設定値が有効か（`Config::validate`）
    pub fn build(self) -> Result<App, BuildError> {
        self.config.validate()?;
        let store = self.store.ok_or(BuildError::MissingStore)?;

        let locks = DocumentLocks::new();
        let layout = self.config.vault.clone();
        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));
        let ids = self
            .ids
            .unwrap_or_else(|| Arc::new(UlidGenerator::new(Arc::clone(&clock))));
        let completion_log = self.completion_log.unwrap_or_else(|| {
            Arc::new(DocumentCompletionLog::new(
                Arc::clone(&store),
                locks.clone(),
                layout.clone(),
            ))
        });

        let machine = TaskRefreshMachine {
            dispatcher: RewardDispatcher::new(Arc::clone(&store), locks.clone(), layout.clone()),
            store,
            completion_log,
            prompt: self.prompt.unwrap_or_else(|| Arc::new(NoPrompt)),
            ids,
            locks,
            layout,
            manual_fallback: self
                .config
                .manual
                .fallback_hours
                .map(|hours| Duration::hours(i64::from(hours))),
        };

        Ok(App {
            machine: Arc::new(machine),
            clock,
            config: self.config,
        })
    }
}

/// App はアプリケーションのランタイム
///
/// 時刻は注入された Clock から取ります。
pub struct App {
    machine: Arc<TaskRefreshMachine>,
    clock: Arc<dyn Clock>,
    config: Config,
}

impl App {
    pub fn machine(&self) -> &Arc<TaskRefreshMachine> {
        &self.machine
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn now(&self) -> Timestamp {
        self.clock.now()
    }

    pub async fn complete(&self, id: &DocumentId) -> QuestResult<CompletionReport> {
        self.machine.complete(id, self.now()).await
    }

    pub async fn supply_next_due(&self, id: &DocumentId, due: Timestamp) -> QuestResult<TaskRecord> {
        self.machine.supply_next_due(id, due, self.now()).await
    }

    pub async fn counts(&self) -> QuestResult<TaskCounts> {
        self.machine.counts(self.now()).await
    }

    /// 現在時刻でスケジューラを 1 回まわす
    pub async fn tick(&self) -> TickReport {
        run_tick(&self.machine, self.now()).await
    }

    pub fn spawn_scheduler(&self) -> SchedulerLoop {
        SchedulerLoop::spawn(
            Arc::clone(&self.machine),
            Arc::clone(&self.clock),
            self.config.scheduler.tick_interval(),
        )
    }
}
