//! SchedulerLoop - 定期的な刷新チェック
//!
//! 一定間隔で全タスクに `refresh_if_due` を呼びます。
//!
//! # ライフサイクル
//! - `spawn()` で開始、`shutdown_and_join()` で停止
//! - shutdown はティックの間でだけ判定する（処理中のタスクは最後まで書き切る）
//! - 1 タスクの失敗はログに出してループを続ける
//!
//! # 失敗の分類（`ErrorKind`）
//! - Recoverable: ドキュメントが直るまでそのタスクだけ飛ばす（`unreadable`）
//! - Rejected: InProgress のタスクは正常（`in_progress`）。それ以外は `failed`
//! - Infrastructure: ストア障害（`failed`）

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::app::refresh::{RefreshOutcome, TaskRefreshMachine};
use crate::domain::{ErrorKind, QuestError, TaskStatus, Timestamp};
use crate::ports::Clock;

/// TickReport は 1 ティックの集計
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TickReport {
    pub scanned: usize,
    pub refreshed: usize,
    pub not_due: usize,
    pub in_progress: usize,
    pub awaiting_input: usize,
    /// ポリシーやフィールドが読めないタスク
    pub unreadable: usize,
    pub failed: usize,
}

/// 全タスクを 1 回ずつ評価する
pub async fn run_tick(machine: &TaskRefreshMachine, now: Timestamp) -> TickReport {
    let mut report = TickReport::default();

    let ids = match machine.tracked_tasks().await {
        Ok(ids) => ids,
        Err(err) => {
            tracing::warn!(error = %err, "failed to list tasks");
            report.failed += 1;
            return report;
        }
    };

    for id in ids {
        report.scanned += 1;
        match machine.refresh_if_due(&id, now).await {
            Ok(RefreshOutcome::Refreshed { .. }) => report.refreshed += 1,
            Ok(RefreshOutcome::NotDue { .. } | RefreshOutcome::FallbackScheduled { .. }) => {
                report.not_due += 1
            }
            Ok(RefreshOutcome::AwaitingInput) => report.awaiting_input += 1,
            Err(err) => match err.kind() {
                ErrorKind::Rejected
                    if matches!(
                        err,
                        QuestError::InvalidTransition {
                            from: TaskStatus::InProgress,
                            ..
                        }
                    ) =>
                {
                    report.in_progress += 1
                }
                ErrorKind::Recoverable => {
                    tracing::warn!(document = %id, error = %err, "task skipped until its document is fixed");
                    report.unreadable += 1;
                }
                ErrorKind::Rejected => {
                    tracing::warn!(document = %id, error = %err, "refresh rejected");
                    report.failed += 1;
                }
                ErrorKind::Infrastructure => {
                    tracing::error!(document = %id, error = %err, "refresh check failed");
                    report.failed += 1;
                }
            },
        }
    }

    tracing::debug!(?report, "tick finished");
    report
}

/// SchedulerLoop は実行中のループのハンドル
/// - `shutdown_tx` を drop してもループは止まる
pub struct SchedulerLoop {
    shutdown_tx: watch::Sender<bool>,
    join: JoinHandle<()>,
}

impl SchedulerLoop {
    /// `interval` ごとにティックを開始（最初のティックはすぐ走る）
    pub fn spawn(machine: Arc<TaskRefreshMachine>, clock: Arc<dyn Clock>, interval: Duration) -> Self {
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);

        let join = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            tracing::info!(interval_secs = interval.as_secs_f64(), "scheduler started");

            loop {
                if *shutdown_rx.borrow() {
                    break;
                }
                tokio::select! {
                    changed = shutdown_rx.changed() => {
                        if changed.is_err() {
                            break;
                        }
                    }
                    _ = ticker.tick() => {
                        let report = run_tick(&machine, clock.now()).await;
                        if report.refreshed > 0 || report.failed > 0 || report.unreadable > 0 {
                            tracing::info!(
                                refreshed = report.refreshed,
                                unreadable = report.unreadable,
                                failed = report.failed,
                                "tick"
                            );
                        }
                    }
                }
            }

            tracing::info!("scheduler stopped");
        });

        Self { shutdown_tx, join }
    }

    pub fn request_shutdown(&self) {
        // ループが既に終わっていれば送信は失敗する
        let _ = self.shutdown_tx.send(true);
    }

    /// 現在のティックの後で止め、ループの終了を待つ
    pub async fn shutdown_and_join(self) {
        self.request_shutdown();
        let _ = self.join.await;
    }
}
