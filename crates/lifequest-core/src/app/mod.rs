//! App - アプリケーション層
//!
//! このモジュールは、ports を組み合わせてアプリケーションロジックを実装します。
//!
//! # 主要コンポーネント
//! - **AppBuilder**: アプリケーションの構築とワイヤリング
//! - **TaskRefreshMachine**: タスクの状態遷移（完了・刷新・手動指定）
//! - **SchedulerLoop**: 定期的な刷新チェック
//! - **DocumentLocks**: ドキュメント単位の排他
//! - **TaskCounts**: 状態の集計

pub mod builder;
pub mod locks;
pub mod refresh;
pub mod scheduler_loop;
pub mod status;

// 主要な型を再エクスポート
pub use self::builder::{App, AppBuilder, BuildError};
pub use self::locks::DocumentLocks;
pub use self::refresh::{CompletionReport, RefreshOutcome, TaskRefreshMachine};
pub use self::scheduler_loop::{SchedulerLoop, TickReport, run_tick};
pub use self::status::TaskCounts;
