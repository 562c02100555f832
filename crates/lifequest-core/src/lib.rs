//! lifequest-core
//!
//! 繰り返しの「生活タスク」を管理するコア。
//!
//! # モジュール構成
//! - **domain**: ドメインモデル（ids, time, state, policy, task, reward, progression, completion, errors）
//! - **schedule**: 刷新ポリシーの評価（次回刷新時刻の計算）
//! - **ledger**: 経験値の加算とレベルアップ
//! - **codec**: ドキュメントのメタデータ ⇄ 型付きレコード、報酬テーブルの解析
//! - **rewards**: 報酬の適用
//! - **ports**: 抽象化レイヤー（DocumentStore, CompletionLog, PromptProvider, Clock, IdGenerator）
//! - **impls**: ポートの実装（インメモリ、ファイルシステム）
//! - **app**: アプリケーション層（builder, refresh state machine, scheduler loop, locks, status）
//! - **config**: TOML 設定
//! - **observability**: tracing の初期化

pub mod app;
pub mod codec;
pub mod config;
pub mod domain;
pub mod impls;
pub mod ledger;
pub mod observability;
pub mod ports;
pub mod rewards;
pub mod schedule;

pub use app::{App, AppBuilder, BuildError};
pub use config::{Config, ConfigError};
pub use domain::{QuestError, QuestResult};
