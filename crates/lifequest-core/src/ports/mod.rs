//! Ports - 抽象化レイヤー
//!
//! Hexagonal Architecture の「ポート」を定義します。
//! 周辺アプリケーション（ドキュメントストア、入力プロンプト、時計）への
//! インターフェースを提供し、実装の詳細を隠蔽します。
//!
//! # 設計原則
//! - ドキュメントストアが source of truth（正本）
//! - 完了記録は注入されたリポジトリに保存（グローバル状態を持たない）
//! - 時刻は Clock 経由でのみ取得（テストで決定的にするため）

pub mod clock;
pub mod completion_log;
pub mod document_store;
pub mod id_generator;
pub mod prompt;

// 主要な trait を再エクスポート
pub use self::clock::{Clock, FixedClock, ManualClock, SystemClock};
pub use self::completion_log::CompletionLog;
pub use self::document_store::{Document, DocumentId, DocumentStore, Metadata, StoreError};
pub use self::id_generator::{IdGenerator, UlidGenerator};
pub use self::prompt::{PromptProvider, TaskPrompt};
