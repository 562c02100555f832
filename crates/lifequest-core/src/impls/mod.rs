//! Implementations - ポートの実装
//!
//! # 実装一覧
//! - **InMemoryDocumentStore** / **FsDocumentStore**: DocumentStore
//! - **InMemoryCompletionLog** / **DocumentCompletionLog**: CompletionLog
//! - **NoPrompt** / **FixedPrompt** / **OffsetPrompt**: PromptProvider

pub mod doc_completion_log;
pub mod fs_store;
pub mod inmem_completion_log;
pub mod inmem_store;
pub mod prompt;

pub use self::doc_completion_log::DocumentCompletionLog;
pub use self::fs_store::FsDocumentStore;
pub use self::inmem_completion_log::InMemoryCompletionLog;
pub use self::inmem_store::InMemoryDocumentStore;
pub use self::prompt::{FixedPrompt, NoPrompt, OffsetPrompt};
