//! Rewards - 報酬の適用（経験値は Ledger へ、属性・資源は単純加算）

pub mod dispatcher;

pub use self::dispatcher::{DispatchReport, RewardDispatcher, RewardIssue};
