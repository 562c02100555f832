//! Domain - ドメインモデル（ids, time, policy, reward, progression, task）

pub mod completion;
pub mod errors;
pub mod ids;
pub mod policy;
pub mod progression;
pub mod reward;
pub mod state;
pub mod task;
pub mod time;

pub use completion::{CompletionRecord, RewardApplication, RewardEffect};
pub use errors::{ErrorKind, QuestError, QuestResult, Transition};
pub use ids::{ParseIdError, TaskId};
pub use policy::{Interval, IntervalBase, IntervalUnit, RefreshPolicy, Schedule};
pub use progression::{EntityClass, ProgressionEntity};
pub use reward::{RewardRule, RewardTable, RewardTarget, TargetKind};
pub use state::TaskStatus;
pub use task::TaskRecord;
pub use time::{Timestamp, format_timestamp, parse_timestamp};
