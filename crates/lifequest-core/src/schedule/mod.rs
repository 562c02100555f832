//! Schedule - 刷新ポリシーの評価
//!
//! # 学習ポイント
//! - 純粋関数: `(policy, 基準時刻) -> 次回刷新時刻 | 入力待ち`
//! - 壁時計は読まない。「今」も入力の一部として受け取る

pub mod calendar;

use chrono::{Datelike, Days};
use serde::{Deserialize, Serialize};

use crate::domain::policy::{FIELD_INTERVAL, FIELD_SCHEDULE, SCHEDULED_SLOT_HOUR};
use crate::domain::{IntervalBase, QuestError, QuestResult, RefreshPolicy, Schedule, Timestamp};

use self::calendar::{add_interval, at_hour, clamped_date, following_month};

/// ReferenceTimes はポリシーが基準にできる時刻
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReferenceTimes {
    /// 評価時刻（定时のみ使う）
    pub now: Timestamp,
    /// 今回の完了時刻（固定间隔 / 上一次完成时间）
    pub last_completion: Option<Timestamp>,
    /// 現在のサイクルの開始時刻（固定间隔 / 上一次刷新时间）
    pub cycle_start: Timestamp,
}

/// NextDue は評価結果
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "at", rename_all = "snake_case")]
pub enum NextDue {
    At(Timestamp),
    /// 手動指定: 次回刷新時刻は外部から与えられる
    NeedsInput,
}

impl NextDue {
    pub fn timestamp(&self) -> Option<Timestamp> {
        match self {
            NextDue::At(ts) => Some(*ts),
            NextDue::NeedsInput => None,
        }
    }
}

/// タスクが次に刷新される時刻を計算
///
/// 結果は常に計算の基準（定时なら `now`、固定间隔なら起算時刻）より後。
/// 進まない結果（桁あふれなど）は ParseError。
pub fn compute_next_due(policy: &RefreshPolicy, refs: &ReferenceTimes) -> QuestResult<NextDue> {
    match policy {
        RefreshPolicy::Scheduled(schedule) => next_scheduled(schedule, refs.now).map(NextDue::At),
        RefreshPolicy::Interval { interval, base } => {
            let anchor = match base {
                IntervalBase::LastCompletion => refs.last_completion.ok_or_else(|| {
                    QuestError::parse("完成时间", "interval anchored on a completion that never happened")
                })?,
                IntervalBase::LastRefresh => refs.cycle_start,
            };
            let due = add_interval(anchor, interval)
                .ok_or_else(|| QuestError::parse(FIELD_INTERVAL, "due time out of range"))?;
            ensure_advances(due, anchor, FIELD_INTERVAL)?;
            Ok(NextDue::At(due))
        }
        RefreshPolicy::Manual => Ok(NextDue::NeedsInput),
    }
}

/// `now` より厳密に後の、`schedule` の次の時刻
pub fn next_scheduled(schedule: &Schedule, now: Timestamp) -> QuestResult<Timestamp> {
    let out_of_range = || QuestError::parse(FIELD_SCHEDULE, "due time out of range");
    let today = now.date();

    let due = match *schedule {
        Schedule::Daily { hour } => {
            let candidate = at_hour(today, hour).ok_or_else(out_of_range)?;
            if candidate <= now {
                candidate
                    .checked_add_days(Days::new(1))
                    .ok_or_else(out_of_range)?
            } else {
                candidate
            }
        }
        Schedule::Weekly { weekday } => {
            let ahead = (7 + weekday.num_days_from_monday() - today.weekday().num_days_from_monday()) % 7;
            let date = today
                .checked_add_days(Days::new(u64::from(ahead)))
                .ok_or_else(out_of_range)?;
            let candidate = at_hour(date, SCHEDULED_SLOT_HOUR).ok_or_else(out_of_range)?;
            if candidate <= now {
                candidate
                    .checked_add_days(Days::new(7))
                    .ok_or_else(out_of_range)?
            } else {
                candidate
            }
        }
        Schedule::Monthly { day } => {
            let this_month = clamped_date(today.year(), today.month(), day).ok_or_else(out_of_range)?;
            let candidate = at_hour(this_month, SCHEDULED_SLOT_HOUR).ok_or_else(out_of_range)?;
            if candidate <= now {
                let (year, month) = following_month(today.year(), today.month());
                let next_month = clamped_date(year, month, day).ok_or_else(out_of_range)?;
                at_hour(next_month, SCHEDULED_SLOT_HOUR).ok_or_else(out_of_range)?
            } else {
                candidate
            }
        }
    };

    ensure_advances(due, now, FIELD_SCHEDULE)?;
    Ok(due)
}

fn ensure_advances(due: Timestamp, from: Timestamp, field: &str) -> QuestResult<()> {
    if due <= from {
        return Err(QuestError::parse(
            field,
            format!("computed due time {due} does not advance past {from}"),
        ));
    }
    Ok(())
}
