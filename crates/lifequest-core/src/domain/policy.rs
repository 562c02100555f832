//! Policy - 刷新ポリシーと frontmatter の書式
//!
//! | field | values |
//! |---|---|
//! | `刷新方式` | `定时` / `固定间隔` / `每次指定时间` |
//! | `刷新时间` | `每天8时` / `每周一` / `每月1日` |
//! | `刷新间隔` | `2小时` / `3天` / `1周` / `1月` |
//! | `刷新间隔起算时间` | `上一次完成时间` / `上一次刷新时间` |

use chrono::Weekday;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::errors::{QuestError, QuestResult};

pub const FIELD_POLICY: &str = "刷新方式";
pub const FIELD_SCHEDULE: &str = "刷新时间";
pub const FIELD_INTERVAL: &str = "刷新间隔";
pub const FIELD_INTERVAL_BASE: &str = "刷新间隔起算时间";

/// 每周・每月ルールの刷新時刻（時）
pub const SCHEDULED_SLOT_HOUR: u32 = 5;

/// Schedule は繰り返し訪れる壁時計の時点
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Schedule {
    /// 毎日 `hour:00:00`
    Daily { hour: u32 },
    /// 指定曜日の `05:00:00`
    Weekly { weekday: Weekday },
    /// 指定日の `05:00:00`（月末を超える日は末日に丸める）
    Monthly { day: u32 },
}

impl Schedule {
    pub fn parse(raw: &str) -> QuestResult<Self> {
        let raw = raw.trim();
        let bad = || QuestError::parse(FIELD_SCHEDULE, format!("unrecognized schedule {raw:?}"));

        if let Some(rest) = raw.strip_prefix("每天") {
            if rest.is_empty() {
                return Ok(Schedule::Daily { hour: SCHEDULED_SLOT_HOUR });
            }
            let digits = rest.strip_suffix('时').ok_or_else(bad)?;
            let hour: u32 = digits.trim().parse().map_err(|_| bad())?;
            if hour > 23 {
                return Err(QuestError::parse(
                    FIELD_SCHEDULE,
                    format!("hour out of range: {hour}"),
                ));
            }
            return Ok(Schedule::Daily { hour });
        }

        if let Some(rest) = raw.strip_prefix("每周") {
            let weekday = match rest.trim() {
                "一" => Weekday::Mon,
                "二" => Weekday::Tue,
                "三" => Weekday::Wed,
                "四" => Weekday::Thu,
                "五" => Weekday::Fri,
                "六" => Weekday::Sat,
                "日" | "天" => Weekday::Sun,
                _ => return Err(bad()),
            };
            return Ok(Schedule::Weekly { weekday });
        }

        if let Some(rest) = raw.strip_prefix("每月") {
            if rest.is_empty() {
                return Ok(Schedule::Monthly { day: 1 });
            }
            let digits = rest.strip_suffix('日').ok_or_else(bad)?;
            let day: u32 = digits.trim().parse().map_err(|_| bad())?;
            if !(1..=31).contains(&day) {
                return Err(QuestError::parse(
                    FIELD_SCHEDULE,
                    format!("day of month out of range: {day}"),
                ));
            }
            return Ok(Schedule::Monthly { day });
        }

        Err(bad())
    }
}

impl fmt::Display for Schedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Schedule::Daily { hour } => write!(f, "每天{hour}时"),
            Schedule::Weekly { weekday } => {
                let label = match weekday {
                    Weekday::Mon => "一",
                    Weekday::Tue => "二",
                    Weekday::Wed => "三",
                    Weekday::Thu => "四",
                    Weekday::Fri => "五",
                    Weekday::Sat => "六",
                    Weekday::Sun => "日",
                };
                write!(f, "每周{label}")
            }
            Schedule::Monthly { day } => write!(f, "每月{day}日"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IntervalUnit {
    Hours,
    Days,
    Weeks,
    Months,
}

impl IntervalUnit {
    const ALL: [IntervalUnit; 4] = [
        IntervalUnit::Hours,
        IntervalUnit::Days,
        IntervalUnit::Weeks,
        IntervalUnit::Months,
    ];

    /// `text` の先頭にある単位
    fn leading(text: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|unit| text.starts_with(unit.label()))
    }

    fn label(self) -> &'static str {
        match self {
            IntervalUnit::Hours => "小时",
            IntervalUnit::Days => "天",
            IntervalUnit::Weeks => "周",
            IntervalUnit::Months => "月",
        }
    }
}

/// Interval は `amount` 個の暦単位（`amount >= 1`）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interval {
    amount: u32,
    unit: IntervalUnit,
}

impl Interval {
    pub fn new(amount: u32, unit: IntervalUnit) -> QuestResult<Self> {
        if amount == 0 {
            return Err(QuestError::parse(FIELD_INTERVAL, "interval must be >= 1"));
        }
        Ok(Self { amount, unit })
    }

    pub fn amount(&self) -> u32 {
        self.amount
    }

    pub fn unit(&self) -> IntervalUnit {
        self.unit
    }

    /// 最初に現れる `<数字><単位>` を読む（`2小时`、`每2小时`、`间隔 3 天`）
    pub fn parse(raw: &str) -> QuestResult<Self> {
        let raw = raw.trim();
        let mut rest = raw;
        while let Some(start) = rest.find(|c: char| c.is_ascii_digit()) {
            let tail = &rest[start..];
            let end = tail.find(|c: char| !c.is_ascii_digit()).unwrap_or(tail.len());
            let (digits, after) = tail.split_at(end);
            if let Some(unit) = IntervalUnit::leading(after.trim_start()) {
                let amount: u32 = digits.parse().map_err(|_| {
                    QuestError::parse(FIELD_INTERVAL, format!("amount out of range in {raw:?}"))
                })?;
                return Self::new(amount, unit);
            }
            rest = after;
        }
        Err(QuestError::parse(
            FIELD_INTERVAL,
            format!("no <n><小时|天|周|月> in {raw:?}"),
        ))
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.amount, self.unit.label())
    }
}

/// IntervalBase は間隔の起算点
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum IntervalBase {
    /// 今回の完了時刻
    #[default]
    LastCompletion,
    /// タスクの `current_cycle_start`
    LastRefresh,
}

impl IntervalBase {
    pub fn from_label(label: &str) -> QuestResult<Self> {
        match label.trim() {
            "上一次完成时间" => Ok(IntervalBase::LastCompletion),
            "上一次刷新时间" => Ok(IntervalBase::LastRefresh),
            other => Err(QuestError::parse(
                FIELD_INTERVAL_BASE,
                format!("unknown interval base {other:?}"),
            )),
        }
    }

    pub fn as_label(self) -> &'static str {
        match self {
            IntervalBase::LastCompletion => "上一次完成时间",
            IntervalBase::LastRefresh => "上一次刷新时间",
        }
    }
}

/// RefreshPolicy は完了したタスクがいつ再び有効になるか
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RefreshPolicy {
    Scheduled(Schedule),
    Interval { interval: Interval, base: IntervalBase },
    /// 完了のたびに次回刷新時刻を外部から受け取る
    Manual,
}

impl RefreshPolicy {
    /// frontmatter の 4 フィールドからデコード
    pub fn from_fields(
        kind: Option<&str>,
        schedule: Option<&str>,
        interval: Option<&str>,
        base: Option<&str>,
    ) -> QuestResult<Self> {
        let kind = kind.ok_or_else(|| QuestError::parse(FIELD_POLICY, "missing"))?;
        match kind.trim() {
            "定时" => {
                let raw = schedule.ok_or_else(|| QuestError::parse(FIELD_SCHEDULE, "missing"))?;
                Ok(RefreshPolicy::Scheduled(Schedule::parse(raw)?))
            }
            "固定间隔" => {
                let raw = interval.ok_or_else(|| QuestError::parse(FIELD_INTERVAL, "missing"))?;
                let base = match base {
                    Some(label) if !label.trim().is_empty() => IntervalBase::from_label(label)?,
                    _ => IntervalBase::default(),
                };
                Ok(RefreshPolicy::Interval {
                    interval: Interval::parse(raw)?,
                    base,
                })
            }
            "每次指定时间" => Ok(RefreshPolicy::Manual),
            other => Err(QuestError::parse(
                FIELD_POLICY,
                format!("unknown refresh policy {other:?}"),
            )),
        }
    }

    pub fn is_manual(&self) -> bool {
        matches!(self, RefreshPolicy::Manual)
    }
}

impl fmt::Display for RefreshPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RefreshPolicy::Scheduled(schedule) => write!(f, "定时 {schedule}"),
            RefreshPolicy::Interval { interval, base } => {
                write!(f, "固定间隔 {interval} ({})", base.as_label())
            }
            RefreshPolicy::Manual => f.write_str("每次指定时间"),
        }
    }
}
