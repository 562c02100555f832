//! Calendar - 壁時計時刻の暦計算
//!
//! 月の加算は対象月の末日に丸めます（1/31 + 1 月 = 2/28 または 2/29）。

use chrono::{Days, Months, NaiveDate, NaiveTime, TimeDelta};

use crate::domain::{Interval, IntervalUnit, Timestamp};

pub fn is_leap_year(year: i32) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

pub fn last_day_of_month(year: i32, month: u32) -> u32 {
    match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        4 | 6 | 9 | 11 => 30,
        2 if is_leap_year(year) => 29,
        _ => 28,
    }
}

/// 指定月の `day` 日（月の日数で丸める）
pub fn clamped_date(year: i32, month: u32, day: u32) -> Option<NaiveDate> {
    let day = day.clamp(1, last_day_of_month(year, month));
    NaiveDate::from_ymd_opt(year, month, day)
}

pub fn following_month(year: i32, month: u32) -> (i32, u32) {
    if month == 12 { (year + 1, 1) } else { (year, month + 1) }
}

pub fn at_hour(date: NaiveDate, hour: u32) -> Option<Timestamp> {
    NaiveTime::from_hms_opt(hour, 0, 0).map(|t| date.and_time(t))
}

/// 暦単位での `base + interval`。桁あふれは None
pub fn add_interval(base: Timestamp, interval: &Interval) -> Option<Timestamp> {
    let amount = interval.amount();
    match interval.unit() {
        IntervalUnit::Hours => base.checked_add_signed(TimeDelta::try_hours(i64::from(amount))?),
        IntervalUnit::Days => base.checked_add_days(Days::new(u64::from(amount))),
        IntervalUnit::Weeks => base.checked_add_days(Days::new(u64::from(amount) * 7)),
        IntervalUnit::Months => base.checked_add_months(Months::new(amount)),
    }
}
