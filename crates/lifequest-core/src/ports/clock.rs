//! Clock port - 時刻の抽象化
//!
//! - SystemClock: ローカル壁時計（本番用）
//! - FixedClock: 固定時刻（テスト用）
//! - ManualClock: テストから進められる時計（スケジューラのテスト用）

use std::sync::Mutex;

use chrono::{Duration, Local};

use crate::domain::Timestamp;

/// Clock は現在時刻を提供
///
/// # テスト容易性
/// - trait により時刻を差し替え可能
/// - テストでは FixedClock / ManualClock を使用
pub trait Clock: Send + Sync {
    fn now(&self) -> Timestamp;
}

/// ローカルタイムゾーンの壁時計
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Local::now().naive_local()
    }
}

/// 常に同じ時刻を返す
#[derive(Debug, Clone, Copy)]
pub struct FixedClock {
    at: Timestamp,
}

impl FixedClock {
    pub fn new(at: Timestamp) -> Self {
        Self { at }
    }
}

impl Clock for FixedClock {
    fn now(&self) -> Timestamp {
        self.at
    }
}

/// 手動で進める時計
#[derive(Debug)]
pub struct ManualClock {
    at: Mutex<Timestamp>,
}

impl ManualClock {
    pub fn new(at: Timestamp) -> Self {
        Self { at: Mutex::new(at) }
    }

    pub fn set(&self, at: Timestamp) {
        *self.at.lock().unwrap_or_else(|e| e.into_inner()) = at;
    }

    pub fn advance(&self, by: Duration) {
        let mut guard = self.at.lock().unwrap_or_else(|e| e.into_inner());
        *guard += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        *self.at.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl<C: Clock + ?Sized> Clock for std::sync::Arc<C> {
    fn now(&self) -> Timestamp {
        (**self).now()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::parse_timestamp;

    #[test]
    fn fixed_clock_never_moves() {
        let at = parse_timestamp("2024-01-01 10:00:00").unwrap();
        let clock = FixedClock::new(at);
        assert_eq!(clock.now(), at);
        assert_eq!(clock.now(), at);
    }

    #[test]
    fn manual_clock_advances() {
        let clock = ManualClock::new(parse_timestamp("2024-01-01 10:00:00").unwrap());
        clock.advance(Duration::hours(2));
        assert_eq!(clock.now(), parse_timestamp("2024-01-01 12:00:00").unwrap());

        clock.set(parse_timestamp("2025-01-01 00:00:00").unwrap());
        assert_eq!(clock.now(), parse_timestamp("2025-01-01 00:00:00").unwrap());
    }
}
