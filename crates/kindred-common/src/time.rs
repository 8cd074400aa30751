//! Calendar windows and subscription periods
//!
//! Usage days are UTC calendar days: the daily quota resets at 00:00:00 UTC
//! regardless of where the actor lives.
//!
//! Subscription periods add whole calendar months. When the start day does not
//! exist in the target month the result is clamped to that month's last day,
//! keeping the time of day: 2024-01-31 + 3 months = 2024-04-30.

use chrono::{DateTime, Duration, Months, NaiveDate, NaiveTime, TimeZone, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::error::{KindredError, KindredResult};

/// `at` truncated to midnight UTC
pub fn start_of_day(at: DateTime<Utc>) -> DateTime<Utc> {
    Utc.from_utc_datetime(&at.date_naive().and_time(NaiveTime::default()))
}

/// Key of the usage day `at` counts toward
pub fn usage_day(at: DateTime<Utc>) -> NaiveDate {
    at.date_naive()
}

/// Purchasable subscription length
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SubscriptionPeriod {
    /// 1 calendar month
    #[serde(rename = "1_month")]
    OneMonth,
    /// 3 calendar months
    #[serde(rename = "3_months")]
    ThreeMonths,
    /// 6 calendar months
    #[serde(rename = "6_months")]
    SixMonths,
    /// 12 calendar months
    #[serde(rename = "12_months")]
    TwelveMonths,
}

impl SubscriptionPeriod {
    /// Every purchasable period
    pub const ALL: [SubscriptionPeriod; 4] = [
        Self::OneMonth,
        Self::ThreeMonths,
        Self::SixMonths,
        Self::TwelveMonths,
    ];

    /// Length in calendar months
    pub fn months(&self) -> u32 {
        match self {
            Self::OneMonth => 1,
            Self::ThreeMonths => 3,
            Self::SixMonths => 6,
            Self::TwelveMonths => 12,
        }
    }

    /// Wire name
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OneMonth => "1_month",
            Self::ThreeMonths => "3_months",
            Self::SixMonths => "6_months",
            Self::TwelveMonths => "12_months",
        }
    }

    /// Expiry of a grant starting at `start`, clamped to month end
    pub fn ends_at(&self, start: DateTime<Utc>) -> KindredResult<DateTime<Utc>> {
        start
            .checked_add_months(Months::new(self.months()))
            .ok_or_else(|| {
                KindredError::InvalidInput(format!("{} from {start} is out of range", self.as_str()))
            })
    }
}

impl fmt::Display for SubscriptionPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SubscriptionPeriod {
    type Err = KindredError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| KindredError::InvalidInput(format!("unknown subscription period: {s}")))
    }
}

/// Source of "now"
pub trait Clock: Send + Sync + 'static {
    /// Current instant
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Settable clock for day-rollover and expiry scenarios
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<RwLock<DateTime<Utc>>>,
}

impl ManualClock {
    /// Clock frozen at `at`
    pub fn new(at: DateTime<Utc>) -> Self {
        Self {
            now: Arc::new(RwLock::new(at)),
        }
    }

    /// Jump to `at`
    pub fn set(&self, at: DateTime<Utc>) {
        *self.now.write() = at;
    }

    /// Move forward by `by`
    pub fn advance(&self, by: Duration) {
        let mut now = self.now.write();
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.read()
    }
}
