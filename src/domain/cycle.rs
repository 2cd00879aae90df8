use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Identifies a settlement cycle by the UTC date of its Monday start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CycleId(NaiveDate);

impl CycleId {
    pub fn start_date(&self) -> NaiveDate {
        self.0
    }
}

impl std::fmt::Display for CycleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%d"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CycleStatus {
    Open,
    CutoffPassed,
    Closed,
}

/// A Monday-to-Sunday UTC settlement week.
///
/// `ends_at` is exclusive (the following Monday 00:00), so membership is the
/// half-open interval `[starts_at, ends_at)`. The cutoff falls on the Monday
/// after the week ends, at 15:00 UTC. Cycles are pure values computed from an
/// instant, never stored or mutated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentCycle {
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub cutoff_at: DateTime<Utc>,
}

impl PaymentCycle {
    /// Returns the cycle whose window contains `instant`.
    pub fn containing(instant: DateTime<Utc>) -> Self {
        let date = instant.date_naive();
        let monday = date - Duration::days(date.weekday().num_days_from_monday() as i64);
        Self::starting(monday)
    }

    /// Builds the cycle starting on the given Monday.
    pub fn starting(monday: NaiveDate) -> Self {
        let starts_at = Utc.from_utc_datetime(&monday.and_time(NaiveTime::MIN));
        let ends_at = starts_at + Duration::days(7);
        let cutoff_at = ends_at + Duration::hours(15);
        Self {
            starts_at,
            ends_at,
            cutoff_at,
        }
    }

    /// Reconstructs a cycle from its identifier.
    pub fn for_id(id: &CycleId) -> Self {
        Self::starting(id.start_date())
    }

    pub fn id(&self) -> CycleId {
        CycleId(self.starts_at.date_naive())
    }

    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.starts_at <= instant && instant < self.ends_at
    }

    pub fn is_cutoff_passed(&self, now: DateTime<Utc>) -> bool {
        now >= self.cutoff_at
    }

    /// Derived lifecycle state. A cycle counts as closed once the following
    /// cycle's cutoff has also passed, i.e. its retry window is over.
    pub fn status(&self, now: DateTime<Utc>) -> CycleStatus {
        if now < self.cutoff_at {
            CycleStatus::Open
        } else if now < self.cutoff_at + Duration::days(7) {
            CycleStatus::CutoffPassed
        } else {
            CycleStatus::Closed
        }
    }
}
