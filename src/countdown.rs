use std::fmt;

use anyhow::{anyhow, Result};
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;

/// Time left until the event, split the way the page shows it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Remaining {
    pub days: i64,
    pub hours: i64,
    pub minutes: i64,
    pub seconds: i64,
}

impl Remaining {
    pub fn is_over(&self) -> bool {
        *self == Self::default()
    }
}

impl fmt::Display for Remaining {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:02}d {:02}h {:02}m {:02}s",
            self.days, self.hours, self.minutes, self.seconds
        )
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Countdown {
    target: DateTime<Utc>,
}

impl Countdown {
    /// Resolves a local wall-clock start in `zone`. Ambiguous times take
    /// the earlier instant; times skipped by a DST jump are rejected.
    pub fn new(starts_at: NaiveDateTime, zone: Tz) -> Result<Self> {
        let local = zone
            .from_local_datetime(&starts_at)
            .earliest()
            .ok_or_else(|| anyhow!("{starts_at} does not exist in {zone}"))?;
        Ok(Self {
            target: local.with_timezone(&Utc),
        })
    }

    pub fn target(&self) -> DateTime<Utc> {
        self.target
    }

    pub fn remaining(&self, now: DateTime<Utc>) -> Remaining {
        let left = self.target.signed_duration_since(now);
        if left.num_milliseconds() < 0 {
            return Remaining::default();
        }
        let total = left.num_seconds();
        Remaining {
            days: total / 86_400,
            hours: (total % 86_400) / 3_600,
            minutes: (total % 3_600) / 60,
            seconds: total % 60,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn event() -> Countdown {
        let starts = NaiveDate::from_ymd_opt(2026, 2, 14)
            .unwrap()
            .and_hms_opt(15, 0, 0)
            .unwrap();
        Countdown::new(starts, chrono_tz::Africa::Johannesburg).unwrap()
    }

    #[test]
    fn target_is_converted_to_utc() {
        assert_eq!(event().target(), Utc.with_ymd_and_hms(2026, 2, 14, 13, 0, 0).unwrap());
    }

    #[test]
    fn splits_into_units() {
        let now = Utc.with_ymd_and_hms(2026, 2, 12, 11, 58, 30).unwrap();
        let left = event().remaining(now);
        assert_eq!(
            left,
            Remaining {
                days: 2,
                hours: 1,
                minutes: 1,
                seconds: 30
            }
        );
        assert_eq!(left.to_string(), "02d 01h 01m 30s");
    }

    #[test]
    fn past_event_is_all_zero() {
        let now = Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).unwrap();
        let left = event().remaining(now);
        assert!(left.is_over());
        assert_eq!(left.to_string(), "00d 00h 00m 00s");
    }
}
