//! Pacing and daily quota enforcement.
//!
//! [`QuotaGate`] is a pure state machine over a [`StateRecord`]: callers pass
//! in the current instant and act on the returned [`AdmitDecision`]. It never
//! sleeps or reads the clock itself.

use std::time::Duration;

use chrono::{DateTime, NaiveTime, TimeDelta, TimeZone, Utc};
use chrono_tz::Tz;

use crate::StateRecord;

/// Response status signalling that the daily quota is exhausted.
pub const OVER_QUERY_LIMIT: &str = "OVER_QUERY_LIMIT";

/// Outcome of asking the gate to admit a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdmitDecision {
    /// The request may proceed once the caller has waited `wait`.
    Admitted {
        /// Pacing delay to observe before issuing the request
        wait: Duration,
    },
    /// The daily quota is exhausted.
    Rejected {
        /// Instant at which the quota resets
        reset_at: DateTime<Utc>,
    },
}

/// Enforces a minimum spacing between requests and a daily quota that
/// resets at local midnight in a fixed timezone.
#[derive(Debug, Clone)]
pub struct QuotaGate {
    record: StateRecord,
    min_interval: Duration,
    reset_timezone: Tz,
}

impl QuotaGate {
    /// Creates a gate starting from a loaded record
    pub fn new(
        record: StateRecord,
        min_interval: Duration,
        reset_timezone: Tz,
    ) -> Self {
        Self { record, min_interval, reset_timezone }
    }

    /// The current state
    pub fn record(&self) -> &StateRecord {
        &self.record
    }

    /// Whether the quota is currently marked exhausted
    pub fn is_exceeded(&self) -> bool {
        self.record.quota_exceeded
    }

    /// Decides whether a request issued at `now` may proceed.
    ///
    /// An exhausted quota whose reset instant has passed is cleared first.
    /// On admission `now` becomes the recorded request time; the caller must
    /// wait the returned duration, still holding exclusive access, before
    /// issuing the request.
    pub fn admit(&mut self, now: DateTime<Utc>) -> AdmitDecision {
        if self.record.quota_exceeded {
            match self.record.quota_reset_at {
                Some(reset_at) if now < reset_at => {
                    log::debug!("request rejected, quota resets at {reset_at}");
                    return AdmitDecision::Rejected { reset_at };
                }
                _ => {
                    log::debug!("daily quota reset, admitting requests again");
                    self.record.quota_exceeded = false;
                }
            }
        }

        let wait = self.pacing_wait(now);
        self.record.last_request_time = Some(now);
        log::debug!("request admitted at {now}, pacing for {wait:?}");
        AdmitDecision::Admitted { wait }
    }

    /// Updates quota state from a decoded response status observed at `now`.
    ///
    /// Returns the reset instant when the status reports the quota as
    /// exhausted.
    pub fn observe(
        &mut self,
        status: &str,
        now: DateTime<Utc>,
    ) -> Option<DateTime<Utc>> {
        if status != OVER_QUERY_LIMIT {
            return None;
        }
        let reset_at = next_local_midnight(now, self.reset_timezone);
        self.record.quota_exceeded = true;
        self.record.quota_reset_at = Some(reset_at);
        log::info!("daily quota exhausted, resets at {reset_at}");
        Some(reset_at)
    }

    // Never longer than `min_interval`, even for a last request time in the
    // future (clock rollback or an edited state file).
    fn pacing_wait(&self, now: DateTime<Utc>) -> Duration {
        let Some(last) = self.record.last_request_time else {
            return Duration::ZERO;
        };
        let elapsed = now.signed_duration_since(last);
        if elapsed < TimeDelta::zero() {
            return self.min_interval;
        }
        self.min_interval.saturating_sub(elapsed.to_std().unwrap_or_default())
    }
}

/// Returns the first instant of the calendar day following `now` in `tz`.
///
/// This is a calendar boundary, not `now` plus 24 hours, so days shortened
/// or lengthened by a daylight saving transition are handled.
pub fn next_local_midnight(now: DateTime<Utc>, tz: Tz) -> DateTime<Utc> {
    let Some(next_day) = now.with_timezone(&tz).date_naive().succ_opt() else {
        return now + TimeDelta::days(1);
    };
    let midnight = next_day.and_time(NaiveTime::MIN);
    tz.from_local_datetime(&midnight)
        .earliest()
        .or_else(|| {
            // midnight falls in a DST gap, the day starts when the gap ends
            tz.from_local_datetime(&(midnight - TimeDelta::hours(1)))
                .earliest()
                .map(|before| before + TimeDelta::hours(1))
        })
        .map(|start| start.with_timezone(&Utc))
        .unwrap_or_else(|| now + TimeDelta::days(1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono_tz::America::Los_Angeles;

    const MIN_INTERVAL: Duration = Duration::from_millis(20);

    fn at(rfc3339: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(rfc3339).unwrap().with_timezone(&Utc)
    }

    fn gate(record: StateRecord) -> QuotaGate {
        QuotaGate::new(record, MIN_INTERVAL, Los_Angeles)
    }

    fn ms(n: i64) -> TimeDelta {
        TimeDelta::milliseconds(n)
    }

    #[test]
    fn first_request_is_admitted_immediately() {
        let mut gate = gate(StateRecord::with_credential("k"));
        let now = at("2024-05-01T10:00:00Z");
        assert_eq!(
            gate.admit(now),
            AdmitDecision::Admitted { wait: Duration::ZERO }
        );
        assert_eq!(gate.record().last_request_time, Some(now));
    }

    #[test]
    fn spaced_requests_never_wait() {
        let mut gate = gate(StateRecord::with_credential("k"));
        let start = at("2024-05-01T10:00:00Z");
        for i in 0..10 {
            let now = start + ms(25 * i + i % 3);
            assert_eq!(
                gate.admit(now),
                AdmitDecision::Admitted { wait: Duration::ZERO }
            );
        }
    }

    #[test]
    fn close_requests_are_paced() {
        let mut gate = gate(StateRecord::with_credential("k"));
        let first = at("2024-05-01T10:00:00Z");
        gate.admit(first);

        let second = first + ms(5);
        assert_eq!(
            gate.admit(second),
            AdmitDecision::Admitted { wait: Duration::from_millis(15) }
        );
        // the admission time is recorded, not the time after sleeping
        assert_eq!(gate.record().last_request_time, Some(second));

        let third = second + ms(16);
        assert_eq!(
            gate.admit(third),
            AdmitDecision::Admitted { wait: Duration::from_millis(4) }
        );
        assert_eq!(gate.record().last_request_time, Some(third));
    }

    #[test]
    fn burst_releases_stay_min_interval_apart() {
        // callers queue on the lock, so each reads the clock only after the
        // previous one has slept and released
        let mut gate = gate(StateRecord::with_credential("k"));
        let mut now = at("2024-05-01T10:00:00Z");
        let mut previous_release: Option<DateTime<Utc>> = None;
        for step in [0, 1, 3, 0, 7] {
            now += ms(step);
            let AdmitDecision::Admitted { wait } = gate.admit(now) else {
                panic!("quota is clear");
            };
            let release = now + TimeDelta::from_std(wait).unwrap();
            if let Some(previous) = previous_release {
                assert!(release - previous >= ms(20));
            }
            previous_release = Some(release);
            now = release;
        }
    }

    #[test]
    fn future_last_request_time_waits_at_most_min_interval() {
        let now = at("2024-05-01T10:00:00Z");
        for ahead in [ms(7), TimeDelta::days(400)] {
            let mut gate = gate(StateRecord {
                last_request_time: Some(now + ahead),
                ..StateRecord::with_credential("k")
            });
            assert_eq!(
                gate.admit(now),
                AdmitDecision::Admitted { wait: MIN_INTERVAL }
            );
            assert_eq!(gate.record().last_request_time, Some(now));
        }
    }

    #[test]
    fn exhausted_quota_rejects_until_reset() {
        let mut gate = gate(StateRecord::with_credential("k"));
        let seen = at("2024-05-01T18:30:00Z");
        let reset_at = at("2024-05-02T07:00:00Z");
        assert_eq!(gate.observe(OVER_QUERY_LIMIT, seen), Some(reset_at));
        assert!(gate.is_exceeded());
        assert_eq!(gate.record().quota_reset_at, Some(reset_at));

        for now in [seen, seen + TimeDelta::hours(5), reset_at - ms(1)] {
            assert_eq!(gate.admit(now), AdmitDecision::Rejected { reset_at });
        }
        assert!(gate.is_exceeded());

        assert_eq!(
            gate.admit(reset_at),
            AdmitDecision::Admitted { wait: Duration::ZERO }
        );
        assert!(!gate.is_exceeded());
    }

    #[test]
    fn rejection_leaves_last_request_time_alone() {
        let last = at("2024-05-01T18:00:00Z");
        let mut gate = gate(StateRecord {
            last_request_time: Some(last),
            quota_exceeded: true,
            quota_reset_at: Some(at("2024-05-02T07:00:00Z")),
            ..StateRecord::with_credential("k")
        });
        gate.admit(at("2024-05-01T19:00:00Z"));
        assert_eq!(gate.record().last_request_time, Some(last));
    }

    #[test]
    fn exceeded_without_reset_instant_clears() {
        let mut gate = gate(StateRecord {
            quota_exceeded: true,
            ..StateRecord::with_credential("k")
        });
        assert!(matches!(
            gate.admit(at("2024-05-01T10:00:00Z")),
            AdmitDecision::Admitted { .. }
        ));
        assert!(!gate.is_exceeded());
    }

    #[test]
    fn other_statuses_do_not_touch_quota() {
        let mut gate = gate(StateRecord::with_credential("k"));
        for status in ["OK", "ZERO_RESULTS", "REQUEST_DENIED", "over_query_limit"]
        {
            assert_eq!(gate.observe(status, at("2024-05-01T10:00:00Z")), None);
        }
        assert!(!gate.is_exceeded());
        assert_eq!(gate.record().quota_reset_at, None);
    }

    #[test]
    fn reset_around_local_midnight() {
        // 23:59:59 PST on Jan 14
        assert_eq!(
            next_local_midnight(at("2024-01-15T07:59:59Z"), Los_Angeles),
            at("2024-01-15T08:00:00Z")
        );
        // exactly midnight belongs to the new day
        assert_eq!(
            next_local_midnight(at("2024-01-15T08:00:00Z"), Los_Angeles),
            at("2024-01-16T08:00:00Z")
        );
        assert_eq!(
            next_local_midnight(at("2024-01-15T08:00:01Z"), Los_Angeles),
            at("2024-01-16T08:00:00Z")
        );
    }

    #[test]
    fn reset_is_calendar_based_not_rolling() {
        // 00:00:01 PDT, the next reset is almost a full day away
        let seen = at("2024-07-04T07:00:01Z");
        assert_eq!(
            next_local_midnight(seen, Los_Angeles),
            at("2024-07-05T07:00:00Z")
        );
        // 23:00 PDT, an hour away rather than 24
        let seen = at("2024-07-05T06:00:00Z");
        assert_eq!(
            next_local_midnight(seen, Los_Angeles),
            at("2024-07-05T07:00:00Z")
        );
    }

    #[test]
    fn reset_across_daylight_saving_transitions() {
        // spring forward: Mar 10 2024 is 23 hours long
        assert_eq!(
            next_local_midnight(at("2024-03-10T19:00:00Z"), Los_Angeles),
            at("2024-03-11T07:00:00Z")
        );
        // the evening before the transition still resets at PST midnight
        assert_eq!(
            next_local_midnight(at("2024-03-10T07:59:00Z"), Los_Angeles),
            at("2024-03-10T08:00:00Z")
        );
        // fall back: Nov 3 2024 is 25 hours long
        assert_eq!(
            next_local_midnight(at("2024-11-03T20:00:00Z"), Los_Angeles),
            at("2024-11-04T08:00:00Z")
        );
        assert_eq!(
            next_local_midnight(at("2024-11-03T06:59:59Z"), Los_Angeles),
            at("2024-11-03T07:00:00Z")
        );
    }

    #[test]
    fn reset_in_a_zone_whose_midnight_is_skipped() {
        // Santiago moved clocks from 00:00 to 01:00 on 2023-09-03
        let tz: Tz = "America/Santiago".parse().unwrap();
        assert_eq!(
            next_local_midnight(at("2023-09-02T20:00:00Z"), tz),
            at("2023-09-03T04:00:00Z")
        );
    }
}
