use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime, Utc};

/// Source of "now", injectable so lateness and day-boundary decisions can be
/// tested deterministically.
pub trait Clock: Send + Sync {
    fn now_utc(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_utc(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Resolves instants in the organization's time zone and derives the
/// calendar date used as the attendance key. The zone is a fixed UTC offset
/// taken from configuration, never the server-local zone.
#[derive(Debug, Clone, Copy)]
pub struct TemporalContext {
    zone: FixedOffset,
}

impl TemporalContext {
    pub fn new(zone: FixedOffset) -> Self {
        Self { zone }
    }

    pub fn localize(&self, instant: DateTime<Utc>) -> DateTime<FixedOffset> {
        instant.with_timezone(&self.zone)
    }

    /// Zone-local calendar date, the natural key of an attendance row.
    pub fn date_key(&self, instant: DateTime<Utc>) -> NaiveDate {
        self.localize(instant).date_naive()
    }

    /// True when the zone-local time of day is strictly after the cutoff.
    pub fn is_late(&self, instant: DateTime<Utc>, cutoff_hour: u32, cutoff_minute: u32) -> bool {
        let cutoff = NaiveTime::from_hms_opt(cutoff_hour, cutoff_minute, 0)
            .unwrap_or(NaiveTime::MIN);
        self.localize(instant).time() > cutoff
    }
}

#[cfg(test)]
pub struct FixedClock(pub DateTime<Utc>);

#[cfg(test)]
impl Clock for FixedClock {
    fn now_utc(&self) -> DateTime<Utc> {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn jakarta() -> TemporalContext {
        TemporalContext::new(FixedOffset::east_opt(7 * 3600).unwrap())
    }

    #[test]
    fn date_key_crosses_midnight_in_org_zone() {
        // 17:30 UTC is 00:30 the next day in UTC+7
        let t = Utc.with_ymd_and_hms(2025, 6, 1, 17, 30, 0).unwrap();
        assert_eq!(jakarta().date_key(t), NaiveDate::from_ymd_opt(2025, 6, 2).unwrap());

        // one hour earlier is still the same org-zone day
        let t = Utc.with_ymd_and_hms(2025, 6, 1, 16, 30, 0).unwrap();
        assert_eq!(jakarta().date_key(t), NaiveDate::from_ymd_opt(2025, 6, 1).unwrap());
    }

    #[test]
    fn lateness_is_strictly_after_cutoff() {
        let ctx = jakarta();
        // 08:15:00 local is 01:15 UTC
        let on_the_dot = Utc.with_ymd_and_hms(2025, 6, 2, 1, 15, 0).unwrap();
        assert!(!ctx.is_late(on_the_dot, 8, 15));

        let one_second_past = Utc.with_ymd_and_hms(2025, 6, 2, 1, 15, 1).unwrap();
        assert!(ctx.is_late(one_second_past, 8, 15));

        let early = Utc.with_ymd_and_hms(2025, 6, 2, 1, 10, 0).unwrap();
        assert!(!ctx.is_late(early, 8, 15));
    }
}
