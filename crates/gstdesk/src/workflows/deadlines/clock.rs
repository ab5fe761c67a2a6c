use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveTime, Offset, TimeZone, Utc};

/// Source of "now" at the service boundary.
///
/// The engine itself never reads the system time; handlers and the CLI ask a
/// `Clock` once per request and pass the instant down explicitly.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Calendar arithmetic in the single timezone the engine runs in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayBoundary {
    offset: FixedOffset,
}

const SECONDS_PER_DAY: i64 = 86_400;

impl DayBoundary {
    pub fn new(offset: FixedOffset) -> Self {
        Self { offset }
    }

    pub fn utc() -> Self {
        Self::new(Utc.fix())
    }

    pub fn offset(&self) -> FixedOffset {
        self.offset
    }

    /// Calendar date of `now` in the engine timezone.
    pub fn today(&self, now: DateTime<Utc>) -> NaiveDate {
        now.with_timezone(&self.offset).date_naive()
    }

    /// 00:00 of `date` in the engine timezone, expressed in UTC.
    ///
    /// `None` when the shift to UTC leaves chrono's representable range.
    pub fn start_of(&self, date: NaiveDate) -> Option<DateTime<Utc>> {
        let local = date.and_time(NaiveTime::MIN);
        let offset_seconds = i64::from(self.offset.local_minus_utc());
        Utc.from_utc_datetime(&local).checked_sub_signed(Duration::seconds(offset_seconds))
    }

    /// Start of the current calendar day; the dedup window opens here.
    pub fn local_midnight(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        self.start_of(self.today(now)).unwrap_or(DateTime::<Utc>::MIN_UTC)
    }

    /// `ceil((due - now) / 1 day)`, with `due` taken as midnight of the due date.
    pub fn days_until(&self, due: NaiveDate, now: DateTime<Utc>) -> Option<i64> {
        let seconds = (self.start_of(due)? - now).num_seconds();
        let whole = seconds.div_euclid(SECONDS_PER_DAY);
        if seconds.rem_euclid(SECONDS_PER_DAY) > 0 {
            Some(whole + 1)
        } else {
            Some(whole)
        }
    }
}

impl Default for DayBoundary {
    fn default() -> Self {
        Self::utc()
    }
}
