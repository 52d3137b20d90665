use chrono::{DateTime, TimeZone, Utc};

/// Represents an entity responsible for providing dates across application. This can allow it to
/// be used for testing
#[cfg_attr(test, mockall::automock)]
pub trait Clock: Sync + Send + 'static {
    fn time(&self) -> DateTime<Utc>;
}

pub struct DefaultClock;

impl Clock for DefaultClock {
    fn time(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock pinned to a single moment. Handy for tests that don't need expectations.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl FixedClock {
    pub fn at<Tz: TimeZone>(moment: DateTime<Tz>) -> Self {
        Self(moment.to_utc())
    }
}

impl Clock for FixedClock {
    fn time(&self) -> DateTime<Utc> {
        self.0
    }
}

impl<C: Clock + ?Sized> Clock for Box<C> {
    fn time(&self) -> DateTime<Utc> {
        (**self).time()
    }
}
