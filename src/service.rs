mod calendar;
mod dispatcher;
mod lifecycle;
mod notices;
mod registry;
mod reminders;
mod rentals;

#[cfg(test)]
pub(crate) mod fixtures;

pub use calendar::*;
pub use dispatcher::*;
pub use lifecycle::*;
pub use notices::*;
pub use registry::*;
pub use reminders::*;
pub use rentals::*;

use std::fmt::Debug;

use chrono::{DateTime, NaiveDate, Utc};

/// Source of the current time, injected so date cutoffs are testable
pub trait Clock: Debug + Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock frozen at a single instant
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}
