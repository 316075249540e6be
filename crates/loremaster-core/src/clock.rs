//! Wall-clock abstraction and the in-game calendar.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// Abstraction over system time for deterministic behavior.
pub trait Clock: Send + Sync {
    /// Returns the current time.
    fn now(&self) -> DateTime<Utc>;
}

/// Production clock that delegates to the system clock.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

const MINUTES_PER_DAY: u32 = 24 * 60;

/// In-world time of a session, measured in days and minutes since midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameTime {
    /// Day counter, starting at 1.
    pub day: u32,
    /// Minutes elapsed since midnight of `day`.
    pub minute_of_day: u32,
}

impl Default for GameTime {
    /// Adventures start on the morning of day one.
    fn default() -> Self {
        Self {
            day: 1,
            minute_of_day: 8 * 60,
        }
    }
}

impl GameTime {
    /// Advances the clock, rolling over into following days.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if the day counter would overflow;
    /// the time is left unchanged.
    pub fn advance(&mut self, minutes: u32) -> Result<(), DomainError> {
        let overflow =
            || DomainError::Validation(format!("cannot advance time by {minutes} minutes"));
        let total = u64::from(self.minute_of_day) + u64::from(minutes);
        let per_day = u64::from(MINUTES_PER_DAY);
        let extra_days = u32::try_from(total / per_day).map_err(|_| overflow())?;
        let minute_of_day = u32::try_from(total % per_day).map_err(|_| overflow())?;
        self.day = self.day.checked_add(extra_days).ok_or_else(overflow)?;
        self.minute_of_day = minute_of_day;
        Ok(())
    }

    /// Renders the time as `Day N, HH:MM`.
    #[must_use]
    pub fn label(&self) -> String {
        format!(
            "Day {}, {:02}:{:02}",
            self.day,
            self.minute_of_day / 60,
            self.minute_of_day % 60
        )
    }
}
