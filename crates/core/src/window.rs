//! Date windows, range presets and grouping keys.

use chrono::{Datelike, Days, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result, ValidationErrorCode};
use crate::limits::MAX_WINDOW_DAYS;

/// Inclusive calendar-day window, `start <= end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "WindowBounds")]
pub struct DateWindow {
    start: NaiveDate,
    end: NaiveDate,
}

#[derive(Deserialize)]
struct WindowBounds {
    start: NaiveDate,
    end: NaiveDate,
}

impl TryFrom<WindowBounds> for DateWindow {
    type Error = Error;

    fn try_from(bounds: WindowBounds) -> Result<Self> {
        Self::new(bounds.start, bounds.end)
    }
}

impl DateWindow {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if start > end {
            return Err(Error::validation_code(
                ValidationErrorCode::InvalidInput,
                format!("window start {} is after end {}", start, end),
            ));
        }
        Ok(Self { start, end })
    }

    /// A window covering a single day.
    pub fn single(day: NaiveDate) -> Self {
        Self { start: day, end: day }
    }

    /// The `days` days ending on `today`, inclusive.
    pub fn last_days(today: NaiveDate, days: i64) -> Result<Self> {
        if days < 1 {
            return Err(Error::validation_code(
                ValidationErrorCode::InvalidInput,
                format!("days must be at least 1, got {}", days),
            ));
        }
        let start = today
            .checked_sub_days(Days::new((days - 1) as u64))
            .ok_or_else(|| Error::validation("window start before the calendar"))?;
        Self::new(start, today)
    }

    /// Resolves a named preset relative to `today`.
    pub fn from_preset(preset: RangePreset, today: NaiveDate) -> Result<Self> {
        let window = match preset {
            RangePreset::Today => Self::single(today),
            RangePreset::Yesterday => Self::single(day_before(today)?),
            RangePreset::Last7Days => Self::last_days(today, 7)?,
            RangePreset::Last30Days => Self::last_days(today, 30)?,
            RangePreset::ThisMonth => Self::new(today.with_day(1).unwrap_or(today), today)?,
            RangePreset::LastMonth => {
                let last_of_prev = day_before(today.with_day(1).unwrap_or(today))?;
                Self::new(last_of_prev.with_day(1).unwrap_or(last_of_prev), last_of_prev)?
            }
            RangePreset::ThisYear => Self::new(today.with_ordinal(1).unwrap_or(today), today)?,
        };
        Ok(window)
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    /// Number of days covered, both ends included.
    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }

    /// Every day in the window in ascending order.
    pub fn iter_days(&self) -> impl Iterator<Item = NaiveDate> {
        let end = self.end;
        self.start.iter_days().take_while(move |d| *d <= end)
    }

    /// The window of equal length that ends the day before `start`.
    pub fn preceding(&self) -> Result<Self> {
        let end = day_before(self.start)?;
        let start = end
            .checked_sub_days(Days::new((self.days() - 1) as u64))
            .ok_or_else(|| Error::validation("preceding window before the calendar"))?;
        Self::new(start, end)
    }

    pub fn overlaps(&self, other: &DateWindow) -> bool {
        self.start <= other.end && other.start <= self.end
    }

    /// Rejects windows longer than [`MAX_WINDOW_DAYS`].
    pub fn check_length(&self) -> Result<()> {
        if self.days() > MAX_WINDOW_DAYS {
            return Err(Error::validation_code(
                ValidationErrorCode::WindowTooLarge,
                format!("window of {} days exceeds {} day limit", self.days(), MAX_WINDOW_DAYS),
            ));
        }
        Ok(())
    }
}

impl std::fmt::Display for DateWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}..={}", self.start, self.end)
    }
}

fn day_before(date: NaiveDate) -> Result<NaiveDate> {
    date.pred_opt()
        .ok_or_else(|| Error::validation("date before the calendar"))
}

/// Named time ranges offered by the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RangePreset {
    Today,
    Yesterday,
    #[serde(rename = "last_7_days")]
    Last7Days,
    #[serde(rename = "last_30_days")]
    Last30Days,
    ThisMonth,
    LastMonth,
    ThisYear,
}

/// Grouping key: every entity, or a single one.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(tag = "kind", content = "entity_id", rename_all = "snake_case")]
pub enum GroupBy {
    #[default]
    All,
    Entity(String),
}

impl GroupBy {
    pub fn entity(id: impl Into<String>) -> Self {
        Self::Entity(id.into())
    }

    pub fn matches(&self, entity_id: &str) -> bool {
        match self {
            Self::All => true,
            Self::Entity(id) => id == entity_id,
        }
    }
}
