//! Daily metric records and their validation.
//!
//! Records are validated once here, at the ingestion boundary. Everything
//! downstream (storage, aggregation) trusts them to be non-negative and
//! within the storable date range.

use std::collections::BTreeMap;
use std::str::FromStr;

use chrono::{Days, NaiveDate};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::error::{Error, Result};
use crate::limits::{CURRENCY_SCALE, FREQUENCY_SCALE, MAX_RECORD_EPOCH_DAY};

/// Day number of `date` counted from 1970-01-01.
pub fn epoch_day(date: NaiveDate) -> i64 {
    date.signed_duration_since(NaiveDate::default()).num_days()
}

/// Inverse of [`epoch_day`] for the ClickHouse `Date` representation.
pub fn date_from_epoch_day(day: u16) -> NaiveDate {
    NaiveDate::default()
        .checked_add_days(Days::new(u64::from(day)))
        .unwrap_or_default()
}

/// Rounds a currency amount to minor units.
pub fn to_minor_units(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(CURRENCY_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

fn round_frequency(frequency: Decimal) -> Decimal {
    frequency.round_dp_with_strategy(FREQUENCY_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

fn validate_non_negative(value: &Decimal) -> std::result::Result<(), ValidationError> {
    if *value < Decimal::ZERO {
        let mut err = ValidationError::new("negative_amount");
        err.message = Some(format!("amount {} must not be negative", value).into());
        return Err(err);
    }
    Ok(())
}

fn validate_storable_date(date: &NaiveDate) -> std::result::Result<(), ValidationError> {
    let day = epoch_day(*date);
    if !(0..=MAX_RECORD_EPOCH_DAY).contains(&day) {
        let mut err = ValidationError::new("date_out_of_range");
        err.message = Some(format!("date {} is outside 1970-01-01..=2149-06-06", date).into());
        return Err(err);
    }
    Ok(())
}

/// Raw counters for one entity and one calendar day.
///
/// At most one record exists per `(entity_id, date)`; a later sync of the
/// same pair replaces the earlier one.
///
/// `reach` and `frequency` describe unique audience for that single day.
/// They are not additive across days or campaigns, so aggregation never
/// sums them; exports carry them per row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct DailyMetricRecord {
    /// Campaign id the counters belong to
    #[validate(length(min = 1, max = 64))]
    pub entity_id: String,
    #[validate(custom(function = "validate_storable_date"))]
    pub date: NaiveDate,
    pub impressions: u64,
    pub clicks: u64,
    #[validate(custom(function = "validate_non_negative"))]
    pub spend: Decimal,
    pub conversions: u64,
    #[validate(custom(function = "validate_non_negative"))]
    pub conversion_value: Decimal,
    /// Unique people reached
    #[serde(default)]
    pub reach: u64,
    /// Average impressions per person reached
    #[serde(default)]
    #[validate(custom(function = "validate_non_negative"))]
    pub frequency: Decimal,
}

impl DailyMetricRecord {
    /// Builds a validated record. Currency amounts are rounded to minor units.
    pub fn new(
        entity_id: impl Into<String>,
        date: NaiveDate,
        impressions: u64,
        clicks: u64,
        spend: Decimal,
        conversions: u64,
        conversion_value: Decimal,
    ) -> Result<Self> {
        let record = Self {
            entity_id: entity_id.into(),
            date,
            impressions,
            clicks,
            spend: to_minor_units(spend),
            conversions,
            conversion_value: to_minor_units(conversion_value),
            reach: 0,
            frequency: Decimal::ZERO,
        };
        record.check()?;
        Ok(record)
    }

    /// Sets the day's audience figures. Frequency keeps four decimals.
    pub fn with_audience(mut self, reach: u64, frequency: Decimal) -> Result<Self> {
        self.reach = reach;
        self.frequency = round_frequency(frequency);
        self.check()?;
        Ok(self)
    }

    /// Builds a record from loosely typed wire values.
    pub fn from_raw(raw: RawDailyMetrics) -> Result<Self> {
        let date = NaiveDate::parse_from_str(raw.date.trim(), "%Y-%m-%d")
            .map_err(|e| Error::validation(format!("date '{}': {}", raw.date, e)))?;

        Self::new(
            raw.entity_id,
            date,
            non_negative_count("impressions", raw.impressions)?,
            non_negative_count("clicks", raw.clicks)?,
            parse_amount("spend", &raw.spend)?,
            non_negative_count("conversions", raw.conversions)?,
            parse_amount("conversion_value", &raw.conversion_value)?,
        )?
        .with_audience(
            non_negative_count("reach", raw.reach)?,
            parse_amount("frequency", &raw.frequency)?,
        )
    }

    /// Runs the validator rules against this record.
    pub fn check(&self) -> Result<()> {
        self.validate().map_err(|e| {
            Error::validation(format!("record {}@{}: {}", self.entity_id, self.date, e))
        })
    }

    /// Identity of the record: one per entity and day.
    pub fn key(&self) -> RecordKey {
        RecordKey {
            entity_id: self.entity_id.clone(),
            date: self.date,
        }
    }
}

fn non_negative_count(field: &str, value: i64) -> Result<u64> {
    u64::try_from(value).map_err(|_| Error::validation(format!("{} must not be negative, got {}", field, value)))
}

fn parse_amount(field: &str, value: &str) -> Result<Decimal> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Ok(Decimal::ZERO);
    }
    Decimal::from_str(trimmed)
        .map_err(|e| Error::validation(format!("{} '{}': {}", field, value, e)))
}

/// Loosely typed daily metrics as they arrive from an upstream API.
///
/// Counters are signed and amounts are strings so that bad input can be
/// reported instead of silently wrapping.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawDailyMetrics {
    pub entity_id: String,
    /// YYYY-MM-DD
    pub date: String,
    pub impressions: i64,
    pub clicks: i64,
    pub spend: String,
    pub conversions: i64,
    pub conversion_value: String,
    #[serde(default)]
    pub reach: i64,
    #[serde(default)]
    pub frequency: String,
}

/// `(entity_id, date)` identity of a daily record.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RecordKey {
    pub entity_id: String,
    pub date: NaiveDate,
}

/// Records keyed by `(entity_id, date)` with last-write-wins upserts.
#[derive(Debug, Clone, Default)]
pub struct RecordSet {
    records: BTreeMap<RecordKey, DailyMetricRecord>,
}

impl RecordSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces the record for its `(entity_id, date)`.
    ///
    /// Returns true if an existing record was replaced.
    pub fn upsert(&mut self, record: DailyMetricRecord) -> bool {
        self.records.insert(record.key(), record).is_some()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Iterates records ordered by entity, then date.
    pub fn iter(&self) -> impl Iterator<Item = &DailyMetricRecord> {
        self.records.values()
    }

    pub fn into_vec(self) -> Vec<DailyMetricRecord> {
        self.records.into_values().collect()
    }
}

impl FromIterator<DailyMetricRecord> for RecordSet {
    fn from_iter<I: IntoIterator<Item = DailyMetricRecord>>(iter: I) -> Self {
        let mut set = Self::new();
        for record in iter {
            set.upsert(record);
        }
        set
    }
}
