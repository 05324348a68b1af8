//! KPI aggregation over daily metric records.
//!
//! Counters are summed over the filtered records, then ratios are derived
//! from the sums. Currency stays exact (`Decimal`) throughout and is only
//! rounded to display precision when an [`AggregateResult`] is built.
//!
//! A ratio with a zero denominator is reported as zero. New and paused
//! campaigns have no traffic all the time and that must not be a fault.

use std::collections::{BTreeMap, BTreeSet};
use std::iter::Sum;
use std::ops::{Add, AddAssign};

use chrono::NaiveDate;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result, ValidationErrorCode};
use crate::limits::DISPLAY_SCALE;
use crate::record::DailyMetricRecord;
use crate::window::{DateWindow, GroupBy};

const HUNDRED: Decimal = Decimal::ONE_HUNDRED;
const THOUSAND: Decimal = Decimal::ONE_THOUSAND;

/// Rounds half away from zero and pads to exactly [`DISPLAY_SCALE`] places.
fn round_display(value: Decimal) -> Decimal {
    let mut rounded =
        value.round_dp_with_strategy(DISPLAY_SCALE, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(DISPLAY_SCALE);
    rounded
}

/// `numerator * scale / denominator`, or zero when the denominator is zero.
fn guarded_ratio(numerator: Decimal, denominator: Decimal, scale: Decimal) -> Decimal {
    if denominator.is_zero() {
        return Decimal::ZERO;
    }
    numerator
        .checked_mul(scale)
        .and_then(|n| n.checked_div(denominator))
        .unwrap_or(Decimal::ZERO)
}

/// Summed raw counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricTotals {
    pub impressions: u64,
    pub clicks: u64,
    pub spend: Decimal,
    pub conversions: u64,
    pub conversion_value: Decimal,
}

impl MetricTotals {
    pub fn from_record(record: &DailyMetricRecord) -> Self {
        Self {
            impressions: record.impressions,
            clicks: record.clicks,
            spend: record.spend,
            conversions: record.conversions,
            conversion_value: record.conversion_value,
        }
    }

    fn rounded(mut self) -> Self {
        self.spend = round_display(self.spend);
        self.conversion_value = round_display(self.conversion_value);
        self
    }
}

impl AddAssign<&MetricTotals> for MetricTotals {
    fn add_assign(&mut self, rhs: &MetricTotals) {
        self.impressions = self.impressions.saturating_add(rhs.impressions);
        self.clicks = self.clicks.saturating_add(rhs.clicks);
        self.spend += rhs.spend;
        self.conversions = self.conversions.saturating_add(rhs.conversions);
        self.conversion_value += rhs.conversion_value;
    }
}

impl AddAssign for MetricTotals {
    fn add_assign(&mut self, rhs: MetricTotals) {
        *self += &rhs;
    }
}

impl Add for MetricTotals {
    type Output = MetricTotals;

    fn add(mut self, rhs: MetricTotals) -> MetricTotals {
        self += &rhs;
        self
    }
}

impl Sum for MetricTotals {
    fn sum<I: Iterator<Item = MetricTotals>>(iter: I) -> Self {
        iter.fold(MetricTotals::default(), Add::add)
    }
}

impl<'a> Sum<&'a DailyMetricRecord> for MetricTotals {
    fn sum<I: Iterator<Item = &'a DailyMetricRecord>>(iter: I) -> Self {
        let mut totals = MetricTotals::default();
        for record in iter {
            totals += MetricTotals::from_record(record);
        }
        totals
    }
}

/// Ratios derived from summed totals.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DerivedMetrics {
    /// clicks / impressions * 100
    pub ctr: Decimal,
    /// spend / clicks
    pub cpc: Decimal,
    /// spend / impressions * 1000
    pub cpm: Decimal,
    /// spend / conversions
    pub cpa: Decimal,
    /// conversion_value / spend
    pub roas: Decimal,
}

impl DerivedMetrics {
    /// Derives unrounded ratios from totals.
    pub fn from_totals(totals: &MetricTotals) -> Self {
        let impressions = Decimal::from(totals.impressions);
        let clicks = Decimal::from(totals.clicks);
        let conversions = Decimal::from(totals.conversions);

        Self {
            ctr: guarded_ratio(clicks, impressions, HUNDRED),
            cpc: guarded_ratio(totals.spend, clicks, Decimal::ONE),
            cpm: guarded_ratio(totals.spend, impressions, THOUSAND),
            cpa: guarded_ratio(totals.spend, conversions, Decimal::ONE),
            roas: guarded_ratio(totals.conversion_value, totals.spend, Decimal::ONE),
        }
    }

    fn rounded(self) -> Self {
        Self {
            ctr: round_display(self.ctr),
            cpc: round_display(self.cpc),
            cpm: round_display(self.cpm),
            cpa: round_display(self.cpa),
            roas: round_display(self.roas),
        }
    }
}

/// Totals and ratios for one window and grouping key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregateResult {
    pub window: DateWindow,
    pub group: GroupBy,
    pub totals: MetricTotals,
    pub metrics: DerivedMetrics,
}

impl AggregateResult {
    /// Derives ratios from exact totals, then rounds both for display.
    pub fn from_totals(window: DateWindow, group: GroupBy, totals: MetricTotals) -> Self {
        let metrics = DerivedMetrics::from_totals(&totals).rounded();
        Self {
            window,
            group,
            totals: totals.rounded(),
            metrics,
        }
    }

    /// True when no activity was recorded in the window.
    pub fn is_empty(&self) -> bool {
        self.totals == MetricTotals::default()
    }
}

/// Records inside `window` that belong to `group`.
pub fn filter_records<'a, I>(
    records: I,
    window: &'a DateWindow,
    group: &'a GroupBy,
) -> impl Iterator<Item = &'a DailyMetricRecord> + 'a
where
    I: IntoIterator<Item = &'a DailyMetricRecord>,
    I::IntoIter: 'a,
{
    records
        .into_iter()
        .filter(move |r| window.contains(r.date) && group.matches(&r.entity_id))
}

/// Sums the matching records and derives ratios from the sums.
pub fn aggregate<'a, I>(records: I, window: &DateWindow, group: &GroupBy) -> AggregateResult
where
    I: IntoIterator<Item = &'a DailyMetricRecord>,
{
    let totals = sum_matching(records, window, group);
    AggregateResult::from_totals(*window, group.clone(), totals)
}

/// Exact, unrounded totals of the matching records.
fn sum_matching<'a, I>(records: I, window: &DateWindow, group: &GroupBy) -> MetricTotals
where
    I: IntoIterator<Item = &'a DailyMetricRecord>,
{
    records
        .into_iter()
        .filter(|r| window.contains(r.date) && group.matches(&r.entity_id))
        .sum()
}

/// One result per day of `window`, ascending. Days without records are zero.
pub fn aggregate_daily<'a, I>(
    records: I,
    window: &DateWindow,
    group: &GroupBy,
) -> Vec<AggregateResult>
where
    I: IntoIterator<Item = &'a DailyMetricRecord>,
{
    let mut by_day: BTreeMap<NaiveDate, MetricTotals> = BTreeMap::new();
    for record in records
        .into_iter()
        .filter(|r| window.contains(r.date) && group.matches(&r.entity_id))
    {
        *by_day.entry(record.date).or_default() += MetricTotals::from_record(record);
    }

    window
        .iter_days()
        .map(|day| {
            let totals = by_day.remove(&day).unwrap_or_default();
            AggregateResult::from_totals(DateWindow::single(day), group.clone(), totals)
        })
        .collect()
}

/// Number of distinct entities with records inside the window.
pub fn distinct_entities<'a, I>(records: I, window: &DateWindow, group: &GroupBy) -> usize
where
    I: IntoIterator<Item = &'a DailyMetricRecord>,
{
    records
        .into_iter()
        .filter(|r| window.contains(r.date) && group.matches(&r.entity_id))
        .map(|r| r.entity_id.as_str())
        .collect::<BTreeSet<_>>()
        .len()
}

/// Percentage change per metric between two periods.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricDeltas {
    pub impressions: Decimal,
    pub clicks: Decimal,
    pub spend: Decimal,
    pub conversions: Decimal,
    pub conversion_value: Decimal,
    pub ctr: Decimal,
    pub cpc: Decimal,
    pub cpm: Decimal,
    pub cpa: Decimal,
    pub roas: Decimal,
}

/// `(current - previous) / previous * 100`, zero when `previous` is zero.
pub fn percent_change(current: Decimal, previous: Decimal) -> Decimal {
    round_display(guarded_ratio(current - previous, previous, HUNDRED))
}

impl MetricDeltas {
    /// Changes between exact totals. Ratios are derived unrounded and only
    /// the resulting percentages are rounded.
    pub fn between(current: &MetricTotals, previous: &MetricTotals) -> Self {
        let (c, p) = (current, previous);
        let cm = DerivedMetrics::from_totals(current);
        let pm = DerivedMetrics::from_totals(previous);
        Self {
            impressions: percent_change(c.impressions.into(), p.impressions.into()),
            clicks: percent_change(c.clicks.into(), p.clicks.into()),
            spend: percent_change(c.spend, p.spend),
            conversions: percent_change(c.conversions.into(), p.conversions.into()),
            conversion_value: percent_change(c.conversion_value, p.conversion_value),
            ctr: percent_change(cm.ctr, pm.ctr),
            cpc: percent_change(cm.cpc, pm.cpc),
            cpm: percent_change(cm.cpm, pm.cpm),
            cpa: percent_change(cm.cpa, pm.cpa),
            roas: percent_change(cm.roas, pm.roas),
        }
    }
}

/// Two periods side by side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comparison {
    pub current: AggregateResult,
    pub previous: AggregateResult,
    pub deltas: MetricDeltas,
}

/// Aggregates two disjoint windows and the change between them.
pub fn compare(
    records: &[DailyMetricRecord],
    current: &DateWindow,
    previous: &DateWindow,
    group: &GroupBy,
) -> Result<Comparison> {
    if current.overlaps(previous) {
        return Err(Error::validation_code(
            ValidationErrorCode::InvalidInput,
            format!("comparison windows {} and {} overlap", current, previous),
        ));
    }

    let current_totals = sum_matching(records, current, group);
    let previous_totals = sum_matching(records, previous, group);
    let deltas = MetricDeltas::between(&current_totals, &previous_totals);

    Ok(Comparison {
        current: AggregateResult::from_totals(*current, group.clone(), current_totals),
        previous: AggregateResult::from_totals(*previous, group.clone(), previous_totals),
        deltas,
    })
}

/// Compares `current` against the equally long window right before it.
pub fn compare_with_previous(
    records: &[DailyMetricRecord],
    current: &DateWindow,
    group: &GroupBy,
) -> Result<Comparison> {
    let previous = current.preceding()?;
    compare(records, current, &previous, group)
}
