//! Test fixtures and record generators.

use chrono::{Days, NaiveDate, Utc};
use dashboard_core::{AdAccount, Campaign, CampaignStatus, DailyMetricRecord};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

pub const ACCOUNT_ID: &str = "1234567890";

/// A day in January 2024.
pub fn jan(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, day).expect("valid January date")
}

/// `n` days before today (UTC).
pub fn days_ago(n: u64) -> NaiveDate {
    Utc::now()
        .date_naive()
        .checked_sub_days(Days::new(n))
        .expect("date in range")
}

pub fn record(
    entity_id: &str,
    date: NaiveDate,
    impressions: u64,
    clicks: u64,
    spend: Decimal,
    conversions: u64,
    conversion_value: Decimal,
) -> DailyMetricRecord {
    DailyMetricRecord::new(
        entity_id,
        date,
        impressions,
        clicks,
        spend,
        conversions,
        conversion_value,
    )
    .expect("valid fixture record")
}

/// 1000 impressions, 50 clicks, 100.00 spend, 5 conversions, 500.00 value.
pub fn reference_record(entity_id: &str, date: NaiveDate) -> DailyMetricRecord {
    record(entity_id, date, 1000, 50, dec!(100.00), 5, dec!(500.00))
}

/// A day with no delivery.
pub fn zero_record(entity_id: &str, date: NaiveDate) -> DailyMetricRecord {
    record(entity_id, date, 0, 0, Decimal::ZERO, 0, Decimal::ZERO)
}

pub fn campaign(campaign_id: &str, name: &str, status: CampaignStatus) -> Campaign {
    Campaign {
        campaign_id: campaign_id.to_string(),
        account_id: ACCOUNT_ID.to_string(),
        name: name.to_string(),
        status,
        objective: Some("OUTCOME_SALES".to_string()),
        daily_budget: Some(dec!(50.00)),
        lifetime_budget: None,
        created_time: None,
    }
}

pub fn account() -> AdAccount {
    AdAccount {
        account_id: ACCOUNT_ID.to_string(),
        name: "Loja Principal".to_string(),
        currency: "BRL".to_string(),
        timezone_name: "America/Sao_Paulo".to_string(),
        account_status: 1,
        amount_spent: dec!(15230.75),
        balance: dec!(0),
    }
}

/// Two campaigns over the first week of January 2024.
///
/// `c1` delivers every day, `c2` only on Jan 3 and Jan 5. `c2` on Jan 3
/// also carries reach and frequency.
pub fn january_records() -> Vec<DailyMetricRecord> {
    let mut records: Vec<DailyMetricRecord> =
        (1..=7).map(|d| reference_record("c1", jan(d))).collect();
    records.push(
        record("c2", jan(3), 2000, 40, dec!(80.00), 2, dec!(120.00))
            .with_audience(1600, dec!(1.25))
            .expect("valid audience"),
    );
    records.push(record("c2", jan(5), 500, 10, dec!(20.00), 0, dec!(0)));
    records
}
