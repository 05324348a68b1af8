//! Report exports: one row per campaign and day.
//!
//! Reach and frequency are copied from the record as-is. They are never
//! summed, since the same person can be reached on several days.

use dashboard_core::{
    AggregateResult, DailyMetricRecord, DateWindow, Error, GroupBy, MetricTotals, Result,
};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

/// Column headers shared by the CSV and XLSX exports.
pub const REPORT_COLUMNS: [&str; 14] = [
    "date",
    "entity_id",
    "impressions",
    "reach",
    "frequency",
    "clicks",
    "spend",
    "conversions",
    "conversion_value",
    "ctr",
    "cpc",
    "cpm",
    "cpa",
    "roas",
];

const UTF8_BOM: [u8; 3] = [0xEF, 0xBB, 0xBF];

const SHEET_NAME: &str = "Sheet1";

/// A record with its derived ratios, ready for export.
#[derive(Debug, Clone)]
pub struct ReportRow {
    pub entity_id: String,
    pub reach: u64,
    pub frequency: Decimal,
    pub result: AggregateResult,
}

impl ReportRow {
    pub fn from_record(record: &DailyMetricRecord) -> Self {
        Self {
            entity_id: record.entity_id.clone(),
            reach: record.reach,
            frequency: two_places(record.frequency),
            result: AggregateResult::from_totals(
                DateWindow::single(record.date),
                GroupBy::entity(record.entity_id.clone()),
                MetricTotals::from_record(record),
            ),
        }
    }

    fn fields(&self) -> [String; 14] {
        let t = &self.result.totals;
        let m = &self.result.metrics;
        [
            self.result.window.start().format("%Y-%m-%d").to_string(),
            self.entity_id.clone(),
            t.impressions.to_string(),
            self.reach.to_string(),
            self.frequency.to_string(),
            t.clicks.to_string(),
            t.spend.to_string(),
            t.conversions.to_string(),
            t.conversion_value.to_string(),
            m.ctr.to_string(),
            m.cpc.to_string(),
            m.cpm.to_string(),
            m.cpa.to_string(),
            m.roas.to_string(),
        ]
    }
}

/// Rows for the records in `window` matching `group`, ordered by date then
/// campaign.
pub fn report_rows(
    records: &[DailyMetricRecord],
    window: &DateWindow,
    group: &GroupBy,
) -> Vec<ReportRow> {
    let mut rows: Vec<ReportRow> = dashboard_core::filter_records(records, window, group)
        .map(ReportRow::from_record)
        .collect();
    rows.sort_by(|a, b| {
        a.result
            .window
            .start()
            .cmp(&b.result.window.start())
            .then_with(|| a.entity_id.cmp(&b.entity_id))
    });
    rows
}

/// CSV with a UTF-8 byte order mark so spreadsheet apps detect the encoding.
pub fn to_csv(rows: &[ReportRow]) -> Result<Vec<u8>> {
    let mut writer = csv::WriterBuilder::new()
        .terminator(csv::Terminator::CRLF)
        .from_writer(Vec::new());

    writer
        .write_record(REPORT_COLUMNS)
        .map_err(|e| Error::export(format!("csv header: {}", e)))?;
    for row in rows {
        writer
            .write_record(row.fields())
            .map_err(|e| Error::export(format!("csv row: {}", e)))?;
    }

    let body = writer
        .into_inner()
        .map_err(|e| Error::export(format!("csv flush: {}", e)))?;

    let mut out = Vec::with_capacity(UTF8_BOM.len() + body.len());
    out.extend_from_slice(&UTF8_BOM);
    out.extend_from_slice(&body);
    Ok(out)
}

fn two_places(value: Decimal) -> Decimal {
    let mut rounded = value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(2);
    rounded
}

fn number(value: Decimal) -> f64 {
    value.to_f64().unwrap_or_default()
}

/// Single-sheet XLSX workbook. Counters and amounts are numeric cells.
pub fn to_xlsx(rows: &[ReportRow]) -> Result<Vec<u8>> {
    let mut book = umya_spreadsheet::new_file();
    let sheet = book
        .get_sheet_by_name_mut(SHEET_NAME)
        .ok_or_else(|| Error::export("workbook has no default sheet"))?;

    for (col, header) in REPORT_COLUMNS.iter().enumerate() {
        sheet
            .get_cell_mut((col as u32 + 1, 1))
            .set_value(header.to_string());
    }

    for (i, row) in rows.iter().enumerate() {
        let r = i as u32 + 2;
        let t = &row.result.totals;
        let m = &row.result.metrics;
        sheet
            .get_cell_mut((1, r))
            .set_value(row.result.window.start().format("%Y-%m-%d").to_string());
        sheet.get_cell_mut((2, r)).set_value(row.entity_id.clone());

        let numbers = [
            t.impressions as f64,
            row.reach as f64,
            number(row.frequency),
            t.clicks as f64,
            number(t.spend),
            t.conversions as f64,
            number(t.conversion_value),
            number(m.ctr),
            number(m.cpc),
            number(m.cpm),
            number(m.cpa),
            number(m.roas),
        ];
        for (offset, value) in numbers.into_iter().enumerate() {
            sheet
                .get_cell_mut((offset as u32 + 3, r))
                .set_value_number(value);
        }
    }

    let mut out: Vec<u8> = Vec::new();
    umya_spreadsheet::writer::xlsx::write_writer(&book, &mut out)
        .map_err(|e| Error::export(format!("failed to serialize workbook: {}", e)))?;
    Ok(out)
}
