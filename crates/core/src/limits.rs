//! Bounds and display constants for metric records and query windows.
//!
//! The `#[validate]` derive macro requires literal values in attributes,
//! so the entity id length is duplicated there. Keep both in sync.

// === Record Limits ===

/// Entity (campaign) id max length.
/// Meta campaign ids are ~18 digit strings.
pub const MAX_ENTITY_ID_LEN: usize = 64;

/// Decimal places kept for currency amounts (minor units).
pub const CURRENCY_SCALE: u32 = 2;

/// Decimal places kept for ad frequency (impressions per reached person).
pub const FREQUENCY_SCALE: u32 = 4;

/// Last storable day, counted from 1970-01-01.
/// ClickHouse `Date` is a UInt16 day number, so 2149-06-06 is the ceiling.
pub const MAX_RECORD_EPOCH_DAY: i64 = u16::MAX as i64;

// === Window Limits ===

/// Longest window a single query may cover (two years, leap day included).
pub const MAX_WINDOW_DAYS: i64 = 731;

/// Window used when a request gives no range (last 30 days).
pub const DEFAULT_RANGE_DAYS: i64 = 30;

// === Output ===

/// Decimal places for ratios and currency in aggregate output.
pub const DISPLAY_SCALE: u32 = 2;
