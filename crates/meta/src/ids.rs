//! Ad account id normalization.
//!
//! The Graph API addresses accounts as `act_<digits>` while listings and
//! the dashboard store the bare numeric id.

use std::sync::LazyLock;

use dashboard_core::{Error, Result};
use regex::Regex;

static ACCOUNT_ID_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:act_)?(\d{1,32})$").expect("invalid account id pattern"));

/// Returns the `act_`-prefixed node id used in Graph API paths.
pub fn account_node_id(account_id: &str) -> Result<String> {
    let trimmed = account_id.trim();
    let digits = ACCOUNT_ID_REGEX
        .captures(trimmed)
        .and_then(|c| c.get(1))
        .ok_or_else(|| Error::validation(format!("invalid ad account id '{}'", account_id)))?;
    Ok(format!("act_{}", digits.as_str()))
}

/// Drops a leading `act_` if present.
pub fn strip_account_prefix(account_id: &str) -> &str {
    let trimmed = account_id.trim();
    trimmed.strip_prefix("act_").unwrap_or(trimmed)
}
