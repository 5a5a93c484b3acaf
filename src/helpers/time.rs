use chrono::Utc;

use crate::utils::constants::SAFETY_MARGIN_SECONDS_DEFAULT;

pub fn get_token_safety_margin_seconds(
    safety_margin_seconds_settings: Option<u64>,
    safety_margin_seconds_supplier: Option<u64>,
) -> u64 {
    // supplier level
    safety_margin_seconds_supplier
        // settings (global) level
        .or(safety_margin_seconds_settings)
        .unwrap_or(SAFETY_MARGIN_SECONDS_DEFAULT)
}

pub fn now_i64() -> i64 {
    Utc::now().timestamp()
}

/// Unix timestamp `expires_in` seconds from now.
pub fn expires_at_from_now(expires_in: u64) -> i64 {
    now_i64().saturating_add(i64::try_from(expires_in).unwrap_or(i64::MAX))
}
