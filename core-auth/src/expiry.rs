//! Token expiry arithmetic.
//!
//! Pure functions over a [`Token`] and an explicit "now". Callers supply the
//! instant (the `Clock` bridge in production, fixed instants in tests).

use chrono::{DateTime, TimeDelta, Utc};

use crate::types::Token;

/// Seconds before the real expiry at which a token counts as stale.
pub const DEFAULT_REFRESH_SKEW: i64 = 60;

/// `at + secs`, saturating at the representable range.
pub(crate) fn offset_seconds(at: DateTime<Utc>, secs: i64) -> DateTime<Utc> {
    let saturated = if secs >= 0 {
        DateTime::<Utc>::MAX_UTC
    } else {
        DateTime::<Utc>::MIN_UTC
    };

    TimeDelta::try_seconds(secs)
        .and_then(|delta| at.checked_add_signed(delta))
        .unwrap_or(saturated)
}

/// Whole seconds of validity left; negative once the token has expired.
pub fn remaining_seconds(token: &Token, now: DateTime<Utc>) -> i64 {
    (token.expires_at() - now).num_seconds()
}

/// `true` iff `now >= issued_at + expires_in - skew_seconds`.
pub fn needs_refresh(token: &Token, now: DateTime<Utc>, skew_seconds: i64) -> bool {
    now >= refresh_due_at(token, skew_seconds)
}

/// `skew_seconds` bounded to half of the token's lifetime.
///
/// A skew at or beyond the lifetime would make every freshly issued token
/// stale and turn each read into a refresh exchange.
pub fn effective_skew(token: &Token, skew_seconds: i64) -> i64 {
    skew_seconds.min(token.expires_in / 2).max(0)
}

/// Instant from which [`needs_refresh`] holds, for proactive scheduling.
pub fn refresh_due_at(token: &Token, skew_seconds: i64) -> DateTime<Utc> {
    offset_seconds(token.expires_at(), skew_seconds.saturating_neg())
}
