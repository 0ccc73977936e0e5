//! Helpers for computing and checking token expiry instants.

use chrono::{DateTime, Duration, Local, NaiveTime, Utc};

/// Whether `expires_at` lies strictly in the past.
pub fn is_expired(expires_at: DateTime<Utc>) -> bool {
    expires_at < Utc::now()
}

/// The last millisecond of the current local calendar day.
///
/// Falls back to the end of the UTC day when the local end-of-day instant
/// does not exist (DST transitions).
pub fn end_of_day_expiry() -> DateTime<Utc> {
    let last_ms = NaiveTime::from_hms_milli_opt(23, 59, 59, 999).unwrap_or(NaiveTime::MIN);
    Local::now()
        .date_naive()
        .and_time(last_ms)
        .and_local_timezone(Local)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|| Utc::now().date_naive().and_time(last_ms).and_utc())
}

/// `offset` from now, saturating at the latest representable instant.
pub fn expiry_in(offset: Duration) -> DateTime<Utc> {
    Utc::now()
        .checked_add_signed(offset)
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}
