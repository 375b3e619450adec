//! Time utilities: minute-granular solver domain + timezone-aware parsing.

use anyhow::Result;
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;

/// Absolute instant -> whole minutes since the Unix epoch (floor).
///
/// Seconds below a minute are dropped; pre-epoch instants round toward
/// negative infinity so the mapping stays monotonic.
pub fn to_minutes(dt: DateTime<Utc>) -> i64 {
    dt.timestamp().div_euclid(60)
}

/// First whole minute at or after `dt`. Used for lower bounds so a placement
/// never starts before the caller's instant.
pub fn to_minutes_ceil(dt: DateTime<Utc>) -> i64 {
    let m = to_minutes(dt);
    if from_minutes(m) < dt { m + 1 } else { m }
}

/// Minutes since the Unix epoch -> absolute instant (UTC).
///
/// Saturates at chrono's representable range; inside that range
/// `to_minutes(from_minutes(m)) == m`.
pub fn from_minutes(minutes: i64) -> DateTime<Utc> {
    let secs = minutes.saturating_mul(60);
    DateTime::from_timestamp(secs, 0).unwrap_or(if minutes < 0 {
        DateTime::<Utc>::MIN_UTC
    } else {
        DateTime::<Utc>::MAX_UTC
    })
}

/// Parse a local time like "2026-02-20 23:59" in an IANA tz like "Europe/Helsinki",
/// returning UTC.
pub fn parse_local_to_utc(local: &str, tz: &str) -> Result<DateTime<Utc>> {
    let tz: Tz = tz
        .parse()
        .map_err(|_| anyhow::anyhow!("invalid timezone: {tz}"))?;

    let ndt = NaiveDateTime::parse_from_str(local, "%Y-%m-%d %H:%M")
        .map_err(|e| anyhow::anyhow!("invalid local datetime '{local}': {e}"))?;

    let local_dt = tz
        .from_local_datetime(&ndt)
        .single()
        .ok_or_else(|| anyhow::anyhow!("ambiguous or invalid local time (DST?): {local} {tz}"))?;

    Ok(local_dt.with_timezone(&Utc))
}
