//! Time zone shifting for slice assignment.
//!
//! Slice grids are computed over *local millis*: a UTC instant plus the UTC
//! offset its zone observes at that instant. Day- and hour-aligned windows in
//! a non-UTC zone then line up with local wall-clock boundaries while all
//! stored timestamps stay in UTC.
//!
//! ## DST policy
//!
//! Shifting UTC to local millis is total and unique. The inverse is not:
//!
//! - **Ambiguous** local times (the repeated hour when clocks fall back)
//!   resolve to the earlier UTC instant in [`ShiftTimeZone::to_epoch_millis`]
//!   and to the later one in [`ShiftTimeZone::to_fire_millis`]. A window end
//!   inside the repeated hour must not fire until both passes of that hour
//!   have been assigned.
//! - **Skipped** local times (the missing hour when clocks spring forward)
//!   are treated as valid and resolved with the offset in force before the
//!   transition, which lands them after the gap, shifted by the gap length.
//!
//! Neither case is an error; assignment stays total over all inputs.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, FixedOffset, MappedLocalTime, NaiveDateTime, Offset, TimeZone};
use chrono_tz::Tz;

use crate::config::ConfigError;

const MILLIS_PER_SECOND: i64 = 1_000;

/// Lookback used to find the offset in force before a skipped local time.
/// Transitions are never closer together than this.
const MILLIS_PER_DAY: i64 = 86_400_000;

/// The zone whose local wall clock the slice grid is aligned to.
///
/// # Example
///
/// ```rust
/// use laminar_slicing::time::ShiftTimeZone;
///
/// let shanghai: ShiftTimeZone = "Asia/Shanghai".parse().unwrap();
/// // 1970-01-01T00:00:00Z is 08:00 local in Shanghai
/// assert_eq!(shanghai.to_local_millis(0), 8 * 3_600_000);
/// assert_eq!(shanghai.to_epoch_millis(8 * 3_600_000), 0);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ShiftTimeZone {
    /// No shifting.
    #[default]
    Utc,
    /// A constant offset from UTC.
    Fixed(FixedOffset),
    /// An IANA zone with its full transition history.
    Named(Tz),
}

impl ShiftTimeZone {
    /// Returns true when no shifting is applied.
    #[inline]
    #[must_use]
    pub fn is_utc(&self) -> bool {
        matches!(self, Self::Utc)
    }

    /// Returns the UTC offset, in milliseconds, observed at `utc_ms`.
    ///
    /// Instants outside chrono's representable range report a zero offset.
    #[must_use]
    pub fn offset_millis_at(&self, utc_ms: i64) -> i64 {
        match self {
            Self::Utc => 0,
            Self::Fixed(offset) => i64::from(offset.local_minus_utc()) * MILLIS_PER_SECOND,
            Self::Named(tz) => match naive_from_millis(utc_ms) {
                Some(naive) => {
                    let offset = tz.offset_from_utc_datetime(&naive).fix();
                    i64::from(offset.local_minus_utc()) * MILLIS_PER_SECOND
                }
                None => 0,
            },
        }
    }

    /// Shifts a UTC instant into local millis.
    #[inline]
    #[must_use]
    pub fn to_local_millis(&self, utc_ms: i64) -> i64 {
        if self.is_utc() {
            return utc_ms;
        }
        utc_ms.saturating_add(self.offset_millis_at(utc_ms))
    }

    /// Converts local millis back to a UTC instant, applying the DST policy
    /// described in the module docs. Ambiguous times map to the earlier instant.
    #[must_use]
    pub fn to_epoch_millis(&self, local_ms: i64) -> i64 {
        self.resolve(local_ms, Fold::Earlier)
    }

    /// Converts a local window end into the instant its timer fires.
    ///
    /// Same as [`ShiftTimeZone::to_epoch_millis`] except that an ambiguous
    /// end resolves to the later instant, after the second pass of the
    /// repeated hour.
    #[must_use]
    pub fn to_fire_millis(&self, local_ms: i64) -> i64 {
        self.resolve(local_ms, Fold::Later)
    }

    fn resolve(&self, local_ms: i64, fold: Fold) -> i64 {
        match self {
            Self::Utc => local_ms,
            Self::Fixed(_) => local_ms.saturating_sub(self.offset_millis_at(0)),
            Self::Named(tz) => {
                let Some(naive) = naive_from_millis(local_ms) else {
                    return local_ms;
                };
                match tz.from_local_datetime(&naive) {
                    MappedLocalTime::Single(dt) => dt.timestamp_millis(),
                    MappedLocalTime::Ambiguous(first, second) => {
                        let (a, b) = (first.timestamp_millis(), second.timestamp_millis());
                        let resolved = match fold {
                            Fold::Earlier => a.min(b),
                            Fold::Later => a.max(b),
                        };
                        tracing::trace!(
                            zone = tz.name(),
                            local_ms,
                            resolved_ms = resolved,
                            ?fold,
                            "ambiguous local time resolved"
                        );
                        resolved
                    }
                    MappedLocalTime::None => {
                        let before =
                            self.offset_millis_at(local_ms.saturating_sub(MILLIS_PER_DAY));
                        let resolved = local_ms.saturating_sub(before);
                        tracing::trace!(
                            zone = tz.name(),
                            local_ms,
                            resolved_ms = resolved,
                            "skipped local time resolved with the pre-transition offset"
                        );
                        resolved
                    }
                }
            }
        }
    }
}

/// Which instant an ambiguous local time maps to.
#[derive(Debug, Clone, Copy)]
enum Fold {
    Earlier,
    Later,
}

fn naive_from_millis(ms: i64) -> Option<NaiveDateTime> {
    DateTime::from_timestamp_millis(ms).map(|dt| dt.naive_utc())
}

/// Parses `+08:00`, `-0530` or `+09` style offsets.
fn parse_fixed_offset(s: &str) -> Option<FixedOffset> {
    let (sign, rest) = match s.as_bytes().first()? {
        b'+' => (1, &s[1..]),
        b'-' => (-1, &s[1..]),
        _ => return None,
    };
    let digits: String = rest.chars().filter(|c| *c != ':').collect();
    if digits.is_empty() || digits.len() > 4 || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let (hours, minutes) = if digits.len() <= 2 {
        (digits.parse::<i32>().ok()?, 0)
    } else {
        let split = digits.len() - 2;
        (
            digits[..split].parse::<i32>().ok()?,
            digits[split..].parse::<i32>().ok()?,
        )
    };
    if minutes >= 60 {
        return None;
    }
    FixedOffset::east_opt(sign * (hours * 3_600 + minutes * 60))
}

impl FromStr for ShiftTimeZone {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.eq_ignore_ascii_case("utc") || trimmed == "Z" {
            return Ok(Self::Utc);
        }
        if trimmed.starts_with('+') || trimmed.starts_with('-') {
            return parse_fixed_offset(trimmed)
                .map(|offset| {
                    if offset.local_minus_utc() == 0 {
                        Self::Utc
                    } else {
                        Self::Fixed(offset)
                    }
                })
                .ok_or_else(|| ConfigError::UnknownTimeZone(s.to_string()));
        }
        trimmed
            .parse::<Tz>()
            .map(Self::Named)
            .map_err(|_| ConfigError::UnknownTimeZone(s.to_string()))
    }
}

impl From<Tz> for ShiftTimeZone {
    fn from(tz: Tz) -> Self {
        Self::Named(tz)
    }
}

impl From<FixedOffset> for ShiftTimeZone {
    fn from(offset: FixedOffset) -> Self {
        Self::Fixed(offset)
    }
}

impl fmt::Display for ShiftTimeZone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Utc => write!(f, "UTC"),
            Self::Fixed(offset) => write!(f, "{offset}"),
            Self::Named(tz) => write!(f, "{}", tz.name()),
        }
    }
}
