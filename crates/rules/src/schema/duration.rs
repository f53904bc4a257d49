//! Prometheus duration strings (`30s`, `5m`, `1h30m`, `2w`).

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

const MS_PER_SECOND: u64 = 1000;
const MS_PER_MINUTE: u64 = 60 * MS_PER_SECOND;
const MS_PER_HOUR: u64 = 60 * MS_PER_MINUTE;
const MS_PER_DAY: u64 = 24 * MS_PER_HOUR;
const MS_PER_WEEK: u64 = 7 * MS_PER_DAY;
const MS_PER_YEAR: u64 = 365 * MS_PER_DAY;

/// Units in the only order Prometheus accepts them, largest first.
const UNITS: [(&str, u64); 7] = [
    ("y", MS_PER_YEAR),
    ("w", MS_PER_WEEK),
    ("d", MS_PER_DAY),
    ("h", MS_PER_HOUR),
    ("m", MS_PER_MINUTE),
    ("s", MS_PER_SECOND),
    ("ms", 1),
];

/// Millisecond-precision duration with Prometheus text form.
///
/// Displays in canonical form, so `180s` and `3m` render identically.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PromDuration(u64);

impl PromDuration {
    pub const ZERO: PromDuration = PromDuration(0);

    pub fn from_millis(millis: u64) -> Self {
        Self(millis)
    }

    pub fn from_secs(secs: u64) -> Self {
        Self(secs.saturating_mul(MS_PER_SECOND))
    }

    pub fn from_mins(mins: u64) -> Self {
        Self(mins.saturating_mul(MS_PER_MINUTE))
    }

    pub fn as_millis(&self) -> u64 {
        self.0
    }
}

impl From<PromDuration> for Duration {
    fn from(d: PromDuration) -> Self {
        Duration::from_millis(d.0)
    }
}

impl FromStr for PromDuration {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        if s == "0" {
            return Ok(PromDuration::ZERO);
        }
        if s.is_empty() {
            return Err("empty duration string".to_string());
        }

        let invalid = || format!("not a valid duration string: '{}'", s);
        let mut rest = s;
        let mut last_unit: Option<usize> = None;
        let mut total: u64 = 0;

        while !rest.is_empty() {
            let digits = rest.bytes().take_while(u8::is_ascii_digit).count();
            if digits == 0 {
                return Err(invalid());
            }
            let value: u64 = rest[..digits].parse().map_err(|_| invalid())?;
            rest = &rest[digits..];

            let unit_len = if rest.starts_with("ms") {
                2
            } else {
                rest.chars().next().map_or(0, char::len_utf8)
            };
            let unit = &rest[..unit_len];
            let idx = UNITS
                .iter()
                .position(|(name, _)| *name == unit)
                .ok_or_else(invalid)?;
            if last_unit.is_some_and(|last| idx <= last) {
                return Err(invalid());
            }
            last_unit = Some(idx);
            rest = &rest[unit_len..];

            total = value
                .checked_mul(UNITS[idx].1)
                .and_then(|ms| total.checked_add(ms))
                .ok_or_else(|| format!("duration out of range: '{}'", s))?;
        }

        Ok(PromDuration(total))
    }
}

impl fmt::Display for PromDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut ms = self.0;
        if ms == 0 {
            return write!(f, "0s");
        }
        for (unit, mult) in UNITS {
            // Years and weeks only when exact: 90d reads better than 12w6d.
            let exact_only = unit == "y" || unit == "w";
            if exact_only && ms % mult != 0 {
                continue;
            }
            let v = ms / mult;
            if v > 0 {
                write!(f, "{}{}", v, unit)?;
                ms -= v * mult;
            }
        }
        Ok(())
    }
}

impl Serialize for PromDuration {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for PromDuration {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct DurationVisitor;

        impl<'de> Visitor<'de> for DurationVisitor {
            type Value = PromDuration;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a duration such as '5m' or '1h30m'")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> std::result::Result<PromDuration, E> {
                v.parse().map_err(E::custom)
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> std::result::Result<PromDuration, E> {
                if v == 0 {
                    Ok(PromDuration::ZERO)
                } else {
                    Err(E::custom(format!("duration '{}' is missing a unit", v)))
                }
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> std::result::Result<PromDuration, E> {
                if v == 0 {
                    Ok(PromDuration::ZERO)
                } else {
                    Err(E::custom(format!("duration '{}' is missing a unit", v)))
                }
            }
        }

        deserializer.deserialize_any(DurationVisitor)
    }
}
