// SPDX-License-Identifier: PMPL-1.0-or-later
//! Stored entry envelope and expiry policy.
//!
//! Every value is written as `{"value": .., "time": .., "expire": ..}` where
//! `time` is the write time and `expire` the absolute deadline, both in Unix
//! milliseconds. `expire: null` never expires.

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::de::{Deserializer, IgnoredAny};
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Expiry policy for a stored value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Expire {
    /// Keep the value until it is removed.
    #[default]
    Never,
    /// Expire this many milliseconds after the write. Zero means never.
    After(i64),
    /// Expire at an absolute instant.
    At(DateTime<Utc>),
}

impl Expire {
    /// Relative expiry from a `chrono::Duration`.
    pub fn after(duration: Duration) -> Self {
        Expire::After(duration.num_milliseconds())
    }

    /// Collapse policies that resolve to "no expiry" into [`Expire::Never`].
    pub fn normalized(self) -> Self {
        match self {
            Expire::After(0) => Expire::Never,
            // The epoch coerces to zero milliseconds, which also means none.
            Expire::At(at) if at.timestamp_millis() == 0 => Expire::Never,
            other => other,
        }
    }

    /// Absolute deadline in Unix milliseconds for a write happening at `now`.
    pub fn deadline(self, now: DateTime<Utc>) -> Option<i64> {
        match self.normalized() {
            Expire::Never => None,
            Expire::After(ms) => Some(now.timestamp_millis().saturating_add(ms)),
            Expire::At(at) => Some(at.timestamp_millis()),
        }
    }
}

impl fmt::Display for Expire {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expire::Never => f.write_str("never"),
            Expire::After(ms) => write!(f, "after {ms}ms"),
            Expire::At(at) => write!(f, "at {}", at.to_rfc3339()),
        }
    }
}

impl Serialize for Expire {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.normalized() {
            Expire::Never => serializer.serialize_none(),
            Expire::After(ms) => serializer.serialize_i64(ms),
            Expire::At(at) => serializer.serialize_str(&at.to_rfc3339()),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ExpireRepr {
    Millis(f64),
    Text(String),
    Other(IgnoredAny),
}

impl<'de> Deserialize<'de> for Expire {
    /// Accepts `null`, a millisecond count, an RFC 3339 date, or a numeric
    /// string. Anything that is neither a usable number nor a date (booleans,
    /// objects, arrays) means no expiry, as does zero.
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let repr = Option::<ExpireRepr>::deserialize(deserializer)?;
        let expire = match repr {
            None => Expire::Never,
            Some(ExpireRepr::Millis(ms)) => from_millis(ms),
            Some(ExpireRepr::Other(_)) => Expire::Never,
            Some(ExpireRepr::Text(text)) => {
                if let Ok(at) = DateTime::parse_from_rfc3339(text.trim()) {
                    Expire::At(at.with_timezone(&Utc))
                } else {
                    text.trim().parse::<f64>().map(from_millis).unwrap_or(Expire::Never)
                }
            }
        };
        Ok(expire.normalized())
    }
}

/// Fractions round away from zero so a sub-millisecond expiry never
/// collapses into "no expiry".
fn from_millis(ms: f64) -> Expire {
    if !ms.is_finite() {
        return Expire::Never;
    }
    let rounded = if ms > 0.0 { ms.ceil() } else { ms.floor() };
    Expire::After(rounded as i64)
}

/// The JSON wrapper persisted for every key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// The stored value. Missing values are stored as `null`.
    #[serde(default)]
    pub value: Value,
    /// Write time, Unix milliseconds.
    #[serde(default)]
    pub time: i64,
    /// Absolute expiry, Unix milliseconds.
    #[serde(default)]
    pub expire: Option<i64>,
}

impl Envelope {
    pub fn new(value: Value, now: DateTime<Utc>, expire: Expire) -> Self {
        Self {
            value,
            time: now.timestamp_millis(),
            expire: expire.deadline(now),
        }
    }

    /// Whether the entry is still readable at `now`. The deadline itself is
    /// still live.
    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        self.expire
            .map_or(true, |deadline| deadline >= now.timestamp_millis())
    }
}
