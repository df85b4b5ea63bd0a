//! Short duration strings used by staff commands (`"10m"`, `"2h"`, `"24"`).
//!
//! [`parse`] and [`format`] are not exact inverses: formatting uses integer
//! division and drops any remainder, so `format(90)` reads "1 minute". That
//! rounding is intended for display and must not feed back into scheduling.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::error::NoxError;

/// Upper bound for minute-suffixed values (one week).
pub const MAX_MINUTES: u64 = 10_080;
/// Upper bound for hour-suffixed and bare values (one week).
pub const MAX_HOURS: u64 = 168;

/// Parses a duration string into seconds.
///
/// Accepts `<n>m` (minutes, 1..=10080), `<n>h` (hours, 1..=168) and a bare
/// `<n>` which is read as hours. Matching is case-insensitive and ignores
/// surrounding whitespace. Anything else yields `None`.
pub fn parse(spec: &str) -> Option<u64> {
    let spec = spec.trim().to_lowercase();
    if spec.is_empty() {
        return None;
    }

    if let Some(body) = spec.strip_suffix('m') {
        let minutes = parse_bounded(body, MAX_MINUTES)?;
        Some(minutes * 60)
    } else if let Some(body) = spec.strip_suffix('h') {
        let hours = parse_bounded(body, MAX_HOURS)?;
        Some(hours * 3600)
    } else {
        let hours = parse_bounded(&spec, MAX_HOURS)?;
        Some(hours * 3600)
    }
}

fn parse_bounded(body: &str, max: u64) -> Option<u64> {
    // `u64::from_str` accepts a leading '+', which is not a valid spec.
    if body.is_empty() || !body.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let value: u64 = body.parse().ok()?;
    (1..=max).contains(&value).then_some(value)
}

/// Renders seconds as whole minutes below one hour, whole hours otherwise.
pub fn format(seconds: u64) -> String {
    if seconds < 3600 {
        let minutes = seconds / 60;
        format!("{} minute{}", minutes, plural(minutes))
    } else {
        let hours = seconds / 3600;
        format!("{} hour{}", hours, plural(hours))
    }
}

fn plural(n: u64) -> &'static str {
    if n == 1 { "" } else { "s" }
}

/// A validated delay, as accepted by [`parse`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimeSpec {
    seconds: u64,
}

impl TimeSpec {
    pub fn seconds(&self) -> u64 {
        self.seconds
    }

    pub fn as_duration(&self) -> Duration {
        Duration::from_secs(self.seconds)
    }
}

impl FromStr for TimeSpec {
    type Err = NoxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse(s)
            .map(|seconds| TimeSpec { seconds })
            .ok_or_else(|| NoxError::invalid_time_spec(s))
    }
}

impl fmt::Display for TimeSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format(self.seconds))
    }
}
