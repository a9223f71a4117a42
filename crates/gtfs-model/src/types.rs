//! Value types with feed-specific text encodings.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

const DATE_FORMAT: &str = "%Y%m%d";

/// RGB color written as six hexadecimal digits without a leading `#`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GtfsColor(u32);

impl GtfsColor {
    /// Parse `RRGGBB`. Case-insensitive; anything else is rejected.
    pub fn parse(raw: &str) -> Option<Self> {
        if raw.len() != 6 || !raw.bytes().all(|byte| byte.is_ascii_hexdigit()) {
            return None;
        }
        u32::from_str_radix(raw, 16).ok().map(Self)
    }

    pub fn from_rgb(rgb: u32) -> Self {
        Self(rgb & 0x00FF_FFFF)
    }

    pub fn rgb(self) -> u32 {
        self.0
    }
}

impl fmt::Display for GtfsColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:06X}", self.0)
    }
}

/// Time of day as seconds since noon minus twelve hours of the service day.
///
/// Values past `24:00:00` are valid and denote trips running after midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GtfsTime {
    seconds: u32,
}

impl GtfsTime {
    pub fn from_hms(hours: u32, minutes: u32, seconds: u32) -> Self {
        Self {
            seconds: hours * 3600 + minutes * 60 + seconds,
        }
    }

    pub fn from_seconds(seconds: u32) -> Self {
        Self { seconds }
    }

    /// Parse `H:MM:SS` or `HH:MM:SS`.
    pub fn parse(raw: &str) -> Option<Self> {
        let mut parts = raw.split(':');
        let (Some(hours), Some(minutes), Some(seconds), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return None;
        };
        if hours.is_empty() || hours.len() > 3 || minutes.len() != 2 || seconds.len() != 2 {
            return None;
        }
        let all_digits = |part: &str| part.bytes().all(|byte| byte.is_ascii_digit());
        if !all_digits(hours) || !all_digits(minutes) || !all_digits(seconds) {
            return None;
        }
        let hours: u32 = hours.parse().ok()?;
        let minutes: u32 = minutes.parse().ok()?;
        let seconds: u32 = seconds.parse().ok()?;
        if minutes > 59 || seconds > 59 {
            return None;
        }
        Some(Self::from_hms(hours, minutes, seconds))
    }

    pub fn total_seconds(self) -> u32 {
        self.seconds
    }
}

impl fmt::Display for GtfsTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:02}:{:02}:{:02}",
            self.seconds / 3600,
            (self.seconds % 3600) / 60,
            self.seconds % 60
        )
    }
}

/// Parse a `YYYYMMDD` service date.
pub fn parse_gtfs_date(raw: &str) -> Option<NaiveDate> {
    if raw.len() != 8 || !raw.bytes().all(|byte| byte.is_ascii_digit()) {
        return None;
    }
    NaiveDate::parse_from_str(raw, DATE_FORMAT).ok()
}

pub fn format_gtfs_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}
