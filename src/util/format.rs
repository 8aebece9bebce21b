// Copyright (C) 2026  Caprica Software Limited
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

/// Formats a duration in seconds into a human-readable `M:SS` string.
///
/// Fractions of a second are truncated, negative and non-finite inputs are
/// shown as zero. Minutes are not wrapped into hours.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(format_time(125.0), "2:05");
/// assert_eq!(format_time(3600.0), "60:00");
/// ```
pub(crate) fn format_time(seconds: f64) -> String {
    let total_seconds = if seconds.is_finite() && seconds > 0.0 {
        seconds as u64
    } else {
        0
    };

    let mins = total_seconds / 60;
    let secs = total_seconds % 60;
    format!("{}:{:02}", mins, secs)
}

/// Playback progress as a percentage, `0` when the duration is unknown.
pub(crate) fn progress_percent(time: f64, duration: f64) -> f64 {
    if duration > 0.0 {
        time / duration * 100.0
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_minutes_and_padded_seconds() {
        assert_eq!(format_time(125.0), "2:05");
        assert_eq!(format_time(0.0), "0:00");
        assert_eq!(format_time(59.9), "0:59");
        assert_eq!(format_time(3600.0), "60:00");
    }

    #[test]
    fn odd_inputs_format_as_zero() {
        assert_eq!(format_time(-4.0), "0:00");
        assert_eq!(format_time(f64::NAN), "0:00");
    }

    #[test]
    fn progress_is_zero_without_duration() {
        assert_eq!(progress_percent(42.0, 0.0), 0.0);
        assert_eq!(progress_percent(30.0, 120.0), 25.0);
    }
}
