//! Spoken/printed representations of time positions.

use crate::core::TimeSec;

/// Formats seconds as `H:MM:SS[.ffffff]`
pub fn to_timecode(seconds: TimeSec) -> String {
    let total_micros = (seconds.max(0.0) * 1_000_000.0).round() as u64;
    let micros = total_micros % 1_000_000;
    let secs = total_micros / 1_000_000;
    let (h, m, s) = (secs / 3600, (secs / 60) % 60, secs % 60);
    if micros == 0 {
        format!("{}:{:02}:{:02}", h, m, s)
    } else {
        format!("{}:{:02}:{:02}.{:06}", h, m, s, micros)
    }
}

/// Human friendly position, e.g. `"2.5 seconds"` or `"3 minutes 5 seconds"`
pub fn show_mark(mark: TimeSec) -> String {
    if mark > 3600.0 {
        return truncate_decimals(&to_timecode(mark), 2);
    }
    if mark > 60.0 {
        let minutes = (mark / 60.0).floor();
        let seconds = truncate_decimals(&(mark - minutes * 60.0).to_string(), 2);
        let minutes_word = if minutes == 1.0 { "minute" } else { "minutes" };
        let seconds_word = if seconds == "1" { "second" } else { "seconds" };
        return format!("{} {} {} {}", minutes, minutes_word, seconds, seconds_word);
    }
    format!("{} seconds", truncate_decimals(&mark.to_string(), 2))
}

/// Cuts the fractional part of a decimal string to `n` digits
fn truncate_decimals(w: &str, n: usize) -> String {
    match w.split_once('.') {
        Some((whole, frac)) => {
            let frac: String = frac.chars().take(n).collect();
            format!("{}.{}", whole, frac)
        }
        None => w.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_timecode() {
        assert_eq!(to_timecode(0.0), "0:00:00");
        assert_eq!(to_timecode(90.5), "0:01:30.500000");
        assert_eq!(to_timecode(3725.0), "1:02:05");
    }

    #[test]
    fn test_show_mark_ranges() {
        assert_eq!(show_mark(2.5), "2.5 seconds");
        assert_eq!(show_mark(1.23456), "1.23 seconds");
        assert_eq!(show_mark(61.0), "1 minute 1 second");
        assert_eq!(show_mark(185.25), "3 minutes 5.25 seconds");
        assert_eq!(show_mark(3725.5), "1:02:05.50");
    }
}
