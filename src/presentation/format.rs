//! Display helpers for durations, counts and dates.

use time::{OffsetDateTime, macros::format_description};

fn split_minutes(seconds: i64) -> (i64, i64) {
    let seconds = seconds.max(0);
    (seconds / 60, seconds % 60)
}

/// `"03 min 05 sec"`.
pub fn duration_long(seconds: i64) -> String {
    let (min, sec) = split_minutes(seconds);
    format!("{min:02} min {sec:02} sec")
}

/// `"03:05"`.
pub fn duration_short(seconds: i64) -> String {
    let (min, sec) = split_minutes(seconds);
    format!("{min:02}:{sec:02}")
}

/// Group digits in threes: `1234567` becomes `"1,234,567"`.
pub fn count(value: i64) -> String {
    let digits = value.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if value < 0 {
        out.push('-');
    }
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

pub fn date(value: OffsetDateTime) -> String {
    value
        .format(format_description!("[year]-[month]-[day]"))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use super::*;

    #[test]
    fn durations_pad_both_fields() {
        assert_eq!(duration_long(185), "03 min 05 sec");
        assert_eq!(duration_short(185), "03:05");
        assert_eq!(duration_short(0), "00:00");
        assert_eq!(duration_short(59), "00:59");
        assert_eq!(duration_short(60), "01:00");
    }

    #[test]
    fn long_totals_keep_every_minute_digit() {
        assert_eq!(duration_long(6_000), "100 min 00 sec");
    }

    #[test]
    fn negative_durations_render_as_zero() {
        assert_eq!(duration_short(-5), "00:00");
    }

    #[test]
    fn counts_are_grouped() {
        assert_eq!(count(0), "0");
        assert_eq!(count(999), "999");
        assert_eq!(count(1_000), "1,000");
        assert_eq!(count(1_234_567), "1,234,567");
        assert_eq!(count(-4_200), "-4,200");
    }

    #[test]
    fn dates_use_calendar_day() {
        assert_eq!(date(datetime!(2021-03-04 23:59:00 UTC)), "2021-03-04");
    }
}
