use chrono::{Duration, NaiveDate};

/// This is the standard way of converting a date to a storage key in sitetime.
pub fn day_key(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Reverse of [day_key]. Anything that isn't exactly `YYYY-MM-DD` is not a day bucket.
pub fn parse_day_key(key: &str) -> Option<NaiveDate> {
    let shaped = key.len() == 10
        && key
            .bytes()
            .enumerate()
            .all(|(i, b)| if i == 4 || i == 7 { b == b'-' } else { b.is_ascii_digit() });
    if !shaped {
        return None;
    }
    NaiveDate::parse_from_str(key, "%Y-%m-%d").ok()
}

pub fn format_duration(v: Duration) -> String {
    if v.num_hours() > 0 {
        format!(
            "{}h{}m{}s",
            v.num_hours(),
            v.num_minutes() % 60,
            v.num_seconds() % 60
        )
    } else if v.num_minutes() > 0 {
        format!("{}m{}s", v.num_minutes() % 60, v.num_seconds() % 60)
    } else {
        format!("{}s", v.num_seconds() % 60)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, NaiveDate};

    use super::{day_key, format_duration, parse_day_key};

    #[test]
    fn test_day_key_is_zero_padded() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 5).unwrap();
        assert_eq!(day_key(date), "2024-03-05");
        assert_eq!(parse_day_key("2024-03-05"), Some(date));
    }

    #[test]
    fn test_parse_day_key_rejects_other_keys() {
        assert_eq!(parse_day_key("whitelist"), None);
        assert_eq!(parse_day_key("2024-3-5"), None);
        assert_eq!(parse_day_key("2024-13-01"), None);
        assert_eq!(parse_day_key("_start_time"), None);
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::seconds(42)), "42s");
        assert_eq!(format_duration(Duration::seconds(75)), "1m15s");
        assert_eq!(format_duration(Duration::seconds(3 * 3600 + 61)), "3h1m1s");
    }
}
