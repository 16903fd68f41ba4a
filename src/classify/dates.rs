use chrono::{Datelike, FixedOffset, NaiveDate, Utc};
use once_cell::sync::Lazy;
use regex::Regex;

static FULL_DATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d{4})\s*[-./]\s*(\d{1,2})\s*[-./]\s*(\d{1,2})").unwrap());

static SHORT_DATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d{1,2})\s*[-./]\s*(\d{1,2})").unwrap());

const KST_OFFSET_SECS: i32 = 9 * 3600;

/// Current calendar date in Korea, which is what every target site uses.
pub fn today_kst() -> NaiveDate {
    let now = Utc::now();
    FixedOffset::east_opt(KST_OFFSET_SECS)
        .map(|kst| now.with_timezone(&kst).date_naive())
        .unwrap_or_else(|| now.date_naive())
}

/// Parse the first date in `text`.
///
/// Accepts `YYYY-MM-DD`, `YYYY.MM.DD` and `YYYY/MM/DD`. A bare `MM-DD` is
/// taken to be in `today`'s year. Anything else, including out-of-range
/// months or days, yields `None`.
pub fn parse_date(text: &str, today: NaiveDate) -> Option<NaiveDate> {
    if let Some(caps) = FULL_DATE.captures(text) {
        return ymd(caps[1].parse().ok()?, &caps[2], &caps[3]);
    }
    let caps = SHORT_DATE.captures(text)?;
    ymd(today.year(), &caps[1], &caps[2])
}

/// Every full `YYYY-MM-DD`-like date in `text`, in order of appearance.
/// Used for period cells such as `2026.03.02 ~ 2026.03.31`.
pub fn parse_dates(text: &str) -> Vec<NaiveDate> {
    FULL_DATE
        .captures_iter(text)
        .filter_map(|caps| ymd(caps[1].parse().ok()?, &caps[2], &caps[3]))
        .collect()
}

fn ymd(year: i32, month: &str, day: &str) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year, month.parse().ok()?, day.parse().ok()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 16).unwrap()
    }

    #[test]
    fn parses_full_dates_with_any_separator() {
        let expected = NaiveDate::from_ymd_opt(2026, 3, 2);
        assert_eq!(parse_date("2026-03-02", today()), expected);
        assert_eq!(parse_date("등록일 2026.3.2", today()), expected);
        assert_eq!(parse_date("2026/03/02 10:00", today()), expected);
        assert_eq!(parse_date("2026. 03. 02.", today()), expected);
    }

    #[test]
    fn short_form_assumes_current_year() {
        assert_eq!(
            parse_date("11-05", today()),
            NaiveDate::from_ymd_opt(2026, 11, 5)
        );
        assert_eq!(
            parse_date("(3.15)", today()),
            NaiveDate::from_ymd_opt(2026, 3, 15)
        );
    }

    #[test]
    fn unparseable_input_is_none() {
        assert_eq!(parse_date("", today()), None);
        assert_eq!(parse_date("상시모집", today()), None);
        assert_eq!(parse_date("2026-13-40", today()), None);
    }

    #[test]
    fn period_cells_yield_both_ends() {
        let dates = parse_dates("2026.03.02 ~ 2026.03.31");
        assert_eq!(
            dates,
            vec![
                NaiveDate::from_ymd_opt(2026, 3, 2).unwrap(),
                NaiveDate::from_ymd_opt(2026, 3, 31).unwrap(),
            ]
        );
    }
}

#[cfg(all(test, feature = "fuzz"))]
mod fuzz {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn parse_date_never_panics(text in ".*") {
            let today = NaiveDate::from_ymd_opt(2026, 10, 16).unwrap();
            let _ = parse_date(&text, today);
            let _ = parse_dates(&text);
        }

        #[test]
        fn formatted_dates_parse_back(y in 2000i32..2100, m in 1u32..=12, d in 1u32..=28, sep in "[-./]") {
            let text = format!("공고일 {y}{sep}{m:02}{sep}{d:02}");
            let today = NaiveDate::from_ymd_opt(2026, 10, 16).unwrap();
            prop_assert_eq!(parse_date(&text, today), NaiveDate::from_ymd_opt(y, m, d));
        }
    }
}
