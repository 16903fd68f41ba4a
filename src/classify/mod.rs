//! Field classifiers: category, target visa, status and dates.
//!
//! All classifiers are pure functions of their input text and the injected
//! keyword tables. Status depends on the current date, which callers pass in.

pub mod dates;

pub use dates::{parse_date, parse_dates, today_kst};

use chrono::NaiveDate;

use crate::config::{KeywordDictionaries, KeywordTable};
use crate::entities::{PolicyCandidate, PolicyStatus, Targets};

/// Days-remaining window (inclusive) in which an open policy is `closing`.
pub const CLOSING_WINDOW_DAYS: i64 = 7;

const CLOSED_TERMS: [&str; 2] = ["마감", "종료"];
const UPCOMING_TERMS: [&str; 2] = ["예정", "곧"];
const OPEN_TERMS: [&str; 2] = ["접수중", "모집중"];

#[derive(Debug, Clone, Default)]
pub struct Classifier {
    categories: KeywordTable,
    visas: KeywordTable,
}

impl Classifier {
    pub fn new(categories: KeywordTable, visas: KeywordTable) -> Self {
        Self { categories, visas }
    }

    pub fn from_dictionaries(dicts: &KeywordDictionaries) -> Self {
        Self::new(dicts.categories.clone(), dicts.visas.clone())
    }

    /// First category with a keyword in `title + summary`, else `hint`.
    pub fn category(&self, title: &str, summary: &str, hint: &str) -> String {
        let text = format!("{title} {summary}");
        self.categories
            .first_match(&text)
            .unwrap_or(hint)
            .to_string()
    }

    /// Every visa code whose keywords appear in `text`, else [`Targets::All`].
    pub fn visas(&self, text: &str) -> Targets {
        Targets::from(
            self.visas
                .all_matches(text)
                .map(str::to_string)
                .collect::<Vec<_>>(),
        )
    }

    /// Fill in category, target visa and status on a list-page skeleton.
    pub fn enrich(&self, candidate: &mut PolicyCandidate, hint: &str, today: NaiveDate) {
        candidate.category = self.category(&candidate.title, &candidate.summary, hint);
        let text = format!("{} {}", candidate.title, candidate.summary);
        candidate.target_visa = self.visas(&text);
        candidate.status = status(&text, candidate.end_date, today);
    }
}

/// Status from the end date if one is known, else from keywords in `text`.
pub fn status(text: &str, end_date: Option<NaiveDate>, today: NaiveDate) -> PolicyStatus {
    if let Some(end) = end_date {
        let days_remaining = (end - today).num_days();
        if days_remaining < 0 {
            return PolicyStatus::Closed;
        }
        if days_remaining <= CLOSING_WINDOW_DAYS {
            return PolicyStatus::Closing;
        }
    }

    let has_any = |terms: &[&str]| terms.iter().any(|term| text.contains(term));
    if has_any(&CLOSED_TERMS) {
        PolicyStatus::Closed
    } else if has_any(&UPCOMING_TERMS) {
        PolicyStatus::Upcoming
    } else if has_any(&OPEN_TERMS) {
        PolicyStatus::Open
    } else {
        PolicyStatus::Open
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::KeywordDictionaries;
    use chrono::Duration;

    fn classifier() -> Classifier {
        Classifier::from_dictionaries(&KeywordDictionaries::load(None).unwrap())
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 16).unwrap()
    }

    #[test]
    fn status_boundaries_around_end_date() {
        let status_in = |days: i64| status("", Some(today() + Duration::days(days)), today());
        assert_eq!(status_in(0), PolicyStatus::Closing);
        assert_eq!(status_in(7), PolicyStatus::Closing);
        assert_eq!(status_in(8), PolicyStatus::Open);
        assert_eq!(status_in(-1), PolicyStatus::Closed);
    }

    #[test]
    fn status_falls_back_to_keywords() {
        assert_eq!(status("접수 마감 안내", None, today()), PolicyStatus::Closed);
        assert_eq!(status("모집 예정 공고", None, today()), PolicyStatus::Upcoming);
        assert_eq!(status("참여기업 모집중", None, today()), PolicyStatus::Open);
        assert_eq!(status("사업 공고", None, today()), PolicyStatus::Open);
        // A distant end date does not override keyword hints.
        let far = Some(today() + Duration::days(30));
        assert_eq!(status("설명회 예정", far, today()), PolicyStatus::Upcoming);
    }

    #[test]
    fn category_prefers_keywords_over_hint() {
        let c = classifier();
        assert_eq!(c.category("2026년 예비창업패키지 모집", "", "sme"), "startup");
        assert_eq!(c.category("공지사항", "", "employment"), "employment");
    }

    #[test]
    fn visas_collects_every_match_or_all() {
        let c = classifier();
        let targets = c.visas("E-9 비전문취업 및 H-2 방문취업 외국인 대상");
        assert!(targets.contains("E-9"));
        assert!(targets.contains("H-2"));
        assert!(!targets.is_all());
        assert!(c.visas("일반 공고").is_all());
    }

    #[test]
    fn enrich_fills_classification_fields() {
        let c = classifier();
        let mut candidate =
            PolicyCandidate::skeleton("eps", "eps-1", "E-9 근로자 고용 지원 모집중", "https://x");
        candidate.end_date = Some(today() + Duration::days(3));
        c.enrich(&mut candidate, "employment", today());
        assert_eq!(candidate.status, PolicyStatus::Closing);
        assert!(candidate.target_visa.contains("E-9"));
        assert!(!candidate.category.is_empty());
    }
}
