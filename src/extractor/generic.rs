use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tracing::debug;
use url::Url;

use super::dom::{digest, element_text, parse_selector, resolve_link};
use super::{ExtractError, ExtractionStrategy, ListPage};
use crate::classify::dates::parse_dates;
use crate::classify::parse_date;
use crate::config::SiteDescriptor;
use crate::entities::{MIN_TITLE_CHARS, PolicyCandidate};

/// Link targets that look like a board post rather than navigation.
static DETAIL_LINK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"View\.do|Detail|detail|view\.do|read\.do|BoardRead|boardRead|selectOne|View\?")
        .unwrap()
});

/// Pagination labels: page numbers, arrows and 처음/이전/다음/마지막.
static PAGINATION_LABEL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9<>|\s처음이전다음마지막]+$").unwrap());

static ANCHOR: Lazy<Selector> = Lazy::new(|| Selector::parse("a[href]").unwrap());

pub const FALLBACK_MIN_CHARS: usize = 5;
pub const FALLBACK_MAX_CHARS: usize = 200;

/// Menu and footer labels that are never announcements.
pub const NAVIGATION_LABELS: &[&str] = &[
    "공지사항",
    "보도자료",
    "자료실",
    "민원서식",
    "뉴스레터",
    "홈",
    "뉴스 · 공지",
    "뉴스·공지",
    "개인정보처리방침",
    "웹접근성정책",
    "원격접속",
    "관련사이트",
    "지역/지방정부",
    "찾아오시는 길",
    "이용약관",
    "저작권보호정책",
    "이메일무단수집거부",
    "뷰어다운로드",
    "공공데이터이용정책",
    "민원행정서비스헌장",
    "스마트폰 어플",
    "사이트맵",
    "이전 페이지",
    "다음 페이지",
    "목록으로",
];

pub fn is_navigation_label(text: &str) -> bool {
    let text = text.trim();
    NAVIGATION_LABELS.contains(&text) || PAGINATION_LABEL.is_match(text)
}

/// Selector-driven extractor with a link-pattern fallback pass.
#[derive(Debug, Clone, Copy, Default)]
pub struct GenericExtractor;

impl ExtractionStrategy for GenericExtractor {
    fn name(&self) -> &'static str {
        "generic"
    }

    fn extract(
        &self,
        page: &ListPage,
        site: &SiteDescriptor,
    ) -> Result<Vec<PolicyCandidate>, ExtractError> {
        let document = Html::parse_document(&page.html);
        let base = site.base_url().unwrap_or_else(|| page.url.clone());

        let rows = extract_rows(&document, page, site, &base)?;
        if !rows.is_empty() {
            return Ok(rows);
        }

        debug!(site = %site.id, "row locators matched nothing, scanning links");
        Ok(extract_fallback(&document, page, site, &base))
    }
}

struct RowSelectors {
    list: Selector,
    title: Selector,
    link: Option<(Selector, String)>,
    date: Option<Selector>,
    organization: Option<Selector>,
}

impl RowSelectors {
    fn from_site(site: &SiteDescriptor) -> Result<Option<Self>, ExtractError> {
        let locators = &site.locators;
        let (Some(list), Some(title)) = (&locators.list, &locators.title) else {
            return Ok(None);
        };
        let link = match locators.link_locator() {
            Some(link) => Some((parse_selector(&link.selector)?, link.attr)),
            None => None,
        };
        Ok(Some(Self {
            list: parse_selector(list)?,
            title: parse_selector(title)?,
            link,
            date: locators.date.as_deref().map(parse_selector).transpose()?,
            organization: locators
                .organization_selector
                .as_deref()
                .map(parse_selector)
                .transpose()?,
        }))
    }
}

fn extract_rows(
    document: &Html,
    page: &ListPage,
    site: &SiteDescriptor,
    base: &Url,
) -> Result<Vec<PolicyCandidate>, ExtractError> {
    let Some(selectors) = RowSelectors::from_site(site)? else {
        return Ok(Vec::new());
    };

    let mut candidates = Vec::new();
    for row in document.select(&selectors.list) {
        let Some(title_el) = row.select(&selectors.title).next() else {
            continue;
        };
        let title = element_text(title_el);
        if title.chars().count() < MIN_TITLE_CHARS {
            continue;
        }

        let href = match &selectors.link {
            Some((selector, attr)) => row
                .select(selector)
                .next()
                .and_then(|el| el.value().attr(attr)),
            None => title_el.value().attr("href"),
        };
        let link = href.and_then(|href| resolve_link(base, href));

        let mut candidate = skeleton(site, &title, link.as_ref(), page);
        if let Some(date_selector) = &selectors.date {
            apply_dates(&mut candidate, row, date_selector, page);
        }
        candidate.organization = match &selectors.organization {
            Some(selector) => row
                .select(selector)
                .next()
                .map(element_text)
                .filter(|org| !org.is_empty()),
            None => None,
        }
        .or_else(|| site.locators.organization.clone())
        .unwrap_or_else(|| site.name.clone());

        candidates.push(candidate);
    }
    Ok(candidates)
}

fn apply_dates(
    candidate: &mut PolicyCandidate,
    row: ElementRef<'_>,
    selector: &Selector,
    page: &ListPage,
) {
    let Some(cell) = row.select(selector).next() else {
        return;
    };
    let text = element_text(cell);
    // A period cell carries both ends; a single date is the posting date.
    match parse_dates(&text).as_slice() {
        [start, end, ..] => {
            candidate.start_date = Some(*start);
            candidate.end_date = Some(*end);
        }
        _ => candidate.start_date = parse_date(&text, page.today),
    }
}

fn extract_fallback(
    document: &Html,
    page: &ListPage,
    site: &SiteDescriptor,
    base: &Url,
) -> Vec<PolicyCandidate> {
    let mut seen = HashSet::new();
    let mut candidates = Vec::new();

    for anchor in document.select(&ANCHOR) {
        let Some(href) = anchor.value().attr("href") else {
            continue;
        };
        if !DETAIL_LINK.is_match(href) {
            continue;
        }
        let title = element_text(anchor);
        let len = title.chars().count();
        if !(FALLBACK_MIN_CHARS..=FALLBACK_MAX_CHARS).contains(&len) || is_navigation_label(&title)
        {
            continue;
        }
        let Some(link) = resolve_link(base, href) else {
            continue;
        };
        if !seen.insert(link.clone()) {
            continue;
        }

        let mut candidate = skeleton(site, &title, Some(&link), page);
        candidate.organization = site.name.clone();
        candidates.push(candidate);
    }
    candidates
}

fn skeleton(
    site: &SiteDescriptor,
    title: &str,
    link: Option<&Url>,
    page: &ListPage,
) -> PolicyCandidate {
    let (original_url, external_id) = match link {
        Some(url) => (url.to_string(), format!("{}-{}", site.id, digest(url.as_str()))),
        None => (
            page.url.to_string(),
            format!("{}-{}", site.id, digest(title)),
        ),
    };
    PolicyCandidate::skeleton(&site.id, external_id, title, original_url)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FieldLocators;
    use crate::extractor::test_support::site;
    use chrono::NaiveDate;

    fn table_locators() -> FieldLocators {
        FieldLocators {
            list: Some(".board_list tbody tr".into()),
            title: Some("td.left a".into()),
            date: Some("td:nth-child(4)".into()),
            link: Some("td.left a@href".into()),
            base_url: Some("https://www.eps.go.kr".into()),
            organization: Some("한국산업인력공단".into()),
            ..FieldLocators::default()
        }
    }

    fn page(html: &str) -> ListPage {
        ListPage::new(Url::parse("https://www.eps.go.kr/eo/list.eo").unwrap(), html)
            .with_today(NaiveDate::from_ymd_opt(2026, 10, 16).unwrap())
    }

    const TABLE: &str = r#"
        <table class="board_list"><tbody>
          <tr><td>3</td><td class="left"><a href="/eo/view.eo?id=3">2026년 고용허가제 신규 인력 배정 안내</a></td>
              <td>관리자</td><td>2026.10.02</td></tr>
          <tr><td>2</td><td class="left"><a href="view.eo?id=2">ab</a></td><td>관리자</td><td>2026.09.30</td></tr>
          <tr><td>1</td><td class="left"><a href="https://other.go.kr/v?id=1">외국인 근로자 교육 일정</a></td>
              <td>관리자</td><td>2026.03.02 ~ 2026.03.31</td></tr>
        </tbody></table>"#;

    #[test]
    fn rows_resolve_links_and_skip_short_titles() {
        let site = site("eps", "https://www.eps.go.kr/eo/list.eo", table_locators());
        let candidates = GenericExtractor.extract(&page(TABLE), &site).unwrap();

        assert_eq!(candidates.len(), 2);
        let first = &candidates[0];
        assert_eq!(first.title, "2026년 고용허가제 신규 인력 배정 안내");
        assert_eq!(first.original_url, "https://www.eps.go.kr/eo/view.eo?id=3");
        assert_eq!(first.start_date, NaiveDate::from_ymd_opt(2026, 10, 2));
        assert_eq!(first.end_date, None);
        assert_eq!(first.organization, "한국산업인력공단");
        assert_eq!(first.summary, first.title);
        assert!(first.external_id.starts_with("eps-"));

        let second = &candidates[1];
        assert_eq!(second.original_url, "https://other.go.kr/v?id=1");
        assert_eq!(second.start_date, NaiveDate::from_ymd_opt(2026, 3, 2));
        assert_eq!(second.end_date, NaiveDate::from_ymd_opt(2026, 3, 31));
    }

    #[test]
    fn external_ids_are_stable_across_runs() {
        let site = site("eps", "https://www.eps.go.kr/eo/list.eo", table_locators());
        let a = GenericExtractor.extract(&page(TABLE), &site).unwrap();
        let b = GenericExtractor.extract(&page(TABLE), &site).unwrap();
        assert_eq!(a[0].external_id, b[0].external_id);
    }

    #[test]
    fn organization_selector_reads_row_cell() {
        let locators = FieldLocators {
            list: Some("table tr".into()),
            title: Some("td.left a".into()),
            link: Some("td.left a@href".into()),
            organization_selector: Some("td:nth-child(3)".into()),
            ..FieldLocators::default()
        };
        let html = r#"<table><tr><td>1</td><td class="left"><a href="/d?id=1">수출바우처 지원사업 공고</a></td>
            <td>중소벤처기업부</td></tr></table>"#;
        let site = site("g4b", "https://www.g4b.go.kr/list.do", locators);
        let candidates = GenericExtractor.extract(&page(html), &site).unwrap();
        assert_eq!(candidates[0].organization, "중소벤처기업부");
        assert_eq!(candidates[0].original_url, "https://www.g4b.go.kr/d?id=1");
    }

    #[test]
    fn fallback_scans_detail_links_when_rows_match_nothing() {
        let html = r#"
            <div class="new-layout">
              <a href="/board/boardView.do?seq=10">외국인 주민 생활 안내 책자 배포</a>
              <a href="/board/boardView.do?seq=10">외국인 주민 생활 안내 책자 배포</a>
              <a href="/board/list.do?page=2">2</a>
              <a href="/board/detail?seq=1">다음</a>
              <a href="/board/BoardRead?seq=9">짧음</a>
              <a href="/about.do">기관 소개 페이지입니다</a>
            </div>"#;
        let site = site("eps", "https://www.eps.go.kr/eo/list.eo", table_locators());
        let candidates = GenericExtractor.extract(&page(html), &site).unwrap();

        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].title, "외국인 주민 생활 안내 책자 배포");
        assert_eq!(
            candidates[0].original_url,
            "https://www.eps.go.kr/board/boardView.do?seq=10"
        );
        assert_eq!(candidates[0].organization, "eps site");
    }

    #[test]
    fn fallback_runs_without_configured_locators() {
        let html = r#"<a href="https://www.nts.go.kr/nts/cm/cntnts/cntntsView.do?mi=1">외국인 근로자 연말정산 안내</a>"#;
        let site = site("nts", "https://www.nts.go.kr/", FieldLocators::default());
        let candidates = GenericExtractor.extract(&page(html), &site).unwrap();
        assert_eq!(candidates.len(), 1);
    }

    #[test]
    fn invalid_locator_is_a_site_level_error() {
        let locators = FieldLocators {
            list: Some("tr[[".into()),
            title: Some("a".into()),
            ..FieldLocators::default()
        };
        let site = site("bad", "https://bad.go.kr/", locators);
        assert!(GenericExtractor.extract(&page("<p></p>"), &site).is_err());
    }

    #[test]
    fn navigation_labels() {
        assert!(is_navigation_label("처음"));
        assert!(is_navigation_label("1 2 3 >"));
        assert!(is_navigation_label("사이트맵"));
        assert!(!is_navigation_label("2026년 외국인 지원 사업"));
    }
}
