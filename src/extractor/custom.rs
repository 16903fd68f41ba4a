//! Site-specific list extractors for markup the generic rules cannot read.

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use url::Url;

use super::dom::{closest, digest, element_text, resolve_link};
use super::generic::is_navigation_label;
use super::{ExtractError, ExtractionStrategy, ListPage};
use crate::classify::parse_date;
use crate::config::SiteDescriptor;
use crate::entities::PolicyCandidate;

/// Custom extractors share the stricter title floor used on these boards.
const MIN_CUSTOM_TITLE_CHARS: usize = 5;

static ROW: Lazy<Selector> =
    Lazy::new(|| Selector::parse("tr, li, .list-item").unwrap());
static ROW_DATE: Lazy<Selector> =
    Lazy::new(|| Selector::parse("td:nth-child(4), .date, span.date").unwrap());

fn title_of(anchor: ElementRef<'_>) -> Option<String> {
    let title = element_text(anchor);
    (title.chars().count() >= MIN_CUSTOM_TITLE_CHARS).then_some(title)
}

fn row_date(anchor: ElementRef<'_>, date: &Selector, today: NaiveDate) -> Option<NaiveDate> {
    let row = closest(anchor, &ROW)?;
    row.select(date)
        .map(element_text)
        .find_map(|text| parse_date(&text, today))
}

fn base_url(site: &SiteDescriptor, page: &ListPage) -> Url {
    site.base_url().unwrap_or_else(|| page.url.clone())
}

// ---------------------------------------------------------------------------
// bizinfo: announcement links carry a `pblancId` query parameter.

static BIZINFO_LINK: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"a[href*="pblancId"]"#).unwrap());
static BIZINFO_DATE: Lazy<Selector> =
    Lazy::new(|| Selector::parse("td:last-child, .date, span.date").unwrap());

#[derive(Debug, Clone, Copy, Default)]
pub struct BizinfoExtractor;

impl ExtractionStrategy for BizinfoExtractor {
    fn name(&self) -> &'static str {
        "bizinfo"
    }

    fn extract(
        &self,
        page: &ListPage,
        site: &SiteDescriptor,
    ) -> Result<Vec<PolicyCandidate>, ExtractError> {
        let document = Html::parse_document(&page.html);
        let base = base_url(site, page);

        let candidates = document
            .select(&BIZINFO_LINK)
            .filter_map(|anchor| {
                let title = title_of(anchor)?;
                let url = resolve_link(&base, anchor.value().attr("href")?)?;
                let id = url
                    .query_pairs()
                    .find(|(key, _)| key == "pblancId")
                    .map(|(_, value)| value.into_owned())
                    .filter(|value| !value.is_empty())
                    .unwrap_or_else(|| digest(url.as_str()));

                let mut candidate = PolicyCandidate::skeleton(
                    &site.id,
                    format!("bizinfo-{id}"),
                    title,
                    url.to_string(),
                );
                candidate.organization = "중소벤처기업부(기업마당)".to_string();
                candidate.start_date = row_date(anchor, &BIZINFO_DATE, page.today);
                Some(candidate)
            })
            .collect();
        Ok(candidates)
    }
}

// ---------------------------------------------------------------------------
// hikorea: anchors are `javascript:void(0)` with the post id in an inline
// call such as `fn_goDetail('2863', 'BS10', 'NT_...')`.

static ANY_ANCHOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("a").unwrap());
static HIKOREA_CALL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"['"](\d+)['"]\s*,\s*['"]([^'"]+)['"]"#).unwrap());

const HIKOREA_DETAIL_PATH: &str = "BoardNtcDetailR.pt";

#[derive(Debug, Clone, Copy, Default)]
pub struct HikoreaExtractor;

impl HikoreaExtractor {
    fn detail_link(anchor: ElementRef<'_>, base: &Url) -> Option<(String, Url)> {
        if let Some(caps) = anchor
            .value()
            .attr("onclick")
            .and_then(|onclick| HIKOREA_CALL.captures(onclick))
        {
            let (seq, board) = (&caps[1], &caps[2]);
            let mut url = base.join(HIKOREA_DETAIL_PATH).ok()?;
            url.query_pairs_mut()
                .append_pair("BBS_SEQ", seq)
                .append_pair("BBS_GB_CD", board);
            return Some((seq.to_string(), url));
        }

        // Some board pages link the detail view directly.
        let url = resolve_link(base, anchor.value().attr("href")?)?;
        if !url.path().ends_with(HIKOREA_DETAIL_PATH) {
            return None;
        }
        let seq = url
            .query_pairs()
            .find(|(key, _)| key == "BBS_SEQ")
            .map(|(_, value)| value.into_owned())?;
        Some((seq, url))
    }
}

impl ExtractionStrategy for HikoreaExtractor {
    fn name(&self) -> &'static str {
        "hikorea"
    }

    fn extract(
        &self,
        page: &ListPage,
        site: &SiteDescriptor,
    ) -> Result<Vec<PolicyCandidate>, ExtractError> {
        let document = Html::parse_document(&page.html);
        // Detail paths are relative to the board list page.
        let base = Url::parse(&site.url).unwrap_or_else(|_| page.url.clone());

        let candidates = document
            .select(&ANY_ANCHOR)
            .filter_map(|anchor| {
                let title = title_of(anchor)?;
                if is_navigation_label(&title)
                    || title.starts_with("페이스북")
                    || title.contains("다운로드")
                {
                    return None;
                }
                let (seq, url) = Self::detail_link(anchor, &base)?;

                let mut candidate = PolicyCandidate::skeleton(
                    &site.id,
                    format!("hikorea-{seq}"),
                    title,
                    url.to_string(),
                );
                candidate.organization = "출입국외국인정책본부".to_string();
                candidate.start_date = row_date(anchor, &ROW_DATE, page.today);
                Some(candidate)
            })
            .collect();
        Ok(candidates)
    }
}

// ---------------------------------------------------------------------------
// moel: press releases and notices link straight to their view pages.

static MOEL_LINK: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"a[href*="enewsView"], a[href*="noticeView"]"#).unwrap());

#[derive(Debug, Clone, Copy, Default)]
pub struct MoelExtractor;

impl ExtractionStrategy for MoelExtractor {
    fn name(&self) -> &'static str {
        "moel"
    }

    fn extract(
        &self,
        page: &ListPage,
        site: &SiteDescriptor,
    ) -> Result<Vec<PolicyCandidate>, ExtractError> {
        let document = Html::parse_document(&page.html);
        let base = base_url(site, page);

        let candidates = document
            .select(&MOEL_LINK)
            .filter_map(|anchor| {
                let title = title_of(anchor)?;
                let url = resolve_link(&base, anchor.value().attr("href")?)?;
                let mut candidate = PolicyCandidate::skeleton(
                    &site.id,
                    format!("moel-{}", digest(url.as_str())),
                    title,
                    url.to_string(),
                );
                candidate.organization = "고용노동부".to_string();
                candidate.start_date = row_date(anchor, &ROW_DATE, page.today);
                Some(candidate)
            })
            .collect();
        Ok(candidates)
    }
}

// ---------------------------------------------------------------------------
// k_startup: rows hold a `go_view(176286)` anchor and a "마감일자" deadline.

static KSTARTUP_ROW: Lazy<Selector> =
    Lazy::new(|| Selector::parse("li, tr").unwrap());
static KSTARTUP_LINK: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"a[href*="go_view"]"#).unwrap());
static KSTARTUP_ID: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"go_view\(\s*'?(\d+)'?\s*\)").unwrap());
static KSTARTUP_DEADLINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"마감일자\s*(\d{4}-\d{2}-\d{2})").unwrap());
static KSTARTUP_ORG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"창업진흥원|중소벤처기업부|[가-힣]+센터").unwrap());

#[derive(Debug, Clone, Copy, Default)]
pub struct KStartupExtractor;

impl KStartupExtractor {
    fn detail_url(site: &SiteDescriptor, page: &ListPage, id: &str) -> Url {
        let mut url = Url::parse(&site.url).unwrap_or_else(|_| page.url.clone());
        url.set_query(None);
        url.query_pairs_mut()
            .append_pair("schM", "view")
            .append_pair("pbancSn", id)
            .append_pair("page", "1")
            .append_pair("schStr", "regist")
            .append_pair("pbancEndYn", "N");
        url
    }
}

impl ExtractionStrategy for KStartupExtractor {
    fn name(&self) -> &'static str {
        "k_startup"
    }

    fn extract(
        &self,
        page: &ListPage,
        site: &SiteDescriptor,
    ) -> Result<Vec<PolicyCandidate>, ExtractError> {
        let document = Html::parse_document(&page.html);

        let candidates = document
            .select(&KSTARTUP_ROW)
            .filter_map(|row| {
                let anchor = row.select(&KSTARTUP_LINK).next()?;
                let title = title_of(anchor)?;
                let id = KSTARTUP_ID
                    .captures(anchor.value().attr("href")?)?
                    .get(1)?
                    .as_str()
                    .to_string();

                let row_text = element_text(row);
                let mut candidate = PolicyCandidate::skeleton(
                    &site.id,
                    format!("kstartup-{id}"),
                    title,
                    Self::detail_url(site, page, &id).to_string(),
                );
                candidate.end_date = KSTARTUP_DEADLINE
                    .captures(&row_text)
                    .and_then(|caps| NaiveDate::parse_from_str(&caps[1], "%Y-%m-%d").ok());
                candidate.organization = KSTARTUP_ORG
                    .find(&row_text)
                    .map(|m| m.as_str().to_string())
                    .unwrap_or_else(|| "K-스타트업".to_string());
                Some(candidate)
            })
            .collect();
        Ok(candidates)
    }
}
