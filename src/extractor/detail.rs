use std::collections::HashSet;

use scraper::Html;
use url::Url;

use super::ExtractError;
use super::dom::{collapse_whitespace, element_text, parse_selector, resolve_link, truncate_chars};
use super::reader;
use crate::config::FieldLocators;
use crate::entities::Attachment;

pub const DEFAULT_CONTENT_SELECTOR: &str = ".view_cont, .board_view, .content, #content, .post-content";
pub const DEFAULT_ATTACHMENT_SELECTOR: &str = r#".file_down, .file_list a, .attach_file a, a[href*="download"], a[href*="fileDown"], a[href*="FileDown"]"#;

/// Upper bound on stored body text, in characters.
pub const MAX_CONTENT_CHARS: usize = 5_000;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DetailContent {
    pub content: String,
    pub attachments: Vec<Attachment>,
}

/// Body text and attachments of a detail page.
///
/// Uses the site's content and attachment locators, or the defaults above.
/// When no content locator matches, a readability pass recovers the text.
pub fn extract_detail(
    html: &str,
    page_url: &Url,
    locators: &FieldLocators,
) -> Result<DetailContent, ExtractError> {
    let content_selector = parse_selector(
        locators
            .content
            .as_deref()
            .unwrap_or(DEFAULT_CONTENT_SELECTOR),
    )?;
    let attachment_selector = parse_selector(
        locators
            .attachments
            .as_deref()
            .unwrap_or(DEFAULT_ATTACHMENT_SELECTOR),
    )?;

    let document = Html::parse_document(html);

    let matched: Vec<String> = document
        .select(&content_selector)
        .map(element_text)
        .filter(|text| !text.is_empty())
        .collect();
    let mut content = collapse_whitespace(&matched.join(" "));
    if content.is_empty() {
        content = reader::main_text(html, page_url).unwrap_or_default();
    }

    let mut seen = HashSet::new();
    let attachments = document
        .select(&attachment_selector)
        .filter_map(|el| {
            let url = resolve_link(page_url, el.value().attr("href")?)?;
            if !seen.insert(url.clone()) {
                return None;
            }
            let name = element_text(el);
            let name = if name.is_empty() {
                file_name(&url)
            } else {
                name
            };
            Some(Attachment {
                name,
                url: url.to_string(),
            })
        })
        .collect();

    Ok(DetailContent {
        content: truncate_chars(&content, MAX_CONTENT_CHARS),
        attachments,
    })
}

fn file_name(url: &Url) -> String {
    url.path_segments()
        .and_then(|mut segments| segments.next_back())
        .filter(|segment| !segment.is_empty())
        .unwrap_or("attachment")
        .to_string()
}
