use readability::extractor;
use scraper::{Html, Selector};
use url::Url;

use super::dom::{collapse_whitespace, element_text};

/// Containers tried in order when readability finds nothing usable.
const CONTENT_CONTAINERS: [&str; 9] = [
    "article",
    "main",
    "[role='main']",
    ".content",
    ".post",
    ".article",
    "#content",
    "#main",
    ".entry-content",
];

/// Minimum characters for a container to count as the main body.
const MIN_BODY_CHARS: usize = 100;

/// Main text of a page without a configured content locator.
pub fn main_text(html: &str, url: &Url) -> Option<String> {
    if let Ok(article) = extractor::extract(&mut html.as_bytes(), url) {
        let text = collapse_whitespace(&article.text);
        if !text.is_empty() {
            return Some(text);
        }
    }

    fallback_text(html)
}

fn fallback_text(html: &str) -> Option<String> {
    let document = Html::parse_document(html);

    for raw in CONTENT_CONTAINERS {
        let Ok(selector) = Selector::parse(raw) else {
            continue;
        };
        if let Some(text) = document
            .select(&selector)
            .map(element_text)
            .find(|text| text.chars().count() > MIN_BODY_CHARS)
        {
            return Some(text);
        }
    }

    // Last resort: the whole body
    let body = Selector::parse("body").ok()?;
    document
        .select(&body)
        .next()
        .map(element_text)
        .filter(|text| !text.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fallback_prefers_long_article_container() {
        let body = "외국인 근로자 지원 내용입니다. ".repeat(10);
        let html = format!(
            "<html><body><nav>메뉴</nav><article><script>track()</script><p>{body}</p></article></body></html>"
        );
        let text = fallback_text(&html).unwrap();
        assert!(text.starts_with("외국인 근로자 지원"));
        assert!(!text.contains("track()"));
        assert!(!text.contains("메뉴"));
    }

    #[test]
    fn fallback_uses_body_for_short_pages() {
        let text = fallback_text("<html><body><p>짧은 공지</p></body></html>").unwrap();
        assert_eq!(text, "짧은 공지");
    }
}
