//! Small helpers over `scraper` shared by the list and detail extractors.

use scraper::{ElementRef, Selector};
use url::Url;

use super::ExtractError;

/// Subtrees whose text never belongs to the visible content.
const SKIPPED_TAGS: [&str; 6] = ["script", "style", "iframe", "form", "noscript", "template"];

/// Elements that separate words when their text is flattened.
const BLOCK_TAGS: [&str; 22] = [
    "address", "article", "br", "dd", "div", "dl", "dt", "footer", "h1", "h2", "h3", "h4", "h5",
    "h6", "header", "li", "p", "section", "table", "td", "th", "tr",
];

pub fn parse_selector(raw: &str) -> Result<Selector, ExtractError> {
    Selector::parse(raw).map_err(|e| ExtractError::InvalidSelector {
        selector: raw.to_string(),
        reason: e.to_string(),
    })
}

/// Visible text of `element` with whitespace collapsed.
pub fn element_text(element: ElementRef<'_>) -> String {
    let mut raw = String::new();
    push_text(element, &mut raw);
    collapse_whitespace(&raw)
}

fn push_text(element: ElementRef<'_>, out: &mut String) {
    for child in element.children() {
        if let Some(child_element) = ElementRef::wrap(child) {
            let name = child_element.value().name();
            if SKIPPED_TAGS.contains(&name) {
                continue;
            }
            let block = BLOCK_TAGS.contains(&name);
            if block {
                out.push(' ');
            }
            push_text(child_element, out);
            if block {
                out.push(' ');
            }
        } else if let Some(text) = child.value().as_text() {
            out.push_str(text);
        }
    }
}

pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Truncate to at most `max` characters (not bytes).
pub fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}

/// Nearest ancestor of `element` matching `selector`.
pub fn closest<'a>(element: ElementRef<'a>, selector: &Selector) -> Option<ElementRef<'a>> {
    element
        .ancestors()
        .filter_map(ElementRef::wrap)
        .find(|ancestor| selector.matches(ancestor))
}

/// Absolute http(s) URL for `href`, or `None` for script pseudo-links,
/// fragments and anything unparseable.
pub fn resolve_link(base: &Url, href: &str) -> Option<Url> {
    let href = href.trim();
    if href.is_empty() || href.starts_with('#') || href.to_ascii_lowercase().starts_with("javascript:")
    {
        return None;
    }
    let url = base.join(href).ok()?;
    matches!(url.scheme(), "http" | "https").then_some(url)
}

/// Hex MD5 digest used for stable fallback identifiers.
pub fn digest(input: &str) -> String {
    format!("{:x}", md5::compute(input.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use scraper::Html;

    #[test]
    fn text_skips_scripts_and_separates_cells() {
        let html = Html::parse_fragment(
            "<table><tr><td>공고</td><td>안내<script>var x = 1;</script></td></tr></table>",
        );
        let table = html.select(&parse_selector("table").unwrap()).next().unwrap();
        assert_eq!(element_text(table), "공고 안내");
    }

    #[test]
    fn inline_markup_does_not_split_words() {
        let html = Html::parse_fragment("<p>신<b>용</b>보증</p>");
        let p = html.select(&parse_selector("p").unwrap()).next().unwrap();
        assert_eq!(element_text(p), "신용보증");
    }

    #[test]
    fn resolve_link_handles_relative_and_pseudo_links() {
        let base = Url::parse("https://www.eps.go.kr/eo/list.eo").unwrap();
        assert_eq!(
            resolve_link(&base, "/eo/view.eo?id=7").unwrap().as_str(),
            "https://www.eps.go.kr/eo/view.eo?id=7"
        );
        assert_eq!(
            resolve_link(&base, "view.eo?id=8").unwrap().as_str(),
            "https://www.eps.go.kr/eo/view.eo?id=8"
        );
        assert!(resolve_link(&base, "javascript:void(0)").is_none());
        assert!(resolve_link(&base, "#top").is_none());
        assert!(resolve_link(&base, "mailto:a@b.kr").is_none());
    }

    #[test]
    fn closest_finds_enclosing_row() {
        let html = Html::parse_fragment("<table><tr class=\"row\"><td><a href=\"#\">x</a></td></tr></table>");
        let a = html.select(&parse_selector("a").unwrap()).next().unwrap();
        let row = closest(a, &parse_selector("tr").unwrap()).unwrap();
        assert_eq!(row.value().attr("class"), Some("row"));
    }

    #[test]
    fn truncate_counts_characters() {
        assert_eq!(truncate_chars("가나다라", 2), "가나");
        assert_eq!(truncate_chars("ab", 5), "ab");
    }

    #[test]
    fn invalid_selector_is_an_error() {
        assert!(matches!(
            parse_selector("td:::bad"),
            Err(ExtractError::InvalidSelector { .. })
        ));
    }
}
