use proptest::prelude::*;
use url::Url;

use super::test_support::site;
use super::*;
use crate::config::FieldLocators;

fn locators() -> FieldLocators {
    FieldLocators {
        list: Some("table tr".to_string()),
        title: Some("td a".to_string()),
        date: Some("td.date".to_string()),
        link: Some("td a@href".to_string()),
        ..Default::default()
    }
}

proptest! {
    #[test]
    fn strategies_never_panic(
        html in ".*",
        id in prop::sample::select(vec!["eps", "bizinfo", "hikorea", "moel", "k_startup"]),
    ) {
        let registry = StrategyRegistry::with_builtin();
        let page = ListPage::new(Url::parse("https://www.example.go.kr/list.do").unwrap(), html);
        let site = site(id, "https://www.example.go.kr/list.do", locators());
        if let Ok(candidates) = registry.extract(&page, &site) {
            for candidate in candidates {
                prop_assert!(candidate.has_usable_title());
                prop_assert_eq!(candidate.site_id.as_str(), id);
            }
        }
    }

    #[test]
    fn table_rows_never_panic(
        cells in prop::collection::vec(("[가-힣a-z0-9 ]{0,40}", "[a-z/?=&.0-9:#]{0,30}", "[0-9.\\-/ ~]{0,25}"), 0..8),
    ) {
        let rows: String = cells
            .iter()
            .map(|(title, href, date)| {
                format!(r#"<tr><td><a href="{href}">{title}</a></td><td class="date">{date}</td></tr>"#)
            })
            .collect();
        let html = format!("<table>{rows}</table>");
        let page = ListPage::new(Url::parse("https://www.example.go.kr/board/list.do").unwrap(), html);
        let site = site("eps", "https://www.example.go.kr/board/list.do", locators());
        let candidates = GenericExtractor.extract(&page, &site).unwrap();
        prop_assert!(candidates.len() <= cells.len());
        for candidate in candidates {
            prop_assert!(candidate.has_usable_title());
            let url = Url::parse(&candidate.original_url).unwrap();
            prop_assert!(matches!(url.scheme(), "http" | "https"));
        }
    }

    #[test]
    fn detail_extraction_never_panics(html in ".*") {
        let url = Url::parse("https://www.example.go.kr/view.do?id=1").unwrap();
        let detail = extract_detail(&html, &url, &FieldLocators::default()).unwrap();
        prop_assert!(detail.content.chars().count() <= detail::MAX_CONTENT_CHARS);
    }
}
