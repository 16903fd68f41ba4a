#![no_main]

use libfuzzer_sys::fuzz_target;
use url::Url;

use policyscan::config::{FieldLocators, SiteDescriptor};
use policyscan::extractor::{ListPage, StrategyRegistry, extract_detail};

fuzz_target!(|data: &[u8]| {
    let html = String::from_utf8_lossy(data).to_string();
    let url = Url::parse("https://www.example.go.kr/board/list.do").unwrap();

    let site = SiteDescriptor {
        id: "eps".to_string(),
        name: "fuzz".to_string(),
        url: url.to_string(),
        enabled: true,
        category: "employment".to_string(),
        locators: FieldLocators {
            list: Some("table tr".to_string()),
            title: Some("td a".to_string()),
            date: Some("td.date".to_string()),
            link: Some("td a@href".to_string()),
            ..Default::default()
        },
    };

    // Neither list nor detail extraction may panic on arbitrary markup
    let _ = StrategyRegistry::with_builtin().extract(&ListPage::new(url.clone(), html.clone()), &site);
    let _ = extract_detail(&html, &url, &site.locators);
});
