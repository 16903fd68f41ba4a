use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::ConfigError;

const DEFAULT_KEYWORDS: &str = include_str!("../../config/keywords.json");

/// One label and the substrings that select it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeywordEntry {
    pub label: String,
    pub keywords: Vec<String>,
}

/// Ordered label dictionary. Order matters: classifiers that pick a single
/// label take the first entry with a hit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KeywordTable(pub Vec<KeywordEntry>);

impl KeywordTable {
    pub fn entries(&self) -> &[KeywordEntry] {
        &self.0
    }

    /// First label with any keyword contained in `text`.
    pub fn first_match(&self, text: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|entry| entry.keywords.iter().any(|kw| text.contains(kw.as_str())))
            .map(|entry| entry.label.as_str())
    }

    /// Every label with any keyword contained in `text`, in table order.
    pub fn all_matches<'a>(&'a self, text: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.0
            .iter()
            .filter(move |entry| entry.keywords.iter().any(|kw| text.contains(kw.as_str())))
            .map(|entry| entry.label.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreditKeywords {
    pub required: Vec<String>,
    pub not_required: Vec<String>,
    #[serde(default)]
    pub category_tendency: BTreeMap<String, f64>,
    #[serde(default = "default_tendency")]
    pub default_tendency: f64,
}

fn default_tendency() -> f64 {
    0.3
}

/// Category, visa and credit dictionaries injected into the classifiers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeywordDictionaries {
    pub categories: KeywordTable,
    pub visas: KeywordTable,
    pub credit: CreditKeywords,
}

impl KeywordDictionaries {
    /// Load from `path`, or the embedded defaults when `None`.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let (raw, what) = match path {
            Some(path) => (
                fs::read_to_string(path).map_err(|source| ConfigError::Io {
                    path: path.to_path_buf(),
                    source,
                })?,
                path.display().to_string(),
            ),
            None => (DEFAULT_KEYWORDS.to_string(), "embedded keywords.json".to_string()),
        };
        let dictionaries: Self =
            serde_json::from_str(&raw).map_err(|source| ConfigError::Parse { what, source })?;
        dictionaries.validate()?;
        Ok(dictionaries)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let in_range = |score: f64| (0.0..=1.0).contains(&score);
        if !in_range(self.credit.default_tendency) {
            return Err(ConfigError::Keywords(format!(
                "default_tendency {} outside [0, 1]",
                self.credit.default_tendency
            )));
        }
        if let Some((category, score)) = self
            .credit
            .category_tendency
            .iter()
            .find(|(_, score)| !in_range(**score))
        {
            return Err(ConfigError::Keywords(format!(
                "tendency for '{category}' is {score}, outside [0, 1]"
            )));
        }
        for table in [&self.categories, &self.visas] {
            if let Some(entry) = table.entries().iter().find(|e| e.keywords.is_empty()) {
                return Err(ConfigError::Keywords(format!(
                    "label '{}' has no keywords",
                    entry.label
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedded_dictionaries_load() {
        let dicts = KeywordDictionaries::load(None).unwrap();
        assert_eq!(dicts.categories.entries().len(), 15);
        assert_eq!(dicts.visas.entries().len(), 9);
        assert_eq!(dicts.credit.category_tendency.get("business"), Some(&0.7));
        assert_eq!(dicts.credit.category_tendency.get("visa"), Some(&0.1));
        assert!(dicts.credit.required.iter().any(|k| k == "신용보증서"));
    }

    #[test]
    fn first_match_respects_table_order() {
        let table = KeywordTable(vec![
            KeywordEntry {
                label: "startup".into(),
                keywords: vec!["창업".into()],
            },
            KeywordEntry {
                label: "youth".into(),
                keywords: vec!["청년".into()],
            },
        ]);
        assert_eq!(table.first_match("청년 창업 지원"), Some("startup"));
        assert_eq!(
            table.all_matches("청년 창업 지원").collect::<Vec<_>>(),
            ["startup", "youth"]
        );
        assert_eq!(table.first_match("주거 지원"), None);
    }

    #[test]
    fn out_of_range_tendency_is_rejected() {
        let dir = std::env::temp_dir().join(format!("kw-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("keywords.json");
        std::fs::write(
            &path,
            r#"{"categories":[],"visas":[],"credit":{"required":[],"not_required":[],
               "category_tendency":{"business":1.5}}}"#,
        )
        .unwrap();
        let err = KeywordDictionaries::load(Some(&path)).unwrap_err();
        assert!(matches!(err, ConfigError::Keywords(_)));
        std::fs::remove_dir_all(dir).ok();
    }
}
