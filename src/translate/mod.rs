//! Translation enrichment.
//!
//! A remote provider is tried first; on missing credentials or provider
//! error each text falls back to [`FallbackDictionary`]. A language whose
//! translation still fails gets a copy of the source text, so one language
//! never blocks the others or the save.

pub mod dictionary;
pub mod providers;

pub use dictionary::FallbackDictionary;
pub use providers::{DeepLTranslator, GoogleTranslator};

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::Config;
use crate::entities::{PolicyCandidate, Translation};

#[derive(Debug, Error)]
pub enum TranslateError {
    #[error("translation provider failed: {0}")]
    Provider(String),

    #[error("unsupported target language: {0}")]
    UnsupportedLanguage(String),
}

/// Pluggable text-to-text translation service. Source text is Korean.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TranslationProvider: Send + Sync {
    fn name(&self) -> &'static str;

    async fn translate(&self, text: &str, target: &str) -> Result<String, TranslateError>;
}

#[derive(Clone)]
pub struct TranslationEnricher {
    provider: Option<Arc<dyn TranslationProvider>>,
    dictionary: FallbackDictionary,
    languages: Vec<String>,
}

impl TranslationEnricher {
    pub fn new(provider: Option<Arc<dyn TranslationProvider>>, languages: Vec<String>) -> Self {
        Self {
            provider,
            dictionary: FallbackDictionary,
            languages,
        }
    }

    /// Google if its key is set, else DeepL, else dictionary only.
    pub fn from_config(config: &Config) -> Result<Self, TranslateError> {
        let provider: Option<Arc<dyn TranslationProvider>> =
            if let Some(key) = config.google_translate_api_key() {
                Some(Arc::new(GoogleTranslator::new(key)?))
            } else if let Some(key) = config.deepl_api_key() {
                Some(Arc::new(DeepLTranslator::new(key)?))
            } else {
                None
            };
        Ok(Self::new(provider, config.translation_languages().to_vec()))
    }

    pub fn languages(&self) -> &[String] {
        &self.languages
    }

    pub fn provider_name(&self) -> &'static str {
        self.provider
            .as_ref()
            .map(|p| p.name())
            .unwrap_or("dictionary")
    }

    /// Translate one text, falling back to the dictionary on provider error.
    pub async fn translate(&self, text: &str, lang: &str) -> Result<String, TranslateError> {
        if text.trim().is_empty() {
            return Ok(String::new());
        }

        if let Some(provider) = &self.provider {
            match provider.translate(text, lang).await {
                Ok(translated) => return Ok(translated),
                Err(err) => {
                    warn!(provider = provider.name(), lang, error = %err, "provider failed, using dictionary");
                }
            }
        }

        self.dictionary.translate(text, lang)
    }

    /// Translations of title, summary and content for every configured language.
    pub async fn translate_candidate(
        &self,
        candidate: &PolicyCandidate,
    ) -> BTreeMap<String, Translation> {
        let mut translations = BTreeMap::new();
        for lang in &self.languages {
            let translation = match self.translate_fields(candidate, lang).await {
                Ok(translation) => translation,
                Err(err) => {
                    warn!(
                        site = %candidate.site_id,
                        title = %candidate.title,
                        lang = %lang,
                        error = %err,
                        "translation failed, keeping source text"
                    );
                    Translation {
                        title: candidate.title.clone(),
                        summary: candidate.summary.clone(),
                        content: candidate.content.clone(),
                    }
                }
            };
            translations.insert(lang.clone(), translation);
        }
        debug!(languages = translations.len(), "translations attached");
        translations
    }

    async fn translate_fields(
        &self,
        candidate: &PolicyCandidate,
        lang: &str,
    ) -> Result<Translation, TranslateError> {
        Ok(Translation {
            title: self.translate(&candidate.title, lang).await?,
            summary: self.translate(&candidate.summary, lang).await?,
            content: self.translate(&candidate.content, lang).await?,
        })
    }
}
