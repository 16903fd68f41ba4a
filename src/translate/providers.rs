use async_trait::async_trait;
use reqwest::{Client, header};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::instrument;

use super::{TranslateError, TranslationProvider};

pub const GOOGLE_ENDPOINT: &str = "https://translation.googleapis.com/language/translate/v2";
pub const DEEPL_ENDPOINT: &str = "https://api-free.deepl.com/v2/translate";

const SOURCE_LANG: &str = "ko";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

fn provider_client() -> Result<Client, TranslateError> {
    Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .build()
        .map_err(|e| TranslateError::Provider(e.to_string()))
}

/// Google Cloud Translation v2.
#[derive(Debug, Clone)]
pub struct GoogleTranslator {
    client: Client,
    api_key: String,
    endpoint: String,
}

#[derive(Serialize)]
struct GoogleRequest<'a> {
    q: &'a str,
    source: &'a str,
    target: &'a str,
    format: &'a str,
}

#[derive(Deserialize)]
struct GoogleResponse {
    data: GoogleData,
}

#[derive(Deserialize)]
struct GoogleData {
    translations: Vec<GoogleTranslation>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GoogleTranslation {
    translated_text: String,
}

impl GoogleTranslator {
    pub fn new(api_key: impl Into<String>) -> Result<Self, TranslateError> {
        Ok(Self {
            client: provider_client()?,
            api_key: api_key.into(),
            endpoint: GOOGLE_ENDPOINT.to_string(),
        })
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

#[async_trait]
impl TranslationProvider for GoogleTranslator {
    fn name(&self) -> &'static str {
        "google"
    }

    #[instrument(skip_all, fields(provider = "google", lang = %target))]
    async fn translate(&self, text: &str, target: &str) -> Result<String, TranslateError> {
        let response = self
            .client
            .post(&self.endpoint)
            .query(&[("key", self.api_key.as_str())])
            .json(&GoogleRequest {
                q: text,
                source: SOURCE_LANG,
                target,
                format: "text",
            })
            .send()
            .await
            .map_err(|e| TranslateError::Provider(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(TranslateError::Provider(format!("google returned {status}")));
        }

        let body: GoogleResponse = response
            .json()
            .await
            .map_err(|e| TranslateError::Provider(e.to_string()))?;
        body.data
            .translations
            .into_iter()
            .next()
            .map(|t| t.translated_text)
            .ok_or_else(|| TranslateError::Provider("google returned no translations".into()))
    }
}

/// DeepL REST API (free or pro endpoint).
#[derive(Debug, Clone)]
pub struct DeepLTranslator {
    client: Client,
    api_key: String,
    endpoint: String,
}

#[derive(Deserialize)]
struct DeepLResponse {
    translations: Vec<DeepLTranslation>,
}

#[derive(Deserialize)]
struct DeepLTranslation {
    text: String,
}

impl DeepLTranslator {
    pub fn new(api_key: impl Into<String>) -> Result<Self, TranslateError> {
        Ok(Self {
            client: provider_client()?,
            api_key: api_key.into(),
            endpoint: DEEPL_ENDPOINT.to_string(),
        })
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

fn deepl_target(lang: &str) -> String {
    match lang {
        "en" => "EN-US".to_string(),
        other => other.to_ascii_uppercase(),
    }
}

#[async_trait]
impl TranslationProvider for DeepLTranslator {
    fn name(&self) -> &'static str {
        "deepl"
    }

    #[instrument(skip_all, fields(provider = "deepl", lang = %target))]
    async fn translate(&self, text: &str, target: &str) -> Result<String, TranslateError> {
        let target_lang = deepl_target(target);
        let response = self
            .client
            .post(&self.endpoint)
            .header(
                header::AUTHORIZATION,
                format!("DeepL-Auth-Key {}", self.api_key),
            )
            .form(&[
                ("text", text),
                ("source_lang", "KO"),
                ("target_lang", target_lang.as_str()),
            ])
            .send()
            .await
            .map_err(|e| TranslateError::Provider(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(TranslateError::Provider(format!("deepl returned {status}")));
        }

        let body: DeepLResponse = response
            .json()
            .await
            .map_err(|e| TranslateError::Provider(e.to_string()))?;
        body.translations
            .into_iter()
            .next()
            .map(|t| t.text)
            .ok_or_else(|| TranslateError::Provider("deepl returned no translations".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{body_partial_json, body_string_contains, header, method, query_param},
    };

    #[tokio::test]
    async fn google_posts_korean_source_text() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(query_param("key", "g-key"))
            .and(body_partial_json(json!({"q": "비자 안내", "source": "ko", "target": "en"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": {"translations": [{"translatedText": "Visa guide"}]}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let google = GoogleTranslator::new("g-key")
            .unwrap()
            .with_endpoint(server.uri());
        assert_eq!(google.translate("비자 안내", "en").await.unwrap(), "Visa guide");
    }

    #[tokio::test]
    async fn deepl_sends_auth_header_and_uppercase_target() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(header("authorization", "DeepL-Auth-Key d-key"))
            .and(body_string_contains("target_lang=VI"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "translations": [{"detected_source_language": "KO", "text": "Hướng dẫn"}]
            })))
            .mount(&server)
            .await;

        let deepl = DeepLTranslator::new("d-key")
            .unwrap()
            .with_endpoint(server.uri());
        assert_eq!(deepl.translate("안내", "vi").await.unwrap(), "Hướng dẫn");
    }

    #[tokio::test]
    async fn provider_error_status_is_surfaced() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;

        let google = GoogleTranslator::new("bad")
            .unwrap()
            .with_endpoint(server.uri());
        let err = google.translate("안내", "en").await.unwrap_err();
        assert!(matches!(err, TranslateError::Provider(msg) if msg.contains("403")));
    }
}
