//! Credit-report requirement detection.
//!
//! A keyword classifier with an explicit confidence level. Every verdict can
//! be traced to the matched keywords or to the category tendency that
//! produced it.

use serde::{Deserialize, Serialize};

use crate::config::CreditKeywords;

/// Category tendency at or above which a keyword-less text is estimated to
/// require a credit report.
pub const TENDENCY_THRESHOLD: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    High,
    Medium,
    Low,
    Estimated,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreditAnalysis {
    pub is_required: bool,
    pub confidence: Confidence,
    pub matched_keywords: Vec<String>,
    pub reason: String,
}

#[derive(Debug, Clone)]
pub struct CreditDetector {
    keywords: CreditKeywords,
    // Lowercased copies used for matching; `keywords` keeps display forms.
    required_lower: Vec<String>,
    not_required_lower: Vec<String>,
}

impl CreditDetector {
    pub fn new(keywords: CreditKeywords) -> Self {
        let lower = |list: &[String]| list.iter().map(|k| k.to_lowercase()).collect();
        Self {
            required_lower: lower(&keywords.required),
            not_required_lower: lower(&keywords.not_required),
            keywords,
        }
    }

    pub fn tendency(&self, category: &str) -> f64 {
        self.keywords
            .category_tendency
            .get(category)
            .copied()
            .unwrap_or(self.keywords.default_tendency)
    }

    /// Keyword analysis of `title` and `text`, refined by the category
    /// tendency when no keyword matched.
    pub fn analyze(&self, text: &str, title: &str, category: &str) -> CreditAnalysis {
        let analysis = self.detect(text, title);
        if analysis.confidence != Confidence::Low {
            return analysis;
        }

        let tendency = self.tendency(category);
        if tendency >= TENDENCY_THRESHOLD {
            CreditAnalysis {
                is_required: true,
                confidence: Confidence::Estimated,
                reason: format!("estimated from category '{category}' (tendency {tendency:.1})"),
                ..analysis
            }
        } else {
            analysis
        }
    }

    /// Keyword pass only.
    pub fn detect(&self, text: &str, title: &str) -> CreditAnalysis {
        let full_text = format!("{title} {text}").to_lowercase();

        if let Some(idx) = self
            .not_required_lower
            .iter()
            .position(|kw| full_text.contains(kw.as_str()))
        {
            return CreditAnalysis {
                is_required: false,
                confidence: Confidence::High,
                matched_keywords: vec![self.keywords.not_required[idx].clone()],
                reason: "explicit exemption keyword found".to_string(),
            };
        }

        let matched_keywords: Vec<String> = self
            .required_lower
            .iter()
            .zip(&self.keywords.required)
            .filter(|(lower, _)| full_text.contains(lower.as_str()))
            .map(|(_, original)| original.clone())
            .collect();

        match matched_keywords.len() {
            0 => CreditAnalysis {
                is_required: false,
                confidence: Confidence::Low,
                matched_keywords,
                reason: "no credit keywords found".to_string(),
            },
            1 => CreditAnalysis {
                is_required: true,
                confidence: Confidence::Medium,
                matched_keywords,
                reason: "1 credit keyword found".to_string(),
            },
            n => CreditAnalysis {
                is_required: true,
                confidence: Confidence::High,
                matched_keywords,
                reason: format!("{n} credit keywords found"),
            },
        }
    }
}
