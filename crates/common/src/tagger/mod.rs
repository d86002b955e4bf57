//! Entity tagger abstraction
//!
//! Wraps a legal-domain token-classification model behind a trait:
//! text in, candidate spans with model confidence out. The extraction
//! pipeline treats this capability as optional at runtime; when it is
//! unavailable the pipeline degrades to lexical-only extraction.

use crate::config::TaggerConfig;
use crate::errors::{AppError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// A candidate span produced by the entity model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaggedSpan {
    /// Raw span text as produced by the model (may carry tokenizer artifacts)
    pub text: String,

    /// Model confidence (0.0 - 1.0)
    pub score: f32,

    /// Character offset of the span in the input
    pub start: usize,
}

/// Trait for entity span extraction
#[async_trait]
pub trait EntityTagger: Send + Sync {
    /// Tag candidate legal-domain spans in the text
    async fn tag(&self, text: &str) -> Result<Vec<TaggedSpan>>;

    /// Get the model name
    fn model_name(&self) -> &str;
}

/// HTTP tagger against a token-classification inference endpoint
pub struct HttpTagger {
    client: reqwest::Client,
    base_url: String,
    min_confidence: f32,
}

#[derive(Serialize)]
struct TagRequest<'a> {
    inputs: &'a str,
}

#[derive(Deserialize)]
struct TagRow {
    word: String,
    score: f32,
    start: usize,
}

impl HttpTagger {
    /// Create a new HTTP tagger from configuration
    pub fn new(config: &TaggerConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AppError::Internal {
                message: format!("Failed to create HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            base_url: config
                .api_base
                .clone()
                .unwrap_or_else(|| "http://localhost:8092".to_string()),
            min_confidence: config.min_confidence,
        })
    }
}

#[async_trait]
impl EntityTagger for HttpTagger {
    async fn tag(&self, text: &str) -> Result<Vec<TaggedSpan>> {
        let url = format!("{}/ner", self.base_url);

        let response = self
            .client
            .post(&url)
            .json(&TagRequest { inputs: text })
            .send()
            .await
            .map_err(|e| AppError::TaggerError {
                message: format!("Request failed: {}", e),
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::TaggerError {
                message: format!("API error {}: {}", status, body),
            });
        }

        let rows: Vec<TagRow> = response.json().await.map_err(|e| AppError::TaggerError {
            message: format!("Failed to parse response: {}", e),
        })?;

        Ok(rows
            .into_iter()
            .filter(|r| r.score >= self.min_confidence)
            .map(|r| TaggedSpan {
                text: r.word,
                score: r.score,
                start: r.start,
            })
            .collect())
    }

    fn model_name(&self) -> &str {
        "legal-bert"
    }
}

/// Keyword tagger for tests and offline development: tags occurrences of a
/// fixed phrase list with a constant confidence.
pub struct KeywordTagger {
    phrases: Vec<String>,
    score: f32,
}

impl KeywordTagger {
    pub fn new(phrases: Vec<String>, score: f32) -> Self {
        Self { phrases, score }
    }
}

impl Default for KeywordTagger {
    fn default() -> Self {
        Self::new(
            [
                "personal data",
                "data protection",
                "consent",
                "organisation",
                "access request",
                "performance appraisals",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            0.9,
        )
    }
}

#[async_trait]
impl EntityTagger for KeywordTagger {
    async fn tag(&self, text: &str) -> Result<Vec<TaggedSpan>> {
        let lowered = text.to_lowercase();
        let mut spans = Vec::new();
        for phrase in &self.phrases {
            if let Some(start) = lowered.find(phrase.as_str()) {
                spans.push(TaggedSpan {
                    text: phrase.clone(),
                    score: self.score,
                    start,
                });
            }
        }
        spans.sort_by_key(|s| s.start);
        Ok(spans)
    }

    fn model_name(&self) -> &str {
        "keyword-mock"
    }
}

/// A tagger that always fails; exercises the degradation path in tests
pub struct UnavailableTagger;

#[async_trait]
impl EntityTagger for UnavailableTagger {
    async fn tag(&self, _text: &str) -> Result<Vec<TaggedSpan>> {
        Err(AppError::TaggerError {
            message: "tagger offline".to_string(),
        })
    }

    fn model_name(&self) -> &str {
        "unavailable"
    }
}

/// Create a tagger based on configuration
pub fn create_tagger(config: &TaggerConfig) -> Result<Arc<dyn EntityTagger>> {
    match config.provider.as_str() {
        "http" => Ok(Arc::new(HttpTagger::new(config)?)),
        "mock" => Ok(Arc::new(KeywordTagger::default())),
        other => {
            tracing::warn!(provider = other, "Unknown tagger provider, using mock");
            Ok(Arc::new(KeywordTagger::default()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_keyword_tagger_finds_phrases() {
        let tagger = KeywordTagger::default();
        let spans = tagger
            .tag("An employee asks for a copy of all personal data held about her")
            .await
            .unwrap();

        assert!(spans.iter().any(|s| s.text == "personal data"));
        assert!(spans.iter().all(|s| s.score >= 0.6));
    }

    #[tokio::test]
    async fn test_unavailable_tagger_errors() {
        let tagger = UnavailableTagger;
        let err = tagger.tag("anything").await.unwrap_err();
        assert!(matches!(err, AppError::TaggerError { .. }));
    }
}
