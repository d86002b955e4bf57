//! Term extraction
//!
//! Converts a raw query into a ranked, deduplicated set of key terms by
//! combining three signal sources over the same input:
//! - the entity tagger model (candidate spans with confidence)
//! - deterministic lexical matching against curated word lists
//! - normalization and synonym collapsing
//!
//! Tagger failure degrades gracefully to lexical-only extraction; the
//! degradation is logged, counted, and reported on the result.

pub mod lexicon;

use lexforge_common::config::RetrievalConfig;
use lexforge_common::metrics::{self, StageTimer};
use lexforge_common::tagger::EntityTagger;
use regex_lite::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// A key term with its relevance score
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractedTerm {
    /// Normalized term text
    pub text: String,

    /// Relevance score (weighted sum of signal bonuses)
    pub score: f32,
}

/// Result of an extraction pass
#[derive(Debug, Clone)]
pub struct Extraction {
    /// Ranked terms, highest score first, capped at the configured maximum
    pub terms: Vec<ExtractedTerm>,

    /// True when the entity tagger failed and only lexical signals ran
    pub degraded: bool,
}

impl Extraction {
    /// Term texts in rank order
    pub fn term_texts(&self) -> Vec<String> {
        self.terms.iter().map(|t| t.text.clone()).collect()
    }
}

/// Candidate term accumulated from one or more signal sources
#[derive(Debug)]
struct Candidate {
    text: String,
    position: usize,
    lexical: bool,
    tagged: bool,
}

/// Extractor combining the entity model with lexical rules
pub struct TermExtractor {
    tagger: Arc<dyn EntityTagger>,
    config: RetrievalConfig,
}

impl TermExtractor {
    /// Create a new extractor
    pub fn new(tagger: Arc<dyn EntityTagger>, config: RetrievalConfig) -> Self {
        Self { tagger, config }
    }

    /// Extract ranked key terms from a raw query
    pub async fn extract(&self, query: &str) -> Extraction {
        let timer = StageTimer::start();
        let normalized = query.trim().to_lowercase();

        if normalized.is_empty() {
            return Extraction {
                terms: vec![],
                degraded: false,
            };
        }

        let mut candidates: HashMap<String, Candidate> = HashMap::new();

        // Signal 1: lexical phrase lists
        for phrase in lexicon::phrase_lists() {
            if let Some(position) = whole_word_find(&normalized, phrase) {
                merge_candidate(&mut candidates, phrase.to_string(), position, true, false);
            }
        }

        // Signal 1b: multi-word data-type patterns
        for pattern in lexicon::DATA_TYPE_PATTERNS {
            if let Ok(re) = Regex::new(pattern) {
                if let Some(m) = re.find(&normalized) {
                    let text = m.as_str().trim().to_string();
                    if text.split_whitespace().count() <= 4 {
                        merge_candidate(&mut candidates, text, m.start(), true, false);
                    }
                }
            }
        }

        // Signal 1c: implied statutory concepts
        for (pattern, term) in lexicon::IMPLIED_TERM_PATTERNS {
            if let Ok(re) = Regex::new(pattern) {
                if let Some(m) = re.find(&normalized) {
                    merge_candidate(&mut candidates, term.to_string(), m.start(), true, false);
                }
            }
        }

        // Signal 2: entity tagger, degrading to lexical-only on failure
        let degraded = match self.tagger.tag(query).await {
            Ok(spans) => {
                for span in spans {
                    if let Some(text) = clean_span_text(&span.text) {
                        merge_candidate(&mut candidates, text, span.start, false, true);
                    }
                }
                false
            }
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    model = self.tagger.model_name(),
                    "Entity tagger unavailable, degrading to lexical-only extraction"
                );
                true
            }
        };

        // Signal 3: synonym collapsing, then scoring
        let collapsed = collapse_synonyms(candidates);

        let mut scored: Vec<(ExtractedTerm, usize)> = collapsed
            .into_iter()
            .filter_map(|c| {
                let score = self.score_candidate(&c, &normalized);
                (score > 0.0).then(|| {
                    (
                        ExtractedTerm {
                            text: c.text,
                            score,
                        },
                        c.position,
                    )
                })
            })
            .collect();

        // Highest score first; equal scores keep earlier query position
        scored.sort_by(|(a, pa), (b, pb)| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(pa.cmp(pb))
        });
        scored.truncate(self.config.max_terms);

        let terms: Vec<ExtractedTerm> = scored.into_iter().map(|(t, _)| t).collect();

        metrics::record_extraction(timer.elapsed_secs(), terms.len(), degraded);
        tracing::debug!(
            terms = terms.len(),
            degraded,
            "Term extraction complete"
        );

        Extraction { terms, degraded }
    }

    /// Weighted sum over signal sources and curated bonuses
    fn score_candidate(&self, candidate: &Candidate, normalized_query: &str) -> f32 {
        let mut score = 0.0;

        let occurrences = whole_word_count(normalized_query, &candidate.text);
        score += occurrences as f32 * self.config.occurrence_weight;

        if candidate.lexical {
            score += self.config.lexical_bonus;
        }
        if candidate.tagged {
            score += self.config.tagger_bonus;
        }
        if lexicon::HIGH_PRIORITY_TERMS.contains(&candidate.text.as_str()) {
            score += self.config.priority_bonus;
        }
        if lexicon::DATA_INDICATORS
            .iter()
            .any(|ind| candidate.text.contains(ind))
        {
            score += self.config.data_indicator_bonus;
        }
        if candidate.text.split_whitespace().count() > 1 {
            score += self.config.specificity_bonus;
        }

        score
    }
}

fn merge_candidate(
    candidates: &mut HashMap<String, Candidate>,
    text: String,
    position: usize,
    lexical: bool,
    tagged: bool,
) {
    let entry = candidates.entry(text.clone()).or_insert(Candidate {
        text,
        position,
        lexical: false,
        tagged: false,
    });
    entry.position = entry.position.min(position);
    entry.lexical |= lexical;
    entry.tagged |= tagged;
}

/// Collapse synonym-group variants to one canonical term per group,
/// keeping the earliest position and the union of sources
fn collapse_synonyms(candidates: HashMap<String, Candidate>) -> Vec<Candidate> {
    let mut ordered: Vec<Candidate> = candidates.into_values().collect();
    ordered.sort_by_key(|c| c.position);

    let mut kept: Vec<Candidate> = Vec::with_capacity(ordered.len());
    let mut groups_used: HashMap<usize, usize> = HashMap::new();

    for mut candidate in ordered {
        match lexicon::synonym_group(&candidate.text) {
            Some((group, canonical)) => {
                if let Some(&kept_idx) = groups_used.get(&group) {
                    let existing = &mut kept[kept_idx];
                    existing.lexical |= candidate.lexical;
                    existing.tagged |= candidate.tagged;
                } else {
                    candidate.text = canonical.to_string();
                    groups_used.insert(group, kept.len());
                    kept.push(candidate);
                }
            }
            None => kept.push(candidate),
        }
    }

    kept
}

/// Clean a model span: strip tokenizer artifacts, reject junk
fn clean_span_text(raw: &str) -> Option<String> {
    let text: String = raw
        .chars()
        .filter(|c| !matches!(c, '#' | '[' | ']'))
        .collect();
    let text = text.trim().to_lowercase();

    if text.len() < 2 {
        return None;
    }
    if text.chars().all(|c| !c.is_alphabetic()) {
        return None;
    }
    if lexicon::is_stop_word(&text) {
        return None;
    }

    Some(text)
}

fn whole_word_find(haystack: &str, needle: &str) -> Option<usize> {
    let pattern = format!(r"\b{}\b", regex_lite::escape(needle));
    Regex::new(&pattern).ok()?.find(haystack).map(|m| m.start())
}

fn whole_word_count(haystack: &str, needle: &str) -> usize {
    let pattern = format!(r"\b{}\b", regex_lite::escape(needle));
    match Regex::new(&pattern) {
        Ok(re) => re.find_iter(haystack).count(),
        Err(_) => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lexforge_common::tagger::{KeywordTagger, UnavailableTagger};

    fn extractor(tagger: Arc<dyn EntityTagger>) -> TermExtractor {
        TermExtractor::new(tagger, RetrievalConfig::default())
    }

    const ACCESS_QUERY: &str = "An employee asks her former employer for a copy of \
        all personal data held about her, including performance appraisals.";

    #[tokio::test]
    async fn test_access_scenario_terms() {
        let extraction = extractor(Arc::new(KeywordTagger::default()))
            .extract(ACCESS_QUERY)
            .await;

        let texts = extraction.term_texts();
        assert!(texts.iter().any(|t| t == "employee"));
        assert!(texts.iter().any(|t| t == "personal data"));
        assert!(texts.iter().any(|t| t == "access"));
        assert!(texts.iter().any(|t| t == "performance appraisals"));
        assert!(!extraction.degraded);
    }

    #[tokio::test]
    async fn test_caps_and_ordering() {
        let extraction = extractor(Arc::new(KeywordTagger::default()))
            .extract(ACCESS_QUERY)
            .await;

        assert!(extraction.terms.len() <= 15);
        for term in &extraction.terms {
            assert!(!term.text.trim().is_empty());
        }
        for pair in extraction.terms.windows(2) {
            assert!(pair[0].score >= pair[1].score);
        }
    }

    #[tokio::test]
    async fn test_no_legal_content_yields_empty() {
        let extraction = extractor(Arc::new(KeywordTagger::default()))
            .extract("What is the weather today?")
            .await;
        assert!(extraction.terms.is_empty());
    }

    #[tokio::test]
    async fn test_degrades_to_lexical_only() {
        let extraction = extractor(Arc::new(UnavailableTagger))
            .extract(ACCESS_QUERY)
            .await;

        assert!(extraction.degraded);
        // Lexical layer still finds statute vocabulary
        assert!(extraction.term_texts().iter().any(|t| t == "personal data"));
    }

    #[tokio::test]
    async fn test_deduplication_by_normalized_form() {
        let extraction = extractor(Arc::new(KeywordTagger::default()))
            .extract("Consent consent CONSENT was never obtained.")
            .await;

        let consent_count = extraction
            .term_texts()
            .iter()
            .filter(|t| t.as_str() == "consent")
            .count();
        assert_eq!(consent_count, 1);
    }

    #[tokio::test]
    async fn test_synonym_collapse() {
        let extraction = extractor(Arc::new(KeywordTagger::default()))
            .extract("The organisation, a large company, leaked records.")
            .await;

        let texts = extraction.term_texts();
        // organisation and company collapse to one canonical term
        assert!(texts.iter().any(|t| t == "company"));
        assert!(!texts.iter().any(|t| t == "organisation"));
    }

    #[tokio::test]
    async fn test_empty_query() {
        let extraction = extractor(Arc::new(KeywordTagger::default()))
            .extract("   ")
            .await;
        assert!(extraction.terms.is_empty());
        assert!(!extraction.degraded);
    }
}
