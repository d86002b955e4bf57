//! Analysis orchestration
//!
//! Drives a single query through the pipeline: extract terms, build the
//! layered context, prompt the generative backend under a bounded
//! timeout, parse and validate the structured output, and resolve the
//! terminal status. Every failure is captured into the outcome document;
//! the caller always receives a status.

use crate::citation::CitationKey;
use crate::context::ContextBuilder;
use crate::publish::Publisher;
use crate::terms::TermExtractor;
use lexforge_common::config::GenerationConfig;
use lexforge_common::errors::{AppError, Result};
use lexforge_common::generation::Generator;
use lexforge_common::knowledge::KnowledgeBase;
use lexforge_common::metrics::{self, StageTimer};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Terminal status of an analysis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisStatus {
    /// Validated provisions with reasoning
    Success,
    /// No relevant knowledge-base content; a legitimate terminal state
    NoMatches,
    /// Backend or validation failure; see the error field
    Error,
}

impl AnalysisStatus {
    /// Metric label for this status
    pub fn label(&self) -> &'static str {
        match self {
            AnalysisStatus::Success => "success",
            AnalysisStatus::NoMatches => "no_matches",
            AnalysisStatus::Error => "error",
        }
    }
}

/// The caller-facing analysis document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisOutcome {
    /// Terminal status; always present
    pub status: AnalysisStatus,

    /// The raw query as submitted
    pub query: String,

    /// Ranked key terms driving retrieval
    pub key_terms: Vec<String>,

    /// Flattened legal context handed to the backend
    pub legal_context: String,

    /// Citation key -> reasoning text, in generation order
    pub analysis: serde_json::Map<String, serde_json::Value>,

    /// Machine-readable reason, present only on error
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AnalysisOutcome {
    fn no_matches(query: &str, key_terms: Vec<String>, legal_context: String) -> Self {
        Self {
            status: AnalysisStatus::NoMatches,
            query: query.to_string(),
            key_terms,
            legal_context,
            analysis: serde_json::Map::new(),
            error: None,
        }
    }

    fn error(query: &str, key_terms: Vec<String>, legal_context: String, reason: &str) -> Self {
        Self {
            status: AnalysisStatus::Error,
            query: query.to_string(),
            key_terms,
            legal_context,
            analysis: serde_json::Map::new(),
            error: Some(reason.to_string()),
        }
    }
}

/// Orchestrator for the full query pipeline
pub struct Orchestrator {
    extractor: TermExtractor,
    builder: ContextBuilder,
    generator: Arc<dyn Generator>,
    knowledge: Arc<KnowledgeBase>,
    config: GenerationConfig,
}

impl Orchestrator {
    /// Create a new orchestrator
    pub fn new(
        extractor: TermExtractor,
        builder: ContextBuilder,
        generator: Arc<dyn Generator>,
        knowledge: Arc<KnowledgeBase>,
        config: GenerationConfig,
    ) -> Self {
        Self {
            extractor,
            builder,
            generator,
            knowledge,
            config,
        }
    }

    /// Process a query end to end. Failures are captured into the
    /// outcome; this never returns an error.
    pub async fn analyze(&self, query: &str) -> AnalysisOutcome {
        let timer = StageTimer::start();
        let outcome = self.analyze_inner(query).await;
        metrics::record_query(timer.elapsed_secs(), outcome.status.label());

        tracing::info!(
            status = outcome.status.label(),
            key_terms = outcome.key_terms.len(),
            provisions = outcome.analysis.len(),
            "Analysis complete"
        );
        outcome
    }

    /// Process a query and publish the outcome atomically, returning the
    /// publication sequence number
    pub async fn run(&self, query: &str, publisher: &Publisher) -> Result<u64> {
        let outcome = self.analyze(query).await;
        publisher.publish(&outcome).await
    }

    async fn analyze_inner(&self, query: &str) -> AnalysisOutcome {
        // Stage 1: term extraction
        let extraction = self.extractor.extract(query).await;
        if extraction.terms.is_empty() {
            return AnalysisOutcome::no_matches(query, vec![], String::new());
        }
        let key_terms = extraction.term_texts();

        // Stage 2: layered context build
        let built = match self.builder.build(&extraction.terms, &self.knowledge).await {
            Ok(built) => built,
            Err(e) => {
                tracing::error!(error = %e, "Context build failed");
                return AnalysisOutcome::error(query, key_terms, String::new(), e.code().reason());
            }
        };

        if built.block.is_empty() {
            return AnalysisOutcome::no_matches(query, key_terms, String::new());
        }
        let legal_context = built.block.flatten();

        // Stage 3: bounded generation with validation; one stricter
        // re-prompt after malformed output before surfacing the error
        match self.generate_validated(query, &legal_context).await {
            Ok(analysis) if analysis.is_empty() => {
                AnalysisOutcome::no_matches(query, key_terms, legal_context)
            }
            Ok(analysis) => AnalysisOutcome {
                status: AnalysisStatus::Success,
                query: query.to_string(),
                key_terms,
                legal_context,
                analysis,
                error: None,
            },
            Err(e) => AnalysisOutcome::error(query, key_terms, legal_context, e.code().reason()),
        }
    }

    async fn generate_validated(
        &self,
        query: &str,
        legal_context: &str,
    ) -> Result<serde_json::Map<String, serde_json::Value>> {
        let timeout = Duration::from_secs(self.config.timeout_secs);
        let attempts = 1 + self.config.max_format_retries;
        let mut last_parse_error = String::new();

        for attempt in 0..attempts {
            let strict = attempt > 0;
            if strict {
                metrics::record_generation_retry();
                tracing::warn!(
                    attempt,
                    error = %last_parse_error,
                    "Malformed generation output, re-prompting strictly"
                );
            }
            let prompt = build_prompt(query, legal_context, strict);

            let call_timer = StageTimer::start();
            let raw = match tokio::time::timeout(timeout, self.generator.generate(&prompt)).await {
                Ok(Ok(text)) => {
                    metrics::record_generation(call_timer.elapsed_secs(), true, None);
                    text
                }
                Ok(Err(e)) => {
                    metrics::record_generation(call_timer.elapsed_secs(), false, Some("unavailable"));
                    return Err(e);
                }
                Err(_) => {
                    metrics::record_generation(call_timer.elapsed_secs(), false, Some("timeout"));
                    return Err(AppError::GenerationTimeout {
                        timeout_secs: self.config.timeout_secs,
                    });
                }
            };

            match parse_analysis(&raw) {
                Ok(parsed) => return Ok(filter_keys(parsed)),
                Err(message) => last_parse_error = message,
            }
        }

        Err(AppError::MalformedGeneration {
            message: last_parse_error,
        })
    }
}

/// Construct the generation prompt: scenario, context, format rules, and
/// a worked example. The strict variant prepends a format reminder after
/// a malformed reply.
fn build_prompt(query: &str, legal_context: &str, strict: bool) -> String {
    let mut prompt = String::new();

    if strict {
        prompt.push_str(
            "YOUR PREVIOUS REPLY WAS NOT A VALID JSON OBJECT. Return ONLY a single \
            JSON object, no code fences, no commentary.\n\n",
        );
    }

    prompt.push_str(&format!(
        "You are a Singapore-qualified lawyer specializing in the Personal Data \
        Protection Act (PDPA). Analyze the legal scenario and return a JSON object \
        mapping the most relevant legal provisions to reasoning.\n\n\
        LEGAL SCENARIO TO ANALYZE:\n{query}\n\n\
        RELEVANT PDPA PROVISIONS AND CONTEXT:\n{legal_context}\n\n"
    ));

    prompt.push_str(
        "CRITICAL INSTRUCTIONS:\n\
        1. Analyze the scenario using ONLY the provided PDPA context above\n\
        2. Identify the most relevant legal provisions from the context\n\
        3. MAXIMUM 5 provisions; output fewer if fewer are relevant\n\
        4. Use definitions, schedules, and subsidiary legislation as supporting \
        context inside your reasoning, never as keys\n\n\
        STRICT KEY FORMAT RULES - ONLY THESE FORMATS ARE ACCEPTED:\n\
        FORMAT 1: \"S [number] PDPA\" - e.g. \"S 21(1) PDPA\", \"Ss 21(5) and (7) PDPA\"\n\
        FORMAT 2: \"Reg [number] PDPR\" - e.g. \"Reg 4 PDPR\"\n\
        FORMAT 3: \"para [reference] of [Schedule] PDPA\" - e.g. \"para 1(a) of Fifth Schedule PDPA\"\n\n\
        PROHIBITED: \"Section 21(1) PDPA\", \"Definition: personal data\", \
        \"Fifth Schedule\", \"S 21 of PDPA\", \"21(1) PDPA\", \"Regulation 4\"\n\n\
        EVERY KEY MUST start with \"S \", \"Ss \", \"Reg \", \"Regs \", or \"para \" \
        and end with the document name (PDPA or PDPR).\n\n\
        EXAMPLE CORRECT OUTPUT:\n\
        {\n\
            \"S 21(1) and (2) PDPA\": \"The facts concern an individual requesting \
        access to their data, so S 21 PDPA is engaged. S 21(1) PDPA requires an \
        organisation to provide personal data on request, and S 21(2) PDPA points \
        to the Fifth Schedule exclusions.\",\n\
            \"para 1(a) of Fifth Schedule PDPA\": \"This paragraph excludes opinion \
        data kept solely for an evaluative purpose from the disclosure requirement.\"\n\
        }\n\n\
        Return ONLY the JSON structure, no additional text.",
    );

    prompt
}

/// Strip markdown code fences and parse the backend reply as a JSON
/// object
fn parse_analysis(raw: &str) -> std::result::Result<serde_json::Map<String, serde_json::Value>, String> {
    let cleaned = strip_code_fences(raw);

    let value: serde_json::Value =
        serde_json::from_str(&cleaned).map_err(|e| format!("invalid JSON: {e}"))?;

    match value {
        serde_json::Value::Object(map) => Ok(map),
        other => Err(format!(
            "expected a JSON object, got {}",
            json_type_name(&other)
        )),
    }
}

/// Drop keys that fail the citation grammar or carry a disallowed term,
/// and entries whose reasoning is not a non-empty string
fn filter_keys(
    parsed: serde_json::Map<String, serde_json::Value>,
) -> serde_json::Map<String, serde_json::Value> {
    let mut filtered = serde_json::Map::new();

    for (key, value) in parsed {
        let Some(valid) = CitationKey::validate(&key) else {
            tracing::debug!(key = %key, "Dropped key failing citation grammar");
            continue;
        };
        match value.as_str() {
            Some(reasoning) if !reasoning.trim().is_empty() => {
                filtered.insert(valid.as_str().to_string(), value);
            }
            _ => {
                tracing::debug!(key = %key, "Dropped key without reasoning text");
            }
        }
    }

    filtered
}

fn strip_code_fences(raw: &str) -> String {
    let mut text = raw.trim();

    if let Some(rest) = text.strip_prefix("```json") {
        text = rest;
    } else if let Some(rest) = text.strip_prefix("```") {
        text = rest;
    }
    if let Some(rest) = text.strip_suffix("```") {
        text = rest;
    }

    text.trim().to_string()
}

fn json_type_name(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_code_fences() {
        assert_eq!(strip_code_fences("```json\n{\"a\": 1}\n```"), "{\"a\": 1}");
        assert_eq!(strip_code_fences("```\n{}\n```"), "{}");
        assert_eq!(strip_code_fences("{}"), "{}");
    }

    #[test]
    fn test_parse_rejects_non_objects() {
        assert!(parse_analysis("[1, 2]").is_err());
        assert!(parse_analysis("not json at all").is_err());
        assert!(parse_analysis("{\"S 21 PDPA\": \"reasoning\"}").is_ok());
    }

    #[test]
    fn test_filter_drops_invalid_and_definition_keys() {
        let mut map = serde_json::Map::new();
        map.insert("S 21 PDPA".into(), "valid reasoning".into());
        map.insert("Definition: personal data".into(), "context".into());
        map.insert("Section 21 PDPA".into(), "wrong form".into());
        map.insert("Reg 4 PDPR".into(), "".into());

        let filtered = filter_keys(map);

        assert_eq!(filtered.len(), 1);
        assert!(filtered.contains_key("S 21 PDPA"));
    }

    #[test]
    fn test_filter_preserves_insertion_order() {
        let mut map = serde_json::Map::new();
        map.insert("S 21(1) PDPA".into(), "first".into());
        map.insert("Reg 4 PDPR".into(), "second".into());
        map.insert("para 1(a) of Fifth Schedule PDPA".into(), "third".into());

        let filtered = filter_keys(map);
        let keys: Vec<&String> = filtered.keys().collect();
        assert_eq!(
            keys,
            vec!["S 21(1) PDPA", "Reg 4 PDPR", "para 1(a) of Fifth Schedule PDPA"]
        );
    }

    #[test]
    fn test_strict_prompt_prepends_reminder() {
        let relaxed = build_prompt("q", "ctx", false);
        let strict = build_prompt("q", "ctx", true);
        assert!(!relaxed.contains("PREVIOUS REPLY"));
        assert!(strict.starts_with("YOUR PREVIOUS REPLY"));
    }
}
