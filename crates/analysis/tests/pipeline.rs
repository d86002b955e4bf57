//! End-to-end pipeline tests over a fixture knowledge base with
//! deterministic capability mocks.

use std::sync::Arc;

use lexforge_analysis::context::ContextBuilder;
use lexforge_analysis::orchestrator::{AnalysisStatus, Orchestrator};
use lexforge_analysis::publish::Publisher;
use lexforge_analysis::terms::TermExtractor;
use lexforge_common::config::{GenerationConfig, RetrievalConfig};
use lexforge_common::embeddings::HashedBagEmbedder;
use lexforge_common::errors::{AppError, Result};
use lexforge_common::generation::{Generator, ScriptedGenerator};
use lexforge_common::knowledge::KnowledgeBase;
use lexforge_common::tagger::KeywordTagger;

const CATEGORIES: &str = r#"{
    "access and correction obligations": {
        "key_terms": ["access", "correction", "request", "copy", "personal data", "employee"],
        "provisions": {
            "21 access to personal data": "On request of an individual, an organisation shall, as soon as reasonably possible, provide the individual with personal data about the individual, subject to the exceptions in the Fifth Schedule.",
            "22 correction of personal data": "An individual may request an organisation to correct an error or omission in the personal data about the individual."
        }
    },
    "consent obligations": {
        "key_terms": ["consent", "collection", "notification", "purpose"],
        "provisions": {
            "13 consent required": "An organisation shall not collect, use or disclose personal data about an individual unless the individual gives consent.",
            "14 provision of consent": "An individual has not given consent unless the individual has been notified of the purposes."
        }
    }
}"#;

const DEFINITIONS: &str = r#"{
    "personal data": "Data, whether true or not, about an individual who can be identified from that data.",
    "organisation": "Any individual, company, association or body of persons."
}"#;

const SCHEDULES: &str = r#"{
    "fifth": "Exceptions from access requirement: opinion data kept solely for an evaluative purpose, including performance appraisals."
}"#;

const SUBSIDIARY: &str = r#"{
    "subsidiary_legislation_mapping": {
        "Personal Data Protection Regulations 2021": {
            "21": {"description": "Prescribes how an organisation must respond to an access request."}
        }
    }
}"#;

const ACCESS_QUERY: &str = "An employee asks her former employer for a copy of all \
    personal data held about her, including performance appraisals.";

const VALID_GENERATION: &str = r#"```json
{
    "S 21(1) and (2) PDPA": "The individual is requesting access to personal data held by her former employer, so the access obligation in S 21(1) PDPA is engaged, subject to the Fifth Schedule exclusions referenced by S 21(2) PDPA.",
    "para 1(a) of Fifth Schedule PDPA": "Performance appraisals are opinion data kept solely for an evaluative purpose, which this paragraph excludes from the disclosure requirement.",
    "Reg 4 PDPR": "This regulation prescribes the procedure the organisation must follow when responding to the access request."
}
```"#;

fn knowledge_base() -> Arc<KnowledgeBase> {
    match KnowledgeBase::from_documents(CATEGORIES, DEFINITIONS, SCHEDULES, SUBSIDIARY) {
        Ok(kb) => Arc::new(kb),
        Err(e) => panic!("fixture knowledge base must parse: {e}"),
    }
}

fn orchestrator(generator: Arc<dyn Generator>) -> Orchestrator {
    orchestrator_with_config(generator, GenerationConfig {
        provider: "mock".into(),
        api_key: None,
        api_base: None,
        model: "scripted".into(),
        max_output_tokens: 1024,
        temperature: 0.3,
        timeout_secs: 30,
        max_format_retries: 1,
    })
}

fn orchestrator_with_config(generator: Arc<dyn Generator>, config: GenerationConfig) -> Orchestrator {
    let retrieval = RetrievalConfig::default();
    Orchestrator::new(
        TermExtractor::new(Arc::new(KeywordTagger::default()), retrieval.clone()),
        ContextBuilder::new(Arc::new(HashedBagEmbedder::new(256)), retrieval),
        generator,
        knowledge_base(),
        config,
    )
}

#[tokio::test]
async fn access_scenario_produces_validated_analysis() {
    let orchestrator = orchestrator(Arc::new(ScriptedGenerator::with_texts(&[VALID_GENERATION])));

    let outcome = orchestrator.analyze(ACCESS_QUERY).await;

    assert_eq!(outcome.status, AnalysisStatus::Success);
    assert!(outcome.error.is_none());

    // Key terms carry the scenario vocabulary
    assert!(outcome.key_terms.iter().any(|t| t == "employee"));
    assert!(outcome.key_terms.iter().any(|t| t == "personal data"));
    assert!(outcome.key_terms.iter().any(|t| t == "access"));
    assert!(outcome.key_terms.iter().any(|t| t == "performance appraisals"));

    // Context includes the access category's provision bodies
    assert!(outcome.legal_context.contains("21 access to personal data"));
    assert!(outcome.legal_context.contains("Fifth Schedule"));

    // At least one key matches the section grammar, with reasoning
    let (key, reasoning) = outcome
        .analysis
        .iter()
        .find(|(k, _)| k.starts_with("S "))
        .expect("a section key");
    assert!(key.ends_with("PDPA"));
    assert!(!reasoning.as_str().unwrap_or_default().is_empty());
}

#[tokio::test]
async fn non_legal_query_short_circuits_to_no_matches() {
    // The generator would fail if called; it must not be
    let orchestrator = orchestrator(Arc::new(ScriptedGenerator::new(vec![])));

    let outcome = orchestrator.analyze("What is the weather today?").await;

    assert_eq!(outcome.status, AnalysisStatus::NoMatches);
    assert!(outcome.key_terms.is_empty());
    assert!(outcome.analysis.is_empty());
    assert!(outcome.error.is_none());
}

#[tokio::test]
async fn malformed_generation_surfaces_error_after_one_retry() {
    let orchestrator = orchestrator(Arc::new(ScriptedGenerator::with_texts(&[
        "I am sorry, I cannot produce JSON",
        "still not json",
    ])));

    let outcome = orchestrator.analyze(ACCESS_QUERY).await;

    assert_eq!(outcome.status, AnalysisStatus::Error);
    assert_eq!(outcome.error.as_deref(), Some("malformed generation output"));
    assert!(outcome.analysis.is_empty());
}

#[tokio::test]
async fn stricter_reprompt_recovers_from_one_malformed_reply() {
    let orchestrator = orchestrator(Arc::new(ScriptedGenerator::with_texts(&[
        "not json",
        VALID_GENERATION,
    ])));

    let outcome = orchestrator.analyze(ACCESS_QUERY).await;

    assert_eq!(outcome.status, AnalysisStatus::Success);
    assert!(!outcome.analysis.is_empty());
}

#[tokio::test]
async fn definition_keys_never_survive() {
    let generation = r#"{
        "Definition: personal data": "definitions are context, not holdings",
        "S 21(1) PDPA": "The access obligation applies to the request."
    }"#;
    let orchestrator = orchestrator(Arc::new(ScriptedGenerator::with_texts(&[generation])));

    let outcome = orchestrator.analyze(ACCESS_QUERY).await;

    assert_eq!(outcome.status, AnalysisStatus::Success);
    for key in outcome.analysis.keys() {
        assert!(!key.contains("Definition"));
    }
    assert!(outcome.analysis.contains_key("S 21(1) PDPA"));
}

#[tokio::test]
async fn all_keys_filtered_downgrades_to_no_matches() {
    let generation = r#"{
        "Section 21 PDPA": "wrong key form",
        "Definition: organisation": "never citable"
    }"#;
    let orchestrator = orchestrator(Arc::new(ScriptedGenerator::with_texts(&[generation])));

    let outcome = orchestrator.analyze(ACCESS_QUERY).await;

    assert_eq!(outcome.status, AnalysisStatus::NoMatches);
    assert!(outcome.analysis.is_empty());
    assert!(outcome.error.is_none());
}

#[tokio::test]
async fn backend_unavailable_surfaces_error() {
    let orchestrator = orchestrator(Arc::new(ScriptedGenerator::new(vec![Err(
        AppError::GenerationUnavailable {
            message: "connection refused".into(),
        },
    )])));

    let outcome = orchestrator.analyze(ACCESS_QUERY).await;

    assert_eq!(outcome.status, AnalysisStatus::Error);
    assert_eq!(outcome.error.as_deref(), Some("backend-unavailable"));
}

/// Generator that never resolves; exercises the bounded-wait policy
struct HangingGenerator;

#[async_trait::async_trait]
impl Generator for HangingGenerator {
    async fn generate(&self, _prompt: &str) -> Result<String> {
        tokio::time::sleep(std::time::Duration::from_secs(3600)).await;
        Ok(String::new())
    }

    fn model_name(&self) -> &str {
        "hanging"
    }
}

#[tokio::test]
async fn backend_timeout_surfaces_distinct_error() {
    let orchestrator = orchestrator_with_config(
        Arc::new(HangingGenerator),
        GenerationConfig {
            provider: "mock".into(),
            api_key: None,
            api_base: None,
            model: "hanging".into(),
            max_output_tokens: 1024,
            temperature: 0.3,
            timeout_secs: 0,
            max_format_retries: 1,
        },
    );

    let outcome = orchestrator.analyze(ACCESS_QUERY).await;

    assert_eq!(outcome.status, AnalysisStatus::Error);
    assert_eq!(outcome.error.as_deref(), Some("backend-timeout"));
}

#[tokio::test]
async fn run_publishes_atomically_with_monotonic_seq() {
    let publisher = Publisher::new(None);
    let orchestrator = orchestrator(Arc::new(ScriptedGenerator::with_texts(&[
        VALID_GENERATION,
        VALID_GENERATION,
    ])));

    let first = orchestrator.run(ACCESS_QUERY, &publisher).await.unwrap();
    let second = orchestrator.run(ACCESS_QUERY, &publisher).await.unwrap();
    assert!(second > first);

    let snapshot = publisher.snapshot().await.expect("published snapshot");
    assert_eq!(snapshot.seq, second);
    assert_eq!(snapshot.document.status, AnalysisStatus::Success);

    // The snapshot always re-serializes to well-formed structured data
    let raw = serde_json::to_string(snapshot.as_ref()).unwrap();
    let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(value["query"], ACCESS_QUERY);
}
