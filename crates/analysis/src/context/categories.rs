//! Layer 1: category matching via embedding similarity
//!
//! Each category's representative key terms and each extracted term are
//! embedded into a shared vector space. A category matches when its best
//! cosine similarity against any term clears the configured threshold.
//! Matches rank descending by score; equal scores keep declaration
//! order; the ranking is capped to the configured maximum.

use crate::terms::ExtractedTerm;
use lexforge_common::config::RetrievalConfig;
use lexforge_common::embeddings::{cosine_similarity, Embedder};
use lexforge_common::errors::Result;
use lexforge_common::knowledge::{Category, KnowledgeBase};
use serde::{Deserialize, Serialize};

/// A category selected by layer 1
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryMatch {
    /// Index into the knowledge base category list
    pub index: usize,

    /// Category name
    pub name: String,

    /// Best cosine similarity against the extracted terms
    pub score: f32,
}

/// Select matching categories for the extracted terms
pub async fn select(
    embedder: &dyn Embedder,
    config: &RetrievalConfig,
    terms: &[ExtractedTerm],
    kb: &KnowledgeBase,
) -> Result<Vec<CategoryMatch>> {
    if terms.is_empty() {
        return Ok(vec![]);
    }

    let term_texts: Vec<String> = terms.iter().map(|t| t.text.clone()).collect();
    let term_embeddings = embedder.embed_batch(&term_texts).await?;

    let category_texts: Vec<String> = kb
        .categories()
        .iter()
        .map(|c| c.embedding_text())
        .collect();
    let category_embeddings = embedder.embed_batch(&category_texts).await?;

    // Best-match term per category; declaration order preserved here so
    // the stable sort below keeps it for equal scores
    let mut matches: Vec<CategoryMatch> = Vec::new();
    for (index, category_embedding) in category_embeddings.iter().enumerate() {
        let best = term_embeddings
            .iter()
            .map(|t| cosine_similarity(t, category_embedding))
            .fold(0.0_f32, f32::max);

        if best >= config.similarity_threshold {
            matches.push(CategoryMatch {
                index,
                name: kb.categories()[index].name.clone(),
                score: best,
            });
        }
    }

    matches.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    matches.truncate(config.max_categories);

    Ok(matches)
}

/// Render a matched category: its name heading plus the full body of
/// every member provision
pub fn render(category: &Category) -> String {
    let mut out = format!("## {}\n", title_case(&category.name));
    for provision in &category.provisions {
        out.push_str(&format!("\n### {}\n{}\n", provision.id, provision.body));
    }
    out.trim_end().to_string()
}

fn title_case(name: &str) -> String {
    name.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => format!("{}{}", first.to_ascii_uppercase(), chars.as_str()),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::test_fixtures;
    use lexforge_common::embeddings::HashedBagEmbedder;

    #[tokio::test]
    async fn test_relative_ranking_not_exact_scores() {
        let kb = test_fixtures::knowledge_base();
        let embedder = HashedBagEmbedder::new(256);
        let config = RetrievalConfig::default();

        let matches = select(
            &embedder,
            &config,
            &test_fixtures::terms(&["access", "correction", "copy", "request"]),
            &kb,
        )
        .await
        .unwrap();

        assert!(!matches.is_empty());
        // The access category must outrank the transfer category
        assert_eq!(matches[0].name, "access and correction obligations");
        for pair in matches.windows(2) {
            assert!(pair[0].score >= pair[1].score);
        }
    }

    #[tokio::test]
    async fn test_threshold_filters_unrelated() {
        let kb = test_fixtures::knowledge_base();
        let embedder = HashedBagEmbedder::new(256);
        let config = RetrievalConfig::default();

        let matches = select(
            &embedder,
            &config,
            &test_fixtures::terms(&["sunny", "weather"]),
            &kb,
        )
        .await
        .unwrap();

        assert!(matches.is_empty());
    }

    #[tokio::test]
    async fn test_empty_terms_short_circuit() {
        let kb = test_fixtures::knowledge_base();
        let embedder = HashedBagEmbedder::new(256);
        let matches = select(&embedder, &RetrievalConfig::default(), &[], &kb)
            .await
            .unwrap();
        assert!(matches.is_empty());
    }

    #[test]
    fn test_render_carries_all_provisions() {
        let kb = test_fixtures::knowledge_base();
        let rendered = render(&kb.categories()[0]);

        assert!(rendered.starts_with("## Access And Correction Obligations"));
        assert!(rendered.contains("### 21 access to personal data"));
        assert!(rendered.contains("### 22 correction of personal data"));
    }
}
