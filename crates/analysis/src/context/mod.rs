//! Layered context building
//!
//! Four ordered retrieval layers progressively enrich a context block,
//! each layer able to read the output of all previous layers:
//! 1. Category matching (embedding similarity)
//! 2. Interpretation definitions (whole-word membership)
//! 3. Schedule references (textual trigger over accumulated context)
//! 4. Subsidiary legislation (keyed by layer 1's matched provisions)
//!
//! Layer order is fixed and non-reorderable: layer 3 scans the text
//! accumulated by layers 1-2, and layer 4 resolves against layer 1's
//! match set. The block keeps per-segment provenance; flattening to a
//! single string is the orchestrator's concern.

mod categories;
mod definitions;
mod schedules;
mod subsidiary;

pub use categories::CategoryMatch;

use crate::terms::ExtractedTerm;
use lexforge_common::config::RetrievalConfig;
use lexforge_common::embeddings::Embedder;
use lexforge_common::errors::Result;
use lexforge_common::knowledge::KnowledgeBase;
use lexforge_common::metrics::{self, StageTimer};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Source layer of a context segment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayerTag {
    /// Layer 1: category-matched provisions
    Categories,
    /// Layer 2: interpretation definitions
    Definitions,
    /// Layer 3: schedule references
    Schedules,
    /// Layer 4: subsidiary legislation
    Subsidiary,
}

impl LayerTag {
    /// Metric label for this layer
    pub fn label(&self) -> &'static str {
        match self {
            LayerTag::Categories => "categories",
            LayerTag::Definitions => "definitions",
            LayerTag::Schedules => "schedules",
            LayerTag::Subsidiary => "subsidiary",
        }
    }
}

/// One provenance-tagged segment of assembled context
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextSegment {
    /// Layer that contributed this segment
    pub layer: LayerTag,

    /// Formatted segment text
    pub text: String,
}

/// Ordered, provenance-tracked context. Segments always appear in layer
/// order 1 -> 2 -> 3 -> 4 regardless of which layers produced content.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContextBlock {
    segments: Vec<ContextSegment>,
}

impl ContextBlock {
    /// Append a segment for a layer
    pub fn push(&mut self, layer: LayerTag, text: String) {
        self.segments.push(ContextSegment { layer, text });
    }

    /// All segments in layer order
    pub fn segments(&self) -> &[ContextSegment] {
        &self.segments
    }

    /// True when no layer contributed anything
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Accumulated text of the given layers, in order
    pub fn text_of_layers(&self, layers: &[LayerTag]) -> String {
        self.segments
            .iter()
            .filter(|s| layers.contains(&s.layer))
            .map(|s| s.text.as_str())
            .collect::<Vec<_>>()
            .join("\n\n---\n\n")
    }

    /// Flatten the whole block to the prompt-facing string
    pub fn flatten(&self) -> String {
        self.segments
            .iter()
            .map(|s| s.text.as_str())
            .collect::<Vec<_>>()
            .join("\n\n---\n\n")
    }
}

/// Output of the layered build
#[derive(Debug, Clone)]
pub struct BuiltContext {
    /// The assembled context block
    pub block: ContextBlock,

    /// Categories selected by layer 1, ranked
    pub category_matches: Vec<CategoryMatch>,

    /// Provision identifiers matched by layer 1, in rank order.
    /// Layer 4 resolves subsidiary legislation against this set.
    pub matched_provisions: Vec<String>,
}

/// Builder running the four retrieval layers in fixed order
pub struct ContextBuilder {
    embedder: Arc<dyn Embedder>,
    config: RetrievalConfig,
}

impl ContextBuilder {
    /// Create a new builder
    pub fn new(embedder: Arc<dyn Embedder>, config: RetrievalConfig) -> Self {
        Self { embedder, config }
    }

    /// Run layers 1-4 over the extracted terms and knowledge base
    pub async fn build(
        &self,
        terms: &[ExtractedTerm],
        kb: &KnowledgeBase,
    ) -> Result<BuiltContext> {
        let timer = StageTimer::start();
        let mut block = ContextBlock::default();

        // Layer 1: category matching
        let category_matches =
            categories::select(self.embedder.as_ref(), &self.config, terms, kb).await?;
        let mut matched_provisions = Vec::new();
        for m in &category_matches {
            let category = &kb.categories()[m.index];
            block.push(LayerTag::Categories, categories::render(category));
            matched_provisions.extend(category.provisions.iter().map(|p| p.id.clone()));
        }
        metrics::record_layer(LayerTag::Categories.label(), category_matches.len());

        // Layer 2: interpretation definitions
        let layer1_text = block.text_of_layers(&[LayerTag::Categories]);
        let matched_definitions = definitions::collect(terms, &layer1_text, kb);
        let definition_count = matched_definitions.len();
        for text in matched_definitions {
            block.push(LayerTag::Definitions, text);
        }
        metrics::record_layer(LayerTag::Definitions.label(), definition_count);

        // Layer 3: schedule references, triggered by the text layers 1-2
        // accumulated
        let accumulated = block.text_of_layers(&[LayerTag::Categories, LayerTag::Definitions]);
        let matched_schedules = schedules::collect(&accumulated, kb);
        let schedule_count = matched_schedules.len();
        for text in matched_schedules {
            block.push(LayerTag::Schedules, text);
        }
        metrics::record_layer(LayerTag::Schedules.label(), schedule_count);

        // Layer 4: subsidiary legislation keyed by layer 1's matches
        let matched_subsidiary = subsidiary::collect(&matched_provisions, kb);
        let subsidiary_count = matched_subsidiary.len();
        for text in matched_subsidiary {
            block.push(LayerTag::Subsidiary, text);
        }
        metrics::record_layer(LayerTag::Subsidiary.label(), subsidiary_count);

        metrics::record_retrieval(timer.elapsed_secs());
        tracing::debug!(
            categories = category_matches.len(),
            definitions = definition_count,
            schedules = schedule_count,
            subsidiary = subsidiary_count,
            "Context build complete"
        );

        Ok(BuiltContext {
            block,
            category_matches,
            matched_provisions,
        })
    }
}
