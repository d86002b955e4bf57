//! LexForge Analysis Core
//!
//! The retrieval and context assembly pipeline:
//! - Term extraction (entity model + lexical rules)
//! - Layered context building (four ordered retrieval layers)
//! - Citation-key grammar validation
//! - Analysis orchestration over the generative backend
//! - Atomic result publication

pub mod citation;
pub mod context;
pub mod orchestrator;
pub mod publish;
pub mod terms;

pub use citation::CitationKey;
pub use context::{ContextBlock, ContextBuilder, LayerTag};
pub use orchestrator::{AnalysisOutcome, AnalysisStatus, Orchestrator};
pub use publish::{PublishedResult, Publisher};
pub use terms::{ExtractedTerm, Extraction, TermExtractor};
