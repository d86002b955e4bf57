//! Layer 3: schedule references
//!
//! A textual-trigger layer, not a similarity layer: schedule
//! cross-references are explicit citations in statutory text. The
//! accumulated layers 1-2 text is scanned for ordinal-qualified
//! references ("fifth schedule"); a bare "schedule" mention with no
//! resolvable ordinal pulls in every schedule.

use lexforge_common::knowledge::KnowledgeBase;
use regex_lite::Regex;

const ORDINAL_PATTERN: &str = r"\b(first|second|third|fourth|fifth|sixth|seventh|eighth|ninth|tenth|eleventh)\s+schedule\b";

/// Collect schedule segments triggered by the accumulated context
pub fn collect(accumulated_text: &str, kb: &KnowledgeBase) -> Vec<String> {
    let lowered = accumulated_text.to_lowercase();

    if !lowered.contains("schedule") {
        return vec![];
    }

    let Ok(re) = Regex::new(ORDINAL_PATTERN) else {
        return vec![];
    };

    // Ordinals in order of first appearance, deduplicated
    let mut ordinals: Vec<String> = Vec::new();
    for captures in re.captures_iter(&lowered) {
        if let Some(ordinal) = captures.get(1) {
            let ordinal = ordinal.as_str().to_string();
            if !ordinals.contains(&ordinal) {
                ordinals.push(ordinal);
            }
        }
    }

    if ordinals.is_empty() {
        // Bare trigger, no finer disambiguation available
        return kb
            .schedules()
            .iter()
            .map(|s| format!("### {}\n{}", s.title(), s.body))
            .collect();
    }

    ordinals
        .iter()
        .filter_map(|ordinal| kb.schedule(ordinal))
        .map(|s| format!("### {}\n{}", s.title(), s.body))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::test_fixtures;

    #[test]
    fn test_ordinal_reference_resolves() {
        let kb = test_fixtures::knowledge_base();
        let matched = collect("subject to the Fifth Schedule.", &kb);

        assert_eq!(matched.len(), 1);
        assert!(matched[0].starts_with("### Fifth Schedule"));
    }

    #[test]
    fn test_no_trigger_no_schedules() {
        let kb = test_fixtures::knowledge_base();
        assert!(collect("nothing statutory here", &kb).is_empty());
    }

    #[test]
    fn test_bare_trigger_pulls_everything() {
        let kb = test_fixtures::knowledge_base();
        let matched = collect("see the schedule for exceptions", &kb);
        assert_eq!(matched.len(), kb.schedules().len());
    }

    #[test]
    fn test_duplicate_references_deduplicated() {
        let kb = test_fixtures::knowledge_base();
        let matched = collect(
            "the Fifth Schedule applies; see also the fifth schedule",
            &kb,
        );
        assert_eq!(matched.len(), 1);
    }

    #[test]
    fn test_unknown_ordinal_skipped() {
        let kb = test_fixtures::knowledge_base();
        // "ninth schedule" is referenced but not in the knowledge base
        let matched = collect("per the Ninth Schedule and Fifth Schedule", &kb);
        assert_eq!(matched.len(), 1);
        assert!(matched[0].contains("Fifth"));
    }
}
