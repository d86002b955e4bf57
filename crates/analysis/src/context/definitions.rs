//! Layer 2: interpretation definitions
//!
//! A definition joins the context when its term appears, whole-word and
//! case-insensitive, either in the extracted-term set or in the text
//! layer 1 accumulated (provisions routinely use defined terms without
//! the query naming them). Independent of layer 1's match outcome.

use crate::terms::ExtractedTerm;
use lexforge_common::knowledge::KnowledgeBase;
use regex_lite::Regex;

/// Collect matched definition segments, in declaration order
pub fn collect(terms: &[ExtractedTerm], layer1_text: &str, kb: &KnowledgeBase) -> Vec<String> {
    let lowered_context = layer1_text.to_lowercase();

    kb.definitions()
        .iter()
        .filter(|def| {
            let pattern = format!(r"\b{}\b", regex_lite::escape(&def.term.to_lowercase()));
            let Ok(re) = Regex::new(&pattern) else {
                return false;
            };
            terms.iter().any(|t| re.is_match(&t.text.to_lowercase()))
                || re.is_match(&lowered_context)
        })
        .map(|def| format!("### Definition: {}\n{}", def.term, def.body))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::test_fixtures;

    #[test]
    fn test_matches_against_term_set() {
        let kb = test_fixtures::knowledge_base();
        let matched = collect(&test_fixtures::terms(&["personal data"]), "", &kb);

        assert_eq!(matched.len(), 1);
        assert!(matched[0].starts_with("### Definition: personal data"));
    }

    #[test]
    fn test_matches_against_accumulated_text() {
        let kb = test_fixtures::knowledge_base();
        let matched = collect(
            &[],
            "An organisation shall provide personal data on request.",
            &kb,
        );

        // Both defined terms appear in the accumulated provision text
        assert_eq!(matched.len(), 2);
    }

    #[test]
    fn test_whole_word_only() {
        let kb = test_fixtures::knowledge_base();
        // "organisations" does not whole-word match "organisation"... but the
        // plural still contains the singular as a prefix token; whole-word
        // boundaries reject it
        let matched = collect(&test_fixtures::terms(&["reorganisation"]), "", &kb);
        assert!(matched.is_empty());
    }

    #[test]
    fn test_no_matches() {
        let kb = test_fixtures::knowledge_base();
        let matched = collect(&test_fixtures::terms(&["weather"]), "", &kb);
        assert!(matched.is_empty());
    }
}
