//! Layer 4: subsidiary legislation
//!
//! Resolves the provision identifiers matched by layer 1 against the
//! subsidiary legislation mapping. This layer has a hard dependency on
//! layer 1's match set, which is why layer order is fixed.

use lexforge_common::knowledge::{section_number, KnowledgeBase};

/// Collect subsidiary segments for the matched provision identifiers,
/// in match order, one entry per section number
pub fn collect(matched_provisions: &[String], kb: &KnowledgeBase) -> Vec<String> {
    let mut seen_sections: Vec<&str> = Vec::new();
    let mut segments = Vec::new();

    for id in matched_provisions {
        let Some(section_number) = section_number(id) else {
            continue;
        };
        if seen_sections.contains(&section_number) {
            continue;
        }
        seen_sections.push(section_number);

        if let Some(entry) = kb.subsidiary_for_section(section_number) {
            segments.push(format!(
                "### Subsidiary Legislation - Section {}\n**Regulation:** {}\n**Description:** {}",
                entry.section_number, entry.regulation, entry.description
            ));
        }
    }

    segments
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::test_fixtures;

    #[test]
    fn test_resolves_matched_sections() {
        let kb = test_fixtures::knowledge_base();
        let matched = collect(
            &[
                "21 access to personal data".to_string(),
                "22 correction of personal data".to_string(),
            ],
            &kb,
        );

        // 21 has subsidiary legislation, 22 does not
        assert_eq!(matched.len(), 1);
        assert!(matched[0].contains("Section 21"));
        assert!(matched[0].contains("Personal Data Protection Regulations 2021"));
    }

    #[test]
    fn test_output_is_subset_of_input_sections() {
        let kb = test_fixtures::knowledge_base();
        let matched = collect(&["26 transfer of personal data outside singapore".to_string()], &kb);

        for segment in &matched {
            assert!(segment.contains("Section 26"));
        }
    }

    #[test]
    fn test_empty_matches_yield_nothing() {
        let kb = test_fixtures::knowledge_base();
        assert!(collect(&[], &kb).is_empty());
    }

    #[test]
    fn test_duplicate_sections_collapsed() {
        let kb = test_fixtures::knowledge_base();
        let matched = collect(
            &[
                "21 access to personal data".to_string(),
                "21 access to personal data".to_string(),
            ],
            &kb,
        );
        assert_eq!(matched.len(), 1);
    }

}
