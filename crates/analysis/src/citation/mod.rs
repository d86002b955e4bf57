//! Citation-key grammar
//!
//! Accepted key forms, and nothing else:
//! - `S 21 PDPA`, `S 21(1) PDPA`, `S 21(1) and (2) PDPA`
//! - `Ss 21(5) and (7) PDPA` (multi-section)
//! - `Reg 4 PDPR`, `Regs 4 and 5 PDPR`
//! - `para 1(a) of Fifth Schedule PDPA`
//!
//! Keys containing the literal word "Definition" are always rejected:
//! definitional entries are context, not citable holdings.

use regex_lite::Regex;

/// Anchored patterns for the closed grammar
const SECTION_PATTERN: &str =
    r"^S \d+[A-Za-z]?(?:\([0-9a-z]+\))*(?: and (?:\([0-9a-z]+\))+)? PDPA$";
const MULTI_SECTION_PATTERN: &str =
    r"^Ss \d+[A-Za-z]?(?:\([0-9a-z]+\))* and (?:\d+[A-Za-z]?)?(?:\([0-9a-z]+\))+ PDPA$";
const REGULATION_PATTERN: &str = r"^Reg \d+[A-Za-z]?(?:\([0-9a-z]+\))* PDPR$";
const MULTI_REGULATION_PATTERN: &str = r"^Regs \d+[A-Za-z]? and \d+[A-Za-z]? PDPR$";
const SCHEDULE_PARA_PATTERN: &str =
    r"^para \d+[a-z]?(?:\([0-9a-z]+\))* of (?:First|Second|Third|Fourth|Fifth|Sixth|Seventh|Eighth|Ninth|Tenth|Eleventh) Schedule PDPA$";

/// A validated citation key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CitationKey(String);

impl CitationKey {
    /// Validate a candidate key against the closed grammar
    pub fn validate(candidate: &str) -> Option<Self> {
        let candidate = candidate.trim();

        // Definitions are never citable, whatever the rest looks like
        if candidate.contains("Definition") {
            return None;
        }

        let patterns = [
            SECTION_PATTERN,
            MULTI_SECTION_PATTERN,
            REGULATION_PATTERN,
            MULTI_REGULATION_PATTERN,
            SCHEDULE_PARA_PATTERN,
        ];

        let accepted = patterns.iter().any(|pattern| {
            Regex::new(pattern)
                .map(|re| re.is_match(candidate))
                .unwrap_or(false)
        });

        accepted.then(|| Self(candidate.to_string()))
    }

    /// The validated key text
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CitationKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
