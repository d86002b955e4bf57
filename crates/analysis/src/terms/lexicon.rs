//! Curated word lists for lexical term extraction
//!
//! The lists mirror the vocabulary of the statute: core data-protection
//! terms, processing action verbs, data-type nouns, entity roles,
//! qualifier/negation words, and known organisations and jurisdictions.

/// Core statute vocabulary, highest-precision matches
pub const CORE_TERMS: &[&str] = &[
    "personal data",
    "sensitive data",
    "data protection",
    "privacy",
    "consent",
    "breach",
    "notification",
    "pdpa",
    "pdpc",
];

/// Data processing action verbs
pub const ACTION_VERBS: &[&str] = &[
    "collect", "use", "disclose", "process", "store", "transfer",
    "share", "access", "expose", "leak", "send", "transmit",
];

/// Data types and subjects
pub const DATA_NOUNS: &[&str] = &[
    "records",
    "information",
    "data",
    "details",
    "patient records",
    "medical records",
    "health records",
    "customer information",
    "financial information",
    "email",
    "phone",
    "contact",
    "location",
];

/// Legal entities and roles
pub const ENTITY_ROLES: &[&str] = &[
    "hospital",
    "bank",
    "company",
    "organisation",
    "business",
    "insurance company",
    "data controller",
    "data processor",
    "data intermediary",
    "individual",
    "patient",
    "customer",
    "employee",
    "employer",
    "third party",
];

/// Qualifier, negation, and manner words that change legal meaning
pub const QUALIFIER_WORDS: &[&str] = &[
    "without", "not", "no", "unauthorized", "improper", "inadequate",
    "proper", "adequate", "appropriate", "explicit", "informed",
    "overseas", "international", "cross-border", "foreign", "domestic",
    "immediately", "promptly", "delayed", "failed",
];

/// Jurisdictions relevant to transfer scenarios
pub const PLACES: &[&str] = &[
    "singapore", "malaysia", "thailand", "indonesia", "vietnam", "philippines",
    "usa", "america", "europe", "china", "india", "japan", "korea", "australia",
];

/// Known organisations appearing in scenarios
pub const ORGANISATIONS: &[&str] = &[
    "grab", "shopee", "lazada", "gojek", "foodpanda",
    "dbs", "ocbc", "uob", "maybank", "citibank",
    "google", "facebook", "microsoft", "apple", "amazon",
];

/// Multi-word data-type patterns matched as regular expressions
pub const DATA_TYPE_PATTERNS: &[&str] = &[
    r"\bperformance\s+appraisals?\b",
    r"\bperformance\s+reviews?\b",
    r"\bcredit\s+card\s+(?:information|data|details)\b",
    r"\blocation\s+(?:data|information|history)\b",
    r"\bbiometric\s+(?:data|information)\b",
    r"\b(?:health|medical|patient)\s+(?:records|information|data)\b",
    r"\b(?:financial|banking)\s+(?:information|data|records|statements)\b",
    r"\baccount\s+balances?\b",
    r"\bbank\s+statements?\b",
    r"\bcontact\s+(?:information|details)\b",
    r"\bphone\s+numbers?\b",
    r"\bemail\s+address(?:es)?\b",
    r"\bsms\s+(?:messages?|marketing)\b",
    r"\buser\s+profiles?\b",
    r"\bcustomer\s+profiles?\b",
];

/// Scenario phrasings that imply a statutory concept without naming it.
/// An access request is usually phrased as asking for a copy of data.
pub const IMPLIED_TERM_PATTERNS: &[(&str, &str)] = &[
    (r"\b(?:a\s+)?cop(?:y|ies)\s+of\b", "access"),
    (r"\brequests?\s+(?:for\s+)?(?:her|his|their|my)?\s*(?:personal\s+)?data\b", "access"),
    (r"\b(?:correct|amend|update)\s+(?:her|his|their|my)?\s*(?:personal\s+)?(?:data|records?)\b", "correction"),
    (r"\b(?:opt\s+out|unsubscribe|withdraw)\b", "withdraw consent"),
];

/// Terms that always score a priority bonus
pub const HIGH_PRIORITY_TERMS: &[&str] = &[
    "personal data", "consent", "breach", "without", "unauthorized",
];

/// Substrings indicating a term names a kind of data
pub const DATA_INDICATORS: &[&str] = &["email", "phone", "records", "information", "data"];

/// Common English words never kept as terms
pub const STOP_WORDS: &[&str] = &[
    "the", "and", "or", "but", "in", "on", "at", "to", "for", "of", "with", "by",
    "from", "up", "about", "into", "during", "before", "after", "such", "than",
    "can", "will", "just", "should", "now", "may", "also", "were", "been",
];

/// Variant groups collapsed to a single canonical term during dedup
pub const SYNONYM_GROUPS: &[(&str, &[&str])] = &[
    ("email", &["email", "emails", "email address", "email addresses"]),
    ("phone number", &["phone", "phone number", "phone numbers", "telephone"]),
    ("data", &["data", "information"]),
    ("company", &["company", "organisation", "organization"]),
    ("customer", &["customer", "client"]),
    ("records", &["records", "record"]),
];

/// All fixed-phrase lists scanned by the lexical layer
pub fn phrase_lists() -> impl Iterator<Item = &'static str> {
    CORE_TERMS
        .iter()
        .chain(ACTION_VERBS)
        .chain(DATA_NOUNS)
        .chain(ENTITY_ROLES)
        .chain(QUALIFIER_WORDS)
        .chain(PLACES)
        .chain(ORGANISATIONS)
        .copied()
}

/// Check whether a term is a stop word
pub fn is_stop_word(term: &str) -> bool {
    STOP_WORDS.contains(&term)
}

/// Canonical form for a term that belongs to a synonym group, with the
/// group index so callers can collapse one pick per group
pub fn synonym_group(term: &str) -> Option<(usize, &'static str)> {
    SYNONYM_GROUPS
        .iter()
        .enumerate()
        .find(|(_, (_, members))| members.contains(&term))
        .map(|(i, (canonical, _))| (i, *canonical))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_synonym_group_lookup() {
        assert_eq!(synonym_group("organisation"), Some((3, "company")));
        assert_eq!(synonym_group("information"), Some((2, "data")));
        assert_eq!(synonym_group("consent"), None);
    }

    #[test]
    fn test_stop_words() {
        assert!(is_stop_word("the"));
        assert!(!is_stop_word("consent"));
    }

    #[test]
    fn test_phrase_lists_nonempty() {
        assert!(phrase_lists().count() > 50);
    }
}
