//! Knowledge base types and loader
//!
//! The knowledge base is four static JSON documents loaded once at process
//! start and shared read-only across all requests:
//! - categories.json: category -> key terms + provisions
//! - definitions.json: interpretation term -> definition body
//! - schedules.json: ordinal label -> schedule body
//! - subsidiary.json: regulation -> section number -> description
//!
//! Schema violations at load time are fatal; the process cannot serve
//! without a valid knowledge base.

use crate::errors::{AppError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// A citable unit of statutory text
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Provision {
    /// Identifier, e.g. "21 access to personal data"
    pub id: String,

    /// Full body text
    pub body: String,
}

impl Provision {
    /// Leading section number of the identifier, e.g. "21" or "26a".
    /// None when the identifier does not start with a section number.
    pub fn section_number(&self) -> Option<&str> {
        section_number(&self.id)
    }
}

/// Leading section number of a provision identifier, e.g. "21" from
/// "21 access to personal data" or "26a" from "26a transfer limitation"
pub fn section_number(id: &str) -> Option<&str> {
    let trimmed = id.trim_start();
    let end = trimmed
        .char_indices()
        .take_while(|(_, c)| c.is_ascii_digit())
        .map(|(i, c)| i + c.len_utf8())
        .last()?;
    // Allow a single letter suffix like "26a"
    let end = match trimmed[end..].chars().next() {
        Some(c) if c.is_ascii_lowercase()
            && trimmed[end + 1..].chars().next().map_or(true, |n| n == ' ') =>
        {
            end + 1
        }
        _ => end,
    };
    Some(&trimmed[..end])
}

/// A curated grouping of provisions, the unit of semantic retrieval
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    /// Category name, e.g. "access and correction obligations"
    pub name: String,

    /// Representative key terms embedded for layer-1 matching
    pub key_terms: Vec<String>,

    /// Member provisions, in declaration order
    pub provisions: Vec<Provision>,
}

impl Category {
    /// Text embedded to represent this category in the vector space
    pub fn embedding_text(&self) -> String {
        if self.key_terms.is_empty() {
            self.name.clone()
        } else {
            format!("{}: {}", self.name, self.key_terms.join(", "))
        }
    }
}

/// An interpretation definition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Definition {
    /// Defined term, e.g. "personal data"
    pub term: String,

    /// Definition body
    pub body: String,
}

/// A schedule, keyed by its ordinal label
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleEntry {
    /// Lowercase ordinal label, e.g. "fifth"
    pub ordinal: String,

    /// Schedule body text
    pub body: String,
}

impl ScheduleEntry {
    /// Display title, e.g. "Fifth Schedule"
    pub fn title(&self) -> String {
        let mut chars = self.ordinal.chars();
        match chars.next() {
            Some(first) => format!("{}{} Schedule", first.to_ascii_uppercase(), chars.as_str()),
            None => "Schedule".to_string(),
        }
    }
}

/// Subsidiary legislation tied to a statute section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubsidiaryEntry {
    /// Regulation instrument name
    pub regulation: String,

    /// Statute section number this entry supports
    pub section_number: String,

    /// Description of the subsidiary provisions
    pub description: String,
}

/// Raw per-category document shape
#[derive(Debug, Deserialize)]
struct CategoryDoc {
    #[serde(default)]
    key_terms: Vec<String>,
    provisions: serde_json::Map<String, serde_json::Value>,
}

/// Raw subsidiary document shape
#[derive(Debug, Deserialize)]
struct SubsidiaryDoc {
    subsidiary_legislation_mapping: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct SubsidiarySection {
    description: String,
}

/// The loaded, immutable knowledge base
#[derive(Debug, Clone)]
pub struct KnowledgeBase {
    categories: Vec<Category>,
    definitions: Vec<Definition>,
    schedules: Vec<ScheduleEntry>,
    subsidiary: Vec<SubsidiaryEntry>,
}

impl KnowledgeBase {
    /// Load all four documents from disk. Any schema violation is fatal.
    pub fn load(config: &crate::config::KnowledgeConfig) -> Result<Self> {
        let categories = Self::parse_categories(
            &read_document(&config.categories_path)?,
            &config.categories_path,
        )?;
        let definitions = Self::parse_definitions(
            &read_document(&config.definitions_path)?,
            &config.definitions_path,
        )?;
        let schedules = Self::parse_schedules(
            &read_document(&config.schedules_path)?,
            &config.schedules_path,
        )?;
        let subsidiary = Self::parse_subsidiary(
            &read_document(&config.subsidiary_path)?,
            &config.subsidiary_path,
        )?;

        tracing::info!(
            categories = categories.len(),
            definitions = definitions.len(),
            schedules = schedules.len(),
            subsidiary = subsidiary.len(),
            "Knowledge base loaded"
        );

        Ok(Self {
            categories,
            definitions,
            schedules,
            subsidiary,
        })
    }

    /// Build from in-memory JSON documents (tests and embedded fixtures)
    pub fn from_documents(
        categories_json: &str,
        definitions_json: &str,
        schedules_json: &str,
        subsidiary_json: &str,
    ) -> Result<Self> {
        Ok(Self {
            categories: Self::parse_categories(categories_json, "categories")?,
            definitions: Self::parse_definitions(definitions_json, "definitions")?,
            schedules: Self::parse_schedules(schedules_json, "schedules")?,
            subsidiary: Self::parse_subsidiary(subsidiary_json, "subsidiary")?,
        })
    }

    /// Categories in declaration order
    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    /// Definitions in declaration order
    pub fn definitions(&self) -> &[Definition] {
        &self.definitions
    }

    /// Schedules in declaration order
    pub fn schedules(&self) -> &[ScheduleEntry] {
        &self.schedules
    }

    /// Look up a schedule by its lowercase ordinal label
    pub fn schedule(&self, ordinal: &str) -> Option<&ScheduleEntry> {
        self.schedules.iter().find(|s| s.ordinal == ordinal)
    }

    /// First subsidiary entry for a statute section number, in regulation
    /// declaration order
    pub fn subsidiary_for_section(&self, section_number: &str) -> Option<&SubsidiaryEntry> {
        self.subsidiary
            .iter()
            .find(|e| e.section_number == section_number)
    }

    fn parse_categories(raw: &str, path: &str) -> Result<Vec<Category>> {
        let value: serde_json::Value = parse_document(raw, path)?;
        let object = value.as_object().ok_or_else(|| schema_error(path, "expected a top-level object"))?;

        let mut categories = Vec::with_capacity(object.len());
        for (name, doc) in object {
            let doc: CategoryDoc = serde_json::from_value(doc.clone())
                .map_err(|e| schema_error(path, &format!("category {name:?}: {e}")))?;

            let provisions = doc
                .provisions
                .iter()
                .map(|(id, body)| {
                    let body = body
                        .as_str()
                        .ok_or_else(|| schema_error(path, &format!("provision {id:?} body must be a string")))?;
                    Ok(Provision {
                        id: id.clone(),
                        body: body.to_string(),
                    })
                })
                .collect::<Result<Vec<_>>>()?;

            if provisions.is_empty() {
                return Err(schema_error(path, &format!("category {name:?} has no provisions")));
            }

            categories.push(Category {
                name: name.clone(),
                key_terms: doc.key_terms,
                provisions,
            });
        }

        if categories.is_empty() {
            return Err(schema_error(path, "no categories defined"));
        }
        Ok(categories)
    }

    fn parse_definitions(raw: &str, path: &str) -> Result<Vec<Definition>> {
        let value: serde_json::Value = parse_document(raw, path)?;
        let object = value.as_object().ok_or_else(|| schema_error(path, "expected a top-level object"))?;

        object
            .iter()
            .map(|(term, body)| {
                let body = body
                    .as_str()
                    .ok_or_else(|| schema_error(path, &format!("definition {term:?} must be a string")))?;
                Ok(Definition {
                    term: term.clone(),
                    body: body.to_string(),
                })
            })
            .collect()
    }

    fn parse_schedules(raw: &str, path: &str) -> Result<Vec<ScheduleEntry>> {
        let value: serde_json::Value = parse_document(raw, path)?;
        let object = value.as_object().ok_or_else(|| schema_error(path, "expected a top-level object"))?;

        object
            .iter()
            .map(|(ordinal, body)| {
                let body = body
                    .as_str()
                    .ok_or_else(|| schema_error(path, &format!("schedule {ordinal:?} must be a string")))?;
                Ok(ScheduleEntry {
                    ordinal: ordinal.to_lowercase(),
                    body: body.to_string(),
                })
            })
            .collect()
    }

    fn parse_subsidiary(raw: &str, path: &str) -> Result<Vec<SubsidiaryEntry>> {
        let doc: SubsidiaryDoc = serde_json::from_str(raw)
            .map_err(|e| schema_error(path, &e.to_string()))?;

        let mut entries = Vec::new();
        for (regulation, sections) in &doc.subsidiary_legislation_mapping {
            let sections = sections
                .as_object()
                .ok_or_else(|| schema_error(path, &format!("regulation {regulation:?} must map sections")))?;
            for (section_number, body) in sections {
                let section: SubsidiarySection = serde_json::from_value(body.clone())
                    .map_err(|e| schema_error(path, &format!("section {section_number:?}: {e}")))?;
                entries.push(SubsidiaryEntry {
                    regulation: regulation.clone(),
                    section_number: section_number.clone(),
                    description: section.description,
                });
            }
        }
        Ok(entries)
    }
}

fn read_document(path: &str) -> Result<String> {
    std::fs::read_to_string(Path::new(path)).map_err(|e| AppError::KnowledgeBase {
        path: path.to_string(),
        message: e.to_string(),
    })
}

fn parse_document(raw: &str, path: &str) -> Result<serde_json::Value> {
    serde_json::from_str(raw).map_err(|e| schema_error(path, &e.to_string()))
}

fn schema_error(path: &str, message: &str) -> AppError {
    AppError::KnowledgeBaseSchema {
        path: path.to_string(),
        message: message.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CATEGORIES: &str = r#"{
        "access and correction obligations": {
            "key_terms": ["access", "correction", "request"],
            "provisions": {
                "21 access to personal data": "Body of section 21. See the Fifth Schedule.",
                "22 correction of personal data": "Body of section 22."
            }
        }
    }"#;

    const DEFINITIONS: &str = r#"{"personal data": "data about an individual"}"#;
    const SCHEDULES: &str = r#"{"fifth": "Exceptions from access requirement."}"#;
    const SUBSIDIARY: &str = r#"{
        "subsidiary_legislation_mapping": {
            "Personal Data Protection Regulations 2021": {
                "21": {"description": "Procedure for access requests."}
            }
        }
    }"#;

    #[test]
    fn test_load_from_documents() {
        let kb = KnowledgeBase::from_documents(CATEGORIES, DEFINITIONS, SCHEDULES, SUBSIDIARY)
            .unwrap();

        assert_eq!(kb.categories().len(), 1);
        assert_eq!(kb.categories()[0].provisions.len(), 2);
        assert_eq!(kb.definitions().len(), 1);
        assert_eq!(kb.schedule("fifth").unwrap().title(), "Fifth Schedule");
        assert!(kb.subsidiary_for_section("21").is_some());
        assert!(kb.subsidiary_for_section("99").is_none());
    }

    #[test]
    fn test_section_number_extraction() {
        let p = Provision {
            id: "21 access to personal data".into(),
            body: String::new(),
        };
        assert_eq!(p.section_number(), Some("21"));

        let p = Provision {
            id: "26a transfer limitation".into(),
            body: String::new(),
        };
        assert_eq!(p.section_number(), Some("26a"));

        let p = Provision {
            id: "general provisions".into(),
            body: String::new(),
        };
        assert_eq!(p.section_number(), None);
    }

    #[test]
    fn test_schema_violation_is_fatal() {
        let err = KnowledgeBase::from_documents("[]", DEFINITIONS, SCHEDULES, SUBSIDIARY)
            .unwrap_err();
        assert!(matches!(err, AppError::KnowledgeBaseSchema { .. }));

        let err = KnowledgeBase::from_documents(
            r#"{"empty": {"key_terms": [], "provisions": {}}}"#,
            DEFINITIONS,
            SCHEDULES,
            SUBSIDIARY,
        )
        .unwrap_err();
        assert!(matches!(err, AppError::KnowledgeBaseSchema { .. }));
    }

    #[test]
    fn test_category_embedding_text() {
        let kb = KnowledgeBase::from_documents(CATEGORIES, DEFINITIONS, SCHEDULES, SUBSIDIARY)
            .unwrap();
        let text = kb.categories()[0].embedding_text();
        assert!(text.starts_with("access and correction obligations"));
        assert!(text.contains("request"));
    }
}
