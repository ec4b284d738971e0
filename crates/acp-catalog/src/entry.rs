use acp_core::Risk;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::CatalogError;

/// A tenant's view of one executable tool: its schema, required scopes, and
/// advisory metadata. Lookups against a catalog are case-insensitive on
/// `slug`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogEntry {
    /// `PROVIDER__action.name`, the catalog's primary key alongside tenant.
    pub slug: String,
    pub display_name: String,
    pub description: String,
    pub version: String,
    pub risk: Risk,
    /// JSON Schema (draft-2020-12 compatible) the entry's arguments must satisfy.
    pub schema: Value,
    /// Ordered, deduplication-preserving set of scopes this tool requires.
    pub required_scopes: Vec<String>,
}

impl CatalogEntry {
    /// Validates `arguments` against this entry's JSON Schema.
    ///
    /// Mirrors `ToolCatalogEntry.validate_arguments` in the original
    /// implementation, which defers entirely to the schema library rather
    /// than hand-rolling field checks.
    pub fn validate(&self, arguments: &Value) -> Result<(), CatalogError> {
        let validator = jsonschema::validator_for(&self.schema)
            .map_err(|e| CatalogError::InvalidSchema(self.slug.clone(), e.to_string()))?;

        validator
            .validate(arguments)
            .map_err(|e| CatalogError::SchemaViolation(self.slug.clone(), e.to_string()))
    }

    /// A human-readable snippet embedded in the system prompt, listing the
    /// tool's scopes and a truncated excerpt of its schema properties.
    pub fn prompt_snippet(&self) -> String {
        let scope_label = if self.required_scopes.is_empty() {
            "none".to_string()
        } else {
            self.required_scopes.join(", ")
        };

        let properties = self
            .schema
            .get("properties")
            .cloned()
            .unwrap_or_else(|| Value::Object(Default::default()));
        let mut schema_excerpt = serde_json::to_string(&properties).unwrap_or_default();
        schema_excerpt.truncate(400);

        format!(
            "Tool `{}` (v{}, risk={})\nScopes: {}\nDescription: {}\nSchema properties: {}\n",
            self.slug, self.version, self.risk, scope_label, self.description, schema_excerpt
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn entry() -> CatalogEntry {
        CatalogEntry {
            slug: "GMAIL__drafts.create".into(),
            display_name: "Create Gmail Draft".into(),
            description: "Prepare a Gmail draft for review.".into(),
            version: "1.0".into(),
            risk: Risk::Medium,
            schema: json!({
                "type": "object",
                "required": ["to", "subject", "body"],
                "properties": {
                    "to": {"type": "string"},
                    "subject": {"type": "string"},
                    "body": {"type": "string"},
                },
            }),
            required_scopes: vec!["GMAIL.SMTP".into()],
        }
    }

    #[test]
    fn accepts_matching_arguments() {
        let e = entry();
        let args = json!({"to": "c@e.com", "subject": "Renewal", "body": "Hi"});
        assert!(e.validate(&args).is_ok());
    }

    #[test]
    fn rejects_missing_required_field() {
        let e = entry();
        let args = json!({"to": "c@e.com", "subject": "Renewal"});
        assert!(e.validate(&args).is_err());
    }

    #[test]
    fn rejects_wrong_type() {
        let e = entry();
        let args = json!({"to": 5, "subject": "s", "body": "b"});
        assert!(e.validate(&args).is_err());
    }

    #[test]
    fn prompt_snippet_includes_slug_and_scopes() {
        let snippet = entry().prompt_snippet();
        assert!(snippet.contains("GMAIL__drafts.create"));
        assert!(snippet.contains("GMAIL.SMTP"));
    }
}
