use std::collections::HashMap;
use std::sync::RwLock;

use crate::entry::CatalogEntry;

/// Contract for resolving a tenant's catalog. Implementations must perform
/// slug lookups case-insensitively.
pub trait CatalogService: Send + Sync {
    /// Every tool entry registered for `tenant`.
    fn list_tools(&self, tenant: &str) -> Vec<CatalogEntry>;

    /// A single tool entry, looked up case-insensitively on `slug`.
    fn get_tool(&self, tenant: &str, slug: &str) -> Option<CatalogEntry>;

    /// Idempotently upserts the full set of entries for `tenant`, keyed on
    /// `(tenant, slug)`. Entries not present in `entries` are left alone —
    /// this is an upsert, not a replace.
    fn sync_entries(&self, tenant: &str, entries: Vec<CatalogEntry>);
}

/// In-memory catalog for tests and local demos, keyed by
/// `(tenant, lowercased slug)`.
#[derive(Default)]
pub struct InMemoryCatalogService {
    entries: RwLock<HashMap<String, HashMap<String, CatalogEntry>>>,
}

impl InMemoryCatalogService {
    /// An empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a catalog pre-seeded with `entries` for `tenant`.
    pub fn seeded(tenant: impl Into<String>, entries: Vec<CatalogEntry>) -> Self {
        let svc = Self::new();
        svc.sync_entries(&tenant.into(), entries);
        svc
    }
}

impl CatalogService for InMemoryCatalogService {
    fn list_tools(&self, tenant: &str) -> Vec<CatalogEntry> {
        self.entries
            .read()
            .unwrap()
            .get(tenant)
            .map(|by_slug| by_slug.values().cloned().collect())
            .unwrap_or_default()
    }

    fn get_tool(&self, tenant: &str, slug: &str) -> Option<CatalogEntry> {
        self.entries
            .read()
            .unwrap()
            .get(tenant)?
            .get(&slug.to_ascii_lowercase())
            .cloned()
    }

    fn sync_entries(&self, tenant: &str, entries: Vec<CatalogEntry>) {
        let mut guard = self.entries.write().unwrap();
        let by_slug = guard.entry(tenant.to_string()).or_default();
        for entry in entries {
            by_slug.insert(entry.slug.to_ascii_lowercase(), entry);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use acp_core::Risk;
    use serde_json::json;

    fn entry(slug: &str) -> CatalogEntry {
        CatalogEntry {
            slug: slug.to_string(),
            display_name: slug.to_string(),
            description: String::new(),
            version: "1".into(),
            risk: Risk::Low,
            schema: json!({"type": "object"}),
            required_scopes: vec![],
        }
    }

    #[test]
    fn lookup_is_case_insensitive() {
        let svc = InMemoryCatalogService::seeded("t1", vec![entry("Slack__chat.postMessage")]);
        assert!(svc.get_tool("t1", "slack__chat.postmessage").is_some());
        assert!(svc.get_tool("t1", "SLACK__CHAT.POSTMESSAGE").is_some());
    }

    #[test]
    fn sync_entries_is_idempotent_upsert() {
        let svc = InMemoryCatalogService::new();
        svc.sync_entries("t1", vec![entry("a__b")]);
        svc.sync_entries("t1", vec![entry("a__b"), entry("c__d")]);
        assert_eq!(svc.list_tools("t1").len(), 2);
    }

    #[test]
    fn unknown_tenant_returns_empty() {
        let svc = InMemoryCatalogService::new();
        assert!(svc.list_tools("missing").is_empty());
        assert!(svc.get_tool("missing", "a__b").is_none());
    }
}
