//! acp-policy
#![deny(unsafe_code)]
#![warn(missing_docs)]
//!
//! Resolves the effective write permission and rate bucket for a
//! `(tenant, tool_slug)` pair — the gate the worker consults before ever
//! calling the external provider.

use std::collections::HashMap;
use std::sync::RwLock;

use acp_core::Risk;
use serde::{Deserialize, Serialize};

/// The resolved policy the worker must honour for a given tool.
///
/// `write_allowed = false` disables execution regardless of what the
/// guardrail pipeline decided; guardrails and policy are independent gates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EffectivePolicy {
    pub write_allowed: bool,
    /// Named throttling channel shared by tools of the same class, e.g.
    /// `slack.minute`. `None` means the tool is unthrottled.
    pub rate_bucket: Option<String>,
    pub risk: Option<Risk>,
    /// Advisory approval mode (`"auto"`, `"manual"`, …); not interpreted here.
    pub approval: Option<String>,
}

impl EffectivePolicy {
    /// A policy that permits execution with no rate bucket, the shape most
    /// demo/test catalogs want by default.
    pub fn allow() -> Self {
        Self {
            write_allowed: true,
            rate_bucket: None,
            risk: None,
            approval: None,
        }
    }

    /// A policy that disables execution outright.
    pub fn deny() -> Self {
        Self {
            write_allowed: false,
            rate_bucket: None,
            risk: None,
            approval: None,
        }
    }

    /// Same policy with a rate bucket attached.
    pub fn with_rate_bucket(mut self, bucket: impl Into<String>) -> Self {
        self.rate_bucket = Some(bucket.into());
        self
    }
}

/// Contract for resolving the effective policy of a `(tenant, slug)` pair.
/// Two implementations coexist in a deployment: an in-memory one for tests,
/// and a durable-store-backed one joining tenant overrides onto catalog
/// defaults (the `catalog_tools_view` of spec.md §6).
pub trait PolicyResolver: Send + Sync {
    /// Resolves the effective policy, or `None` if the tool has no policy
    /// entry at all (distinct from an explicit deny).
    fn get_effective_policy(&self, tenant: &str, slug: &str) -> Option<EffectivePolicy>;
}

/// In-memory policy resolver, keyed by `(tenant, lowercased slug)`.
#[derive(Default)]
pub struct InMemoryPolicyResolver {
    policies: RwLock<HashMap<(String, String), EffectivePolicy>>,
}

impl InMemoryPolicyResolver {
    /// An empty resolver; every lookup returns `None` until entries are set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets (or replaces) the policy for `(tenant, slug)`.
    pub fn set_policy(&self, tenant: &str, slug: &str, policy: EffectivePolicy) {
        self.policies
            .write()
            .unwrap()
            .insert((tenant.to_string(), slug.to_ascii_lowercase()), policy);
    }
}

impl PolicyResolver for InMemoryPolicyResolver {
    fn get_effective_policy(&self, tenant: &str, slug: &str) -> Option<EffectivePolicy> {
        self.policies
            .read()
            .unwrap()
            .get(&(tenant.to_string(), slug.to_ascii_lowercase()))
            .cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unset_policy_is_none() {
        let resolver = InMemoryPolicyResolver::new();
        assert!(resolver.get_effective_policy("t1", "a__b").is_none());
    }

    #[test]
    fn lookup_is_case_insensitive() {
        let resolver = InMemoryPolicyResolver::new();
        resolver.set_policy("t1", "Slack__chat.postMessage", EffectivePolicy::allow());
        assert!(resolver
            .get_effective_policy("t1", "slack__chat.postmessage")
            .is_some());
    }

    #[test]
    fn deny_disables_writes() {
        let policy = EffectivePolicy::deny();
        assert!(!policy.write_allowed);
    }

    #[test]
    fn rate_bucket_builder_attaches_bucket() {
        let policy = EffectivePolicy::allow().with_rate_bucket("slack.minute");
        assert_eq!(policy.rate_bucket.as_deref(), Some("slack.minute"));
    }
}
