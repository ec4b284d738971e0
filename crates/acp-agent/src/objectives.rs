//! Tenant objectives surfaced in the system prompt. Ported from
//! `original_source/agent/services/objectives.py`.
use std::collections::HashMap;
use std::sync::RwLock;

use serde::{Deserialize, Serialize};

/// A tenant goal the agent's system prompt is composed around.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Objective {
    pub objective_id: String,
    pub title: String,
    pub metric: String,
    pub target: String,
    pub horizon: String,
    pub summary: String,
}

/// Contract for resolving a tenant's objectives.
pub trait ObjectivesService: Send + Sync {
    /// All objectives currently active for `tenant_id`, unordered.
    fn list_objectives(&self, tenant_id: &str) -> Vec<Objective>;
}

/// Static objectives used for demos and unit tests.
#[derive(Default)]
pub struct InMemoryObjectivesService {
    by_tenant: RwLock<HashMap<String, Vec<Objective>>>,
}

impl InMemoryObjectivesService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-seeds `tenant` with `objectives`.
    pub fn seeded(tenant: impl Into<String>, objectives: Vec<Objective>) -> Self {
        let svc = Self::new();
        svc.by_tenant.write().unwrap().insert(tenant.into(), objectives);
        svc
    }
}

impl ObjectivesService for InMemoryObjectivesService {
    fn list_objectives(&self, tenant_id: &str) -> Vec<Objective> {
        self.by_tenant
            .read()
            .unwrap()
            .get(tenant_id)
            .cloned()
            .unwrap_or_default()
    }
}

/// Two demo objectives, ported in intent from the original's
/// `DEFAULT_OBJECTIVES` fixture — not product configuration.
pub fn default_objectives() -> Vec<Objective> {
    vec![
        Objective {
            objective_id: "obj-increase-renewals".to_string(),
            title: "Increase renewal rate".to_string(),
            metric: "renewal_rate".to_string(),
            target: "+5% QoQ".to_string(),
            horizon: "Q4".to_string(),
            summary: "Partner with CSMs to contact at-risk customers before renewal milestones."
                .to_string(),
        },
        Objective {
            objective_id: "obj-improve-sla".to_string(),
            title: "Improve support SLA".to_string(),
            metric: "sla_achieved".to_string(),
            target: ">= 95%".to_string(),
            horizon: "Monthly".to_string(),
            summary: "Ensure all priority incidents receive responses under 30 minutes."
                .to_string(),
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unseeded_tenant_has_no_objectives() {
        let svc = InMemoryObjectivesService::new();
        assert!(svc.list_objectives("missing").is_empty());
    }

    #[test]
    fn seeded_tenant_returns_its_objectives() {
        let svc = InMemoryObjectivesService::seeded("t1", default_objectives());
        assert_eq!(svc.list_objectives("t1").len(), 2);
    }
}
