use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::error::CoreError;

/// Risk tier an agent attaches to a proposed action.
///
/// Defaults to [`Risk::Low`] when a payload omits it, matching the
/// original builder's `payload.get("risk", "low")` fallback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Risk {
    Low,
    Medium,
    High,
}

impl Default for Risk {
    fn default() -> Self {
        Risk::Low
    }
}

impl std::fmt::Display for Risk {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Risk::Low => "low",
            Risk::Medium => "medium",
            Risk::High => "high",
        };
        f.write_str(s)
    }
}

impl std::str::FromStr for Risk {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "low" => Ok(Risk::Low),
            "medium" => Ok(Risk::Medium),
            "high" => Ok(Risk::High),
            other => Err(CoreError::InvalidRisk(other.to_string())),
        }
    }
}

/// A tenant-scoped proposal to execute a third-party SaaS action, staged
/// by an agent before it is admitted onto the outbox.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Envelope {
    pub envelope_id: Uuid,
    pub tenant_id: String,
    /// `PROVIDER__action.name`, e.g. `slack__chat.postMessage`.
    pub tool_slug: String,
    pub arguments: Map<String, Value>,
    pub connected_account_id: Option<String>,
    #[serde(default)]
    pub risk: Risk,
    /// Idempotency key surfaced to the downstream provider.
    pub external_id: String,
    #[serde(default)]
    pub trust_context: Map<String, Value>,
    #[serde(default)]
    pub metadata: Map<String, Value>,
    pub created_at: DateTime<Utc>,
}

impl Envelope {
    /// Builds an envelope from an untyped JSON payload, the shape an agent
    /// tool call hands over at the model boundary.
    ///
    /// Mirrors the original `Envelope.from_payload` contract: `tool_slug`
    /// (or the legacy `slug` key) is required and non-blank, `arguments`
    /// must be an object (defaulting to empty), and `envelope_id` /
    /// `external_id` are minted as fresh UUIDs when absent. Any failure
    /// here must leave no partial state behind — this is a pure
    /// constructor with no side effects.
    pub fn from_payload(
        payload: &Value,
        tenant_id: impl Into<String>,
        default_risk: Risk,
    ) -> Result<Self, CoreError> {
        let obj = payload.as_object().ok_or(CoreError::PayloadNotObject)?;

        let tool_slug = obj
            .get("tool_slug")
            .or_else(|| obj.get("slug"))
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or(CoreError::MissingToolSlug)?
            .to_string();

        let arguments = match obj.get("arguments") {
            None | Some(Value::Null) => Map::new(),
            Some(Value::Object(map)) => map.clone(),
            Some(_) => return Err(CoreError::InvalidArguments),
        };

        let envelope_id = obj
            .get("envelope_id")
            .and_then(Value::as_str)
            .and_then(|s| Uuid::parse_str(s).ok())
            .unwrap_or_else(Uuid::new_v4);

        let external_id = obj
            .get("external_id")
            .and_then(Value::as_str)
            .filter(|s| !s.trim().is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        let connected_account_id = obj
            .get("connected_account_id")
            .and_then(Value::as_str)
            .map(str::to_string);

        let risk = obj
            .get("risk")
            .and_then(Value::as_str)
            .map(|s| s.parse::<Risk>())
            .transpose()?
            .unwrap_or(default_risk);

        let trust_context = obj
            .get("trust_context")
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default();

        let metadata = obj
            .get("metadata")
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default();

        let created_at = match obj.get("created_at") {
            None | Some(Value::Null) => Utc::now(),
            Some(Value::String(s)) => DateTime::parse_from_rfc3339(s)
                .map(|dt| dt.with_timezone(&Utc))
                .map_err(|_| CoreError::InvalidTimestamp(s.clone()))?,
            Some(other) => return Err(CoreError::InvalidTimestamp(other.to_string())),
        };

        Ok(Envelope {
            envelope_id,
            tenant_id: tenant_id.into(),
            tool_slug,
            arguments,
            connected_account_id,
            risk,
            external_id,
            trust_context,
            metadata,
            created_at,
        })
    }

    /// Splits `tool_slug` into a `(provider, action)` pair on the `__`
    /// separator, for display and audit purposes.
    pub fn provider_and_action(&self) -> (&str, &str) {
        match self.tool_slug.split_once("__") {
            Some((provider, action)) => (provider, action),
            None => (self.tool_slug.as_str(), ""),
        }
    }
}

/// Turns `slack__chat.postMessage` into `"Slack · Chat Post Message"`,
/// the human-readable label the desk UI shows for a queued action.
pub fn humanize_slug(tool_slug: &str) -> String {
    let (provider, action) = match tool_slug.split_once("__") {
        Some(parts) => parts,
        None => (tool_slug, ""),
    };

    let title_case = |s: &str| -> String {
        s.split(|c: char| c == '.' || c == '_' || c.is_whitespace())
            .filter(|w| !w.is_empty())
            .map(|w| {
                let mut chars = w.chars();
                match chars.next() {
                    Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                    None => String::new(),
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    };

    let provider_label = title_case(provider);
    if action.is_empty() {
        provider_label
    } else {
        format!("{} · {}", provider_label, title_case(action))
    }
}
