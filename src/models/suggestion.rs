// Operational suggestions and per-suggestion dashboard preferences

use serde::{Deserialize, Serialize};

/// Urgency tier. Ordered `Info < Warning < Critical`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

/// One fired rule. `id` is the rule key and stays stable across evaluations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Suggestion {
    pub id: String,
    pub severity: Severity,
    pub title: String,
    pub description: String,
    pub metric_summary: String,
}

/// Dismissal/note state a manager attached to a suggestion id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestionPref {
    pub dismissed: bool,
    pub note: String,
    pub updated_at: i64,
}

/// Suggestions split by dismissal state, each side in rule order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SuggestionBoard {
    pub visible: Vec<Suggestion>,
    pub dismissed: Vec<Suggestion>,
}
