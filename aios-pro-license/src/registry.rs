//! Compiled-in catalogue of Pro features and license pattern matching.

use serde::Serialize;

/// One gated Pro feature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FeatureRegistryEntry {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub module: &'static str,
}

const fn entry(
    id: &'static str,
    name: &'static str,
    description: &'static str,
    module: &'static str,
) -> FeatureRegistryEntry {
    FeatureRegistryEntry {
        id,
        name,
        description,
        module,
    }
}

/// All known Pro features, grouped by module.
pub static FEATURE_REGISTRY: &[FeatureRegistryEntry] = &[
    entry(
        "pro.squads.premium",
        "Premium Squads",
        "Curated agent squads maintained by the AIOS team",
        "squads",
    ),
    entry(
        "pro.squads.custom",
        "Custom Squads",
        "Define and run your own agent squads",
        "squads",
    ),
    entry(
        "pro.squads.marketplace",
        "Squad Marketplace",
        "Browse and install community squads",
        "squads",
    ),
    entry(
        "pro.squads.export",
        "Squad Export",
        "Package squads for sharing across projects",
        "squads",
    ),
    entry(
        "pro.memory.extended",
        "Extended Memory",
        "Larger context memory for agents",
        "memory",
    ),
    entry(
        "pro.memory.persistence",
        "Persistent Memory",
        "Agent memory that survives across sessions",
        "memory",
    ),
    entry(
        "pro.metrics.advanced",
        "Advanced Metrics",
        "Detailed usage and performance metrics",
        "metrics",
    ),
    entry(
        "pro.metrics.dashboard",
        "Metrics Dashboard",
        "Visual dashboard for project metrics",
        "metrics",
    ),
    entry(
        "pro.integrations.jira",
        "Jira Integration",
        "Sync stories and tasks with Jira",
        "integrations",
    ),
    entry(
        "pro.integrations.clickup",
        "ClickUp Integration",
        "Sync stories and tasks with ClickUp",
        "integrations",
    ),
];

/// Looks up a feature by id in [`FEATURE_REGISTRY`].
#[must_use]
pub fn lookup(feature_id: &str) -> Option<&'static FeatureRegistryEntry> {
    FEATURE_REGISTRY.iter().find(|e| e.id == feature_id)
}

/// Display name for a feature, falling back to the raw id.
#[must_use]
pub fn feature_friendly_name(feature_id: &str) -> String {
    lookup(feature_id).map_or_else(|| feature_id.to_string(), |e| e.name.to_string())
}

/// Whether a license feature pattern grants `feature_id`.
///
/// `pro.squads.*` grants every id under `pro.squads.`; `*` grants everything.
/// A pattern without a wildcard grants the exact id and anything nested
/// under it, so `pro.squads` grants `pro.squads.custom` but not
/// `pro.squadsX`.
#[must_use]
pub fn pattern_matches(pattern: &str, feature_id: &str) -> bool {
    if let Some(prefix) = pattern.strip_suffix('*') {
        return feature_id.starts_with(prefix);
    }
    feature_id == pattern
        || feature_id
            .strip_prefix(pattern)
            .is_some_and(|rest| rest.starts_with('.'))
}

/// Whether any pattern in `patterns` grants `feature_id`.
#[must_use]
pub fn matches_any(patterns: &[String], feature_id: &str) -> bool {
    patterns.iter().any(|p| pattern_matches(p, feature_id))
}
