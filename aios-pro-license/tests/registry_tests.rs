use aios_pro_license::{
    feature_friendly_name, lookup, matches_any, pattern_matches, FEATURE_REGISTRY,
};
use proptest::prelude::*;
use std::collections::HashSet;

// ── Registry ─────────────────────────────────────────────────────

#[test]
fn registry_ids_are_unique() {
    let ids: HashSet<_> = FEATURE_REGISTRY.iter().map(|e| e.id).collect();
    assert_eq!(ids.len(), FEATURE_REGISTRY.len());
}

#[test]
fn registry_ids_live_under_their_module() {
    for entry in FEATURE_REGISTRY {
        assert!(
            entry.id.starts_with(&format!("pro.{}.", entry.module)),
            "{} not under module {}",
            entry.id,
            entry.module
        );
        assert!(!entry.name.is_empty());
        assert!(!entry.description.is_empty());
    }
}

#[test]
fn registry_covers_every_module() {
    let modules: HashSet<_> = FEATURE_REGISTRY.iter().map(|e| e.module).collect();
    for module in ["squads", "memory", "metrics", "integrations"] {
        assert!(modules.contains(module), "missing module {module}");
    }
}

#[test]
fn lookup_and_friendly_name() {
    assert_eq!(lookup("pro.squads.premium").unwrap().name, "Premium Squads");
    assert!(lookup("pro.unknown.feature").is_none());
    assert_eq!(feature_friendly_name("pro.squads.premium"), "Premium Squads");
    assert_eq!(feature_friendly_name("pro.unknown.feature"), "pro.unknown.feature");
}

// ── Pattern matching ─────────────────────────────────────────────

#[test]
fn exact_match() {
    assert!(pattern_matches("pro.squads.premium", "pro.squads.premium"));
    assert!(!pattern_matches("pro.squads.premium", "pro.squads.custom"));
}

#[test]
fn module_wildcard() {
    assert!(pattern_matches("pro.squads.*", "pro.squads.custom"));
    assert!(pattern_matches("pro.squads.*", "pro.squads.premium"));
    assert!(!pattern_matches("pro.squads.*", "pro.memory.extended"));
}

#[test]
fn top_level_wildcards() {
    assert!(pattern_matches("pro.*", "pro.integrations.jira"));
    assert!(pattern_matches("*", "pro.metrics.dashboard"));
    assert!(pattern_matches("*", "anything"));
}

#[test]
fn bare_prefix_matches_nested_ids_only_at_dot() {
    assert!(pattern_matches("pro.squads", "pro.squads"));
    assert!(pattern_matches("pro.squads", "pro.squads.custom"));
    assert!(!pattern_matches("pro.squads", "pro.squadsx"));
    assert!(!pattern_matches("pro.squads", "pro.squad"));
}

#[test]
fn matches_any_pattern() {
    let patterns = vec!["pro.squads.*".to_string(), "pro.memory.extended".to_string()];
    assert!(matches_any(&patterns, "pro.squads.export"));
    assert!(matches_any(&patterns, "pro.memory.extended"));
    assert!(!matches_any(&patterns, "pro.memory.persistence"));
    assert!(!matches_any(&[], "pro.squads.export"));
}

// =============================================================================
// MATCHING PROPERTIES
// =============================================================================

fn feature_id_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("pro\\.[a-z]{1,8}\\.[a-z]{1,8}").unwrap()
}

proptest! {
    /// Every id matches itself and the catch-all
    #[test]
    fn id_matches_itself(id in feature_id_strategy()) {
        prop_assert!(pattern_matches(&id, &id));
        prop_assert!(pattern_matches("*", &id));
        prop_assert!(pattern_matches("pro.*", &id));
    }

    /// A module wildcard matches exactly the ids in that module
    #[test]
    fn module_wildcard_matches_its_module(id in feature_id_strategy()) {
        let module: Vec<&str> = id.split('.').collect();
        let own = format!("pro.{}.*", module[1]);
        let other = format!("pro.{}x.*", module[1]);
        prop_assert!(pattern_matches(&own, &id));
        prop_assert!(!pattern_matches(&other, &id));
    }
}
