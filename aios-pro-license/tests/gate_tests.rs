mod common;

use aios_pro_license::{
    FeatureGate, FixedClock, LicenseConfig, LicenseError, LicenseState, ValidationCode,
};
use common::{days_ago, gate_activated_days_ago, gate_with, now};
use pretty_assertions::assert_eq;
use std::fs;
use std::sync::Arc;
use std::thread;

// ── is_available ─────────────────────────────────────────────────

#[test]
fn nothing_available_without_license() {
    let dir = tempfile::tempdir().unwrap();
    let gate = gate_with(dir.path(), None);
    assert!(!gate.is_available("pro.squads.premium"));
    assert!(gate.list_available().is_empty());
    assert_eq!(gate.license_state().unwrap(), LicenseState::NotActivated);
    assert_eq!(gate.license_info().unwrap(), None);
}

#[test]
fn wildcard_license_grants_module() {
    let dir = tempfile::tempdir().unwrap();
    let gate = gate_activated_days_ago(dir.path(), &["pro.squads.*"], 1);
    assert!(gate.is_available("pro.squads.premium"));
    assert!(gate.is_available("pro.squads.custom"));
    assert!(!gate.is_available("pro.memory.extended"));
}

#[test]
fn exact_feature_license() {
    let dir = tempfile::tempdir().unwrap();
    let gate = gate_activated_days_ago(dir.path(), &["pro.memory.extended"], 1);
    assert!(gate.is_available("pro.memory.extended"));
    assert!(!gate.is_available("pro.memory.persistence"));
}

#[test]
fn grace_keeps_features() {
    let dir = tempfile::tempdir().unwrap();
    let gate = gate_activated_days_ago(dir.path(), &["pro.*"], 33);
    assert_eq!(gate.license_state().unwrap(), LicenseState::Grace);
    assert!(gate.is_available("pro.squads.premium"));
    assert!(gate.require("pro.squads.premium", None).is_ok());
}

#[test]
fn expired_denies_everything() {
    let dir = tempfile::tempdir().unwrap();
    let gate = gate_activated_days_ago(dir.path(), &["pro.*"], 40);
    assert_eq!(gate.license_state().unwrap(), LicenseState::Expired);
    assert!(!gate.is_available("pro.squads.premium"));
    assert!(gate.list_available().is_empty());
}

#[test]
fn state_follows_the_clock_without_reload() {
    let dir = tempfile::tempdir().unwrap();
    let record = common::record(&["pro.*"], days_ago(0));
    let store = common::store_in(dir.path());
    store.write(&record).unwrap();

    let later = FeatureGate::new(store.clone())
        .with_clock(Arc::new(FixedClock(now() + chrono::Duration::days(33))));
    assert_eq!(later.license_state().unwrap(), LicenseState::Grace);

    let much_later = FeatureGate::new(store)
        .with_clock(Arc::new(FixedClock(now() + chrono::Duration::days(40))));
    assert_eq!(much_later.license_state().unwrap(), LicenseState::Expired);
}

// ── require ──────────────────────────────────────────────────────

#[test]
fn require_uses_registry_name() {
    let dir = tempfile::tempdir().unwrap();
    let gate = gate_with(dir.path(), None);
    match gate.require("pro.squads.premium", None) {
        Err(LicenseError::FeatureUnavailable(e)) => {
            assert_eq!(e.feature_id, "pro.squads.premium");
            assert_eq!(e.friendly_name, "Premium Squads");
        }
        other => panic!("expected FeatureUnavailable, got {other:?}"),
    }
}

#[test]
fn require_prefers_caller_name_then_id() {
    let dir = tempfile::tempdir().unwrap();
    let gate = gate_with(dir.path(), None);

    let Err(LicenseError::FeatureUnavailable(named)) =
        gate.require("pro.squads.premium", Some("Squads+"))
    else {
        panic!("expected FeatureUnavailable");
    };
    assert_eq!(named.friendly_name, "Squads+");

    let Err(LicenseError::FeatureUnavailable(unknown)) = gate.require("pro.unknown.feature", None)
    else {
        panic!("expected FeatureUnavailable");
    };
    assert_eq!(unknown.friendly_name, "pro.unknown.feature");
}

#[test]
fn require_uses_configured_wording() {
    let dir = tempfile::tempdir().unwrap();
    let config = LicenseConfig {
        product_name: "Synkra Pro".into(),
        purchase_url: "https://example.com/pro".into(),
        ..LicenseConfig::default()
    };
    let gate = FeatureGate::open(dir.path(), config);
    let err = gate.require("pro.metrics.advanced", None).unwrap_err();
    let msg = err.to_string();
    assert!(msg.contains("Advanced Metrics requires an active Synkra Pro license"));
    assert!(msg.contains("https://example.com/pro"));
}

#[test]
fn require_error_never_contains_key() {
    let dir = tempfile::tempdir().unwrap();
    let gate = gate_activated_days_ago(dir.path(), &["pro.squads.*"], 1);
    let err = gate.require("pro.memory.extended", None).unwrap_err();
    common::assert_no_raw_key(&err.to_string());
    common::assert_no_raw_key(&err.cli_message());
    common::assert_no_raw_key(&serde_json::to_string(&err.report()).unwrap());
}

// ── Invalid cache ────────────────────────────────────────────────

#[test]
fn corrupted_cache_is_not_treated_as_unactivated() {
    let dir = tempfile::tempdir().unwrap();
    let store = common::store_in(dir.path());
    fs::create_dir_all(store.cache_dir()).unwrap();
    fs::write(store.cache_path(), "{ not json").unwrap();
    let gate = FeatureGate::new(store).with_clock(Arc::new(FixedClock(now())));

    assert!(!gate.is_available("pro.squads.premium"));
    match gate.require("pro.squads.premium", None) {
        Err(LicenseError::Validation(v)) => assert_eq!(v.code, ValidationCode::CorruptedCache),
        other => panic!("expected Validation, got {other:?}"),
    }
    assert!(gate.license_state().is_err());
    assert!(gate.license_info().is_err());
    assert!(gate.list_all().iter().all(|f| !f.available));
}

#[test]
fn foreign_cache_reports_machine_mismatch() {
    let dir = tempfile::tempdir().unwrap();
    common::store_in(dir.path())
        .write(&common::record(&["pro.*"], days_ago(0)))
        .unwrap();

    let store = aios_pro_license::LicenseCacheStore::new(dir.path())
        .with_machine_id(common::MACHINE_B);
    let gate = FeatureGate::new(store).with_clock(Arc::new(FixedClock(now())));
    match gate.license_state() {
        Err(LicenseError::Validation(v)) => assert_eq!(v.code, ValidationCode::MachineMismatch),
        other => panic!("expected Validation, got {other:?}"),
    }
}

#[test]
fn invalid_cache_is_logged_once() {
    let dir = tempfile::tempdir().unwrap();
    let store = common::store_in(dir.path());
    fs::create_dir_all(store.cache_dir()).unwrap();
    fs::write(store.cache_path(), "garbage").unwrap();
    let gate = FeatureGate::new(store);

    let (_, logs) = common::capture_logs(|| {
        for _ in 0..5 {
            assert!(!gate.is_available("pro.squads.premium"));
        }
    });
    assert_eq!(logs.matches("CORRUPTED_CACHE").count(), 1, "{logs}");
}

// ── Listing ──────────────────────────────────────────────────────

#[test]
fn list_available_is_sorted() {
    let dir = tempfile::tempdir().unwrap();
    let gate = gate_activated_days_ago(dir.path(), &["pro.squads.*", "pro.integrations.*"], 1);
    assert_eq!(
        gate.list_available(),
        vec![
            "pro.integrations.clickup",
            "pro.integrations.jira",
            "pro.squads.custom",
            "pro.squads.export",
            "pro.squads.marketplace",
            "pro.squads.premium",
        ]
    );
}

#[test]
fn list_all_annotates_registry() {
    let dir = tempfile::tempdir().unwrap();
    let gate = gate_activated_days_ago(dir.path(), &["pro.memory.*"], 1);
    let all = gate.list_all();
    assert_eq!(all.len(), aios_pro_license::FEATURE_REGISTRY.len());
    for status in &all {
        assert_eq!(status.available, status.module == "memory", "{}", status.id);
    }
}

#[test]
fn list_by_module_groups_features() {
    let dir = tempfile::tempdir().unwrap();
    let gate = gate_activated_days_ago(dir.path(), &["pro.*"], 1);
    let modules = gate.list_by_module();
    let names: Vec<&str> = modules.keys().map(String::as_str).collect();
    assert_eq!(names, vec!["integrations", "memory", "metrics", "squads"]);
    assert_eq!(modules["squads"].len(), 4);
    assert!(modules.values().flatten().all(|f| f.available));
}

// ── license_info ─────────────────────────────────────────────────

#[test]
fn license_info_for_active_license() {
    let dir = tempfile::tempdir().unwrap();
    let gate = gate_activated_days_ago(dir.path(), &["pro.squads.*"], 10);
    let info = gate.license_info().unwrap().unwrap();

    assert_eq!(info.state, LicenseState::Active);
    assert_eq!(info.key, "PRO-ABCD-****-****-MNOP");
    assert_eq!(info.features, vec!["pro.squads.*"]);
    assert_eq!(info.seats.max, 5);
    assert_eq!(info.activated_at, days_ago(10));
    assert_eq!(info.cache_expires_at, days_ago(10) + chrono::Duration::days(30));
    assert_eq!(info.days_remaining, 20);
    assert!(!info.in_grace);
    assert!(!info.is_expired);

    let json = serde_json::to_value(&info).unwrap();
    assert_eq!(json["state"], "Active");
    assert_eq!(json["daysRemaining"], 20);
}

#[test]
fn license_info_in_grace() {
    let dir = tempfile::tempdir().unwrap();
    let gate = gate_activated_days_ago(dir.path(), &["pro.*"], 33);
    let info = gate.license_info().unwrap().unwrap();
    assert_eq!(info.state, LicenseState::Grace);
    assert!(info.in_grace);
    assert!(!info.is_expired);
    assert_eq!(info.days_remaining, -3);

    // The lifecycle helper counts the lapsed cache window, grace included.
    let record = common::record(&["pro.*"], days_ago(33));
    assert!(aios_pro_license::is_expired(&record, now()));
}

#[test]
fn unbounded_cache_window_never_lapses() {
    let dir = tempfile::tempdir().unwrap();
    let store = common::store_in(dir.path());
    store
        .write(&common::record(&["pro.*"], now()).with_cache_valid_days(u32::MAX))
        .unwrap();
    let gate = FeatureGate::new(store).with_clock(Arc::new(FixedClock(now())));

    assert!(gate.is_available("pro.squads.custom"));
    assert!(gate.require("pro.squads.custom", None).is_ok());
    assert_eq!(gate.license_state().unwrap(), LicenseState::Active);
    assert_eq!(gate.list_available().len(), aios_pro_license::FEATURE_REGISTRY.len());
    let info = gate.license_info().unwrap().unwrap();
    assert_eq!(info.cache_expires_at, chrono::DateTime::<chrono::Utc>::MAX_UTC);
    assert!(info.days_remaining > 0);
}

// ── Caching and reload ───────────────────────────────────────────

#[test]
fn record_is_cached_until_reload() {
    let dir = tempfile::tempdir().unwrap();
    let gate = gate_with(dir.path(), None);
    assert!(!gate.is_available("pro.squads.premium"));

    gate.store()
        .write(&common::record(&["pro.squads.*"], days_ago(0)))
        .unwrap();
    assert!(!gate.is_available("pro.squads.premium"));

    gate.reload();
    assert!(gate.is_available("pro.squads.premium"));

    gate.store().delete().unwrap();
    assert!(gate.is_available("pro.squads.premium"));
    gate.reload();
    assert!(!gate.is_available("pro.squads.premium"));
}

#[test]
fn gate_is_shareable_across_threads() {
    let dir = tempfile::tempdir().unwrap();
    let gate = Arc::new(gate_activated_days_ago(dir.path(), &["pro.*"], 1));

    let handles: Vec<_> = (0..4)
        .map(|i| {
            let gate = Arc::clone(&gate);
            thread::spawn(move || {
                for _ in 0..10 {
                    assert!(gate.is_available("pro.squads.premium"));
                    if i == 0 {
                        gate.reload();
                    }
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }
}
