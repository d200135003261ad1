//! Shared test helpers for license tests.

#![allow(dead_code)]

use aios_pro_license::{FeatureGate, FixedClock, LicenseCacheStore, LicenseRecord, Seats};
use chrono::{DateTime, Duration, TimeZone, Utc};
use std::io;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing_subscriber::fmt::MakeWriter;

/// A well-formed raw key. Must never appear on disk or in any message.
pub const RAW_KEY: &str = "PRO-ABCD-EFGH-IJKL-MNOP";

pub const MACHINE_A: &str = "machine-a-0000000000000000000000000000000000000000000000000000000";
pub const MACHINE_B: &str = "machine-b-1111111111111111111111111111111111111111111111111111111";

/// Fixed "now" shared by lifecycle tests.
pub fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
}

pub fn days_ago(days: i64) -> DateTime<Utc> {
    now() - Duration::days(days)
}

/// Store under `dir` bound to [`MACHINE_A`].
pub fn store_in(dir: &Path) -> LicenseCacheStore {
    LicenseCacheStore::new(dir).with_machine_id(MACHINE_A)
}

pub fn record(features: &[&str], activated_at: DateTime<Utc>) -> LicenseRecord {
    LicenseRecord::new(
        RAW_KEY,
        features.iter().map(|f| f.to_string()).collect(),
        Seats::new(1, 5),
        activated_at,
    )
}

/// Gate over `dir` with the clock fixed at [`now`], after writing `record`
/// if given.
pub fn gate_with(dir: &Path, record: Option<&LicenseRecord>) -> FeatureGate {
    let store = store_in(dir);
    if let Some(record) = record {
        store.write(record).unwrap();
    }
    FeatureGate::new(store).with_clock(Arc::new(FixedClock(now())))
}

/// Gate whose license was activated `days` days before [`now`].
pub fn gate_activated_days_ago(dir: &Path, features: &[&str], days: i64) -> FeatureGate {
    gate_with(dir, Some(&record(features, days_ago(days))))
}

/// Asserts `text` contains nothing that looks like a full raw license key.
pub fn assert_no_raw_key(text: &str) {
    assert!(!text.contains(RAW_KEY), "raw key leaked: {text}");
    for group in ["EFGH", "IJKL"] {
        assert!(!text.contains(group), "key segment {group} leaked: {text}");
    }
}

// ── Log capture ──────────────────────────────────────────────────

#[derive(Clone, Default)]
pub struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl CapturedLogs {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for CapturedLogs {
    type Writer = CapturedLogs;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

/// Runs `f` with a scoped subscriber and returns everything it logged.
pub fn capture_logs<T>(f: impl FnOnce() -> T) -> (T, String) {
    let logs = CapturedLogs::default();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(logs.clone())
        .with_ansi(false)
        .with_max_level(tracing::Level::DEBUG)
        .finish();
    let out = tracing::subscriber::with_default(subscriber, f);
    (out, logs.contents())
}
