// src/setup_check.rs
use std::collections::BTreeMap;
use tracing::{debug, warn};

use crate::aws::Credentials;
use crate::store::{BucketAccess, ObjectStore};

pub const REQUIRED_VARS: [&str; 2] = ["CUR_BUCKET", "TARGET_MONTH"];
pub const OPTIONAL_VARS: [&str; 3] = ["VPC_LOGS_BUCKET", "CUR_PREFIX", "VPC_LOGS_PREFIX"];

/// Placeholder bucket name that skips the VPC logs access check.
pub const DUMMY_BUCKET: &str = "dummy-bucket";

/// The variables the checks look at, captured once. Empty values count as unset.
#[derive(Debug, Clone, Default)]
pub struct EnvSnapshot {
    vars: BTreeMap<&'static str, String>,
}

impl EnvSnapshot {
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let vars = REQUIRED_VARS
            .iter()
            .chain(OPTIONAL_VARS.iter())
            .filter_map(|&name| {
                lookup(name)
                    .filter(|v| !v.is_empty())
                    .map(|v| (name, v))
            })
            .collect();
        EnvSnapshot { vars }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars.get(name).map(String::as_str)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckReport {
    pub passed: usize,
    pub total: usize,
}

impl CheckReport {
    pub fn all_passed(&self) -> bool {
        self.passed == self.total
    }

    fn record(&mut self, ok: bool) {
        self.total += 1;
        if ok {
            self.passed += 1;
        }
    }
}

pub fn check_credentials(creds: &Credentials) -> bool {
    match creds {
        Credentials::Valid { account } => {
            println!("✓ AWS credentials valid - Account: {account}");
            true
        }
        Credentials::Missing => {
            println!("✗ AWS credentials not found. Run 'aws configure' or set environment variables");
            false
        }
        Credentials::Invalid(e) => {
            println!("✗ AWS credential error: {e}");
            false
        }
    }
}

pub fn check_environment(env: &EnvSnapshot) -> bool {
    let missing: Vec<&str> = REQUIRED_VARS
        .iter()
        .copied()
        .filter(|v| env.get(v).is_none())
        .collect();
    if !missing.is_empty() {
        println!(
            "✗ Missing required environment variables: {}",
            missing.join(", ")
        );
        return false;
    }

    println!("✓ Required environment variables set");
    for var in OPTIONAL_VARS {
        println!("  {var}: {}", env.get(var).unwrap_or("Not set"));
    }
    true
}

pub async fn check_bucket_access(store: &dyn ObjectStore, bucket: &str, prefix: &str) -> bool {
    let access = store.check_bucket(bucket, prefix).await;
    debug!(bucket, prefix, ?access, "bucket probe");
    match access {
        BucketAccess::Accessible { key_count } => {
            println!(
                "✓ S3 bucket '{bucket}' accessible - {key_count} files found with prefix '{prefix}'"
            );
            true
        }
        BucketAccess::NotFound => {
            println!("✗ S3 bucket '{bucket}' not found");
            false
        }
        BucketAccess::AccessDenied => {
            println!("✗ Access denied to S3 bucket '{bucket}'");
            false
        }
        BucketAccess::Error(e) => {
            warn!(bucket, error = %e, "bucket probe failed");
            println!("✗ S3 error for bucket '{bucket}': {e}");
            false
        }
    }
}

/// Run every applicable check and print the tally.
///
/// Bucket checks only count when the bucket variable is set; the VPC logs
/// bucket is also skipped when it holds the placeholder name.
pub async fn run_checks(
    creds: &Credentials,
    env: &EnvSnapshot,
    store: &dyn ObjectStore,
) -> CheckReport {
    println!("DTO Cost Analysis - Environment Test");
    println!("{}", "=".repeat(50));

    let mut report = CheckReport { passed: 0, total: 0 };
    report.record(check_credentials(creds));
    report.record(check_environment(env));

    if let Some(bucket) = env.get("CUR_BUCKET") {
        let prefix = env.get("CUR_PREFIX").unwrap_or("");
        report.record(check_bucket_access(store, bucket, prefix).await);
    }
    if let Some(bucket) = env.get("VPC_LOGS_BUCKET").filter(|b| *b != DUMMY_BUCKET) {
        let prefix = env.get("VPC_LOGS_PREFIX").unwrap_or("");
        report.record(check_bucket_access(store, bucket, prefix).await);
    }

    println!("\n{}", "=".repeat(50));
    println!("Tests passed: {}/{}", report.passed, report.total);
    if report.all_passed() {
        println!("✓ Environment ready! You can run: run_dto_analysis");
    } else {
        println!("✗ Please fix the issues above before running the analysis");
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use bytes::Bytes;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> EnvSnapshot {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        EnvSnapshot::from_lookup(|name| map.get(name).cloned())
    }

    fn valid() -> Credentials {
        Credentials::Valid {
            account: "123456789012".into(),
        }
    }

    #[test]
    fn snapshot_ignores_empty_and_unknown() {
        let e = env(&[("CUR_BUCKET", ""), ("TARGET_MONTH", "2024-01"), ("HOME", "/root")]);
        assert_eq!(e.get("CUR_BUCKET"), None);
        assert_eq!(e.get("TARGET_MONTH"), Some("2024-01"));
        assert_eq!(e.get("HOME"), None);
    }

    #[test]
    fn required_vars() {
        assert!(!check_environment(&env(&[("CUR_BUCKET", "b")])));
        assert!(check_environment(&env(&[
            ("CUR_BUCKET", "b"),
            ("TARGET_MONTH", "2024-01")
        ])));
    }

    #[test]
    fn credential_outcomes() {
        assert!(check_credentials(&valid()));
        assert!(!check_credentials(&Credentials::Missing));
        assert!(!check_credentials(&Credentials::Invalid("expired".into())));
    }

    #[tokio::test]
    async fn all_checks_pass() {
        let store = MemoryStore::with_buckets(["cur", "vpc"]);
        store
            .put_object("cur", "cur-reports/x.csv", Bytes::from_static(b"a"))
            .await
            .unwrap();
        let e = env(&[
            ("CUR_BUCKET", "cur"),
            ("TARGET_MONTH", "2024-01"),
            ("CUR_PREFIX", "cur-reports/"),
            ("VPC_LOGS_BUCKET", "vpc"),
        ]);
        let report = run_checks(&valid(), &e, &store).await;
        assert_eq!(report, CheckReport { passed: 4, total: 4 });
        assert!(report.all_passed());
    }

    #[tokio::test]
    async fn dummy_vpc_bucket_is_skipped() {
        let store = MemoryStore::with_buckets(["cur"]);
        let e = env(&[
            ("CUR_BUCKET", "cur"),
            ("TARGET_MONTH", "2024-01"),
            ("VPC_LOGS_BUCKET", DUMMY_BUCKET),
        ]);
        let report = run_checks(&valid(), &e, &store).await;
        assert_eq!(report, CheckReport { passed: 3, total: 3 });
    }

    #[tokio::test]
    async fn failures_are_counted() {
        let store = MemoryStore::with_buckets(["vpc"]);
        store.deny("vpc");
        let e = env(&[("CUR_BUCKET", "missing"), ("VPC_LOGS_BUCKET", "vpc")]);
        let report = run_checks(&Credentials::Missing, &e, &store).await;
        assert_eq!(report, CheckReport { passed: 0, total: 4 });
        assert!(!report.all_passed());
    }
}
