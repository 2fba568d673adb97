// src/provision.rs
use anyhow::{bail, Result};
use tracing::{error, info};

use crate::store::{BucketOutcome, ObjectStore};

/// The pair of buckets the harness writes its synthetic data to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestBuckets {
    pub cur: String,
    pub vpc_logs: String,
}

impl TestBuckets {
    pub fn names(&self) -> [&str; 2] {
        [self.cur.as_str(), self.vpc_logs.as_str()]
    }
}

/// Bucket names are made unique per account.
pub fn bucket_names(account_id: &str) -> TestBuckets {
    TestBuckets {
        cur: format!("dto-test-cur-{account_id}"),
        vpc_logs: format!("dto-test-vpc-logs-{account_id}"),
    }
}

/// Create both buckets. Both are always attempted; the step fails if
/// either could not be created.
pub async fn create_test_buckets(
    store: &dyn ObjectStore,
    buckets: &TestBuckets,
    region: &str,
) -> Result<()> {
    println!("Creating test S3 buckets for DTO analysis...");
    println!("Region: {region}");
    println!("CUR bucket: {}", buckets.cur);
    println!("VPC logs bucket: {}", buckets.vpc_logs);
    println!("{}", "-".repeat(50));

    let mut failed = Vec::new();
    for name in buckets.names() {
        match store.ensure_bucket(name, region).await {
            Ok(BucketOutcome::Created) => {
                info!(bucket = name, region, "bucket created");
                println!("✓ Created bucket: {name}");
            }
            Ok(BucketOutcome::AlreadyExists) => println!("✓ Bucket {name} already exists"),
            Ok(BucketOutcome::AlreadyOwned) => println!("✓ Bucket {name} already owned by you"),
            Err(e) => {
                error!(bucket = name, error = %e, "bucket creation failed");
                println!("✗ Failed to create bucket {name}: {e:#}");
                failed.push(name);
            }
        }
    }

    if !failed.is_empty() {
        println!("\n✗ Failed to create some buckets");
        bail!("could not create {}", failed.join(", "));
    }
    Ok(())
}

pub fn print_next_steps(buckets: &TestBuckets) {
    println!("\n{}", "=".repeat(50));
    println!("Buckets created successfully!");
    println!("\nUpdate your environment variables:");
    println!("export CUR_BUCKET={}", buckets.cur);
    println!("export VPC_LOGS_BUCKET={}", buckets.vpc_logs);
    println!("\nNext steps:");
    println!("1. generate_test_data");
    println!("2. run_dto_analysis");
}

/// Shell commands that delete the buckets and everything in them.
pub fn cleanup_commands(buckets: &TestBuckets) -> Vec<String> {
    buckets
        .names()
        .iter()
        .map(|b| format!("aws s3 rb s3://{b} --force"))
        .collect()
}

pub fn print_cleanup(buckets: &TestBuckets) {
    println!("\nTo clean up test resources:");
    for cmd in cleanup_commands(buckets) {
        println!("{cmd}");
    }
}
