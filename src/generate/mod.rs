// src/generate/mod.rs
use anyhow::{bail, Context, Result};
use bytes::Bytes;
use rand::{rngs::StdRng, SeedableRng};
use tracing::{error, info, instrument};

use crate::config::Month;
use crate::cur::write_cur_csv;
use crate::flow::{parse_flow_line, write_flow_parquet};
use crate::store::{join_key, s3_uri, ObjectStore};

pub mod billing;
pub mod network;

pub use billing::generate_cur_records;
pub use network::{generate_flow_logs, resource_addresses};

/// Object name of the resource → address map stored next to the flow logs.
pub const RESOURCE_ADDRESSES_FILE: &str = "resource-addresses.json";

/// Where the synthetic data lands.
#[derive(Debug, Clone)]
pub struct GenerationPlan {
    pub target_month: Month,
    pub cur_bucket: String,
    pub cur_prefix: String,
    pub vpc_logs_bucket: String,
    pub vpc_logs_prefix: String,
}

impl GenerationPlan {
    pub fn cur_key(&self) -> String {
        join_key(
            &self.cur_prefix,
            &format!("cur-{}/cur-data.csv.gz", self.target_month),
        )
    }

    pub fn flow_key(&self, file: &str) -> String {
        join_key(
            &self.vpc_logs_prefix,
            &format!("{}/{}", self.target_month, file),
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationSummary {
    pub cur_records: usize,
    pub flow_logs: usize,
    pub objects: Vec<String>,
}

/// Seeded RNG when a seed is given, OS entropy otherwise.
pub fn rng_from(seed: Option<u64>) -> StdRng {
    match seed {
        Some(s) => StdRng::seed_from_u64(s),
        None => StdRng::from_entropy(),
    }
}

/// Generate one month of CUR and flow-log data and upload it.
///
/// Every upload is attempted; the step fails if any of them did.
#[instrument(level = "info", skip(store, plan), fields(month = %plan.target_month))]
pub async fn generate_and_upload(
    store: &dyn ObjectStore,
    plan: &GenerationPlan,
    seed: Option<u64>,
) -> Result<GenerationSummary> {
    let (cur_csv, cur_count, flow_text, flow_parquet, flow_count, addresses) = {
        let mut rng = rng_from(seed);

        println!("Generating CUR data...");
        let cur = generate_cur_records(plan.target_month, &mut rng);
        let cur_csv = write_cur_csv(&cur, true).context("encoding CUR csv")?;

        println!("Generating VPC flow logs...");
        let lines = generate_flow_logs(plan.target_month, &mut rng);
        let flow_text = lines.join("\n");

        println!("Generating parquet VPC flow logs...");
        let records: Vec<_> = lines.iter().filter_map(|l| parse_flow_line(l)).collect();
        let flow_parquet = write_flow_parquet(&records).context("encoding flow-log parquet")?;

        let addresses = serde_json::to_vec_pretty(&resource_addresses())?;
        (cur_csv, cur.len(), flow_text, flow_parquet, lines.len(), addresses)
    };

    let uploads = [
        (plan.cur_bucket.as_str(), plan.cur_key(), Bytes::from(cur_csv)),
        (
            plan.vpc_logs_bucket.as_str(),
            plan.flow_key("flow-logs.txt"),
            Bytes::from(flow_text),
        ),
        (
            plan.vpc_logs_bucket.as_str(),
            plan.flow_key("flow-logs.parquet"),
            Bytes::from(flow_parquet),
        ),
        (
            plan.vpc_logs_bucket.as_str(),
            plan.flow_key(RESOURCE_ADDRESSES_FILE),
            Bytes::from(addresses),
        ),
    ];

    let mut objects = Vec::with_capacity(uploads.len());
    let mut failed = 0usize;
    for (bucket, key, body) in uploads {
        match store.put_object(bucket, &key, body).await {
            Ok(()) => {
                println!("✓ Uploaded {key} to s3://{bucket}/");
                objects.push(s3_uri(bucket, &key));
            }
            Err(e) => {
                println!("✗ Failed to upload {key}: {e:#}");
                error!(bucket, key = %key, error = %e, "upload failed");
                failed += 1;
            }
        }
    }
    if failed > 0 {
        bail!("{failed} of {} uploads failed", objects.len() + failed);
    }

    info!(cur_records = cur_count, flow_logs = flow_count, "test data uploaded");
    Ok(GenerationSummary {
        cur_records: cur_count,
        flow_logs: flow_count,
        objects,
    })
}
