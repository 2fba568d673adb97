// src/main.rs
use anyhow::{Context, Result};
use clap::Parser;
use dtocost::{
    analysis::{run_complete_analysis, write_report, AnalysisParams},
    aws::{caller_account, load_sdk_config, MOCK_ACCOUNT_ID},
    config::{
        AwsArgs, Month, DEFAULT_CUR_PREFIX, DEFAULT_TARGET_MONTH, DEFAULT_TOP_N,
        DEFAULT_VPC_LOGS_PREFIX,
    },
    generate::{generate_and_upload, GenerationPlan},
    logging,
    provision::{bucket_names, create_test_buckets, print_cleanup},
    store::{MemoryStore, ObjectStore, S3Store},
};
use std::{path::PathBuf, process::ExitCode};
use tracing::{error, info};

/// Provision test buckets, fill them with synthetic data, analyze, and
/// print the cleanup commands.
#[derive(Parser, Debug)]
#[command(name = "dtocost")]
struct Cli {
    /// Run against an in-process store instead of AWS
    #[arg(long)]
    mock: bool,

    #[command(flatten)]
    aws: AwsArgs,

    #[arg(long, env = "TARGET_MONTH", default_value = DEFAULT_TARGET_MONTH)]
    target_month: Month,

    #[arg(long, env = "CUR_PREFIX", default_value = DEFAULT_CUR_PREFIX)]
    cur_prefix: String,

    #[arg(long, env = "VPC_LOGS_PREFIX", default_value = DEFAULT_VPC_LOGS_PREFIX)]
    vpc_logs_prefix: String,

    #[arg(long, env = "TOP_N", default_value_t = DEFAULT_TOP_N)]
    top_n: usize,

    /// Seed for reproducible data
    #[arg(long)]
    seed: Option<u64>,

    /// Also write the JSON report to this file
    #[arg(long)]
    output: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> ExitCode {
    logging::init();
    let cli = Cli::parse();
    info!(mock = cli.mock, month = %cli.target_month, "startup");

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("pipeline failed: {e:#}");
            println!("✗ {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    // ─── 1) store + account ──────────────────────────────────────────
    let (store, account): (Box<dyn ObjectStore>, String) = if cli.mock {
        (Box::new(MemoryStore::new()), MOCK_ACCOUNT_ID.to_string())
    } else {
        let conf = load_sdk_config(&cli.aws.region).await;
        let account = caller_account(&conf)
            .await
            .context("Failed to get AWS account ID")?;
        (Box::new(S3Store::new(&conf)), account)
    };
    let buckets = bucket_names(&account);

    // ─── 2) provision ────────────────────────────────────────────────
    println!("Step 1: Creating test buckets");
    create_test_buckets(store.as_ref(), &buckets, &cli.aws.region).await?;

    // ─── 3) synthetic data ───────────────────────────────────────────
    println!("\nStep 2: Generating test data");
    let plan = GenerationPlan {
        target_month: cli.target_month,
        cur_bucket: buckets.cur.clone(),
        cur_prefix: cli.cur_prefix.clone(),
        vpc_logs_bucket: buckets.vpc_logs.clone(),
        vpc_logs_prefix: cli.vpc_logs_prefix.clone(),
    };
    let summary = generate_and_upload(store.as_ref(), &plan, cli.seed).await?;
    info!(
        cur_records = summary.cur_records,
        flow_logs = summary.flow_logs,
        "data generated"
    );

    // ─── 4) analysis ─────────────────────────────────────────────────
    println!("\nStep 3: Running DTO analysis");
    let params = AnalysisParams {
        cur_bucket: buckets.cur.clone(),
        cur_prefix: cli.cur_prefix,
        target_month: cli.target_month,
        vpc_logs_bucket: buckets.vpc_logs.clone(),
        vpc_logs_prefix: cli.vpc_logs_prefix,
        top_n: cli.top_n,
    };
    let report = run_complete_analysis(store.as_ref(), &params)
        .await
        .context("Error running analysis")?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    if let Some(path) = &cli.output {
        write_report(&report, path)?;
        info!(path = %path.display(), "report written");
    }

    // ─── 5) cleanup hints ────────────────────────────────────────────
    print_cleanup(&buckets);
    Ok(())
}
