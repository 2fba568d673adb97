use anyhow::Result;
use clap::Parser;
use dtocost::{
    analysis::{run_complete_analysis, write_report},
    aws::load_sdk_config,
    config::{AnalyzeArgs, AwsArgs},
    logging,
    store::S3Store,
};
use std::process::ExitCode;

/// Analyze a month of CUR data and VPC flow logs and print the JSON report.
#[derive(Parser, Debug)]
struct Args {
    #[command(flatten)]
    aws: AwsArgs,

    #[command(flatten)]
    analyze: AnalyzeArgs,
}

#[tokio::main]
async fn main() -> ExitCode {
    logging::init();
    let args = Args::parse();

    println!("Analyzing DTO costs for {}...", args.analyze.target_month);
    println!("CUR Bucket: {}", args.analyze.cur_bucket);
    println!("VPC Logs Bucket: {}", args.analyze.vpc_logs_bucket);
    println!("{}", "-".repeat(50));

    match run(&args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            println!("Error running analysis: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: &Args) -> Result<()> {
    let conf = load_sdk_config(&args.aws.region).await;
    let store = S3Store::new(&conf);
    let report = run_complete_analysis(&store, &args.analyze.params()).await?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    if let Some(path) = &args.analyze.output {
        write_report(&report, path)?;
    }
    Ok(())
}
