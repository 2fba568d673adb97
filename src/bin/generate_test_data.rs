use clap::Parser;
use dtocost::{
    aws::load_sdk_config,
    config::{AwsArgs, GenerateArgs},
    generate::generate_and_upload,
    logging,
    store::S3Store,
};
use std::process::ExitCode;
use tracing::error;

/// Generate a month of synthetic CUR and VPC flow log data and upload it.
#[derive(Parser, Debug)]
struct Args {
    #[command(flatten)]
    aws: AwsArgs,

    #[command(flatten)]
    generate: GenerateArgs,
}

#[tokio::main]
async fn main() -> ExitCode {
    logging::init();
    let args = Args::parse();
    let plan = args.generate.plan();

    println!("Generating test data for {}", plan.target_month);
    println!("CUR bucket: {}", plan.cur_bucket);
    println!("VPC logs bucket: {}", plan.vpc_logs_bucket);
    println!("{}", "-".repeat(50));

    let conf = load_sdk_config(&args.aws.region).await;
    let store = S3Store::new(&conf);
    match generate_and_upload(&store, &plan, args.generate.seed).await {
        Ok(summary) => {
            println!("\n{}", "=".repeat(50));
            println!("Test data generation complete!");
            println!("CUR records: {}", summary.cur_records);
            println!("VPC flow logs: {}", summary.flow_logs);
            println!("\nNext: run_dto_analysis");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{e:#}");
            println!("✗ Test data generation failed: {e:#}");
            ExitCode::FAILURE
        }
    }
}
