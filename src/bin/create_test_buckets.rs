use clap::Parser;
use dtocost::{
    aws::{caller_account, load_sdk_config},
    config::AwsArgs,
    logging,
    provision::{bucket_names, create_test_buckets, print_next_steps},
    store::S3Store,
};
use std::process::ExitCode;
use tracing::error;

/// Create the per-account CUR and VPC flow log test buckets.
#[derive(Parser, Debug)]
struct Args {
    #[command(flatten)]
    aws: AwsArgs,
}

#[tokio::main]
async fn main() -> ExitCode {
    logging::init();
    let args = Args::parse();

    let conf = load_sdk_config(&args.aws.region).await;
    let account = match caller_account(&conf).await {
        Ok(a) => a,
        Err(e) => {
            println!("✗ Failed to get AWS account ID: {e:#}");
            return ExitCode::FAILURE;
        }
    };

    let buckets = bucket_names(&account);
    let store = S3Store::new(&conf);
    match create_test_buckets(&store, &buckets, &args.aws.region).await {
        Ok(()) => {
            print_next_steps(&buckets);
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}
