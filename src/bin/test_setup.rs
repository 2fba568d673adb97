use clap::Parser;
use dtocost::{
    aws::{load_sdk_config, probe_credentials},
    config::AwsArgs,
    logging,
    setup_check::{run_checks, EnvSnapshot},
    store::S3Store,
};
use std::process::ExitCode;

/// Check credentials, environment variables and bucket access before an analysis run.
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
    let creds = probe_credentials(&conf).await;
    let store = S3Store::new(&conf);
    let report = run_checks(&creds, &EnvSnapshot::from_env(), &store).await;

    if report.all_passed() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
