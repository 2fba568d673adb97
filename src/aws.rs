use anyhow::{anyhow, Result};
use aws_config::{BehaviorVersion, Region, SdkConfig};
use aws_credential_types::provider::{error::CredentialsError, ProvideCredentials};
use aws_sdk_sts as sts;
use sts::error::DisplayErrorContext;
use tracing::debug;

/// Account used by `--mock` runs, the documentation account from the AWS docs.
pub const MOCK_ACCOUNT_ID: &str = "123456789012";

/// Outcome of probing the credential chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credentials {
    Valid { account: String },
    Missing,
    Invalid(String),
}

/// Load the default provider chain pinned to `region`.
pub async fn load_sdk_config(region: &str) -> SdkConfig {
    aws_config::defaults(BehaviorVersion::latest())
        .region(Region::new(region.to_string()))
        .load()
        .await
}

/// Account ID of the caller, via `sts:GetCallerIdentity`.
pub async fn caller_account(conf: &SdkConfig) -> Result<String> {
    let client = sts::Client::new(conf);
    let who = client
        .get_caller_identity()
        .send()
        .await
        .map_err(|e| anyhow!("sts:GetCallerIdentity failed: {}", DisplayErrorContext(&e)))?;
    let account = who
        .account()
        .ok_or_else(|| anyhow!("caller identity carries no account id"))?;
    debug!(account, arn = ?who.arn(), "resolved caller identity");
    Ok(account.to_string())
}

/// Resolve credentials first so that an empty chain is told apart from
/// credentials STS rejects.
pub async fn probe_credentials(conf: &SdkConfig) -> Credentials {
    let Some(provider) = conf.credentials_provider() else {
        return Credentials::Missing;
    };
    match provider.provide_credentials().await {
        Ok(_) => {}
        Err(CredentialsError::CredentialsNotLoaded(_)) => return Credentials::Missing,
        Err(e) => return Credentials::Invalid(DisplayErrorContext(&e).to_string()),
    }
    match caller_account(conf).await {
        Ok(account) => Credentials::Valid { account },
        Err(e) => Credentials::Invalid(format!("{e:#}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aws_credential_types::provider::{future, SharedCredentialsProvider};

    #[derive(Debug)]
    struct Failing(fn() -> CredentialsError);

    impl ProvideCredentials for Failing {
        fn provide_credentials<'a>(&'a self) -> future::ProvideCredentials<'a>
        where
            Self: 'a,
        {
            future::ProvideCredentials::ready(Err((self.0)()))
        }
    }

    fn config_with(provider: Failing) -> SdkConfig {
        SdkConfig::builder()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new("us-east-1"))
            .credentials_provider(SharedCredentialsProvider::new(provider))
            .build()
    }

    #[tokio::test]
    async fn no_provider_is_missing() {
        let conf = SdkConfig::builder().build();
        assert_eq!(probe_credentials(&conf).await, Credentials::Missing);
    }

    #[tokio::test]
    async fn empty_chain_is_missing() {
        let conf = config_with(Failing(|| CredentialsError::not_loaded("no profile")));
        assert_eq!(probe_credentials(&conf).await, Credentials::Missing);
    }

    #[tokio::test]
    async fn broken_provider_is_invalid() {
        let conf = config_with(Failing(|| CredentialsError::invalid_configuration("bad profile")));
        match probe_credentials(&conf).await {
            Credentials::Invalid(msg) => assert!(msg.contains("bad profile"), "{msg}"),
            other => panic!("unexpected {other:?}"),
        }
    }
}
