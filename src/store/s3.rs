use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_s3 as s3;
use bytes::Bytes;
use s3::{
    error::DisplayErrorContext,
    primitives::ByteStream,
    types::{BucketLocationConstraint, CreateBucketConfiguration},
};
use tracing::{debug, instrument};

use super::{BucketAccess, BucketOutcome, ObjectInfo, ObjectStore};

/// `us-east-1` is the one region that rejects an explicit location constraint.
const DEFAULT_LOCATION: &str = "us-east-1";

pub struct S3Store {
    client: s3::Client,
}

impl S3Store {
    pub fn new(conf: &SdkConfig) -> Self {
        Self::from_client(s3::Client::new(conf))
    }

    pub fn from_client(client: s3::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ObjectStore for S3Store {
    #[instrument(level = "debug", skip(self))]
    async fn ensure_bucket(&self, bucket: &str, region: &str) -> Result<BucketOutcome> {
        let mut req = self.client.create_bucket().bucket(bucket);
        if region != DEFAULT_LOCATION {
            let cfg = CreateBucketConfiguration::builder()
                .location_constraint(BucketLocationConstraint::from(region))
                .build();
            req = req.create_bucket_configuration(cfg);
        }

        match req.send().await {
            Ok(_) => Ok(BucketOutcome::Created),
            Err(err) => match err.as_service_error() {
                Some(e) if e.is_bucket_already_exists() => Ok(BucketOutcome::AlreadyExists),
                Some(e) if e.is_bucket_already_owned_by_you() => Ok(BucketOutcome::AlreadyOwned),
                _ => Err(anyhow!(
                    "creating bucket {bucket}: {}",
                    DisplayErrorContext(&err)
                )),
            },
        }
    }

    #[instrument(level = "debug", skip(self))]
    async fn check_bucket(&self, bucket: &str, prefix: &str) -> BucketAccess {
        if let Err(err) = self.client.head_bucket().bucket(bucket).send().await {
            let status = err.raw_response().map(|r| r.status().as_u16());
            return BucketAccess::from_status(status, DisplayErrorContext(&err).to_string());
        }

        match self
            .client
            .list_objects_v2()
            .bucket(bucket)
            .prefix(prefix)
            .max_keys(1)
            .send()
            .await
        {
            Ok(resp) => BucketAccess::Accessible {
                key_count: resp.key_count().unwrap_or(0).max(0) as usize,
            },
            Err(err) => {
                let status = err.raw_response().map(|r| r.status().as_u16());
                BucketAccess::from_status(status, DisplayErrorContext(&err).to_string())
            }
        }
    }

    #[instrument(level = "debug", skip(self))]
    async fn list_objects(&self, bucket: &str, prefix: &str) -> Result<Vec<ObjectInfo>> {
        let mut pages = self
            .client
            .list_objects_v2()
            .bucket(bucket)
            .prefix(prefix)
            .into_paginator()
            .send();

        let mut out = Vec::new();
        while let Some(page) = pages.next().await {
            let page = page.map_err(|e| {
                anyhow!(
                    "listing s3://{bucket}/{prefix}: {}",
                    DisplayErrorContext(&e)
                )
            })?;
            for obj in page.contents() {
                if let Some(key) = obj.key() {
                    out.push(ObjectInfo {
                        key: key.to_string(),
                        size: obj.size().unwrap_or(0).max(0) as u64,
                    });
                }
            }
        }
        debug!(count = out.len(), "listed objects");
        Ok(out)
    }

    async fn get_object(&self, bucket: &str, key: &str) -> Result<Bytes> {
        let resp = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| anyhow!("fetching s3://{bucket}/{key}: {}", DisplayErrorContext(&e)))?;
        let data = resp
            .body
            .collect()
            .await
            .with_context(|| format!("reading body of s3://{bucket}/{key}"))?;
        Ok(data.into_bytes())
    }

    async fn put_object(&self, bucket: &str, key: &str, body: Bytes) -> Result<()> {
        let len = body.len();
        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .body(ByteStream::from(body))
            .send()
            .await
            .map_err(|e| anyhow!("uploading s3://{bucket}/{key}: {}", DisplayErrorContext(&e)))?;
        debug!(bucket, key, bytes = len, "put object");
        Ok(())
    }
}
