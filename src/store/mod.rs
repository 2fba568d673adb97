// src/store/mod.rs
use anyhow::Result;
use async_trait::async_trait;
use bytes::Bytes;

pub mod memory;
pub mod s3;

pub use memory::MemoryStore;
pub use s3::S3Store;

/// Result of asking for a bucket to exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BucketOutcome {
    Created,
    /// Someone already holds the name.
    AlreadyExists,
    AlreadyOwned,
}

/// Result of a read-access probe on a bucket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BucketAccess {
    Accessible { key_count: usize },
    NotFound,
    AccessDenied,
    Error(String),
}

impl BucketAccess {
    /// Map an HTTP status (when the request got that far) to an access outcome.
    pub fn from_status(status: Option<u16>, message: impl Into<String>) -> Self {
        match status {
            Some(404) => BucketAccess::NotFound,
            Some(403) => BucketAccess::AccessDenied,
            _ => BucketAccess::Error(message.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectInfo {
    pub key: String,
    pub size: u64,
}

/// The object storage the harness reads and writes.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Create `bucket` in `region`, treating "already there" as success.
    async fn ensure_bucket(&self, bucket: &str, region: &str) -> Result<BucketOutcome>;

    /// Probe that `bucket` is reachable and count keys under `prefix` (at most one).
    async fn check_bucket(&self, bucket: &str, prefix: &str) -> BucketAccess;

    /// Every object under `prefix`, in key order.
    async fn list_objects(&self, bucket: &str, prefix: &str) -> Result<Vec<ObjectInfo>>;

    async fn get_object(&self, bucket: &str, key: &str) -> Result<Bytes>;

    async fn put_object(&self, bucket: &str, key: &str, body: Bytes) -> Result<()>;
}

/// Join a key prefix and a relative key with exactly one `/` between them.
pub fn join_key(prefix: &str, rest: &str) -> String {
    let rest = rest.trim_start_matches('/');
    if prefix.is_empty() {
        rest.to_string()
    } else {
        format!("{}/{}", prefix.trim_end_matches('/'), rest)
    }
}

pub fn s3_uri(bucket: &str, key: &str) -> String {
    format!("s3://{bucket}/{key}")
}
