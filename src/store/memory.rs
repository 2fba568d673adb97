use anyhow::{bail, Result};
use async_trait::async_trait;
use bytes::Bytes;
use std::{
    collections::{BTreeMap, HashSet},
    sync::{Mutex, MutexGuard, PoisonError},
};

use super::{BucketAccess, BucketOutcome, ObjectInfo, ObjectStore};

type Buckets = BTreeMap<String, BTreeMap<String, Bytes>>;

/// In-process object store for `--mock` runs and tests.
#[derive(Default)]
pub struct MemoryStore {
    buckets: Mutex<Buckets>,
    /// Buckets that exist but refuse every request.
    denied: Mutex<HashSet<String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store with the given buckets already created.
    pub fn with_buckets<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let store = Self::new();
        {
            let mut buckets = store.lock();
            for name in names {
                buckets.entry(name.into()).or_default();
            }
        }
        store
    }

    pub fn deny(&self, bucket: &str) {
        self.denied
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(bucket.to_string());
    }

    pub fn keys(&self, bucket: &str) -> Vec<String> {
        self.lock()
            .get(bucket)
            .map(|objs| objs.keys().cloned().collect())
            .unwrap_or_default()
    }

    fn lock(&self) -> MutexGuard<'_, Buckets> {
        self.buckets.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn is_denied(&self, bucket: &str) -> bool {
        self.denied
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(bucket)
    }

    fn guard(&self, bucket: &str) -> Result<()> {
        if self.is_denied(bucket) {
            bail!("AccessDenied: bucket {bucket}");
        }
        Ok(())
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn ensure_bucket(&self, bucket: &str, _region: &str) -> Result<BucketOutcome> {
        if self.is_denied(bucket) {
            return Ok(BucketOutcome::AlreadyExists);
        }
        let mut buckets = self.lock();
        if buckets.contains_key(bucket) {
            return Ok(BucketOutcome::AlreadyOwned);
        }
        buckets.insert(bucket.to_string(), BTreeMap::new());
        Ok(BucketOutcome::Created)
    }

    async fn check_bucket(&self, bucket: &str, prefix: &str) -> BucketAccess {
        if self.is_denied(bucket) {
            return BucketAccess::AccessDenied;
        }
        match self.lock().get(bucket) {
            Some(objs) => BucketAccess::Accessible {
                key_count: objs.keys().filter(|k| k.starts_with(prefix)).take(1).count(),
            },
            None => BucketAccess::NotFound,
        }
    }

    async fn list_objects(&self, bucket: &str, prefix: &str) -> Result<Vec<ObjectInfo>> {
        self.guard(bucket)?;
        let buckets = self.lock();
        let Some(objs) = buckets.get(bucket) else {
            bail!("NoSuchBucket: {bucket}");
        };
        Ok(objs
            .iter()
            .filter(|(k, _)| k.starts_with(prefix))
            .map(|(k, v)| ObjectInfo {
                key: k.clone(),
                size: v.len() as u64,
            })
            .collect())
    }

    async fn get_object(&self, bucket: &str, key: &str) -> Result<Bytes> {
        self.guard(bucket)?;
        let buckets = self.lock();
        match buckets.get(bucket).and_then(|objs| objs.get(key)) {
            Some(body) => Ok(body.clone()),
            None => bail!("NoSuchKey: s3://{bucket}/{key}"),
        }
    }

    async fn put_object(&self, bucket: &str, key: &str, body: Bytes) -> Result<()> {
        self.guard(bucket)?;
        let mut buckets = self.lock();
        let Some(objs) = buckets.get_mut(bucket) else {
            bail!("NoSuchBucket: {bucket}");
        };
        objs.insert(key.to_string(), body);
        Ok(())
    }
}
