// src/analysis/resources.rs
use anyhow::{Context, Result};
use futures::future::try_join_all;
use std::collections::BTreeMap;
use tracing::{debug, info, instrument};

use super::{report::ExpensiveResource, round_cents};
use crate::config::Month;
use crate::cur::{read_cur_csv, CurFile, CurRecord};
use crate::store::ObjectStore;

/// CUR exports this analysis understands.
pub fn is_cur_key(key: &str) -> bool {
    key.ends_with(".csv") || key.ends_with(".csv.gz")
}

/// Rows of `file` that belong to `month`. Files without a usage start
/// column are taken whole; rows with an unreadable date are dropped.
pub fn rows_in_month(file: CurFile, month: Month) -> impl Iterator<Item = CurRecord> {
    let filter = file.has_usage_start;
    file.records
        .into_iter()
        .filter(move |r| !filter || r.usage_start().is_some_and(|d| month.contains(d)))
}

/// Sum data-transfer spend per (resource, service, region) and keep the
/// `top_n` most expensive. Rows without a resource ID are ignored.
pub fn rank_dto_resources<'a, I>(records: I, top_n: usize) -> Vec<ExpensiveResource>
where
    I: IntoIterator<Item = &'a CurRecord>,
{
    let mut totals: BTreeMap<(&str, &str, &str), (f64, f64)> = BTreeMap::new();
    for r in records {
        if r.resource_id.is_empty() || !r.is_data_transfer() {
            continue;
        }
        let entry = totals
            .entry((
                r.resource_id.as_str(),
                r.service_name.as_str(),
                r.region.as_str(),
            ))
            .or_insert((0.0, 0.0));
        entry.0 += r.blended_cost;
        entry.1 += r.usage_amount;
    }

    let mut ranked: Vec<ExpensiveResource> = totals
        .into_iter()
        .map(|((id, service, region), (cost, usage))| ExpensiveResource {
            resource_id: id.to_string(),
            service_name: service.to_string(),
            region: region.to_string(),
            blended_cost: round_cents(cost),
            usage_amount: round_cents(usage),
        })
        .collect();
    ranked.sort_by(|a, b| {
        b.blended_cost
            .total_cmp(&a.blended_cost)
            .then_with(|| a.resource_id.cmp(&b.resource_id))
    });
    ranked.truncate(top_n);
    ranked
}

/// Most expensive data-transfer resources in the CUR objects for `month`.
#[instrument(level = "info", skip(store))]
pub async fn analyze_expensive_dto_resources(
    store: &dyn ObjectStore,
    cur_bucket: &str,
    cur_prefix: &str,
    month: Month,
    top_n: usize,
) -> Result<Vec<ExpensiveResource>> {
    let month_tag = month.to_string();
    let keys: Vec<String> = store
        .list_objects(cur_bucket, cur_prefix)
        .await?
        .into_iter()
        .map(|o| o.key)
        .filter(|k| is_cur_key(k) && k.contains(&month_tag))
        .collect();

    if keys.is_empty() {
        info!("no CUR objects for {month_tag} under s3://{cur_bucket}/{cur_prefix}");
        return Ok(Vec::new());
    }
    debug!(?keys, "loading CUR objects");

    let bodies = try_join_all(keys.iter().map(|key| async move {
        store
            .get_object(cur_bucket, key)
            .await
            .map(|body| (key, body))
    }))
    .await?;

    let mut records = Vec::new();
    for (key, body) in bodies {
        let file = read_cur_csv(&body, key.ends_with(".gz"))
            .with_context(|| format!("parsing s3://{cur_bucket}/{key}"))?;
        let before = records.len();
        records.extend(rows_in_month(file, month));
        debug!(key = %key, rows = records.len() - before, "CUR rows in month");
    }

    let ranked = rank_dto_resources(&records, top_n);
    info!(
        rows = records.len(),
        resources = ranked.len(),
        "ranked data transfer resources"
    );
    Ok(ranked)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cur::write_cur_csv;
    use crate::store::MemoryStore;
    use bytes::Bytes;

    fn rec(day: &str, id: &str, usage: &str, family: &str, cost: f64) -> CurRecord {
        CurRecord {
            usage_start_date: day.into(),
            usage_end_date: day.into(),
            resource_id: id.into(),
            usage_type: usage.into(),
            blended_cost: cost,
            usage_amount: cost * 10.0,
            service_name: "svc".into(),
            region: "us-east-1".into(),
            product_family: family.into(),
        }
    }

    #[test]
    fn cur_keys() {
        assert!(is_cur_key("a/cur-2024-01/data.csv"));
        assert!(is_cur_key("a/cur-2024-01/data.csv.gz"));
        assert!(!is_cur_key("a/cur-2024-01/data.parquet"));
        assert!(!is_cur_key("a/manifest.json"));
    }

    #[test]
    fn groups_filters_and_ranks() {
        let records = vec![
            rec("2024-01-01", "a", "DataTransfer-Out-Bytes", "", 10.0),
            rec("2024-01-02", "a", "DataTransfer-Out-Bytes", "", 15.0),
            rec("2024-01-01", "b", "Other", "Data Transfer", 20.0),
            rec("2024-01-01", "c", "NatGateway-Bytes", "Compute Instance", 999.0),
            rec("2024-01-01", "", "DataTransfer-Out-Bytes", "", 500.0),
            rec("2024-01-01", "d", "DataTransfer-Out-Bytes", "", 1.0),
        ];
        let ranked = rank_dto_resources(&records, 10);
        let ids: Vec<_> = ranked.iter().map(|r| r.resource_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "d"]);
        assert_eq!(ranked[0].blended_cost, 25.0);
        assert_eq!(ranked[0].usage_amount, 250.0);

        let top = rank_dto_resources(&records, 2);
        assert_eq!(top.len(), 2);
        assert_eq!(rank_dto_resources(&records, 0).len(), 0);
    }

    #[test]
    fn same_resource_in_two_regions_stays_apart() {
        let mut west = rec("2024-01-01", "a", "DataTransfer-Out-Bytes", "", 5.0);
        west.region = "us-west-2".into();
        let records = vec![rec("2024-01-01", "a", "DataTransfer-Out-Bytes", "", 7.0), west];
        let ranked = rank_dto_resources(&records, 10);
        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].region, "us-east-1");
    }

    #[test]
    fn ties_break_on_resource_id() {
        let records = vec![
            rec("2024-01-01", "z", "DataTransfer-Out-Bytes", "", 5.0),
            rec("2024-01-01", "m", "DataTransfer-Out-Bytes", "", 5.0),
        ];
        let ranked = rank_dto_resources(&records, 10);
        assert_eq!(ranked[0].resource_id, "m");
    }

    #[test]
    fn month_filter() {
        let month: Month = "2024-01".parse().unwrap();
        let file = CurFile {
            records: vec![
                rec("2024-01-31", "a", "", "", 1.0),
                rec("2024-02-01", "b", "", "", 1.0),
                rec("garbage", "c", "", "", 1.0),
            ],
            has_usage_start: true,
        };
        let kept: Vec<_> = rows_in_month(file, month).map(|r| r.resource_id).collect();
        assert_eq!(kept, vec!["a"]);

        let undated = CurFile {
            records: vec![rec("", "a", "", "", 1.0)],
            has_usage_start: false,
        };
        assert_eq!(rows_in_month(undated, month).count(), 1);
    }

    #[tokio::test]
    async fn reads_only_matching_objects() {
        let store = MemoryStore::with_buckets(["cur"]);
        let jan = vec![rec("2024-01-05", "i-1", "DataTransfer-Out-Bytes", "", 80.0)];
        let feb = vec![rec("2024-02-05", "i-2", "DataTransfer-Out-Bytes", "", 90.0)];
        store
            .put_object(
                "cur",
                "cur-reports/cur-2024-01/a.csv.gz",
                Bytes::from(write_cur_csv(&jan, true).unwrap()),
            )
            .await
            .unwrap();
        store
            .put_object(
                "cur",
                "cur-reports/cur-2024-02/a.csv",
                Bytes::from(write_cur_csv(&feb, false).unwrap()),
            )
            .await
            .unwrap();
        store
            .put_object("cur", "cur-reports/cur-2024-01/manifest.json", Bytes::from_static(b"{}"))
            .await
            .unwrap();

        let month: Month = "2024-01".parse().unwrap();
        let ranked = analyze_expensive_dto_resources(&store, "cur", "cur-reports/", month, 10)
            .await
            .unwrap();
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].resource_id, "i-1");

        let empty = analyze_expensive_dto_resources(&store, "cur", "elsewhere/", month, 10)
            .await
            .unwrap();
        assert!(empty.is_empty());
    }

    #[tokio::test]
    async fn corrupt_object_is_an_error() {
        let store = MemoryStore::with_buckets(["cur"]);
        store
            .put_object("cur", "cur-2024-01.csv.gz", Bytes::from_static(b"nope"))
            .await
            .unwrap();
        let month: Month = "2024-01".parse().unwrap();
        assert!(analyze_expensive_dto_resources(&store, "cur", "", month, 10)
            .await
            .is_err());
    }
}
