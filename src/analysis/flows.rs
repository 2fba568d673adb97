// src/analysis/flows.rs
use anyhow::{Context, Result};
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::{debug, info, instrument, warn};

use super::report::{FlowAnalysis, FlowSummary};
use crate::flow::{parse_flow_text, read_flow_parquet, FlowRecord};
use crate::generate::RESOURCE_ADDRESSES_FILE;
use crate::store::{ObjectInfo, ObjectStore};

/// Flow-log objects read per analysis.
pub const MAX_FLOW_LOG_FILES: usize = 10;
/// Address pairs reported back.
pub const MAX_REPORTED_FLOWS: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowLogFormat {
    Text,
    Parquet,
}

impl FlowLogFormat {
    pub fn from_key(key: &str) -> Option<Self> {
        if key.ends_with(".txt") || key.ends_with(".log") {
            Some(FlowLogFormat::Text)
        } else if key.ends_with(".parquet") {
            Some(FlowLogFormat::Parquet)
        } else {
            None
        }
    }
}

/// Flow-log objects to read, at most `limit`. When a text and a parquet
/// export share a stem only the parquet one is kept, so one set of flows is
/// not counted twice.
pub fn select_flow_files(objects: &[ObjectInfo], limit: usize) -> Vec<(String, FlowLogFormat)> {
    let mut by_stem: BTreeMap<&str, (&str, FlowLogFormat)> = BTreeMap::new();
    for obj in objects {
        let Some(format) = FlowLogFormat::from_key(&obj.key) else {
            continue;
        };
        let stem = obj
            .key
            .rsplit_once('.')
            .map(|(stem, _)| stem)
            .unwrap_or(obj.key.as_str());
        match by_stem.get(stem) {
            Some((_, FlowLogFormat::Parquet)) => {}
            _ => {
                by_stem.insert(stem, (obj.key.as_str(), format));
            }
        }
    }
    by_stem
        .into_values()
        .take(limit)
        .map(|(key, format)| (key.to_string(), format))
        .collect()
}

/// Decides whether a flow involves one of the resources under analysis.
///
/// An address matches when it contains a resource ID or is the mapped
/// address of one.
pub struct ResourceMatcher {
    ids: Vec<String>,
    addresses: HashSet<String>,
}

impl ResourceMatcher {
    pub fn new(resource_ids: &[String], address_map: &HashMap<String, String>) -> Self {
        let addresses = resource_ids
            .iter()
            .filter_map(|id| address_map.get(id).cloned())
            .collect();
        Self {
            ids: resource_ids.iter().filter(|id| !id.is_empty()).cloned().collect(),
            addresses,
        }
    }

    fn address_matches(&self, addr: &str) -> bool {
        self.addresses.contains(addr) || self.ids.iter().any(|id| addr.contains(id.as_str()))
    }

    pub fn matches(&self, flow: &FlowRecord) -> bool {
        self.address_matches(&flow.srcaddr) || self.address_matches(&flow.dstaddr)
    }
}

/// Aggregate by (srcaddr, dstaddr, protocol), heaviest first, capped at
/// [`MAX_REPORTED_FLOWS`]. Byte totals saturate at `u64::MAX`.
pub fn summarize_flows(flows: &[FlowRecord]) -> Vec<FlowSummary> {
    let mut pairs: HashMap<(&str, &str, &str), FlowSummary> = HashMap::new();
    for f in flows {
        let entry = pairs
            .entry((f.srcaddr.as_str(), f.dstaddr.as_str(), f.protocol.as_str()))
            .or_insert_with(|| FlowSummary {
                srcaddr: f.srcaddr.clone(),
                dstaddr: f.dstaddr.clone(),
                protocol: f.protocol.clone(),
                total_bytes: 0,
                flow_count: 0,
            });
        entry.total_bytes = entry.total_bytes.saturating_add(f.bytes);
        entry.flow_count += 1;
    }

    let mut out: Vec<FlowSummary> = pairs.into_values().collect();
    out.sort_by(|a, b| {
        b.total_bytes
            .cmp(&a.total_bytes)
            .then_with(|| a.srcaddr.cmp(&b.srcaddr))
            .then_with(|| a.dstaddr.cmp(&b.dstaddr))
            .then_with(|| a.protocol.cmp(&b.protocol))
    });
    out.truncate(MAX_REPORTED_FLOWS);
    out
}

/// Merge every resource address map stored under the prefix.
async fn load_resource_addresses(
    store: &dyn ObjectStore,
    bucket: &str,
    objects: &[ObjectInfo],
) -> Result<HashMap<String, String>> {
    let mut map = HashMap::new();
    for obj in objects.iter().filter(|o| {
        o.key == RESOURCE_ADDRESSES_FILE || o.key.ends_with(&format!("/{RESOURCE_ADDRESSES_FILE}"))
    }) {
        let body = store.get_object(bucket, &obj.key).await?;
        match serde_json::from_slice::<HashMap<String, String>>(&body) {
            Ok(m) => map.extend(m),
            Err(e) => warn!(key = %obj.key, error = %e, "ignoring unreadable address map"),
        }
    }
    Ok(map)
}

async fn collect_flows(
    store: &dyn ObjectStore,
    resource_ids: &[String],
    bucket: &str,
    prefix: &str,
) -> Result<FlowAnalysis> {
    let objects = store.list_objects(bucket, prefix).await?;
    if objects.is_empty() {
        return Ok(FlowAnalysis::NoFiles {
            error: "No VPC flow log files found".to_string(),
        });
    }

    let addresses = load_resource_addresses(store, bucket, &objects).await?;
    let matcher = ResourceMatcher::new(resource_ids, &addresses);

    let mut matched = Vec::new();
    for (key, format) in select_flow_files(&objects, MAX_FLOW_LOG_FILES) {
        let body = store.get_object(bucket, &key).await?;
        let records = match format {
            FlowLogFormat::Text => parse_flow_text(&String::from_utf8_lossy(&body)),
            FlowLogFormat::Parquet => {
                read_flow_parquet(body).with_context(|| format!("reading {key}"))?
            }
        };
        let before = matched.len();
        let total = records.len();
        matched.extend(records.into_iter().filter(|r| matcher.matches(r)));
        debug!(key = %key, total, matched = matched.len() - before, "scanned flow log");
    }

    let flows = summarize_flows(&matched);
    info!(matched = matched.len(), pairs = flows.len(), "correlated flow logs");
    Ok(FlowAnalysis::Success {
        total_flows: flows.len(),
        flows,
    })
}

/// Traffic of the given resources according to the flow logs under `prefix`.
/// Storage and decoding failures are reported in the result, not raised.
#[instrument(level = "info", skip(store, resource_ids), fields(resources = resource_ids.len()))]
pub async fn correlate_vpc_flow_logs(
    store: &dyn ObjectStore,
    resource_ids: &[String],
    bucket: &str,
    prefix: &str,
) -> FlowAnalysis {
    if resource_ids.is_empty() {
        return FlowAnalysis::NoResources;
    }
    match collect_flows(store, resource_ids, bucket, prefix).await {
        Ok(analysis) => analysis,
        Err(e) => {
            warn!(error = %e, "flow log correlation failed");
            FlowAnalysis::Error {
                error: format!("{e:#}"),
            }
        }
    }
}
