// src/analysis/report.rs
use anyhow::{Context, Result};
use serde::{Serialize, Serializer};
use std::{
    fs,
    io::Write,
    path::{Path, PathBuf},
};

use crate::config::Month;

/// Result of a complete analysis run.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Report {
    Success {
        analysis_summary: AnalysisSummary,
        expensive_resources: Vec<ExpensiveResource>,
        flow_analysis: FlowAnalysis,
        recommendations: Vec<Recommendation>,
    },
    NoData {
        message: String,
        recommendations: Vec<Recommendation>,
    },
}

impl Report {
    pub fn no_data(month: Month) -> Self {
        Report::NoData {
            message: format!("No expensive DTO resources found in CUR data for {month}"),
            recommendations: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisSummary {
    pub target_month: Month,
    pub total_dto_cost: f64,
    pub resources_analyzed: usize,
    pub flow_logs_status: &'static str,
    pub recommendations_count: usize,
}

/// Monthly data-transfer spend of one resource. Serialized under the CUR
/// column names it was aggregated from.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExpensiveResource {
    #[serde(rename = "lineItem/resourceId")]
    pub resource_id: String,
    #[serde(rename = "product/serviceName")]
    pub service_name: String,
    #[serde(rename = "product/region")]
    pub region: String,
    #[serde(rename = "lineItem/blendedCost")]
    pub blended_cost: f64,
    #[serde(rename = "lineItem/usageAmount")]
    pub usage_amount: f64,
}

/// Traffic between one address pair over one protocol.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FlowSummary {
    pub srcaddr: String,
    pub dstaddr: String,
    pub protocol: String,
    pub total_bytes: u64,
    pub flow_count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FlowAnalysis {
    Success {
        flows: Vec<FlowSummary>,
        total_flows: usize,
    },
    NoResources,
    NoFiles {
        error: String,
    },
    Error {
        error: String,
    },
}

impl FlowAnalysis {
    pub fn status(&self) -> &'static str {
        match self {
            FlowAnalysis::Success { .. } => "success",
            FlowAnalysis::NoResources => "no_resources",
            FlowAnalysis::NoFiles { .. } => "no_files",
            FlowAnalysis::Error { .. } => "error",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Priority {
    High,
    Medium,
}

/// A dollar amount, or `"Variable"` for traffic-pattern findings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RecommendationCost {
    Amount(f64),
    Variable,
}

impl Serialize for RecommendationCost {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            RecommendationCost::Amount(v) => serializer.serialize_f64(*v),
            RecommendationCost::Variable => serializer.serialize_str("Variable"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Recommendation {
    pub resource_id: String,
    pub service: String,
    pub cost: RecommendationCost,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub priority: Priority,
    pub recommendation: &'static str,
    pub implementation: &'static str,
    pub aws_documentation: &'static str,
    pub estimated_savings: &'static str,
}

/// Pretty JSON with a trailing newline, written to a temp file and renamed into place.
pub fn write_report(report: &Report, path: &Path) -> Result<()> {
    let dir = path.parent().filter(|p| !p.as_os_str().is_empty());
    if let Some(dir) = dir {
        fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    }
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "report.json".to_string());
    let tmp_path: PathBuf = match dir {
        Some(d) => d.join(format!(".{file_name}.tmp")),
        None => PathBuf::from(format!(".{file_name}.tmp")),
    };

    let mut tmp = fs::File::create(&tmp_path)
        .with_context(|| format!("creating {}", tmp_path.display()))?;
    serde_json::to_writer_pretty(&mut tmp, report).context("serializing report")?;
    tmp.write_all(b"\n")?;
    drop(tmp);

    fs::rename(&tmp_path, path)
        .with_context(|| format!("renaming {} -> {}", tmp_path.display(), path.display()))?;
    Ok(())
}
