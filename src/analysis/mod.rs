// src/analysis/mod.rs
use anyhow::Result;
use tracing::{info, instrument};

use crate::config::Month;
use crate::store::ObjectStore;

pub mod flows;
pub mod recommend;
pub mod report;
pub mod resources;

pub use flows::correlate_vpc_flow_logs;
pub use recommend::generate_recommendations;
pub use report::{write_report, AnalysisSummary, FlowAnalysis, Report};
pub use resources::analyze_expensive_dto_resources;

/// Inputs of one analysis run.
#[derive(Debug, Clone)]
pub struct AnalysisParams {
    pub cur_bucket: String,
    pub cur_prefix: String,
    pub target_month: Month,
    pub vpc_logs_bucket: String,
    pub vpc_logs_prefix: String,
    pub top_n: usize,
}

pub(crate) fn round_cents(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

/// Rank CUR spend, correlate with flow logs, recommend.
///
/// Fails only when the CUR data cannot be read; flow-log problems end up
/// in `flow_analysis`.
#[instrument(level = "info", skip(store, params), fields(month = %params.target_month))]
pub async fn run_complete_analysis(
    store: &dyn ObjectStore,
    params: &AnalysisParams,
) -> Result<Report> {
    let resources = analyze_expensive_dto_resources(
        store,
        &params.cur_bucket,
        &params.cur_prefix,
        params.target_month,
        params.top_n,
    )
    .await?;

    if resources.is_empty() {
        info!("no data transfer spend found");
        return Ok(Report::no_data(params.target_month));
    }

    let resource_ids: Vec<String> = resources
        .iter()
        .filter(|r| !r.resource_id.is_empty())
        .map(|r| r.resource_id.clone())
        .collect();
    let flow_analysis = correlate_vpc_flow_logs(
        store,
        &resource_ids,
        &params.vpc_logs_bucket,
        &params.vpc_logs_prefix,
    )
    .await;

    let recommendations = generate_recommendations(&resources, &flow_analysis);
    let total_dto_cost = round_cents(resources.iter().map(|r| r.blended_cost).sum());

    info!(
        total_dto_cost,
        resources = resources.len(),
        flow_logs = flow_analysis.status(),
        recommendations = recommendations.len(),
        "analysis complete"
    );

    Ok(Report::Success {
        analysis_summary: AnalysisSummary {
            target_month: params.target_month,
            total_dto_cost,
            resources_analyzed: resources.len(),
            flow_logs_status: flow_analysis.status(),
            recommendations_count: recommendations.len(),
        },
        expensive_resources: resources,
        flow_analysis,
        recommendations,
    })
}
