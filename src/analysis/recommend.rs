// src/analysis/recommend.rs
use super::report::{
    ExpensiveResource, FlowAnalysis, Priority, Recommendation, RecommendationCost,
};

/// Resources below this monthly spend get no recommendation.
pub const COST_THRESHOLD: f64 = 50.0;
/// A single address pair moving more than this is worth a look.
pub const HIGH_TRAFFIC_BYTES: u64 = 500_000_000;

struct ServiceRule {
    /// Substrings of the CUR service name: short code and long product name.
    aliases: &'static [&'static str],
    kind: &'static str,
    /// Spend above which the priority becomes High, if any.
    high_above: Option<f64>,
    recommendation: &'static str,
    implementation: &'static str,
    aws_documentation: &'static str,
    estimated_savings: &'static str,
}

/// Checked in order; the first matching rule wins.
const SERVICE_RULES: &[ServiceRule] = &[
    ServiceRule {
        aliases: &["EC2", "Elastic Compute Cloud"],
        kind: "EC2 Data Transfer Optimization",
        high_above: Some(200.0),
        recommendation: "Implement VPC endpoints to reduce NAT gateway data transfer charges",
        implementation: "Create VPC endpoints for frequently accessed AWS services",
        aws_documentation: "https://docs.aws.amazon.com/vpc/latest/privatelink/vpc-endpoints.html",
        estimated_savings: "Up to 50% reduction in data transfer costs",
    },
    ServiceRule {
        aliases: &["S3", "Simple Storage Service"],
        kind: "S3 Data Transfer Optimization",
        high_above: Some(100.0),
        recommendation: "Use CloudFront CDN or S3 Transfer Acceleration",
        implementation: "Configure CloudFront distribution for frequently accessed objects",
        aws_documentation:
            "https://docs.aws.amazon.com/AmazonCloudFront/latest/DeveloperGuide/Introduction.html",
        estimated_savings: "Up to 60% reduction in data transfer costs",
    },
    ServiceRule {
        aliases: &["RDS", "Relational Database Service"],
        kind: "RDS Data Transfer Optimization",
        high_above: None,
        recommendation: "Optimize database queries and implement read replicas in same AZ",
        implementation: "Create read replicas closer to application servers",
        aws_documentation: "https://docs.aws.amazon.com/AmazonRDS/latest/UserGuide/USER_ReadRepl.html",
        estimated_savings: "Up to 40% reduction in cross-AZ charges",
    },
];

fn rule_for(service: &str) -> Option<&'static ServiceRule> {
    SERVICE_RULES
        .iter()
        .find(|rule| rule.aliases.iter().any(|a| service.contains(a)))
}

fn network_recommendation() -> Recommendation {
    Recommendation {
        resource_id: "Network Traffic Pattern".to_string(),
        service: "VPC".to_string(),
        cost: RecommendationCost::Variable,
        kind: "Network Architecture Optimization",
        priority: Priority::High,
        recommendation: "Optimize data locality and reduce cross-AZ/cross-region traffic",
        implementation: "Review application architecture for data locality patterns",
        aws_documentation:
            "https://docs.aws.amazon.com/wellarchitected/latest/cost-optimization-pillar/networking.html",
        estimated_savings: "Up to 70% reduction in inter-AZ charges",
    }
}

/// Best-practice recommendations for the expensive resources, plus one
/// network-wide item when the flow logs show a heavy address pair.
pub fn generate_recommendations(
    resources: &[ExpensiveResource],
    flow_analysis: &FlowAnalysis,
) -> Vec<Recommendation> {
    let mut out: Vec<Recommendation> = resources
        .iter()
        .filter(|r| r.blended_cost > COST_THRESHOLD)
        .filter_map(|r| {
            let rule = rule_for(&r.service_name)?;
            let priority = match rule.high_above {
                Some(limit) if r.blended_cost > limit => Priority::High,
                _ => Priority::Medium,
            };
            Some(Recommendation {
                resource_id: r.resource_id.clone(),
                service: r.service_name.clone(),
                cost: RecommendationCost::Amount(r.blended_cost),
                kind: rule.kind,
                priority,
                recommendation: rule.recommendation,
                implementation: rule.implementation,
                aws_documentation: rule.aws_documentation,
                estimated_savings: rule.estimated_savings,
            })
        })
        .collect();

    if let FlowAnalysis::Success { flows, .. } = flow_analysis {
        if flows.iter().any(|f| f.total_bytes > HIGH_TRAFFIC_BYTES) {
            out.push(network_recommendation());
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::report::FlowSummary;

    fn res(id: &str, service: &str, cost: f64) -> ExpensiveResource {
        ExpensiveResource {
            resource_id: id.into(),
            service_name: service.into(),
            region: "us-east-1".into(),
            blended_cost: cost,
            usage_amount: cost * 100.0,
        }
    }

    fn flows(bytes: u64) -> FlowAnalysis {
        FlowAnalysis::Success {
            flows: vec![FlowSummary {
                srcaddr: "10.0.1.100".into(),
                dstaddr: "8.8.8.8".into(),
                protocol: "6".into(),
                total_bytes: bytes,
                flow_count: 1,
            }],
            total_flows: 1,
        }
    }

    #[test]
    fn priorities_by_service() {
        let resources = vec![
            res("i-hi", "Amazon Elastic Compute Cloud", 250.0),
            res("i-med", "Amazon EC2", 200.0),
            res("s3-hi", "Amazon Simple Storage Service", 100.01),
            res("s3-med", "Amazon S3", 75.0),
            res("db", "Amazon Relational Database Service", 5000.0),
        ];
        let recs = generate_recommendations(&resources, &FlowAnalysis::NoResources);
        let got: Vec<_> = recs
            .iter()
            .map(|r| (r.resource_id.as_str(), r.kind, r.priority))
            .collect();
        assert_eq!(
            got,
            vec![
                ("i-hi", "EC2 Data Transfer Optimization", Priority::High),
                ("i-med", "EC2 Data Transfer Optimization", Priority::Medium),
                ("s3-hi", "S3 Data Transfer Optimization", Priority::High),
                ("s3-med", "S3 Data Transfer Optimization", Priority::Medium),
                ("db", "RDS Data Transfer Optimization", Priority::Medium),
            ]
        );
        assert_eq!(recs[0].cost, RecommendationCost::Amount(250.0));
    }

    #[test]
    fn cheap_and_unknown_services_are_skipped() {
        let resources = vec![
            res("i-cheap", "Amazon Elastic Compute Cloud", 50.0),
            res("cf", "Amazon CloudFront", 900.0),
            res("vol", "Amazon Elastic Block Store", 900.0),
        ];
        assert!(generate_recommendations(&resources, &FlowAnalysis::NoResources).is_empty());
    }

    #[test]
    fn heavy_flow_adds_network_item() {
        let recs = generate_recommendations(&[], &flows(HIGH_TRAFFIC_BYTES + 1));
        assert_eq!(recs.len(), 1);
        assert_eq!(recs[0].kind, "Network Architecture Optimization");
        assert_eq!(recs[0].cost, RecommendationCost::Variable);

        assert!(generate_recommendations(&[], &flows(HIGH_TRAFFIC_BYTES)).is_empty());
        assert!(generate_recommendations(
            &[],
            &FlowAnalysis::Error {
                error: "x".into()
            }
        )
        .is_empty());
    }
}
